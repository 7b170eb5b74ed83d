//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;
pub(crate) mod locks;

pub(crate) use circular::ResolutionFrame;
pub(crate) use dispose_bag::DisposeBag;
pub(crate) use locks::HeldLocks;
