//! Explicit record of the resolution locks the current call chain holds.

use std::ops::BitOr;

/// Bit set of held resolution locks.
///
/// Passed down through every nested resolution so that a dependency cached
/// in a scope whose lock is already held by an outer construction does not
/// try to take it again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct HeldLocks(u8);

impl HeldLocks {
    pub(crate) const NONE: HeldLocks = HeldLocks(0);
    /// The resolving child scope's lock.
    pub(crate) const SCOPE: HeldLocks = HeldLocks(1);
    /// The root scope's lock.
    pub(crate) const ROOT: HeldLocks = HeldLocks(2);

    pub(crate) fn contains(self, other: HeldLocks) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for HeldLocks {
    type Output = HeldLocks;

    fn bitor(self, rhs: HeldLocks) -> HeldLocks {
        HeldLocks(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_tracks_both_locks() {
        let held = HeldLocks::NONE | HeldLocks::SCOPE;
        assert!(held.contains(HeldLocks::SCOPE));
        assert!(!held.contains(HeldLocks::ROOT));
        assert!((held | HeldLocks::ROOT).contains(HeldLocks::ROOT));
    }
}
