//! Internal disposal bag for captured disposables.

use std::sync::Arc;

use crate::traits::Dispose;

/// Disposal handles in capture order, drained last-in first-out.
#[derive(Default)]
pub(crate) struct DisposeBag {
    items: Vec<Arc<dyn Dispose>>,
}

impl DisposeBag {
    /// Add a captured disposal handle.
    pub(crate) fn push(&mut self, item: Arc<dyn Dispose>) {
        self.items.push(item);
    }

    /// Dispose everything in reverse capture order, returning how many ran.
    pub(crate) fn run_all_reverse(&mut self) -> usize {
        let mut count = 0;
        while let Some(item) = self.items.pop() {
            item.dispose();
            count += 1;
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
