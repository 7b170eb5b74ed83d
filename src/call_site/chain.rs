//! Cycle detection while a call-site graph is being built.

use std::collections::HashMap;

use ahash::RandomState;

use crate::error::{DiError, DiResult};
use crate::key::ServiceType;

struct ChainEntry {
    order: usize,
    implementation: Option<&'static str>,
}

/// Service types currently being built, in visitation order.
///
/// Lives for one top-level build only.
pub(crate) struct CallSiteChain {
    entries: HashMap<ServiceType, ChainEntry, RandomState>,
}

impl CallSiteChain {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::default(),
        }
    }

    /// Fails with the full chain if `service_type` is already being built.
    pub(crate) fn check_circular(&self, service_type: ServiceType) -> DiResult<()> {
        if self.entries.contains_key(&service_type) {
            let mut path = self.ordered();
            path.push(service_type.name());
            return Err(DiError::CircularDependency(path));
        }
        Ok(())
    }

    pub(crate) fn add(&mut self, service_type: ServiceType, implementation: Option<&'static str>) {
        let order = self.entries.len();
        self.entries.insert(service_type, ChainEntry { order, implementation });
    }

    pub(crate) fn remove(&mut self, service_type: ServiceType) {
        self.entries.remove(&service_type);
    }

    /// Implementation recorded for `service_type`, if it is in the chain.
    pub(crate) fn implementation_of(&self, service_type: ServiceType) -> Option<&'static str> {
        self.entries.get(&service_type).and_then(|e| e.implementation)
    }

    fn ordered(&self) -> Vec<&'static str> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.order);
        entries.into_iter().map(|(ty, _)| ty.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn reports_visitation_order() {
        let mut chain = CallSiteChain::new();
        chain.add(ServiceType::of::<A>(), Some("AImpl"));
        chain.add(ServiceType::of::<B>(), None);
        let err = chain.check_circular(ServiceType::of::<A>()).unwrap_err();
        let path = err.cycle().unwrap();
        assert_eq!(path, &[
            std::any::type_name::<A>(),
            std::any::type_name::<B>(),
            std::any::type_name::<A>(),
        ]);
        assert_eq!(chain.implementation_of(ServiceType::of::<A>()), Some("AImpl"));
    }

    #[test]
    fn removal_reopens_the_type() {
        let mut chain = CallSiteChain::new();
        chain.add(ServiceType::of::<C>(), None);
        chain.remove(ServiceType::of::<C>());
        assert!(chain.check_circular(ServiceType::of::<C>()).is_ok());
    }
}
