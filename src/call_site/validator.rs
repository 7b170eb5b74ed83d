//! Scope validation over built call sites.

use ahash::RandomState;
use dashmap::DashMap;

use super::{CacheLocation, CallSite};
use crate::error::{DiError, DiResult};
use crate::key::{ServiceKey, ServiceType};

/// Checks that scoped services never leak into singletons or the root scope.
///
/// Every built call site is walked once: a scoped node below a singleton is
/// rejected outright, and the first scoped service each request depends on
/// is remembered so that resolving it from the root scope can be refused.
pub(crate) struct CallSiteValidator {
    scoped_dependencies: DashMap<ServiceKey, ServiceType, RandomState>,
}

impl CallSiteValidator {
    pub(crate) fn new() -> Self {
        Self {
            scoped_dependencies: DashMap::default(),
        }
    }

    /// Validates a freshly built call site. `key` is the request it answers,
    /// if any; build-time validation of shadowed registrations passes `None`.
    pub(crate) fn validate_call_site(&self, key: Option<ServiceKey>, call_site: &CallSite) -> DiResult<()> {
        let scoped = self.visit(call_site, None)?;
        if let (Some(key), Some(scoped)) = (key, scoped) {
            self.scoped_dependencies.insert(key, scoped);
        }
        Ok(())
    }

    /// Rejects resolving a scoped service, directly or transitively, from the root scope.
    pub(crate) fn validate_resolution(&self, key: ServiceKey, from_root: bool) -> DiResult<()> {
        if !from_root {
            return Ok(());
        }
        match self.scoped_dependencies.get(&key) {
            Some(scoped) if *scoped == key.service_type() => Err(DiError::InvalidScopeUsage(format!(
                "Cannot resolve scoped service '{}' from root provider",
                key.service_type()
            ))),
            Some(scoped) => Err(DiError::InvalidScopeUsage(format!(
                "Cannot resolve '{}' from root provider because it requires scoped service '{}'",
                key,
                *scoped
            ))),
            None => Ok(()),
        }
    }

    /// Returns the first scoped service found at or below `call_site`.
    fn visit(&self, call_site: &CallSite, singleton: Option<ServiceType>) -> DiResult<Option<ServiceType>> {
        match call_site.cache().location {
            CacheLocation::Root => {
                self.visit_dependencies(call_site, Some(call_site.service_type()))?;
                Ok(None)
            }
            CacheLocation::Scope => {
                if let Some(singleton) = singleton {
                    return Err(DiError::InvalidScopeUsage(format!(
                        "Cannot consume scoped service '{}' from singleton '{}'",
                        call_site.service_type(),
                        singleton
                    )));
                }
                self.visit_dependencies(call_site, None)?;
                Ok(Some(call_site.service_type()))
            }
            CacheLocation::Dispose | CacheLocation::None => self.visit_dependencies(call_site, singleton),
        }
    }

    fn visit_dependencies(
        &self,
        call_site: &CallSite,
        singleton: Option<ServiceType>,
    ) -> DiResult<Option<ServiceType>> {
        let mut first_scoped = None;
        for dependency in call_site.dependencies() {
            let scoped = self.visit(dependency, singleton)?;
            first_scoped = first_scoped.or(scoped);
        }
        Ok(first_scoped)
    }
}
