//! The call-site graph: immutable descriptions of how to build a service.
//!
//! A call site is built once per service and shared by every scope and
//! thread afterwards. It holds no behavior; the runtime resolver interprets
//! it and the compiled engine turns it into closures.

pub(crate) mod chain;
pub(crate) mod factory;
pub(crate) mod validator;

use std::fmt;
use std::sync::Arc;

use crate::activation::Arguments;
use crate::error::DiResult;
use crate::descriptors::FactoryFn;
use crate::instance::Instance;
use crate::key::{CacheKey, ServiceType};
use crate::lifetime::Lifetime;

/// Where the result of a call site is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLocation {
    /// Root scope; one instance per provider
    Root,
    /// Resolving scope; one instance per scope
    Scope,
    /// Not reused, but captured by the resolving scope for disposal
    Dispose,
    /// Neither reused nor captured
    None,
}

/// Cache policy of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCache {
    /// Where the instance lives
    pub location: CacheLocation,
    /// Key inside the target scope's instance map
    pub key: CacheKey,
}

impl ResultCache {
    pub(crate) fn new(lifetime: Lifetime, key: CacheKey) -> Self {
        let location = match lifetime {
            Lifetime::Singleton => CacheLocation::Root,
            Lifetime::Scoped => CacheLocation::Scope,
            Lifetime::Transient => CacheLocation::Dispose,
        };
        Self { location, key }
    }

    pub(crate) fn none(service_type: ServiceType) -> Self {
        Self {
            location: CacheLocation::None,
            key: CacheKey::new(service_type, 0),
        }
    }
}

/// Variant tag of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteKind {
    /// Pre-built value
    Constant,
    /// Implementation type activated through a selected constructor
    Constructor,
    /// User factory closure
    Factory,
    /// Every registration of a type, in order
    Aggregate,
    /// The resolving scope itself
    ProviderSelf,
    /// A scope factory for the owning engine
    ScopeFactorySelf,
}

/// Invokes the selected constructor and converts the result to the service type.
pub(crate) type Activator = Arc<dyn Fn(&mut Arguments) -> DiResult<Instance> + Send + Sync>;

pub(crate) struct ConstructorCallSite {
    pub(crate) activator: Activator,
    pub(crate) parameters: Vec<Arc<CallSite>>,
}

pub(crate) enum CallSitePayload {
    Constant(Instance),
    Constructor(ConstructorCallSite),
    Factory(FactoryFn),
    Aggregate(Vec<Arc<CallSite>>),
    ProviderSelf,
    ScopeFactorySelf,
}

/// A node of the call-site graph.
pub struct CallSite {
    service_type: ServiceType,
    implementation: Option<&'static str>,
    cache: ResultCache,
    pub(crate) payload: CallSitePayload,
}

impl CallSite {
    pub(crate) fn new(
        service_type: ServiceType,
        implementation: Option<&'static str>,
        cache: ResultCache,
        payload: CallSitePayload,
    ) -> Self {
        Self {
            service_type,
            implementation,
            cache,
            payload,
        }
    }

    /// The service type this node produces.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Implementation type name for constructor call sites.
    pub fn implementation_name(&self) -> Option<&'static str> {
        self.implementation
    }

    /// Cache policy.
    pub fn cache(&self) -> ResultCache {
        self.cache
    }

    /// Variant tag.
    pub fn kind(&self) -> CallSiteKind {
        match &self.payload {
            CallSitePayload::Constant(_) => CallSiteKind::Constant,
            CallSitePayload::Constructor(_) => CallSiteKind::Constructor,
            CallSitePayload::Factory(_) => CallSiteKind::Factory,
            CallSitePayload::Aggregate(_) => CallSiteKind::Aggregate,
            CallSitePayload::ProviderSelf => CallSiteKind::ProviderSelf,
            CallSitePayload::ScopeFactorySelf => CallSiteKind::ScopeFactorySelf,
        }
    }

    /// Direct dependencies: constructor parameters or aggregate items.
    pub fn dependencies(&self) -> &[Arc<CallSite>] {
        match &self.payload {
            CallSitePayload::Constructor(ctor) => &ctor.parameters,
            CallSitePayload::Aggregate(items) => items,
            _ => &[],
        }
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CallSite");
        s.field("service_type", &self.service_type)
            .field("kind", &self.kind())
            .field("cache", &self.cache.location);
        if let Some(implementation) = self.implementation {
            s.field("implementation", &implementation);
        }
        let dependencies = self.dependencies();
        if !dependencies.is_empty() {
            s.field("dependencies", &dependencies);
        }
        s.finish()
    }
}
