//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type, the root entry point for
//! resolving services, along with scopes and the resolver context.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::engine::Engine;
use crate::error::DiResult;
use crate::instance::Instance;
use crate::key::ServiceKey;
use crate::observer::Observers;
use crate::options::ServiceProviderOptions;
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::{Scope, ScopeFactory};

/// Service provider for resolving dependencies from the DI container.
///
/// The provider owns the root scope: singletons are cached there, and
/// scoped services resolved directly from the provider live there too.
/// Scoped services are normally resolved from a [`Scope`] created with
/// [`create_scope`](Self::create_scope).
///
/// # Thread Safety
///
/// `ServiceProvider` is `Send + Sync` and cheap to clone; clones share the
/// same root scope and realized accessors. A singleton is constructed at
/// most once, however many threads race for it.
///
/// # Examples
///
/// ```
/// use callsite_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     Ok(UserService { db: resolver.get_required::<Database>()? })
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>().unwrap();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    root: Scope,
}

impl ServiceProvider {
    pub(crate) fn new(
        descriptors: Vec<ServiceDescriptor>,
        options: ServiceProviderOptions,
        observers: Observers,
    ) -> Self {
        let engine = Engine::new(descriptors, options, observers);
        Self {
            root: Scope::root(engine),
        }
    }

    /// Builds the call site of every registration and reports all failures.
    pub(crate) fn validate(&self) -> DiResult<()> {
        self.root.engine().validate_descriptors()
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Each scope keeps its own cache of scoped services and its own list of
    /// instances to dispose, while sharing singletons with the provider.
    ///
    /// ```
    /// use callsite_di::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let next = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     Ok(RequestId(next.fetch_add(1, Ordering::SeqCst)))
    /// });
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>().unwrap();
    /// let req1b = scope1.get_required::<RequestId>().unwrap();
    /// let req2 = scope2.get_required::<RequestId>().unwrap();
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> Scope {
        self.root.create_scope()
    }

    /// Runs `f` in a fresh scope that is disposed when `f` returns.
    pub fn using_scope<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&Scope) -> Result<R, E>,
    {
        self.create_scope().using(f)
    }

    /// A factory creating scopes of this provider.
    pub fn scope_factory(&self) -> ScopeFactory {
        ScopeFactory::new(self.root.engine().clone())
    }

    /// The root scope.
    pub fn root_scope(&self) -> &Scope {
        &self.root
    }

    /// Disposes the root scope: every singleton and every instance captured
    /// by the root, in reverse construction order. Idempotent. Child scopes
    /// are not disposed.
    pub fn dispose(&self) {
        self.root.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_disposed()
    }

    /// Options this provider was built with.
    pub fn options(&self) -> &ServiceProviderOptions {
        self.root.engine().options()
    }

    /// The registrations this provider was built from, in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        self.root.engine().descriptors()
    }

    /// Debug rendering of the call-site graph that answers a request for `T`,
    /// or `None` when `T` is not registered.
    ///
    /// ```
    /// use callsite_di::ServiceCollection;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(1u8);
    /// let provider = services.build();
    ///
    /// let graph = provider.call_site_debug::<u8>().unwrap().unwrap();
    /// assert!(graph.contains("Constant"));
    /// assert!(provider.call_site_debug::<u16>().unwrap().is_none());
    /// ```
    pub fn call_site_debug<T: ?Sized + 'static>(&self) -> DiResult<Option<String>> {
        self.root.engine().describe(ServiceKey::of::<T>())
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_key(&self, key: ServiceKey) -> DiResult<Option<Instance>> {
        self.root.resolve_key(key)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("engine", self.root.engine())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
