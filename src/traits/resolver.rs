//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceKey;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`Scope`](crate::Scope) and [`ResolverContext`](crate::ResolverContext).
/// Most users should use the [`Resolver`] trait instead, which layers typed
/// generic methods on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves a request to a type-erased instance.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(instance))` - The resolved service
    /// * `Ok(None)` - Nothing is registered for a single-value request
    /// * `Err(DiError)` - Resolution error (cycle, disposed scope, user error, ...)
    fn resolve_key(&self, key: ServiceKey) -> DiResult<Option<Instance>>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Every [`ResolverCore`] gets these methods. `T` may be a concrete type or a
/// trait object such as `dyn Logger`.
///
/// # Examples
///
/// ```
/// use callsite_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let provider = collection.build();
///
/// let number = provider.get_required::<usize>().unwrap();
/// assert_eq!(*number, 42);
///
/// let logger = provider.get_required::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
///
/// assert!(provider.get::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the last registration of `T`, or `None` when `T` is not registered.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve_key(ServiceKey::of::<T>())? {
            Some(instance) => instance.downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the last registration of `T`.
    ///
    /// Fails with [`DiError::UnresolvableDependency`] when `T` is not registered.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get::<T>()?.ok_or(DiError::UnresolvableDependency {
            service: std::any::type_name::<T>(),
            required_by: None,
        })
    }

    /// Resolves every registration of `T` in registration order.
    ///
    /// Never fails for lack of registrations; the result is simply empty.
    ///
    /// ```
    /// use callsite_di::{Lifetime, ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// struct PluginA;
    /// impl Plugin for PluginA {
    ///     fn name(&self) -> &str { "Plugin A" }
    /// }
    ///
    /// struct PluginB;
    /// impl Plugin for PluginB {
    ///     fn name(&self) -> &str { "Plugin B" }
    /// }
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton_trait::<dyn Plugin>(Arc::new(PluginA));
    /// collection.add_trait_factory::<dyn Plugin, _>(Lifetime::Transient, |_| Ok(Arc::new(PluginB)));
    ///
    /// let provider = collection.build();
    /// let plugins = provider.get_all::<dyn Plugin>().unwrap();
    /// assert_eq!(plugins.len(), 2);
    /// assert_eq!(plugins[0].name(), "Plugin A");
    /// assert_eq!(plugins[1].name(), "Plugin B");
    /// ```
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        match self.resolve_key(ServiceKey::all::<T>())? {
            Some(instance) => instance.downcast_all::<T>(),
            None => Ok(Vec::new()),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
