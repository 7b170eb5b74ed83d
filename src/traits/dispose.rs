//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown (flushing
/// buffers, closing connections). An instance only gets disposed by the
/// engine when its registration says so: a [`TypeDescriptor`] marked
/// [`disposable`], or a factory registered through
/// [`add_disposable_factory`]. The owning scope then calls `dispose`
/// exactly once, in reverse construction order, when the scope is disposed.
///
/// [`TypeDescriptor`]: crate::TypeDescriptor
/// [`disposable`]: crate::TypeDescriptor::disposable
/// [`add_disposable_factory`]: crate::ServiceCollection::add_disposable_factory
///
/// # Examples
///
/// ```
/// use callsite_di::{Dispose, Lifetime, ServiceCollection, Resolver};
/// use std::sync::{Arc, Mutex};
///
/// struct Cache {
///     flushed: Arc<Mutex<bool>>,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         *self.flushed.lock().unwrap() = true;
///     }
/// }
///
/// let flushed = Arc::new(Mutex::new(false));
/// let flag = flushed.clone();
///
/// let mut services = ServiceCollection::new();
/// services.add_disposable_factory::<Cache, _>(Lifetime::Scoped, move |_| {
///     Ok(Cache { flushed: flag.clone() })
/// });
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// scope.get_required::<Cache>().unwrap();
/// scope.dispose();
/// assert!(*flushed.lock().unwrap());
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
