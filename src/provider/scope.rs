//! Scoped service resolution and lifecycle management.
//!
//! This module contains the Scope type, its shared state (instance cache,
//! disposables and the per-scope resolution lock) and the ScopeFactory
//! built-in service.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, warn};

use super::ResolverContext;
use crate::engine::Engine;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::internal::DisposeBag;
use crate::key::{CacheKey, ServiceKey};
use crate::traits::ResolverCore;

#[derive(Default)]
struct ScopeData {
    resolved: HashMap<CacheKey, Instance, RandomState>,
    disposables: DisposeBag,
}

/// State shared by every handle to one scope.
///
/// `sync` serializes cached construction in this scope and is held across
/// the whole construction of a cached instance. It is re-entrant: a
/// constructor may resolve through its own `Scope` handle, which starts a
/// fresh context that knows nothing of the lock its thread already owns.
/// `data` guards the instance map and disposables and is only ever held
/// briefly, so a thread that already owns `sync` can keep reading and
/// writing the map.
pub(crate) struct ScopeState {
    is_root: bool,
    sync: ReentrantMutex<()>,
    data: Mutex<ScopeData>,
    disposed: AtomicBool,
}

impl ScopeState {
    pub(crate) fn new(is_root: bool) -> Self {
        Self {
            is_root,
            sync: ReentrantMutex::new(()),
            data: Mutex::new(ScopeData::default()),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        self.is_root
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn disposed_error(&self) -> DiError {
        DiError::ObjectDisposed(if self.is_root { "ServiceProvider" } else { "Scope" })
    }

    pub(crate) fn resolution_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.sync.lock()
    }

    /// Cached instance for `key`, failing once the scope is disposed.
    pub(crate) fn lookup(&self, key: &CacheKey) -> DiResult<Option<Instance>> {
        let data = self.data.lock();
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        Ok(data.resolved.get(key).cloned())
    }

    /// Stores a freshly built cached instance and captures it for disposal.
    pub(crate) fn commit(&self, key: CacheKey, instance: Instance) -> DiResult<Instance> {
        let mut data = self.data.lock();
        if self.is_disposed() {
            drop(data);
            return Err(self.reject(&instance));
        }
        if let Some(disposer) = instance.disposer() {
            data.disposables.push(disposer.clone());
        }
        data.resolved.insert(key, instance.clone());
        Ok(instance)
    }

    /// Captures an uncached instance for disposal with this scope.
    pub(crate) fn capture(&self, instance: Instance) -> DiResult<Instance> {
        let disposer = match instance.disposer() {
            Some(disposer) => disposer.clone(),
            None => return Ok(instance),
        };
        let mut data = self.data.lock();
        if self.is_disposed() {
            drop(data);
            return Err(self.reject(&instance));
        }
        data.disposables.push(disposer);
        Ok(instance)
    }

    /// An instance built against a scope that got disposed meanwhile is
    /// disposed right away so it is never left without an owner.
    fn reject(&self, instance: &Instance) -> DiError {
        if let Some(disposer) = instance.disposer() {
            disposer.dispose();
        }
        self.disposed_error()
    }

    /// Disposes captured instances in reverse capture order. Idempotent.
    pub(crate) fn dispose(&self) -> usize {
        let (resolved, mut disposables) = {
            let mut data = self.data.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return 0;
            }
            let data = std::mem::take(&mut *data);
            (data.resolved, data.disposables)
        };
        let count = disposables.run_all_reverse();
        drop(resolved);
        debug!(root = self.is_root, disposed = count, "scope disposed");
        count
    }
}

impl Drop for ScopeState {
    fn drop(&mut self) {
        if self.is_disposed() {
            return;
        }
        let data = self.data.get_mut();
        if !data.disposables.is_empty() {
            warn!(
                root = self.is_root,
                pending = data.disposables.len(),
                "scope dropped without being disposed; disposing captured instances now"
            );
            data.disposables.run_all_reverse();
        }
    }
}

/// Scoped service container for request-scoped dependency resolution.
///
/// A `Scope` has its own instance cache and disposal list while sharing the
/// provider's call sites, compiled accessors and singletons.
///
/// # Lifetime Behavior
///
/// - **Singleton**: Resolved and cached in the root scope (shared across all scopes)
/// - **Scoped**: Resolved and cached within this specific scope
/// - **Transient**: Created on every resolution and disposed with this scope
///
/// Handles are cheap to clone; all clones refer to the same scope. The
/// scope is disposed by [`dispose`](Self::dispose), or when the last handle
/// is dropped.
///
/// # Examples
///
/// ```
/// use callsite_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
/// struct UserService { db: Arc<DatabaseConnection> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     Ok(DatabaseConnection("connection-123".to_string()))
/// });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     Ok(UserService { db: resolver.get_required::<DatabaseConnection>()? })
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// let a = scope.get_required::<UserService>().unwrap();
/// let b = scope.get_required::<UserService>().unwrap();
/// assert!(Arc::ptr_eq(&a.db, &b.db));
///
/// scope.dispose();
/// assert!(scope.get::<UserService>().is_err());
/// ```
#[derive(Clone)]
pub struct Scope {
    engine: Arc<Engine>,
    state: Arc<ScopeState>,
}

impl Scope {
    pub(crate) fn root(engine: Arc<Engine>) -> Self {
        let state = engine.root_state().clone();
        Self { engine, state }
    }

    pub(crate) fn child(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            state: Arc::new(ScopeState::new(false)),
        }
    }

    pub(crate) fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub(crate) fn state(&self) -> &ScopeState {
        &self.state
    }

    /// Handle to the root scope of the same provider.
    pub(crate) fn root_scope(&self) -> Scope {
        Scope::root(self.engine.clone())
    }

    /// Whether this is the provider's root scope.
    pub fn is_root(&self) -> bool {
        self.state.is_root()
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }

    /// Creates a new scope of the same provider.
    ///
    /// The new scope is independent of this one: disposing either leaves the
    /// other untouched.
    pub fn create_scope(&self) -> Scope {
        Scope::child(self.engine.clone())
    }

    /// Disposes every instance this scope captured, in reverse construction
    /// order, and rejects all further resolution. A second call is a no-op.
    pub fn dispose(&self) {
        let count = self.state.dispose();
        self.engine.observers().scope_disposed(count);
    }

    /// Runs `f` with this scope and disposes the scope afterwards, whether or
    /// not `f` succeeded.
    ///
    /// ```
    /// use callsite_di::{DiError, ServiceCollection, Resolver};
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_scoped_factory::<String, _>(|_| Ok("request".to_string()));
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope();
    /// let len = scope.using(|s| Ok::<_, DiError>(s.get_required::<String>()?.len())).unwrap();
    /// assert_eq!(len, 7);
    /// assert!(scope.is_disposed());
    /// ```
    pub fn using<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&Scope) -> Result<R, E>,
    {
        let result = f(self);
        self.dispose();
        result
    }
}

impl ResolverCore for Scope {
    fn resolve_key(&self, key: ServiceKey) -> DiResult<Option<Instance>> {
        self.engine.get_service(key, &ResolverContext::new(self))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("root", &self.is_root())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Creates scopes for the provider that owns it.
///
/// Resolvable as a built-in service, so factories and constructors can open
/// their own units of work.
///
/// ```
/// use callsite_di::{ScopeFactory, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// let factory = provider.get_required::<ScopeFactory>().unwrap();
/// let scope = factory.create_scope();
/// assert!(!scope.is_root());
/// ```
#[derive(Clone)]
pub struct ScopeFactory {
    engine: Arc<Engine>,
}

impl ScopeFactory {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Creates a new, empty scope.
    pub fn create_scope(&self) -> Scope {
        Scope::child(self.engine.clone())
    }
}

impl fmt::Debug for ScopeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeFactory").finish()
    }
}
