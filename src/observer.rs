//! Diagnostic observers for resolution events.
//!
//! Observers are registered on the [`ServiceCollection`](crate::ServiceCollection)
//! and called synchronously from the engine, so implementations should be
//! cheap. Every hook has a no-op default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::call_site::CallSite;
use crate::error::DiError;
use crate::key::ServiceKey;

/// Observer trait for dependency injection events.
///
/// # Examples
///
/// ```
/// use callsite_di::{DiObserver, Resolver, ServiceCollection, ServiceKey};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl DiObserver for Counter {
///     fn resolved(&self, _key: &ServiceKey, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let counter = Arc::new(Counter::default());
/// let mut services = ServiceCollection::new();
/// services.add_singleton(7u32);
/// services.add_observer(counter.clone());
///
/// let provider = services.build();
/// provider.get_required::<u32>().unwrap();
/// assert_eq!(counter.0.load(Ordering::Relaxed), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// A call site was built for a request.
    fn call_site_built(&self, _call_site: &CallSite) {}

    /// A request was answered. Nested resolutions are reported too.
    fn resolved(&self, _key: &ServiceKey, _duration: Duration) {}

    /// A request failed.
    fn resolution_failed(&self, _key: &ServiceKey, _error: &DiError) {}

    /// A compiled accessor replaced the interpreter for `key`.
    fn accessor_compiled(&self, _key: &ServiceKey) {}

    /// A scope was disposed, running `disposed` dispose handles.
    fn scope_disposed(&self, _disposed: usize) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiObserver for TracingObserver {
    fn call_site_built(&self, call_site: &CallSite) {
        debug!(
            service = %call_site.service_type(),
            kind = ?call_site.kind(),
            dependencies = call_site.dependencies().len(),
            "call site built"
        );
    }

    fn resolved(&self, key: &ServiceKey, duration: Duration) {
        trace!(service = %key, ?duration, "service resolved");
    }

    fn resolution_failed(&self, key: &ServiceKey, error: &DiError) {
        debug!(service = %key, %error, "service resolution failed");
    }

    fn accessor_compiled(&self, key: &ServiceKey) {
        debug!(service = %key, "accessor compiled");
    }

    fn scope_disposed(&self, disposed: usize) {
        debug!(disposed, "scope disposed");
    }
}

/// Counts resolutions, failures and time spent resolving.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolutions: AtomicU64,
    failures: AtomicU64,
    total_nanos: AtomicU64,
    compiled: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Number of accessors swapped for compiled ones.
    pub fn compiled_count(&self) -> u64 {
        self.compiled.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    /// Mean time per successful resolution, `None` before the first one.
    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = self.resolution_count();
        if count == 0 {
            return None;
        }
        Some(self.total_resolution_time() / count as u32)
    }
}

impl DiObserver for MetricsObserver {
    fn resolved(&self, _key: &ServiceKey, duration: Duration) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn resolution_failed(&self, _key: &ServiceKey, _error: &DiError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn accessor_compiled(&self, _key: &ServiceKey) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }
}

/// Observers registered for one provider.
///
/// Designed to cost a single emptiness check when nothing is registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn call_site_built(&self, call_site: &CallSite) {
        for observer in &self.observers {
            observer.call_site_built(call_site);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &ServiceKey, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, key: &ServiceKey, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(key, error);
        }
    }

    pub(crate) fn accessor_compiled(&self, key: &ServiceKey) {
        for observer in &self.observers {
            observer.accessor_compiled(key);
        }
    }

    pub(crate) fn scope_disposed(&self, disposed: usize) {
        for observer in &self.observers {
            observer.scope_disposed(disposed);
        }
    }
}
