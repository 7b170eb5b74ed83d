//! Type-erased service instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::traits::Dispose;

/// A built service instance with its type erased.
///
/// The payload is an `Arc<T>` stored behind `Arc<dyn Any>`, so both sized
/// types and trait objects (`Arc<dyn Logger>`) round-trip without copies.
/// An instance that exposes a disposal contract carries a handle to it;
/// the scope that owns the instance disposes through that handle.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    disposer: Option<Arc<dyn Dispose>>,
}

impl Instance {
    /// Wraps a shared value.
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            disposer: None,
        }
    }

    /// Wraps a shared value whose `Dispose` impl the owning scope should run.
    pub fn disposable<T: Dispose>(value: Arc<T>) -> Self {
        let disposer: Arc<dyn Dispose> = value.clone();
        Self::new(value).with_disposer(disposer)
    }

    /// Attaches a disposal handle.
    pub fn with_disposer(mut self, disposer: Arc<dyn Dispose>) -> Self {
        self.disposer = Some(disposer);
        self
    }

    /// Wraps the ordered items of an aggregate request.
    pub(crate) fn aggregate(items: Vec<Instance>) -> Self {
        Self::new(Arc::new(items))
    }

    /// The disposal handle, if the instance exposes one.
    pub fn disposer(&self) -> Option<&Arc<dyn Dispose>> {
        self.disposer.as_ref()
    }

    /// Recovers the typed `Arc<T>`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Recovers every item of an aggregate instance as `Arc<T>`.
    pub fn downcast_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let items = self.downcast::<Vec<Instance>>()?;
        items.iter().map(Instance::downcast::<T>).collect()
    }

    /// Whether both handles refer to the same construction.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}
