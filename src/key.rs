//! Service identity types: what is being asked for and where its result is cached.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a service type.
///
/// Works for concrete types and trait objects alike (`ServiceType::of::<dyn Logger>()`).
/// Equality and hashing use only the `TypeId`; the name is carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use callsite_di::ServiceType;
///
/// trait Logger: Send + Sync {}
///
/// let a = ServiceType::of::<dyn Logger>();
/// let b = ServiceType::of::<dyn Logger>();
/// assert_eq!(a, b);
/// assert_ne!(a, ServiceType::of::<String>());
/// assert_eq!(ServiceType::of::<String>().name(), "alloc::string::String");
/// ```
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    /// Identity of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The `std::any::type_name` of the service.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A resolution request.
///
/// `Single` asks for the last registration of a type; `All` asks for every
/// registration of it, in registration order.
///
/// ```rust
/// use callsite_di::{ServiceKey, ServiceType};
///
/// let single = ServiceKey::of::<u32>();
/// let all = ServiceKey::all::<u32>();
/// assert_ne!(single, all);
/// assert_eq!(single.service_type(), all.service_type());
/// assert_eq!(all.to_string(), "all<u32>");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// The last registration of a service type
    Single(ServiceType),
    /// Every registration of a service type
    All(ServiceType),
}

impl ServiceKey {
    /// Single-value request for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey::Single(ServiceType::of::<T>())
    }

    /// Aggregate request for every registration of `T`.
    pub fn all<T: ?Sized + 'static>() -> Self {
        ServiceKey::All(ServiceType::of::<T>())
    }

    /// The requested service type, regardless of arity.
    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceKey::Single(ty) | ServiceKey::All(ty) => *ty,
        }
    }

    /// Whether this is an aggregate request.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, ServiceKey::All(_))
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Single(ty) => write!(f, "{}", ty),
            ServiceKey::All(ty) => write!(f, "all<{}>", ty),
        }
    }
}

/// Key of a cached instance inside a scope.
///
/// `slot` counts how many registrations of the same service type come after
/// the one that produced the instance, so the last registration always owns
/// slot 0. Single-value resolution and the last element of an aggregate
/// therefore share one cached instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Service type of the cached instance
    pub service_type: ServiceType,
    /// Registration slot, 0 for the last registration
    pub slot: usize,
}

impl CacheKey {
    pub(crate) fn new(service_type: ServiceType, slot: usize) -> Self {
        Self { service_type, slot }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.service_type, self.slot)
    }
}
