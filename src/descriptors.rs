//! Service descriptors: the registration records the engine is built from.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::activation::{describe, Activated, Injectable, TypeInfo};
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceType;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::traits::Dispose;

/// Factory closure stored in a descriptor.
pub type FactoryFn = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync>;

type Finish = Arc<dyn Fn(Activated) -> DiResult<Instance> + Send + Sync>;

/// How a descriptor produces its instances.
#[derive(Clone)]
pub enum ImplementationStrategy {
    /// A pre-built value, returned as-is and never disposed by the engine
    Constant(Instance),
    /// A closure invoked with a resolver bound to the resolving scope
    Factory(FactoryFn),
    /// An implementation type activated through constructor selection
    Implementation(ImplementationType),
}

/// An implementation type bound to the service type it is registered as.
#[derive(Clone)]
pub struct ImplementationType {
    type_id: TypeId,
    name: &'static str,
    describe: fn() -> TypeInfo,
    finish: Finish,
}

impl ImplementationType {
    fn new<S, I, F>(upcast: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        let finish: Finish = Arc::new(move |activated: Activated| {
            let concrete = activated
                .value
                .downcast::<I>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))?;
            let instance = Instance::new(upcast(concrete));
            Ok(match activated.disposer {
                Some(disposer) => instance.with_disposer(disposer),
                None => instance,
            })
        });
        Self {
            type_id: TypeId::of::<I>(),
            name: std::any::type_name::<I>(),
            describe: describe::<I>,
            finish,
        }
    }

    /// `TypeId` of the implementation.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Type name of the implementation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_info(&self) -> TypeInfo {
        (self.describe)()
    }

    pub(crate) fn finish(&self) -> &Finish {
        &self.finish
    }
}

/// A single registration: service type, lifetime and construction strategy.
///
/// Several descriptors may share a service type. The last one wins for
/// single-value resolution; all of them are returned, in registration
/// order, by `get_all`.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{ImplementationStrategy, Lifetime, ServiceCollection, ServiceDescriptor};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add(ServiceDescriptor::constant(Arc::new(42u32)));
/// services.add_scoped_factory::<String, _>(|_| Ok("req".to_string()));
///
/// let descriptors = services.descriptors();
/// assert_eq!(descriptors.len(), 2);
/// assert_eq!(descriptors[0].lifetime(), Lifetime::Singleton);
/// assert!(matches!(descriptors[1].strategy(), ImplementationStrategy::Factory(_)));
/// assert_eq!(descriptors[1].service_type().name(), "alloc::string::String");
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    service_type: ServiceType,
    lifetime: Lifetime,
    strategy: ImplementationStrategy,
}

impl ServiceDescriptor {
    /// A singleton backed by an already-built value.
    pub fn constant<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            service_type: ServiceType::of::<T>(),
            lifetime: Lifetime::Singleton,
            strategy: ImplementationStrategy::Constant(Instance::new(value)),
        }
    }

    /// A service produced by `factory`.
    pub fn factory<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::erased_factory(ServiceType::of::<T>(), lifetime, move |ctx| {
            factory(ctx).map(Instance::new)
        })
    }

    /// A service produced by `factory` whose `Dispose` impl the owning scope runs.
    pub fn disposable_factory<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        Self::erased_factory(ServiceType::of::<T>(), lifetime, move |ctx| {
            factory(ctx).map(|value| Instance::disposable(Arc::new(value)))
        })
    }

    /// A service activated from implementation type `I`, registered as itself.
    pub fn implementation<I: Injectable>(lifetime: Lifetime) -> Self {
        Self::implementation_as::<I, I, _>(lifetime, |value| value)
    }

    /// A service of type `S` activated from implementation type `I`.
    ///
    /// `upcast` converts the built `Arc<I>` into the service type, typically
    /// an unsizing cast such as `|r| r as Arc<dyn Repo>`.
    pub fn implementation_as<S, I, F>(lifetime: Lifetime, upcast: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            service_type: ServiceType::of::<S>(),
            lifetime,
            strategy: ImplementationStrategy::Implementation(ImplementationType::new::<S, I, F>(upcast)),
        }
    }

    fn erased_factory<F>(service_type: ServiceType, lifetime: Lifetime, factory: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Self {
            service_type,
            lifetime,
            strategy: ImplementationStrategy::Factory(Arc::new(factory)),
        }
    }

    /// The service type this descriptor registers.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// The registered lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The construction strategy.
    pub fn strategy(&self) -> &ImplementationStrategy {
        &self.strategy
    }

    /// Implementation type name, when the strategy is an implementation type.
    pub fn implementation_name(&self) -> Option<&'static str> {
        match &self.strategy {
            ImplementationStrategy::Implementation(implementation) => Some(implementation.name()),
            _ => None,
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.strategy {
            ImplementationStrategy::Constant(_) => "constant",
            ImplementationStrategy::Factory(_) => "factory",
            ImplementationStrategy::Implementation(implementation) => implementation.name(),
        };
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type)
            .field("lifetime", &self.lifetime)
            .field("strategy", &strategy)
            .finish()
    }
}
