//! Type descriptors: how an implementation type is constructed.
//!
//! Rust has no runtime reflection, so an implementation type describes its
//! own constructors once through [`Injectable::type_descriptor`]. Each
//! constructor lists the services it consumes, in order, and an activator
//! closure that pulls them back out of [`Arguments`]. The engine queries the
//! descriptor once per implementation type and selects a constructor from it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceKey;
use crate::traits::Dispose;

/// An implementation type the engine can activate by constructor selection.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{
///     ConstructorDescriptor, Injectable, Resolver, ServiceCollection, TypeDescriptor,
/// };
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
///
/// impl Injectable for Server {
///     fn type_descriptor() -> TypeDescriptor<Self> {
///         TypeDescriptor::new().constructor(
///             ConstructorDescriptor::new(|args| Ok(Server { config: args.next::<Config>()? }))
///                 .param::<Config>(),
///         )
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Config { port: 8080 });
/// services.add_singleton_type::<Server>();
///
/// let provider = services.build();
/// let server = provider.get_required::<Server>().unwrap();
/// assert_eq!(server.config.port, 8080);
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Describes the constructors of `Self`.
    fn type_descriptor() -> TypeDescriptor<Self>;
}

type Activator<I> = Arc<dyn Fn(&mut Arguments) -> DiResult<I> + Send + Sync>;
pub(crate) type RawActivator = Arc<dyn Fn(&mut Arguments) -> DiResult<Activated> + Send + Sync>;
pub(crate) type DefaultValue = Arc<dyn Fn() -> Instance + Send + Sync>;

/// The constructors of an implementation type.
pub struct TypeDescriptor<I> {
    constructors: Vec<ConstructorDescriptor<I>>,
    disposer: Option<fn(&Arc<I>) -> Arc<dyn Dispose>>,
}

impl<I: Send + Sync + 'static> TypeDescriptor<I> {
    /// A descriptor with no constructors yet.
    pub fn new() -> Self {
        Self {
            constructors: Vec::new(),
            disposer: None,
        }
    }

    /// Adds a constructor.
    pub fn constructor(mut self, constructor: ConstructorDescriptor<I>) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Declares that instances expose a disposal contract.
    ///
    /// Every activated instance is then captured by the scope that owns it
    /// and disposed when that scope is disposed.
    pub fn disposable(mut self) -> Self
    where
        I: Dispose,
    {
        self.disposer = Some(dispose_handle::<I>);
        self
    }

    /// Number of described constructors.
    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    pub(crate) fn erase(self) -> TypeInfo {
        let disposer = self.disposer;
        let constructors = self
            .constructors
            .into_iter()
            .map(|ctor| {
                let activate = ctor.activate;
                let raw: RawActivator = Arc::new(move |args: &mut Arguments| {
                    let value = Arc::new(activate(args)?);
                    Ok(Activated {
                        disposer: disposer.map(|handle| handle(&value)),
                        value,
                    })
                });
                ConstructorInfo {
                    parameters: ctor.parameters,
                    preferred: ctor.preferred,
                    activate: raw,
                }
            })
            .collect();
        TypeInfo {
            name: std::any::type_name::<I>(),
            constructors,
        }
    }
}

impl<I: Send + Sync + 'static> Default for TypeDescriptor<I> {
    fn default() -> Self {
        Self::new()
    }
}

fn dispose_handle<I: Dispose>(value: &Arc<I>) -> Arc<dyn Dispose> {
    value.clone()
}

/// One constructor: its parameters and the closure that invokes it.
///
/// Parameters are declared in the order the activator consumes them.
pub struct ConstructorDescriptor<I> {
    parameters: Vec<ParameterDescriptor>,
    preferred: bool,
    activate: Activator<I>,
}

impl<I: Send + Sync + 'static> ConstructorDescriptor<I> {
    /// A constructor with no parameters yet.
    pub fn new<F>(activate: F) -> Self
    where
        F: Fn(&mut Arguments) -> DiResult<I> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            preferred: false,
            activate: Arc::new(activate),
        }
    }

    /// Appends a required parameter of service type `T`.
    pub fn param<T: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(ParameterDescriptor {
            key: ServiceKey::of::<T>(),
            default: None,
        });
        self
    }

    /// Appends a parameter receiving every registration of `T`.
    ///
    /// Always satisfiable: no registrations yield an empty sequence.
    pub fn param_all<T: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(ParameterDescriptor {
            key: ServiceKey::all::<T>(),
            default: None,
        });
        self
    }

    /// Appends a parameter of type `T` that falls back to `default` when
    /// nothing is registered for `T`.
    pub fn param_or<T, F>(mut self, default: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.parameters.push(ParameterDescriptor {
            key: ServiceKey::of::<T>(),
            default: Some(Arc::new(move || Instance::new(default()))),
        });
        self
    }

    /// Marks this constructor as the one to use regardless of arity.
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }
}

/// A constructor parameter.
#[derive(Clone)]
pub struct ParameterDescriptor {
    key: ServiceKey,
    default: Option<DefaultValue>,
}

impl ParameterDescriptor {
    /// The service requested for this parameter.
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// Whether the parameter declares a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("key", &self.key)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    values: SmallVec<[Instance; 4]>,
    cursor: usize,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: SmallVec::with_capacity(capacity),
            cursor: 0,
        }
    }

    pub(crate) fn push(&mut self, value: Instance) {
        self.values.push(value);
    }

    /// Takes the next argument as `Arc<T>`.
    pub fn next<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        self.take()?.downcast::<T>()
    }

    /// Takes the next argument, declared with `param_all`, as a sequence.
    pub fn next_all<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Vec<Arc<T>>> {
        self.take()?.downcast_all::<T>()
    }

    /// Number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.values.len() - self.cursor
    }

    fn take(&mut self) -> DiResult<&Instance> {
        let value = self
            .values
            .get(self.cursor)
            .ok_or(DiError::TypeMismatch("constructor argument list exhausted"))?;
        self.cursor += 1;
        Ok(value)
    }
}

/// Output of a type-erased activator.
pub(crate) struct Activated {
    pub(crate) value: Arc<dyn Any + Send + Sync>,
    pub(crate) disposer: Option<Arc<dyn Dispose>>,
}

pub(crate) struct ConstructorInfo {
    pub(crate) parameters: Vec<ParameterDescriptor>,
    pub(crate) preferred: bool,
    pub(crate) activate: RawActivator,
}

/// Type-erased, memoizable form of a [`TypeDescriptor`].
pub(crate) struct TypeInfo {
    pub(crate) name: &'static str,
    pub(crate) constructors: Vec<ConstructorInfo>,
}

pub(crate) fn describe<I: Injectable>() -> TypeInfo {
    I::type_descriptor().erase()
}
