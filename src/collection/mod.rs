//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type and related functionality
//! for registering services and building service providers.

use std::sync::Arc;

use crate::activation::Injectable;
use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::options::ServiceProviderOptions;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::traits::Dispose;

pub mod module_system;
pub use module_system::*;

/// Ordered list of service registrations.
///
/// Registering a service type again shadows the earlier registration for
/// single-value resolution; every registration stays visible to
/// [`get_all`](crate::Resolver::get_all). The collection is consumed by
/// [`build`](Self::build), so the provider's registry never changes.
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    observers: Observers,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends `descriptor` only if its service type has no registration yet.
    ///
    /// ```rust
    /// # use callsite_di::{ServiceCollection, ServiceDescriptor, Resolver};
    /// # use std::sync::Arc;
    /// let mut services = ServiceCollection::new();
    /// assert!(services.try_add(ServiceDescriptor::constant(Arc::new(1u32))));
    /// assert!(!services.try_add(ServiceDescriptor::constant(Arc::new(2u32))));
    ///
    /// let provider = services.build();
    /// assert_eq!(*provider.get_required::<u32>().unwrap(), 1);
    /// ```
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> bool {
        let service_type = descriptor.service_type();
        if self.descriptors.iter().any(|d| d.service_type() == service_type) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance that will be shared across the entire application.
    ///
    /// The engine never disposes values registered this way; their owner does.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callsite_di::ServiceCollection;
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add(ServiceDescriptor::constant(Arc::new(value)))
    }

    /// Registers a singleton factory that creates the instance on first request.
    ///
    /// The factory runs at most once per provider and receives a resolver bound
    /// to the root scope.
    ///
    /// ```rust
    /// # use callsite_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct UserService { db: Arc<Database> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() });
    /// services.add_singleton_factory::<UserService, _>(|resolver| {
    ///     Ok(UserService { db: resolver.get_required::<Database>()? })
    /// });
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory: one instance per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory: a new instance on every resolution.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory::<T, _>(lifetime, move |ctx| {
            factory(ctx).map(Arc::new)
        }))
    }

    /// Registers a factory whose products implement [`Dispose`]; the scope
    /// that owns each instance disposes it.
    pub fn add_disposable_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::disposable_factory(lifetime, factory))
    }

    // ----- Trait Registrations -----

    /// Registers a pre-built trait object as a singleton.
    ///
    /// ```rust
    /// # use callsite_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Greeter: Send + Sync { fn greet(&self) -> String; }
    /// struct English;
    /// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait::<dyn Greeter>(Arc::new(English));
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<dyn Greeter>().unwrap().greet(), "hello");
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::constant(value))
    }

    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Transient, factory)
    }

    /// Registers a trait factory with an explicit lifetime.
    pub fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(lifetime, factory))
    }

    // ----- Implementation Types -----

    /// Registers implementation type `I` as a singleton of itself.
    ///
    /// `I` is built through constructor selection over its
    /// [`TypeDescriptor`](crate::TypeDescriptor).
    pub fn add_singleton_type<I: Injectable>(&mut self) -> &mut Self {
        self.add(ServiceDescriptor::implementation::<I>(Lifetime::Singleton))
    }

    pub fn add_scoped_type<I: Injectable>(&mut self) -> &mut Self {
        self.add(ServiceDescriptor::implementation::<I>(Lifetime::Scoped))
    }

    pub fn add_transient_type<I: Injectable>(&mut self) -> &mut Self {
        self.add(ServiceDescriptor::implementation::<I>(Lifetime::Transient))
    }

    /// Registers implementation type `I` as service type `S`.
    ///
    /// ```rust
    /// # use callsite_di::{Injectable, Lifetime, ServiceCollection, TypeDescriptor, ConstructorDescriptor, Resolver};
    /// # use std::sync::Arc;
    /// trait Clock: Send + Sync { fn now(&self) -> u64; }
    ///
    /// struct FixedClock;
    /// impl Clock for FixedClock { fn now(&self) -> u64 { 42 } }
    /// impl Injectable for FixedClock {
    ///     fn type_descriptor() -> TypeDescriptor<Self> {
    ///         TypeDescriptor::new().constructor(ConstructorDescriptor::new(|_| Ok(FixedClock)))
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_type_as::<dyn Clock, FixedClock, _>(Lifetime::Singleton, |c| c as Arc<dyn Clock>);
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<dyn Clock>().unwrap().now(), 42);
    /// ```
    pub fn add_type_as<S, I, F>(&mut self, lifetime: Lifetime, upcast: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable,
        F: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::implementation_as::<S, I, F>(lifetime, upcast))
    }

    // ----- Introspection -----

    /// Registered descriptors in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    // ----- Observers -----

    /// Adds a diagnostic observer notified of every resolution of the built provider.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    // ----- Building -----

    /// Builds a provider with default options.
    ///
    /// ```
    /// use callsite_di::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton(42usize);
    /// collection.add_transient_factory::<String, _>(|_| Ok("Hello".to_string()));
    ///
    /// let provider = collection.build();
    /// assert_eq!(*provider.get_required::<usize>().unwrap(), 42);
    /// assert_eq!(&*provider.get_required::<String>().unwrap(), "Hello");
    /// ```
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.descriptors, ServiceProviderOptions::default(), self.observers)
    }

    /// Builds a provider with explicit options.
    ///
    /// Fails with [`DiError::AggregateValidation`](crate::DiError::AggregateValidation)
    /// when `validate_on_build` is set and any descriptor cannot be built.
    ///
    /// ```
    /// use callsite_di::{ServiceCollection, ServiceProviderOptions, ExecutionMode};
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(1u8);
    /// let provider = services
    ///     .build_with(ServiceProviderOptions::strict().mode(ExecutionMode::Compiled))
    ///     .unwrap();
    /// assert_eq!(provider.options().mode, ExecutionMode::Compiled);
    /// ```
    pub fn build_with(self, options: ServiceProviderOptions) -> DiResult<ServiceProvider> {
        let validate = options.validate_on_build;
        let provider = ServiceProvider::new(self.descriptors, options, self.observers);
        if validate {
            provider.validate()?;
        }
        Ok(provider)
    }
}
