//! # callsite-di
//!
//! Dependency injection built on a call-site graph, modeled on
//! Microsoft.Extensions.DependencyInjection.
//!
//! Registrations are turned into an immutable graph of *call sites*
//! describing how each service is built: a constant, a constructor with its
//! parameters, a factory, a collection of every registration, or a built-in.
//! The graph is checked for cycles when it is built and then executed by an
//! interpreter, a closure compiler, or a hybrid of the two.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Scoped and Transient with per-scope caching
//! - **Constructor selection**: implementation types describe their
//!   constructors; the engine picks the widest satisfiable one
//! - **Multi-registration**: the last registration wins for single lookups,
//!   `get_all` returns every registration in order
//! - **Disposal**: scopes dispose what they created, in reverse order
//! - **Validation**: cycle detection with full paths, optional scope
//!   validation and build-time validation
//! - **Thread-safe**: singletons and scoped instances are built once per owner
//!
//! ## Quick Start
//!
//! ```rust
//! use callsite_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient_factory::<UserService, _>(|resolver| {
//!     Ok(UserService {
//!         db: resolver.get_required::<Database>()?,
//!     })
//! });
//!
//! let provider = services.build();
//! let user_service = provider.get_required::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Implementation Types
//!
//! ```rust
//! use callsite_di::{
//!     ConstructorDescriptor, Injectable, Lifetime, Resolver, ServiceCollection, TypeDescriptor,
//! };
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! struct Handler {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Injectable for Handler {
//!     fn type_descriptor() -> TypeDescriptor<Self> {
//!         TypeDescriptor::new().constructor(
//!             ConstructorDescriptor::new(|args| Ok(Handler { logger: args.next::<dyn Logger>()? }))
//!                 .param::<dyn Logger>(),
//!         )
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_trait::<dyn Logger>(Arc::new(ConsoleLogger));
//! services.add_transient_type::<Handler>();
//!
//! let provider = services.build();
//! let handler = provider.get_required::<Handler>().unwrap();
//! assert_eq!(handler.logger.log("ready"), "[LOG] ready");
//! ```
//!
//! ## Scoped Services
//!
//! ```rust
//! use callsite_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct RequestContext {
//!     id: u32,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_scoped_factory::<RequestContext, _>(|_| Ok(RequestContext { id: 7 }));
//!
//! let provider = services.build();
//! let scope = provider.create_scope();
//! let a = scope.get_required::<RequestContext>().unwrap();
//! let b = scope.get_required::<RequestContext>().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.id, 7);
//! scope.dispose();
//! ```

pub mod activation;
pub mod call_site;
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod options;
pub mod provider;
pub mod traits;

mod engine;
mod internal;

pub use activation::{Arguments, ConstructorDescriptor, Injectable, ParameterDescriptor, TypeDescriptor};
pub use call_site::{CacheLocation, CallSite, CallSiteKind, ResultCache};
pub use collection::{ServiceCollection, ServiceCollectionExt, ServiceCollectionModuleExt, ServiceModule};
pub use descriptors::{FactoryFn, ImplementationStrategy, ImplementationType, ServiceDescriptor};
pub use error::{DiError, DiResult};
pub use instance::Instance;
pub use key::{CacheKey, ServiceKey, ServiceType};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, MetricsObserver, TracingObserver};
pub use options::{ExecutionMode, ServiceProviderOptions};
pub use provider::{ResolverContext, Scope, ScopeFactory, ServiceProvider};
pub use traits::{Dispose, Resolver, ResolverCore};
