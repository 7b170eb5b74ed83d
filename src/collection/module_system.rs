//! Grouping registrations into reusable modules.
//!
//! A module owns the registrations of one feature (persistence, messaging,
//! ...) so an application composes its container from a handful of calls.

use crate::{DiResult, ServiceCollection};

/// A unit of registrations applied to a [`ServiceCollection`].
///
/// Modules are consumed when applied. A failing module aborts composition;
/// registrations it made before failing stay in the collection.
///
/// ```rust
/// use callsite_di::{DiResult, Resolver, ServiceCollection, ServiceCollectionExt, ServiceModule};
/// use std::sync::Arc;
///
/// struct Pool { size: usize }
/// struct Orders { pool: Arc<Pool> }
///
/// struct Persistence { pool_size: usize }
///
/// impl ServiceModule for Persistence {
///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
///         services.add_singleton(Pool { size: self.pool_size });
///         services.add_scoped_factory::<Orders, _>(|r| Ok(Orders { pool: r.get_required()? }));
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let provider = ServiceCollection::new().add_module(Persistence { pool_size: 4 })?.build();
/// let orders = provider.create_scope().get_required::<Orders>()?;
/// assert_eq!(orders.pool.size, 4);
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Adds this module's registrations to `services`.
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()>;
}

impl<F> ServiceModule for F
where
    F: FnOnce(&mut ServiceCollection) -> DiResult<()>,
{
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
        self(services)
    }
}

/// Builder-style composition on an owned collection.
pub trait ServiceCollectionExt: Sized {
    /// Applies `module` and hands the collection back for chaining.
    ///
    /// ```rust
    /// use callsite_di::{DiResult, ServiceCollection, ServiceCollectionExt};
    ///
    /// # fn main() -> DiResult<()> {
    /// let provider = ServiceCollection::new()
    ///     .add_module(|s: &mut ServiceCollection| {
    ///         s.add_singleton(3u8);
    ///         Ok(())
    ///     })?
    ///     .add_module(|s: &mut ServiceCollection| {
    ///         s.add_singleton(4u16);
    ///         Ok(())
    ///     })?
    ///     .build();
    /// assert_eq!(provider.descriptors().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    fn add_module<M: ServiceModule>(self, module: M) -> DiResult<Self>;
}

impl ServiceCollectionExt for ServiceCollection {
    fn add_module<M: ServiceModule>(mut self, module: M) -> DiResult<Self> {
        self.add_module_mut(module)?;
        Ok(self)
    }
}

/// Composition through `&mut`, matching the other registration methods.
pub trait ServiceCollectionModuleExt {
    fn add_module_mut<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self>;
}

impl ServiceCollectionModuleExt for ServiceCollection {
    fn add_module_mut<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_services(self)?;
        Ok(self)
    }
}
