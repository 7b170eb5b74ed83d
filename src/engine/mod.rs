//! Execution engines: turning call sites into reusable accessors.
//!
//! The engine owns the call-site factory, the root scope and the realized
//! accessor map. How a call site becomes an accessor is decided by a
//! [`RealizationStrategy`]: re-interpret the graph on every call, compile it
//! once into a closure tree, or interpret first and compile hot services in
//! the background.

pub(crate) mod compiled;
pub(crate) mod hybrid;
pub(crate) mod runtime;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use ahash::RandomState;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::call_site::chain::CallSiteChain;
use crate::call_site::factory::CallSiteFactory;
use crate::call_site::validator::CallSiteValidator;
use crate::call_site::CallSite;
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceKey;
use crate::observer::Observers;
use crate::options::{ExecutionMode, ServiceProviderOptions};
use crate::provider::scope::ScopeState;
use crate::provider::ResolverContext;

/// A realized resolution routine for one request.
pub(crate) type ServiceAccessor =
    Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync>;

pub(crate) fn new_accessor<F>(f: F) -> ServiceAccessor
where
    F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Turns a call site into an accessor.
///
/// Every strategy must produce accessors with identical results and caching
/// behavior; they differ only in what they pay up front.
pub(crate) trait RealizationStrategy: Send + Sync {
    fn realize(&self, key: ServiceKey, call_site: Arc<CallSite>, engine: &Engine) -> ServiceAccessor;
}

/// Walks the call-site graph on every call.
pub(crate) struct InterpretedStrategy;

impl RealizationStrategy for InterpretedStrategy {
    fn realize(&self, _key: ServiceKey, call_site: Arc<CallSite>, _engine: &Engine) -> ServiceAccessor {
        new_accessor(move |ctx| runtime::resolve(&call_site, ctx))
    }
}

/// Compiles the call-site graph into a closure tree on first use.
pub(crate) struct CompiledStrategy;

impl RealizationStrategy for CompiledStrategy {
    fn realize(&self, key: ServiceKey, call_site: Arc<CallSite>, _engine: &Engine) -> ServiceAccessor {
        debug!(service = %key, "compiling accessor");
        compiled::compile(&call_site)
    }
}

fn strategy_for(options: &ServiceProviderOptions) -> Box<dyn RealizationStrategy> {
    match options.mode {
        ExecutionMode::Interpreted => Box::new(InterpretedStrategy),
        ExecutionMode::Compiled => Box::new(CompiledStrategy),
        ExecutionMode::Hybrid => Box::new(hybrid::HybridStrategy::new(options.hybrid_threshold)),
    }
}

pub(crate) struct Engine {
    call_sites: CallSiteFactory,
    validator: Option<CallSiteValidator>,
    strategy: Box<dyn RealizationStrategy>,
    /// `None` records that nothing is registered for the request.
    realized: DashMap<ServiceKey, Option<ServiceAccessor>, RandomState>,
    root: Arc<ScopeState>,
    observers: Observers,
    options: ServiceProviderOptions,
    this: Weak<Engine>,
}

impl Engine {
    pub(crate) fn new(
        descriptors: Vec<ServiceDescriptor>,
        options: ServiceProviderOptions,
        observers: Observers,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            call_sites: CallSiteFactory::new(descriptors),
            validator: options.validate_scopes.then(CallSiteValidator::new),
            strategy: strategy_for(&options),
            realized: DashMap::default(),
            root: Arc::new(ScopeState::new(true)),
            observers,
            options,
            this: this.clone(),
        })
    }

    pub(crate) fn root_state(&self) -> &Arc<ScopeState> {
        &self.root
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    pub(crate) fn options(&self) -> &ServiceProviderOptions {
        &self.options
    }

    pub(crate) fn descriptors(&self) -> &[ServiceDescriptor] {
        self.call_sites.descriptors()
    }

    pub(crate) fn downgrade(&self) -> Weak<Engine> {
        self.this.clone()
    }

    /// Entry point of every resolution, top-level or nested.
    pub(crate) fn get_service(&self, key: ServiceKey, ctx: &ResolverContext<'_>) -> DiResult<Option<Instance>> {
        let scope = ctx.scope().state();
        if scope.is_disposed() {
            return Err(scope.disposed_error());
        }
        let accessor = match self.accessor(key)? {
            Some(accessor) => accessor,
            None => return Ok(None),
        };
        if let Some(validator) = &self.validator {
            validator.validate_resolution(key, scope.is_root())?;
        }

        if !self.observers.has_observers() {
            return accessor(ctx).map(Some);
        }
        let started = Instant::now();
        match accessor(ctx) {
            Ok(instance) => {
                self.observers.resolved(&key, started.elapsed());
                Ok(Some(instance))
            }
            Err(err) => {
                self.observers.failed(&key, &err);
                Err(err)
            }
        }
    }

    /// The realized accessor for `key`, building it on first request.
    fn accessor(&self, key: ServiceKey) -> DiResult<Option<ServiceAccessor>> {
        if let Some(found) = self.realized.get(&key) {
            return Ok(found.clone());
        }
        let created = self.create_accessor(key)?;
        Ok(self.realized.entry(key).or_insert(created).clone())
    }

    fn create_accessor(&self, key: ServiceKey) -> DiResult<Option<ServiceAccessor>> {
        let mut chain = CallSiteChain::new();
        let call_site = match self.call_sites.get_call_site(key, &mut chain)? {
            Some(call_site) => call_site,
            None => return Ok(None),
        };
        if let Some(validator) = &self.validator {
            validator.validate_call_site(Some(key), &call_site)?;
        }
        debug!(
            service = %key,
            kind = ?call_site.kind(),
            cache = ?call_site.cache().location,
            "built call site"
        );
        self.observers.call_site_built(&call_site);
        Ok(Some(self.strategy.realize(key, call_site, self)))
    }

    /// Swaps in a better accessor for `key`.
    pub(crate) fn replace_accessor(&self, key: ServiceKey, accessor: ServiceAccessor) {
        self.realized.insert(key, Some(accessor));
        debug!(service = %key, "compiled accessor swapped in");
        self.observers.accessor_compiled(&key);
    }

    /// Builds the call site of every descriptor, reporting all failures at once.
    pub(crate) fn validate_descriptors(&self) -> DiResult<()> {
        let count = self.call_sites.descriptors().len();
        let mut failures = Vec::new();
        for position in 0..count {
            let mut chain = CallSiteChain::new();
            let result = self
                .call_sites
                .call_site_for_descriptor(position, &mut chain)
                .and_then(|call_site| match &self.validator {
                    Some(validator) => validator.validate_call_site(None, &call_site),
                    None => Ok(()),
                });
            if let Err(err) = result {
                failures.push(err);
            }
        }
        if failures.is_empty() {
            info!(descriptors = count, "validated service descriptors");
            Ok(())
        } else {
            warn!(
                descriptors = count,
                failures = failures.len(),
                "service descriptors failed validation"
            );
            Err(DiError::AggregateValidation(failures))
        }
    }

    /// Debug rendering of the call site answering `key`.
    pub(crate) fn describe(&self, key: ServiceKey) -> DiResult<Option<String>> {
        let mut chain = CallSiteChain::new();
        Ok(self
            .call_sites
            .get_call_site(key, &mut chain)?
            .map(|call_site| format!("{:#?}", call_site)))
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("mode", &self.options.mode)
            .field("descriptors", &self.call_sites.descriptors().len())
            .field("realized", &self.realized.len())
            .finish()
    }
}
