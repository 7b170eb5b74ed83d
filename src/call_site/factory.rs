//! Builds call sites from the frozen descriptor list.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use tracing::debug;

use super::chain::CallSiteChain;
use super::{Activator, CallSite, CallSitePayload, ConstructorCallSite, ResultCache};
use crate::activation::{Arguments, ConstructorInfo, TypeInfo};
use crate::descriptors::{ImplementationStrategy, ImplementationType, ServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::{CacheKey, ServiceKey, ServiceType};
use crate::lifetime::Lifetime;
use crate::provider::{Scope, ScopeFactory};

/// Outcome of binding one constructor's parameters.
enum Binding {
    Satisfied(Vec<Arc<CallSite>>),
    Missing(ServiceType),
}

pub(crate) struct CallSiteFactory {
    descriptors: Vec<ServiceDescriptor>,
    /// Descriptor positions per service type, in registration order.
    index: HashMap<ServiceType, Vec<usize>, RandomState>,
    by_key: DashMap<ServiceKey, Arc<CallSite>, RandomState>,
    by_slot: DashMap<CacheKey, Arc<CallSite>, RandomState>,
    type_infos: DashMap<TypeId, Arc<TypeInfo>, RandomState>,
}

impl CallSiteFactory {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>) -> Self {
        let mut index: HashMap<ServiceType, Vec<usize>, RandomState> = HashMap::default();
        for (position, descriptor) in descriptors.iter().enumerate() {
            index.entry(descriptor.service_type()).or_default().push(position);
        }
        Self {
            descriptors,
            index,
            by_key: DashMap::default(),
            by_slot: DashMap::default(),
            type_infos: DashMap::default(),
        }
    }

    pub(crate) fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    /// Call site for a resolution request, `None` when nothing is registered.
    ///
    /// Aggregate requests always produce a call site, possibly with no items.
    pub(crate) fn get_call_site(
        &self,
        key: ServiceKey,
        chain: &mut CallSiteChain,
    ) -> DiResult<Option<Arc<CallSite>>> {
        if let Some(found) = self.by_key.get(&key) {
            return Ok(Some(found.clone()));
        }
        let built = match key {
            ServiceKey::Single(service_type) => self.create_single(service_type, chain)?,
            ServiceKey::All(item_type) => Some(self.create_aggregate(item_type, chain)?),
        };
        if let Some(call_site) = &built {
            // Concurrent first builds may both land here; either graph is valid.
            self.by_key.insert(key, call_site.clone());
        }
        Ok(built)
    }

    /// Call site for the descriptor at `position`, as used by build-time validation.
    pub(crate) fn call_site_for_descriptor(
        &self,
        position: usize,
        chain: &mut CallSiteChain,
    ) -> DiResult<Arc<CallSite>> {
        let service_type = self.descriptors[position].service_type();
        let positions = self.index.get(&service_type).map(Vec::as_slice).unwrap_or(&[]);
        let slot = positions
            .iter()
            .rev()
            .position(|p| *p == position)
            .unwrap_or(0);
        self.create_for_slot(position, slot, chain)
    }

    fn create_single(
        &self,
        service_type: ServiceType,
        chain: &mut CallSiteChain,
    ) -> DiResult<Option<Arc<CallSite>>> {
        if service_type == ServiceType::of::<Scope>() {
            return Ok(Some(Self::built_in(service_type, CallSitePayload::ProviderSelf)));
        }
        if service_type == ServiceType::of::<ScopeFactory>() {
            return Ok(Some(Self::built_in(service_type, CallSitePayload::ScopeFactorySelf)));
        }
        let last = match self.index.get(&service_type).and_then(|p| p.last()) {
            Some(position) => *position,
            None => return Ok(None),
        };
        self.create_for_slot(last, 0, chain).map(Some)
    }

    fn create_aggregate(
        &self,
        item_type: ServiceType,
        chain: &mut CallSiteChain,
    ) -> DiResult<Arc<CallSite>> {
        let positions = self.index.get(&item_type).map(Vec::as_slice).unwrap_or(&[]);
        let count = positions.len();
        let mut items = Vec::with_capacity(count);
        for (i, position) in positions.iter().enumerate() {
            items.push(self.create_for_slot(*position, count - 1 - i, chain)?);
        }
        Ok(Arc::new(CallSite::new(
            item_type,
            None,
            ResultCache::none(item_type),
            CallSitePayload::Aggregate(items),
        )))
    }

    fn built_in(service_type: ServiceType, payload: CallSitePayload) -> Arc<CallSite> {
        Arc::new(CallSite::new(
            service_type,
            None,
            ResultCache::none(service_type),
            payload,
        ))
    }

    fn create_for_slot(
        &self,
        position: usize,
        slot: usize,
        chain: &mut CallSiteChain,
    ) -> DiResult<Arc<CallSite>> {
        let descriptor = &self.descriptors[position];
        let cache_key = CacheKey::new(descriptor.service_type(), slot);
        if let Some(found) = self.by_slot.get(&cache_key) {
            return Ok(found.clone());
        }

        chain.check_circular(descriptor.service_type()).map_err(|err| {
            debug!(
                service = %descriptor.service_type(),
                implementation = ?chain.implementation_of(descriptor.service_type()),
                "circular dependency while building call site"
            );
            err
        })?;

        let call_site = match descriptor.strategy() {
            ImplementationStrategy::Constant(value) => Arc::new(CallSite::new(
                descriptor.service_type(),
                None,
                ResultCache::none(descriptor.service_type()),
                CallSitePayload::Constant(value.clone()),
            )),
            ImplementationStrategy::Factory(factory) => Arc::new(CallSite::new(
                descriptor.service_type(),
                None,
                ResultCache::new(descriptor.lifetime(), cache_key),
                CallSitePayload::Factory(factory.clone()),
            )),
            ImplementationStrategy::Implementation(implementation) => {
                chain.add(descriptor.service_type(), Some(implementation.name()));
                let built = self.create_constructor_call_site(
                    descriptor.service_type(),
                    descriptor.lifetime(),
                    cache_key,
                    implementation,
                    chain,
                );
                chain.remove(descriptor.service_type());
                built?
            }
        };

        self.by_slot.insert(cache_key, call_site.clone());
        Ok(call_site)
    }

    fn type_info(&self, implementation: &ImplementationType) -> Arc<TypeInfo> {
        self.type_infos
            .entry(implementation.type_id())
            .or_insert_with(|| Arc::new(implementation.type_info()))
            .clone()
    }

    fn create_constructor_call_site(
        &self,
        service_type: ServiceType,
        lifetime: Lifetime,
        cache_key: CacheKey,
        implementation: &ImplementationType,
        chain: &mut CallSiteChain,
    ) -> DiResult<Arc<CallSite>> {
        let info = self.type_info(implementation);
        let (constructor, parameters) = self.select_constructor(&info, implementation.name(), chain)?;

        let raw = constructor.activate.clone();
        let finish = implementation.finish().clone();
        let activator: Activator = Arc::new(move |args: &mut Arguments| finish(raw(args)?));

        Ok(Arc::new(CallSite::new(
            service_type,
            Some(implementation.name()),
            ResultCache::new(lifetime, cache_key),
            CallSitePayload::Constructor(ConstructorCallSite { activator, parameters }),
        )))
    }

    /// Picks the constructor to activate `implementation` with.
    ///
    /// A single constructor marked preferred always wins. Otherwise the
    /// constructors are tried widest first; the first satisfiable one becomes
    /// the best candidate and any later satisfiable constructor must take a
    /// subset of its parameters.
    fn select_constructor<'i>(
        &self,
        info: &'i TypeInfo,
        implementation: &'static str,
        chain: &mut CallSiteChain,
    ) -> DiResult<(&'i ConstructorInfo, Vec<Arc<CallSite>>)> {
        if info.constructors.is_empty() {
            return Err(DiError::NoConstructor(implementation));
        }

        let mut preferred = info.constructors.iter().filter(|c| c.preferred);
        if let Some(first) = preferred.next() {
            if preferred.next().is_some() {
                return Err(DiError::AmbiguousConstructor {
                    implementation,
                    reason: "more than one constructor is marked as preferred".to_string(),
                });
            }
            return self.bind_required(first, implementation, chain);
        }

        if info.constructors.len() == 1 {
            return self.bind_required(&info.constructors[0], implementation, chain);
        }

        let mut ordered: Vec<&ConstructorInfo> = info.constructors.iter().collect();
        ordered.sort_by(|a, b| b.parameters.len().cmp(&a.parameters.len()));

        let mut best: Option<(&ConstructorInfo, Vec<Arc<CallSite>>)> = None;
        let mut best_keys: HashSet<ServiceKey, RandomState> = HashSet::default();
        let mut first_missing = None;

        for constructor in ordered {
            match self.bind(constructor, chain)? {
                Binding::Satisfied(parameters) => match best.as_ref().map(|(chosen, _)| *chosen) {
                    None => {
                        best_keys = constructor.parameters.iter().map(|p| p.key()).collect();
                        best = Some((constructor, parameters));
                    }
                    Some(chosen) => {
                        let is_subset = constructor
                            .parameters
                            .iter()
                            .all(|p| best_keys.contains(&p.key()));
                        if !is_subset {
                            return Err(DiError::AmbiguousConstructor {
                                implementation,
                                reason: format!(
                                    "constructors taking {} and {} parameters are both satisfiable \
                                     and neither subsumes the other",
                                    chosen.parameters.len(),
                                    constructor.parameters.len()
                                ),
                            });
                        }
                    }
                },
                Binding::Missing(service_type) => {
                    first_missing.get_or_insert(service_type);
                }
            }
        }

        best.ok_or_else(|| DiError::UnresolvableDependency {
            service: first_missing.map_or("<unknown>", |ty| ty.name()),
            required_by: Some(implementation),
        })
    }

    fn bind_required<'i>(
        &self,
        constructor: &'i ConstructorInfo,
        implementation: &'static str,
        chain: &mut CallSiteChain,
    ) -> DiResult<(&'i ConstructorInfo, Vec<Arc<CallSite>>)> {
        match self.bind(constructor, chain)? {
            Binding::Satisfied(parameters) => Ok((constructor, parameters)),
            Binding::Missing(service_type) => Err(DiError::UnresolvableDependency {
                service: service_type.name(),
                required_by: Some(implementation),
            }),
        }
    }

    fn bind(&self, constructor: &ConstructorInfo, chain: &mut CallSiteChain) -> DiResult<Binding> {
        let mut parameters = Vec::with_capacity(constructor.parameters.len());
        for parameter in &constructor.parameters {
            let key = parameter.key();
            match self.get_call_site(key, chain)? {
                Some(call_site) => parameters.push(call_site),
                None => match parameter.default_value() {
                    Some(default) => {
                        let service_type = key.service_type();
                        let value: Instance = default();
                        parameters.push(Arc::new(CallSite::new(
                            service_type,
                            None,
                            ResultCache::none(service_type),
                            CallSitePayload::Constant(value),
                        )));
                    }
                    None => return Ok(Binding::Missing(key.service_type())),
                },
            }
        }
        Ok(Binding::Satisfied(parameters))
    }
}
