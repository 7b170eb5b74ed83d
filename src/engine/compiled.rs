//! Closure-tree compilation of call sites.
//!
//! Each node becomes a closure that calls its children's closures directly,
//! so a compiled accessor never matches on the graph again. Caching goes
//! through [`runtime::visit_cache`]; singletons additionally keep a
//! per-accessor slot so the hot path skips the root map lookup.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::runtime;
use super::{new_accessor, ServiceAccessor};
use crate::activation::Arguments;
use crate::call_site::{CacheLocation, CallSite, CallSitePayload};
use crate::instance::Instance;
use crate::internal::ResolutionFrame;

/// Compiles `call_site` and everything below it.
pub(crate) fn compile(call_site: &Arc<CallSite>) -> ServiceAccessor {
    let main = compile_main(call_site);
    wrap_cache(call_site, main)
}

fn compile_main(call_site: &Arc<CallSite>) -> ServiceAccessor {
    let service_type = call_site.service_type();
    match &call_site.payload {
        CallSitePayload::Constant(value) => {
            let value = value.clone();
            new_accessor(move |_| Ok(value.clone()))
        }
        CallSitePayload::Constructor(constructor) => {
            let parameters: Vec<ServiceAccessor> = constructor.parameters.iter().map(compile).collect();
            let activator = constructor.activator.clone();
            new_accessor(move |ctx| {
                let frame = ResolutionFrame::enter(service_type, ctx.frame())?;
                let inner = ctx.with_frame(&frame);
                let mut args = Arguments::with_capacity(parameters.len());
                for parameter in &parameters {
                    args.push(parameter(&inner)?);
                }
                activator(&mut args)
            })
        }
        CallSitePayload::Factory(factory) => {
            let factory = factory.clone();
            new_accessor(move |ctx| runtime::invoke_factory(service_type, &factory, ctx))
        }
        CallSitePayload::Aggregate(items) => {
            let items: Vec<ServiceAccessor> = items.iter().map(compile).collect();
            new_accessor(move |ctx| {
                let resolved = items.iter().map(|item| item(ctx)).collect::<Result<Vec<_>, _>>()?;
                Ok(Instance::aggregate(resolved))
            })
        }
        CallSitePayload::ProviderSelf => new_accessor(|ctx| Ok(runtime::provider_self(ctx))),
        CallSitePayload::ScopeFactorySelf => new_accessor(|ctx| Ok(runtime::scope_factory_self(ctx))),
    }
}

fn wrap_cache(call_site: &Arc<CallSite>, main: ServiceAccessor) -> ServiceAccessor {
    let node = call_site.clone();
    match call_site.cache().location {
        CacheLocation::None => main,
        CacheLocation::Root => {
            let slot: OnceCell<Instance> = OnceCell::new();
            new_accessor(move |ctx| {
                let root_disposed = ctx.scope().engine().root_state().is_disposed();
                if !root_disposed {
                    if let Some(cached) = slot.get() {
                        return Ok(cached.clone());
                    }
                }
                let instance = runtime::visit_cache(&node, ctx, &|ctx| main(ctx))?;
                let _ = slot.set(instance.clone());
                Ok(instance)
            })
        }
        CacheLocation::Scope | CacheLocation::Dispose => {
            new_accessor(move |ctx| runtime::visit_cache(&node, ctx, &|ctx| main(ctx)))
        }
    }
}
