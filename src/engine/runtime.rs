//! Tree-walking resolver over the call-site graph.
//!
//! The cache protocol here (`visit_cache`) is shared with compiled
//! accessors, so both engines cache, lock and capture identically.

use std::sync::Arc;

use tracing::trace;

use crate::activation::Arguments;
use crate::call_site::{CacheLocation, CallSite, CallSitePayload};
use crate::descriptors::FactoryFn;
use crate::error::DiResult;
use crate::instance::Instance;
use crate::internal::{HeldLocks, ResolutionFrame};
use crate::key::{CacheKey, ServiceType};
use crate::provider::{ResolverContext, Scope, ScopeFactory};

/// Resolves `call_site` in the context's scope.
pub(crate) fn resolve(call_site: &Arc<CallSite>, ctx: &ResolverContext<'_>) -> DiResult<Instance> {
    trace!(service = %call_site.service_type(), kind = ?call_site.kind(), "resolving call site");
    visit_cache(call_site, ctx, &|ctx| visit_main(call_site, ctx))
}

/// Applies the cache policy of `call_site` around `body`.
pub(crate) fn visit_cache(
    call_site: &CallSite,
    ctx: &ResolverContext<'_>,
    body: &dyn Fn(&ResolverContext<'_>) -> DiResult<Instance>,
) -> DiResult<Instance> {
    let cache = call_site.cache();
    match cache.location {
        CacheLocation::Root => {
            if ctx.scope().is_root() {
                resolve_cached(cache.key, ctx, ctx.scope(), HeldLocks::ROOT, body)
            } else {
                let root = ctx.scope().root_scope();
                resolve_cached(cache.key, ctx, &root, HeldLocks::ROOT, body)
            }
        }
        CacheLocation::Scope => {
            let lock = if ctx.scope().is_root() {
                HeldLocks::ROOT
            } else {
                HeldLocks::SCOPE
            };
            resolve_cached(cache.key, ctx, ctx.scope(), lock, body)
        }
        CacheLocation::Dispose => {
            let instance = body(ctx)?;
            ctx.scope().state().capture(instance)
        }
        CacheLocation::None => body(ctx),
    }
}

/// Looks up `key` in `target`, building it at most once under the target's
/// resolution lock unless the current chain already holds that lock.
fn resolve_cached(
    key: CacheKey,
    ctx: &ResolverContext<'_>,
    target: &Scope,
    lock: HeldLocks,
    body: &dyn Fn(&ResolverContext<'_>) -> DiResult<Instance>,
) -> DiResult<Instance> {
    let state = target.state();
    if let Some(found) = state.lookup(&key)? {
        return Ok(found);
    }

    let _guard = if ctx.held().contains(lock) {
        None
    } else {
        Some(state.resolution_lock())
    };
    if let Some(found) = state.lookup(&key)? {
        return Ok(found);
    }

    let inner = ctx.rebind(target, ctx.held() | lock);
    let instance = body(&inner)?;
    state.commit(key, instance)
}

fn visit_main(call_site: &CallSite, ctx: &ResolverContext<'_>) -> DiResult<Instance> {
    match &call_site.payload {
        CallSitePayload::Constant(value) => Ok(value.clone()),
        CallSitePayload::Constructor(constructor) => {
            let frame = ResolutionFrame::enter(call_site.service_type(), ctx.frame())?;
            let inner = ctx.with_frame(&frame);
            let mut args = Arguments::with_capacity(constructor.parameters.len());
            for parameter in &constructor.parameters {
                args.push(resolve(parameter, &inner)?);
            }
            (constructor.activator)(&mut args)
        }
        CallSitePayload::Factory(factory) => invoke_factory(call_site.service_type(), factory, ctx),
        CallSitePayload::Aggregate(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve(item, ctx)?);
            }
            Ok(Instance::aggregate(resolved))
        }
        CallSitePayload::ProviderSelf => Ok(provider_self(ctx)),
        CallSitePayload::ScopeFactorySelf => Ok(scope_factory_self(ctx)),
    }
}

/// Invokes a user factory one activation deeper in the chain.
pub(crate) fn invoke_factory(
    service_type: ServiceType,
    factory: &FactoryFn,
    ctx: &ResolverContext<'_>,
) -> DiResult<Instance> {
    let frame = ResolutionFrame::enter(service_type, ctx.frame())?;
    factory(&ctx.with_frame(&frame))
}

pub(crate) fn provider_self(ctx: &ResolverContext<'_>) -> Instance {
    Instance::new(Arc::new(ctx.scope().clone()))
}

pub(crate) fn scope_factory_self(ctx: &ResolverContext<'_>) -> Instance {
    Instance::new(Arc::new(ScopeFactory::new(ctx.scope().engine().clone())))
}
