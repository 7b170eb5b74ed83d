//! Interpret first, compile hot services in the background.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::{compiled, new_accessor, runtime, Engine, RealizationStrategy, ServiceAccessor};
use crate::call_site::CallSite;
use crate::key::ServiceKey;

/// Serves requests through the interpreter and, once a service has been
/// resolved `threshold` times, compiles it on the rayon pool and swaps the
/// compiled accessor into the engine. Calls racing the swap keep using the
/// interpreter; both paths share the same scope caches.
pub(crate) struct HybridStrategy {
    threshold: usize,
}

impl HybridStrategy {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl RealizationStrategy for HybridStrategy {
    fn realize(&self, key: ServiceKey, call_site: Arc<CallSite>, engine: &Engine) -> ServiceAccessor {
        let threshold = self.threshold;
        let calls = AtomicUsize::new(0);
        let engine = engine.downgrade();
        new_accessor(move |ctx| {
            if calls.fetch_add(1, Ordering::Relaxed) + 1 == threshold {
                let engine = engine.clone();
                let call_site = call_site.clone();
                trace!(service = %key, "scheduling background compilation");
                rayon::spawn(move || {
                    let compiled = compiled::compile(&call_site);
                    if let Some(engine) = engine.upgrade() {
                        engine.replace_accessor(key, compiled);
                    }
                });
            }
            runtime::resolve(&call_site, ctx)
        })
    }
}
