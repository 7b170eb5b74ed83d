//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which carries one
//! resolution through the engine and is handed to factory closures.

use crate::error::DiResult;
use crate::instance::Instance;
use crate::internal::{HeldLocks, ResolutionFrame};
use crate::key::ServiceKey;
use crate::traits::ResolverCore;

use super::Scope;

/// Context passed to factory functions for resolving dependencies.
///
/// A context is bound to the scope the current service is being built in:
/// singletons see the root scope, scoped and transient services see the
/// scope that requested them. It also carries the resolution locks held by
/// the enclosing construction and the chain of services being activated, so
/// nested resolutions neither deadlock nor recurse forever.
///
/// # Examples
///
/// ```
/// use callsite_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     Ok(UserService { db: resolver.get_required::<Database>()? })
/// });
///
/// let provider = services.build();
/// let users = provider.get_required::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    scope: &'a Scope,
    held: HeldLocks,
    frame: Option<&'a ResolutionFrame<'a>>,
}

impl<'a> ResolverContext<'a> {
    /// Creates a top-level context for a resolution starting at `scope`.
    pub(crate) fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            held: HeldLocks::NONE,
            frame: None,
        }
    }

    /// The scope services are currently being resolved in.
    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    pub(crate) fn held(&self) -> HeldLocks {
        self.held
    }

    pub(crate) fn frame(&self) -> Option<&'a ResolutionFrame<'a>> {
        self.frame
    }

    /// Same chain, bound to `scope` with `held` locks.
    pub(crate) fn rebind<'b>(&'b self, scope: &'b Scope, held: HeldLocks) -> ResolverContext<'b> {
        ResolverContext {
            scope,
            held,
            frame: self.frame,
        }
    }

    /// Same scope and locks, one activation deeper.
    pub(crate) fn with_frame<'b>(&'b self, frame: &'b ResolutionFrame<'b>) -> ResolverContext<'b> {
        ResolverContext {
            scope: self.scope,
            held: self.held,
            frame: Some(frame),
        }
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_key(&self, key: ServiceKey) -> DiResult<Option<Instance>> {
        self.scope.engine().get_service(key, self)
    }
}
