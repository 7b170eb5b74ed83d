//! Runtime cycle detection for resolutions that escape the call-site graph.
//!
//! Constructor dependencies are checked while the call-site graph is built.
//! Factories resolve their dependencies only when invoked, so a factory that
//! re-enters its own service would recurse forever. Each constructor or
//! factory invocation pushes a frame that lives on the caller's stack; the
//! frames form a linked list carried through the resolver context, never
//! through thread-local state.

use crate::error::{DiError, DiResult};
use crate::key::ServiceType;

/// Deepest activation chain accepted. Every level costs a handful of stack
/// frames across accessors and user closures, so the cap stays well inside
/// the 2 MiB stack of a spawned thread.
const MAX_DEPTH: usize = 256;

/// One in-flight activation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolutionFrame<'a> {
    service_type: ServiceType,
    parent: Option<&'a ResolutionFrame<'a>>,
    depth: usize,
}

impl<'a> ResolutionFrame<'a> {
    /// Pushes `service_type` on top of `parent`, failing if it is already
    /// being activated further down the chain.
    pub(crate) fn enter(
        service_type: ServiceType,
        parent: Option<&'a ResolutionFrame<'a>>,
    ) -> DiResult<Self> {
        Self::enter_within(service_type, parent, MAX_DEPTH)
    }

    fn enter_within(
        service_type: ServiceType,
        parent: Option<&'a ResolutionFrame<'a>>,
        max_depth: usize,
    ) -> DiResult<Self> {
        let depth = parent.map_or(0, |p| p.depth + 1);
        if parent.map_or(false, |p| p.contains(service_type)) {
            let mut path = parent.map(ResolutionFrame::path).unwrap_or_default();
            path.push(service_type.name());
            return Err(DiError::CircularDependency(path));
        }
        if depth >= max_depth {
            let mut path = parent.map(ResolutionFrame::path).unwrap_or_default();
            path.push(service_type.name());
            return Err(DiError::CircularDependency(path));
        }
        Ok(Self {
            service_type,
            parent,
            depth,
        })
    }

    fn contains(&self, service_type: ServiceType) -> bool {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.service_type == service_type {
                return true;
            }
            frame = current.parent;
        }
        false
    }

    /// Service types from the outermost activation to this one.
    fn path(&self) -> Vec<&'static str> {
        let mut path = Vec::with_capacity(self.depth + 1);
        let mut frame = Some(self);
        while let Some(current) = frame {
            path.push(current.service_type.name());
            frame = current.parent;
        }
        path.reverse();
        path
    }
}
