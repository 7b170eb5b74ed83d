//! Error types for the dependency injection engine.

use std::error::Error as StdError;
use std::sync::Arc;

/// Dependency injection errors
///
/// Every failure the engine can report while building call sites, resolving
/// services or managing scopes. Errors raised by user constructors and
/// factories travel through [`DiError::Service`] untouched, so callers see
/// their own error type rather than a wrapper.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get_required::<String>() {
///     Err(DiError::UnresolvableDependency { service, required_by }) => {
///         assert_eq!(service, "alloc::string::String");
///         assert!(required_by.is_none());
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use callsite_di::DiError;
///
/// let circular = DiError::CircularDependency(vec!["A", "B", "A"]);
/// assert_eq!(circular.to_string(), "Circular dependency detected: A -> B -> A");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// No registration satisfies a required service and no default exists
    #[error("{}", unresolvable_message(.service, .required_by))]
    UnresolvableDependency {
        /// The service that could not be resolved
        service: &'static str,
        /// The implementation that asked for it, if any
        required_by: Option<&'static str>,
    },
    /// Constructor selection could not pick a single constructor
    #[error("Ambiguous constructor for '{implementation}': {reason}")]
    AmbiguousConstructor {
        /// The implementation type being activated
        implementation: &'static str,
        /// Which constructors conflicted
        reason: String,
    },
    /// A service type reappeared in its own construction chain (includes path)
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<&'static str>),
    /// Scoped service used from the root provider or captured by a singleton
    #[error("Invalid scope usage: {0}")]
    InvalidScopeUsage(String),
    /// The scope or provider has been disposed
    #[error("Cannot access a disposed object: {0}")]
    ObjectDisposed(&'static str),
    /// Build-time validation failures, one per failing descriptor
    #[error("Some services are not able to be constructed: {}", join_errors(.0))]
    AggregateValidation(Vec<DiError>),
    /// Implementation type described without any constructor
    #[error("No constructor is described for '{0}'")]
    NoConstructor(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Provider options could not be read
    #[error("Invalid provider options: {0}")]
    InvalidOptions(String),
    /// Error raised by a user constructor or factory
    #[error(transparent)]
    Service(Arc<dyn StdError + Send + Sync>),
}

impl DiError {
    /// Wraps an error produced by user code (a constructor or a factory).
    ///
    /// ```rust
    /// use callsite_di::DiError;
    ///
    /// let err = DiError::service(std::io::Error::new(std::io::ErrorKind::Other, "db offline"));
    /// assert_eq!(err.to_string(), "db offline");
    /// ```
    pub fn service<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DiError::Service(Arc::new(error))
    }

    /// Returns the cycle path for [`DiError::CircularDependency`].
    pub fn cycle(&self) -> Option<&[&'static str]> {
        match self {
            DiError::CircularDependency(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the individual failures of an aggregate validation error.
    pub fn failures(&self) -> &[DiError] {
        match self {
            DiError::AggregateValidation(errors) => errors,
            _ => std::slice::from_ref(self),
        }
    }

    /// Attempts to view a [`DiError::Service`] payload as a concrete error type.
    pub fn downcast_service<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            DiError::Service(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

fn unresolvable_message(service: &str, required_by: &Option<&'static str>) -> String {
    match required_by {
        Some(implementation) => format!(
            "Unable to resolve service for type '{}' while attempting to activate '{}'",
            service, implementation
        ),
        None => format!("No service for type '{}' has been registered", service),
    }
}

fn join_errors(errors: &[DiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for DI operations
///
/// A convenience alias for `Result<T, DiError>` used throughout the crate.
///
/// ```rust
/// use callsite_di::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::ObjectDisposed("Scope"))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Offline;

    impl std::fmt::Display for Offline {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "offline")
        }
    }

    impl StdError for Offline {}

    #[test]
    fn service_errors_are_transparent() {
        let err = DiError::service(Offline);
        assert_eq!(err.to_string(), "offline");
        assert!(err.downcast_service::<Offline>().is_some());
        assert!(DiError::TypeMismatch("x").downcast_service::<Offline>().is_none());
    }

    #[test]
    fn aggregate_lists_every_failure() {
        let err = DiError::AggregateValidation(vec![
            DiError::NoConstructor("A"),
            DiError::CircularDependency(vec!["B", "C", "B"]),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Some services are not able to be constructed"));
        assert!(text.contains("No constructor is described for 'A'"));
        assert!(text.contains("B -> C -> B"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn unresolvable_names_the_requester() {
        let nested = DiError::UnresolvableDependency { service: "Repo", required_by: Some("Handler") };
        assert_eq!(
            nested.to_string(),
            "Unable to resolve service for type 'Repo' while attempting to activate 'Handler'"
        );
        let top = DiError::UnresolvableDependency { service: "Repo", required_by: None };
        assert_eq!(top.to_string(), "No service for type 'Repo' has been registered");
    }
}
