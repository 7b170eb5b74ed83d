//! Provider build options.
//!
//! Options can be set in code, read from `CALLSITE_DI_*` environment
//! variables, or (with the `config` feature) deserialized from JSON.

use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Prefix of the environment variables read by [`ServiceProviderOptions::from_env`].
pub const ENV_PREFIX: &str = "CALLSITE_DI";

/// How call sites are turned into accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ExecutionMode {
    /// Walk the call-site graph on every resolution
    Interpreted,
    /// Compile each graph into a closure tree when first requested
    Compiled,
    /// Interpret, then compile in the background once a service is hot
    #[default]
    Hybrid,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Interpreted => "interpreted",
            ExecutionMode::Compiled => "compiled",
            ExecutionMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpreted" | "runtime" => Ok(ExecutionMode::Interpreted),
            "compiled" => Ok(ExecutionMode::Compiled),
            "hybrid" | "dynamic" => Ok(ExecutionMode::Hybrid),
            other => Err(DiError::InvalidOptions(format!("unknown execution mode '{}'", other))),
        }
    }
}

/// Options applied when building a [`ServiceProvider`](crate::ServiceProvider).
///
/// ```
/// use callsite_di::{ExecutionMode, ServiceProviderOptions};
///
/// let options = ServiceProviderOptions::new()
///     .validate_scopes(true)
///     .mode(ExecutionMode::Compiled);
/// assert!(options.validate_scopes);
/// assert!(!options.validate_on_build);
/// assert_eq!(options.hybrid_threshold, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ServiceProviderOptions {
    /// Reject scoped services reached from singletons or the root provider
    pub validate_scopes: bool,
    /// Build every descriptor's call site when the provider is built
    pub validate_on_build: bool,
    /// Execution engine
    pub mode: ExecutionMode,
    /// Resolutions of one service before [`ExecutionMode::Hybrid`] compiles it
    pub hybrid_threshold: usize,
}

impl Default for ServiceProviderOptions {
    fn default() -> Self {
        Self {
            validate_scopes: false,
            validate_on_build: false,
            mode: ExecutionMode::default(),
            hybrid_threshold: 2,
        }
    }
}

impl ServiceProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_scopes(mut self, enabled: bool) -> Self {
        self.validate_scopes = enabled;
        self
    }

    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn hybrid_threshold(mut self, threshold: usize) -> Self {
        self.hybrid_threshold = threshold;
        self
    }

    /// Options with both validations switched on, as used during development.
    pub fn strict() -> Self {
        Self::default().validate_scopes(true).validate_on_build(true)
    }

    /// Reads options from `CALLSITE_DI_VALIDATE_SCOPES`,
    /// `CALLSITE_DI_VALIDATE_ON_BUILD`, `CALLSITE_DI_MODE` and
    /// `CALLSITE_DI_HYBRID_THRESHOLD`. Unset variables keep their defaults.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(ENV_PREFIX, |name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable prefix.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
        let var = |key: &str| lookup(&format!("{}_{}", prefix.to_uppercase(), key));
        let mut options = Self::default();
        if let Some(value) = var("VALIDATE_SCOPES") {
            options.validate_scopes = parse_bool("VALIDATE_SCOPES", &value)?;
        }
        if let Some(value) = var("VALIDATE_ON_BUILD") {
            options.validate_on_build = parse_bool("VALIDATE_ON_BUILD", &value)?;
        }
        if let Some(value) = var("MODE") {
            options.mode = value.parse()?;
        }
        if let Some(value) = var("HYBRID_THRESHOLD") {
            options.hybrid_threshold = value.trim().parse().map_err(|_| {
                DiError::InvalidOptions(format!("HYBRID_THRESHOLD must be a number, got '{}'", value))
            })?;
        }
        Ok(options)
    }

    /// Parses options from JSON. Missing fields keep their defaults.
    ///
    /// ```
    /// # #[cfg(feature = "config")]
    /// # {
    /// use callsite_di::{ExecutionMode, ServiceProviderOptions};
    ///
    /// let options = ServiceProviderOptions::from_json(r#"{"mode": "interpreted"}"#).unwrap();
    /// assert_eq!(options.mode, ExecutionMode::Interpreted);
    /// assert_eq!(options.hybrid_threshold, 2);
    /// # }
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::InvalidOptions(e.to_string()))
    }
}

fn parse_bool(name: &str, value: &str) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DiError::InvalidOptions(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}
