//! Configuration for the injection engine.
//!
//! This module provides the settings that control naming of generated code, alias resolution
//! and diagnostic verbosity.

use crate::{descriptor::NamingEpoch, Result};

/// Configuration for the injection engine.
///
/// # Example
///
/// ```rust
/// use eventscope::config::EngineConfig;
///
/// let config = EngineConfig {
///     max_proxy_methods: 16,
///     ..EngineConfig::default()
/// };
/// config.validate()?;
/// assert_eq!(config.proxy_class_name, "eventscope/runtime/EventProxy");
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Internal name of the first generated proxy type (default: `eventscope/runtime/EventProxy`).
    ///
    /// Spill types append `$1`, `$2`, ...
    pub proxy_class_name: String,

    /// Prefix of generated dispatch routine names (default: `$event`).
    pub dispatch_prefix: String,

    /// Maximum routines per proxy type before a new one is opened (default: 1000).
    pub max_proxy_methods: usize,

    /// Order in which descriptor aliases are tried against a body
    /// (default: obfuscated, intermediate, deobfuscated).
    pub epoch_order: Vec<NamingEpoch>,

    /// Report locator hit counts as info diagnostics (default: false).
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proxy_class_name: "eventscope/runtime/EventProxy".to_string(),
            dispatch_prefix: "$event".to_string(),
            max_proxy_methods: 1000,
            epoch_order: NamingEpoch::default_order(),
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables verbose diagnostics.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the per-type routine capacity.
    #[must_use]
    pub fn with_max_proxy_methods(mut self, max: usize) -> Self {
        self.max_proxy_methods = max;
        self
    }

    /// Sets the alias resolution order.
    #[must_use]
    pub fn with_epoch_order(mut self, order: Vec<NamingEpoch>) -> Self {
        self.epoch_order = order;
        self
    }

    /// Checks the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if a name is empty, the proxy capacity is zero
    /// or the epoch order is empty.
    pub fn validate(&self) -> Result<()> {
        if self.proxy_class_name.is_empty() {
            return Err(config_error!("proxy_class_name must not be empty"));
        }
        if self.dispatch_prefix.is_empty() {
            return Err(config_error!("dispatch_prefix must not be empty"));
        }
        if self.max_proxy_methods == 0 {
            return Err(config_error!("max_proxy_methods must be at least 1"));
        }
        if self.epoch_order.is_empty() {
            return Err(config_error!("epoch_order must name at least one epoch"));
        }
        Ok(())
    }
}
