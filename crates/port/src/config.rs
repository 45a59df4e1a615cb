//! Port configuration
//!
//! Mirrors the compile-time switches of a typical embedded logger port
//! (async output on/off, line-oriented pulls, worker task name and stack)
//! as runtime values that can also be loaded from TOML.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Default scratch capacity: an engine line buffer of 1024 minus 4.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 1020;

/// Largest scratch buffer the dispatcher will allocate.
pub const MAX_SCRATCH_CAPACITY: usize = 1024 * 1024;

/// Default dispatcher thread name.
pub const DEFAULT_DISPATCHER_NAME: &str = "elog_async";

/// Default dispatcher stack size in bytes.
pub const DEFAULT_DISPATCHER_STACK_SIZE: usize = 256 * 1024;

/// Default scheduler tick rate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 1000;

/// Which pull capability the dispatcher uses to drain the backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullMode {
    /// Pull as many pending bytes as fit in the scratch buffer
    #[default]
    Chunk,
    /// Pull whole lines
    Line,
}

/// Configuration for an output context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Spawn the dispatcher and accept wake notifications
    pub async_output: bool,
    /// Pull capability used by the dispatcher
    pub pull_mode: PullMode,
    /// Size of the dispatcher's scratch buffer
    pub scratch_capacity: usize,
    /// Thread name of the dispatcher
    pub dispatcher_name: String,
    /// Stack size of the dispatcher thread
    pub dispatcher_stack_size: usize,
    /// Ticks per second of the default clock
    pub tick_rate_hz: u32,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            async_output: true,
            pull_mode: PullMode::Chunk,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
            dispatcher_name: DEFAULT_DISPATCHER_NAME.to_string(),
            dispatcher_stack_size: DEFAULT_DISPATCHER_STACK_SIZE,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

impl PortConfig {
    /// Create a builder starting from the defaults
    #[must_use]
    pub fn builder() -> PortConfigBuilder {
        PortConfigBuilder::new()
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the dispatcher and clock rely on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.scratch_capacity == 0 {
            return Err(Error::Configuration(
                "scratch_capacity must be greater than zero".to_string(),
            ));
        }

        if self.scratch_capacity > MAX_SCRATCH_CAPACITY {
            return Err(Error::Configuration(format!(
                "scratch_capacity must not exceed {MAX_SCRATCH_CAPACITY} bytes"
            )));
        }

        if self.tick_rate_hz == 0 {
            return Err(Error::Configuration(
                "tick_rate_hz must be greater than zero".to_string(),
            ));
        }

        if self.async_output && self.dispatcher_name.is_empty() {
            return Err(Error::Configuration(
                "dispatcher_name must not be empty".to_string(),
            ));
        }

        // thread names are handed to the OS as C strings
        if self.async_output && self.dispatcher_name.contains('\0') {
            return Err(Error::Configuration(
                "dispatcher_name must not contain NUL bytes".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for port configuration
#[derive(Debug, Clone, Default)]
pub struct PortConfigBuilder {
    config: PortConfig,
}

impl PortConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PortConfig::default(),
        }
    }

    /// Set whether the dispatcher is spawned
    #[must_use]
    pub fn async_output(mut self, enabled: bool) -> Self {
        self.config.async_output = enabled;
        self
    }

    /// Set the pull mode
    #[must_use]
    pub fn pull_mode(mut self, mode: PullMode) -> Self {
        self.config.pull_mode = mode;
        self
    }

    /// Set the scratch buffer capacity
    #[must_use]
    pub fn scratch_capacity(mut self, capacity: usize) -> Self {
        self.config.scratch_capacity = capacity;
        self
    }

    /// Set the dispatcher thread name
    #[must_use]
    pub fn dispatcher_name(mut self, name: impl Into<String>) -> Self {
        self.config.dispatcher_name = name.into();
        self
    }

    /// Set the dispatcher stack size
    #[must_use]
    pub fn dispatcher_stack_size(mut self, size: usize) -> Self {
        self.config.dispatcher_stack_size = size;
        self
    }

    /// Set the default clock's tick rate
    #[must_use]
    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> PortConfig {
        self.config
    }
}
