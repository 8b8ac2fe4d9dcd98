//! Engine configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::call::FrameShape;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid engine configuration: {0}")]
    Invalid(String),
}

/// Limits and behavior switches for realms created by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Frames kept per thread for reuse
    pub frame_pool_capacity: usize,
    /// Argument stack slots per frame
    pub stack_slots: usize,
    /// Scope chain slots per frame
    pub scope_slots: usize,
    /// Scratch value slots per frame
    pub value_slots: usize,
    /// Nested invocations allowed before a stack overflow error
    pub max_call_depth: usize,
    /// Memoize global lookups into the global object
    pub snap_globals: bool,
}

impl EngineConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_slots < 2 {
            return Err(ConfigError::Invalid("stack_slots must be at least 2".into()));
        }
        if self.scope_slots < 2 {
            return Err(ConfigError::Invalid("scope_slots must be at least 2".into()));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be positive".into()));
        }
        Ok(())
    }

    pub fn frame_shape(&self) -> FrameShape {
        FrameShape {
            stack: self.stack_slots,
            scope: self.scope_slots,
            values: self.value_slots,
        }
    }

    pub fn with_frame_pool_capacity(mut self, capacity: usize) -> Self {
        self.frame_pool_capacity = capacity;
        self
    }

    pub fn with_stack_slots(mut self, slots: usize) -> Self {
        self.stack_slots = slots;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_snap_globals(mut self, snap: bool) -> Self {
        self.snap_globals = snap;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let shape = FrameShape::default();
        Self {
            frame_pool_capacity: 2,
            stack_slots: shape.stack,
            scope_slots: shape.scope,
            value_slots: shape.values,
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            snap_globals: true,
        }
    }
}
