//! The distributed-execution runtime used by training engines.

use parking_lot::Mutex;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::engine::EngineError;

/// A process-wide distributed-execution runtime (e.g. a Ray cluster started
/// by the engine).
///
/// Sized through an explicit [`RuntimeConfig`]; implementations must not
/// rely on environment variables set elsewhere in the process.
pub trait DistributedRuntime: Send + Sync {
    /// Start the runtime. Called by the training job when
    /// [`is_initialized`](Self::is_initialized) is `false`.
    fn initialize(&self, config: &RuntimeConfig) -> Result<(), EngineError>;

    /// Whether the runtime is currently up.
    fn is_initialized(&self) -> bool;

    /// Stop the runtime and its workers.
    fn shutdown(&self) -> Result<(), EngineError>;
}

/// A runtime for engines that train in-process.
///
/// Records the config it was initialized with so callers can inspect it.
#[derive(Debug, Default)]
pub struct LocalRuntime {
    config: Mutex<Option<RuntimeConfig>>,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// The config passed to the last successful `initialize`, while up.
    pub fn active_config(&self) -> Option<RuntimeConfig> {
        self.config.lock().clone()
    }
}

impl DistributedRuntime for LocalRuntime {
    fn initialize(&self, config: &RuntimeConfig) -> Result<(), EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::new(e.to_string()))?;
        debug!("Local runtime initialized with {:?}", config);
        *self.config.lock() = Some(config.clone());
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.config.lock().is_some()
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        debug!("Local runtime shut down");
        self.config.lock().take();
        Ok(())
    }
}
