//! Handles the once-per-cycle notification trigger.
//!
//! The core only sees the [`NotificationSink`](crate::core::NotificationSink)
//! trait. The concrete [`hook::CommandHook`] spawns an external executable;
//! [`NoopSink`] is used when no hook is configured.
pub mod hook;

use crate::core::NotificationSink;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use hook::CommandHook;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Failed to start notification hook: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Failed waiting for notification hook: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Notification hook timed out after {0:?}")]
    Timeout(Duration),

    #[error("Notification hook exited with {0}")]
    NonZeroExit(String),
}

/// A sink that does nothing; used when no hook is configured.
#[derive(Debug, Default, Clone)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self) -> Result<(), HookError> {
        Ok(())
    }
}
