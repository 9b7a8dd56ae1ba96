//! A notification sink that runs an external command.

use crate::{config::NotificationConfig, core::NotificationSink, notification::HookError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument};

/// Runs the configured executable with no arguments.
pub struct CommandHook {
    program: PathBuf,
    timeout: Duration,
    name: String,
}

impl CommandHook {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        let name = program.display().to_string();
        Self {
            program,
            timeout,
            name,
        }
    }

    /// Returns `None` when no hook is configured or the path is empty.
    pub fn from_config(config: &NotificationConfig) -> Option<Self> {
        config
            .hook
            .clone()
            .filter(|program| !program.as_os_str().is_empty())
            .map(|program| Self::new(program, Duration::from_secs(config.timeout_seconds)))
    }
}

#[async_trait]
impl NotificationSink for CommandHook {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(hook = %self.name))]
    async fn notify(&self) -> Result<(), HookError> {
        info!("Running notification hook");
        let mut child = Command::new(&self.program).kill_on_drop(true).spawn()?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(HookError::Wait)?,
            // Dropping the child kills it.
            Err(_) => return Err(HookError::Timeout(self.timeout)),
        };

        if status.success() {
            Ok(())
        } else {
            Err(HookError::NonZeroExit(status.to_string()))
        }
    }
}
