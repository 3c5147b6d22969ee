// Executor module - command dispatch and the poll/retry engine

use std::time::Duration;

use async_trait::async_trait;

use crate::modules::CommandBatch;
use crate::output::errors::VyosError;
use crate::runtime::Response;

pub mod api;
pub mod poller;

pub use api::{ApiClient, ApiConfig};
pub use poller::{PollResult, PollerConfig, RetryPoller};

/// Something that can run a command batch against one device
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run every command of the batch, in order, returning one result per command
    async fn execute_commands(&self, batch: &CommandBatch) -> Result<Response, VyosError>;

    /// Get the host name for this executor
    fn host_name(&self) -> &str;
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    async fn execute_commands(&self, batch: &CommandBatch) -> Result<Response, VyosError> {
        (**self).execute_commands(batch).await
    }

    fn host_name(&self) -> &str {
        (**self).host_name()
    }
}

/// Suspension between poll attempts
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<T: Delay + ?Sized> Delay for &T {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Delay backed by the tokio timer; only the polling task is suspended
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
