// Task modules for vyos-api

mod command;

pub use command::{parse_commands, Command, CommandBatch, Verb, API_COMMANDS};

use std::time::Instant;

use tracing::{debug, info};

use crate::executor::{CommandExecutor, Delay, PollerConfig, RetryPoller, TokioDelay};
use crate::output::errors::VyosError;
use crate::output::TaskResult;
use crate::parser::ast::Conditional;
use crate::parser::{parse_conditionals, TaskParams};

/// Message reported when the retry budget runs out with conditionals pending
pub const CONDITIONS_UNMET_MSG: &str = "One or more conditional statements have not been satisfied";

/// Runs commands on a VyOS device and waits for conditionals on the output
///
/// Everything that can be checked locally (allowed verbs, check-mode
/// filtering, conditional syntax) is checked in [`ApiCommandModule::prepare`],
/// so a bad task never reaches a device.
#[derive(Debug, Clone)]
pub struct ApiCommandModule {
    name: String,
    batch: CommandBatch,
    conditionals: Vec<Conditional>,
    warnings: Vec<String>,
    config: PollerConfig,
}

impl ApiCommandModule {
    /// Validate and compile a task
    pub fn prepare(params: &TaskParams) -> Result<Self, VyosError> {
        let (batch, warnings) = parse_commands(&params.commands, params.check_mode)?;
        let conditionals = parse_conditionals(&params.wait_for)?;

        debug!(
            commands = batch.len(),
            conditionals = conditionals.len(),
            dropped = warnings.len(),
            "task prepared"
        );

        Ok(ApiCommandModule {
            name: params.display_name(),
            batch,
            conditionals,
            warnings,
            config: PollerConfig {
                retries: params.retries,
                interval: params.interval,
                match_policy: params.match_policy,
                tolerant: params.tolerant,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch(&self) -> &CommandBatch {
        &self.batch
    }

    pub fn conditionals(&self) -> &[Conditional] {
        &self.conditionals
    }

    /// Warnings produced while preparing (check-mode drops)
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Run the task against one device
    pub async fn run<E: CommandExecutor>(&self, executor: E) -> TaskResult {
        self.run_with_delay(executor, TokioDelay).await
    }

    /// Run the task with a custom delay between attempts
    pub async fn run_with_delay<E: CommandExecutor, D: Delay>(&self, executor: E, delay: D) -> TaskResult {
        let host = executor.host_name().to_string();
        let start = Instant::now();
        let poller = RetryPoller::with_delay(executor, delay, self.config.clone());

        let outcome = poller
            .poll_compiled(&self.batch, self.conditionals.clone())
            .await;
        let duration = start.elapsed();

        let mut result = match outcome {
            Ok(mut poll) => {
                let mut warnings = self.warnings.clone();
                let failed_conditions = poll.failed_conditions();
                let mut result = TaskResult::ok(&host, &self.name);

                if let Some(response) = poll.response.take() {
                    result = result.with_stdout(response);
                }

                if !poll.is_success() {
                    info!(host = %host, attempts = poll.attempts, "{}", CONDITIONS_UNMET_MSG);
                    warnings.extend(poll.warnings);
                    result.failed = true;
                    result.message = Some(CONDITIONS_UNMET_MSG.to_string());
                    result.failed_conditions = failed_conditions;
                }

                result.attempts = poll.attempts;
                result.warnings = warnings;
                result
            }
            // A rejected command is a plain failure; only transport errors mean unreachable
            Err(e) => {
                let mut result = if e.is_transport() {
                    TaskResult::unreachable(&host, &self.name, e.summary())
                } else {
                    TaskResult::failed(&host, &self.name, e.summary())
                };
                result.warnings = self.warnings.clone();
                result
            }
        };

        result.duration = duration;
        result
    }
}
