// Conditional poll-and-retry engine
//
// Dispatches a command batch, evaluates the wait_for conditionals against the
// response, and repeats with a fixed interval until the match policy is
// satisfied or the retry budget runs out.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CommandExecutor, Delay, TokioDelay};
use crate::modules::CommandBatch;
use crate::output::errors::VyosError;
use crate::parser::ast::{Conditional, MatchPolicy};
use crate::parser::parse_conditionals;
use crate::runtime::{check, Outcome, Response};

/// Poll configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum dispatch attempts while conditionals are pending
    pub retries: u32,
    /// Wait between attempts
    pub interval: Duration,
    pub match_policy: MatchPolicy,
    /// Keep retrying past transport errors instead of failing on the first one
    pub tolerant: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            retries: 10,
            interval: Duration::from_secs(1),
            match_policy: MatchPolicy::All,
            tolerant: false,
        }
    }
}

/// Terminal state of one poll
#[derive(Debug, Clone)]
pub struct PollResult {
    /// Last response received, if any attempt got one
    pub response: Option<Response>,
    /// Conditionals never satisfied (empty on success)
    pub pending: Vec<Conditional>,
    /// Number of dispatches made
    pub attempts: u32,
    /// Why pending conditionals could not be evaluated on the last attempt
    pub warnings: Vec<String>,
}

impl PollResult {
    pub fn is_success(&self) -> bool {
        self.pending.is_empty()
    }

    /// Raw expressions of the conditionals still pending
    pub fn failed_conditions(&self) -> Vec<String> {
        self.pending.iter().map(|c| c.raw.clone()).collect()
    }
}

/// Runs the dispatch / evaluate / sleep loop for one device
pub struct RetryPoller<E, D = TokioDelay> {
    executor: E,
    delay: D,
    config: PollerConfig,
}

impl<E: CommandExecutor> RetryPoller<E, TokioDelay> {
    pub fn new(executor: E, config: PollerConfig) -> Self {
        RetryPoller {
            executor,
            delay: TokioDelay,
            config,
        }
    }
}

impl<E: CommandExecutor, D: Delay> RetryPoller<E, D> {
    pub fn with_delay(executor: E, delay: D, config: PollerConfig) -> Self {
        RetryPoller {
            executor,
            delay,
            config,
        }
    }

    /// Compile the wait_for expressions and poll
    ///
    /// A malformed expression fails here, before any command is dispatched.
    pub async fn poll<S: AsRef<str>>(
        &self,
        batch: &CommandBatch,
        wait_for: &[S],
    ) -> Result<PollResult, VyosError> {
        let conditionals = parse_conditionals(wait_for)?;
        self.poll_compiled(batch, conditionals).await
    }

    /// Poll with already compiled conditionals
    pub async fn poll_compiled(
        &self,
        batch: &CommandBatch,
        conditionals: Vec<Conditional>,
    ) -> Result<PollResult, VyosError> {
        let host = self.executor.host_name().to_string();

        // Nothing to wait for: a single dispatch regardless of retries
        if conditionals.is_empty() {
            debug!(host = %host, "no conditionals, dispatching once");
            let response = self.executor.execute_commands(batch).await?;
            return Ok(PollResult {
                response: Some(response),
                pending: conditionals,
                attempts: 1,
                warnings: Vec::new(),
            });
        }

        let retries = self.config.retries;
        let mut pending = conditionals;
        let mut attempts = 0;
        let mut last_response = None;
        let mut last_error = None;
        let mut notes = Vec::new();

        while attempts < retries {
            attempts += 1;
            debug!(
                host = %host,
                attempt = attempts,
                retries,
                pending = pending.len(),
                "dispatching {} command(s)",
                batch.len()
            );

            match self.executor.execute_commands(batch).await {
                Ok(response) => {
                    notes.clear();
                    self.evaluate_pending(&mut pending, &response, &mut notes);
                    last_response = Some(response);
                }
                Err(e) if self.config.tolerant && e.is_transport() => {
                    warn!(
                        host = %host,
                        attempt = attempts,
                        "dispatch failed, will retry: {}",
                        e.summary()
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if pending.is_empty() {
                info!(host = %host, attempts, "all required conditionals satisfied");
                break;
            }

            if attempts >= retries {
                break;
            }

            debug!(
                host = %host,
                interval_secs = self.config.interval.as_secs_f64(),
                "conditionals pending, sleeping"
            );
            self.delay.sleep(self.config.interval).await;
        }

        // Tolerant mode never got a single response through
        if last_response.is_none() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        if !pending.is_empty() {
            warn!(
                host = %host,
                attempts,
                "{} conditional(s) not satisfied",
                pending.len()
            );
        } else {
            notes.clear();
        }

        Ok(PollResult {
            response: last_response,
            pending,
            attempts,
            warnings: notes,
        })
    }

    /// Drop satisfied conditionals from the pending set per the match policy
    fn evaluate_pending(
        &self,
        pending: &mut Vec<Conditional>,
        response: &Response,
        notes: &mut Vec<String>,
    ) {
        match self.config.match_policy {
            MatchPolicy::All => {
                pending.retain(|cond| !record(cond, response, notes));
            }
            MatchPolicy::Any => {
                // Stops at the first pass; later conditionals are not evaluated
                if pending.iter().any(|cond| record(cond, response, notes)) {
                    pending.clear();
                }
            }
        }
    }
}

/// Check one conditional, noting why it could not be evaluated
fn record(cond: &Conditional, response: &Response, notes: &mut Vec<String>) -> bool {
    match check(cond, response) {
        Outcome::Passed => {
            debug!(conditional = %cond.raw, "conditional satisfied");
            true
        }
        Outcome::Failed => false,
        Outcome::Unevaluable(e) => {
            debug!(conditional = %cond.raw, "conditional unevaluable: {}", e);
            notes.push(format!("unable to apply conditional '{}': {}", cond.raw, e));
            false
        }
    }
}
