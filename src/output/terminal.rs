// Rich terminal output for vyos-api

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::Duration;

use colored::*;

use crate::runtime::Response;

/// Terminal output manager
pub struct TerminalOutput {
    verbose: bool,
    quiet: bool,
}

impl TerminalOutput {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        // Respect NO_COLOR (https://no-color.org/) and plain pipes
        if std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }

        TerminalOutput { verbose, quiet }
    }

    /// Print a header for a run
    pub fn print_run_header(&self, task_name: &str, hosts_count: usize) {
        if self.quiet {
            return;
        }

        println!();
        println!(
            "{} {} ({} hosts)",
            "TASK".yellow().bold(),
            task_name.cyan(),
            hosts_count
        );
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a task result for a host
    pub fn print_task_result(&self, result: &TaskResult) {
        if self.quiet && !result.failed {
            return;
        }

        let status = if result.unreachable {
            "UNREACHABLE".red().bold()
        } else if result.failed {
            "FAILED".red().bold()
        } else {
            "OK".green()
        };

        println!(
            "  {} {} {} {}",
            status,
            "=>".dimmed(),
            result.host.white().bold(),
            format!(
                "({} attempt{}, {:.2}s)",
                result.attempts,
                if result.attempts == 1 { "" } else { "s" },
                result.duration.as_secs_f64()
            )
            .dimmed()
        );

        for warning in &result.warnings {
            println!("      {} {}", "[WARNING]".yellow(), warning);
        }

        if self.verbose || result.failed {
            for (i, lines) in result.stdout_lines().iter().enumerate() {
                println!("      {}", format!("result[{}]", i).cyan());
                for line in lines {
                    println!("        {}", line.dimmed());
                }
            }

            if let Some(msg) = &result.message {
                println!("      {}", msg.red());
            }

            for cond in &result.failed_conditions {
                println!("      {} {}", "pending:".yellow(), cond);
            }
        }
    }

    /// Print the recap summary
    pub fn print_recap(&self, recap: &PlayRecap) {
        if self.quiet {
            return;
        }

        println!();
        println!("{}", "RECAP".green().bold());
        println!("{}", "─".repeat(60).dimmed());

        for (host, stats) in &recap.hosts {
            let ok = format!("ok={}", stats.ok).green();
            let failed = if stats.failed > 0 {
                format!("failed={}", stats.failed).red().bold()
            } else {
                format!("failed={}", stats.failed).normal()
            };
            let unreachable = if stats.unreachable > 0 {
                format!("unreachable={}", stats.unreachable).red().bold()
            } else {
                format!("unreachable={}", stats.unreachable).normal()
            };

            println!(
                "{:<30} : {}    {}    {}",
                host.white().bold(),
                ok,
                failed,
                unreachable
            );
        }

        println!();
        println!("Total time: {:.2}s", recap.total_duration.as_secs_f64());
    }
}

/// Result of one task on one host
#[derive(Debug, Clone, Default)]
pub struct TaskResult {
    pub host: String,
    pub task_name: String,
    /// Never set: the module reports device state, it does not track changes
    pub changed: bool,
    pub failed: bool,
    /// The device could not be reached or rejected a command
    pub unreachable: bool,
    /// Final response, if any attempt got one
    pub stdout: Option<Response>,
    pub failed_conditions: Vec<String>,
    pub warnings: Vec<String>,
    pub message: Option<String>,
    pub attempts: u32,
    pub duration: Duration,
}

impl TaskResult {
    pub fn ok(host: impl Into<String>, task_name: impl Into<String>) -> Self {
        TaskResult {
            host: host.into(),
            task_name: task_name.into(),
            ..Default::default()
        }
    }

    pub fn failed(
        host: impl Into<String>,
        task_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TaskResult {
            host: host.into(),
            task_name: task_name.into(),
            failed: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn unreachable(
        host: impl Into<String>,
        task_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TaskResult {
            unreachable: true,
            ..TaskResult::failed(host, task_name, message)
        }
    }

    pub fn with_stdout(mut self, stdout: Response) -> Self {
        self.stdout = Some(stdout);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Each command's output split into lines
    pub fn stdout_lines(&self) -> Vec<Vec<String>> {
        self.stdout
            .as_ref()
            .map(Response::to_lines)
            .unwrap_or_default()
    }
}

/// Statistics for a single host
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostStats {
    pub ok: usize,
    pub failed: usize,
    pub unreachable: usize,
}

impl HostStats {
    pub fn record(&mut self, result: &TaskResult) {
        if result.unreachable {
            self.unreachable += 1;
        } else if result.failed {
            self.failed += 1;
        } else {
            self.ok += 1;
        }
    }
}

/// Summary of a whole run
#[derive(Debug, Default, Clone)]
pub struct PlayRecap {
    pub hosts: BTreeMap<String, HostStats>,
    pub total_duration: Duration,
}

impl PlayRecap {
    pub fn new() -> Self {
        PlayRecap::default()
    }

    pub fn record(&mut self, result: &TaskResult) {
        self.hosts
            .entry(result.host.clone())
            .or_default()
            .record(result);
    }

    pub fn has_failures(&self) -> bool {
        self.hosts
            .values()
            .any(|s| s.failed > 0 || s.unreachable > 0)
    }

    pub fn total_failed(&self) -> usize {
        self.hosts.values().map(|s| s.failed).sum()
    }

    pub fn total_unreachable(&self) -> usize {
        self.hosts.values().map(|s| s.unreachable).sum()
    }
}
