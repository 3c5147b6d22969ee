// JSON output for machine-readable results

use serde_json::{json, Map, Value};

use super::terminal::{PlayRecap, TaskResult};

/// JSON output manager emitting one event per line (NDJSON)
pub struct JsonOutput {
    verbose: bool,
    quiet: bool,
}

impl JsonOutput {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        JsonOutput { verbose, quiet }
    }

    /// Print a header for a run
    pub fn print_run_header(&self, task_name: &str, hosts_count: usize) {
        if self.quiet {
            return;
        }

        self.emit_json(&json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "event": "run_start",
            "task": task_name,
            "hosts_count": hosts_count,
        }));
    }

    /// Print a task result for a host
    pub fn print_task_result(&self, result: &TaskResult) {
        if self.quiet && !result.failed {
            return;
        }

        self.emit_json(&task_event(result, self.verbose));
    }

    /// Print the recap summary
    pub fn print_recap(&self, recap: &PlayRecap) {
        if self.quiet {
            return;
        }

        self.emit_json(&recap_event(recap));
    }

    fn emit_json(&self, value: &Value) {
        if let Ok(line) = serde_json::to_string(value) {
            println!("{}", line);
        }
    }
}

/// `task_complete` event for one host
pub fn task_event(result: &TaskResult, verbose: bool) -> Value {
    let status = if result.unreachable {
        "unreachable"
    } else if result.failed {
        "failed"
    } else {
        "ok"
    };

    let mut data = Map::new();
    data.insert("changed".to_string(), json!(result.changed));
    data.insert("failed".to_string(), json!(result.failed));

    if let Some(ref stdout) = result.stdout {
        data.insert("stdout".to_string(), json!(stdout));
        data.insert("stdout_lines".to_string(), json!(result.stdout_lines()));
    }

    if verbose {
        data.insert("duration_secs".to_string(), json!(result.duration.as_secs_f64()));
    }

    if result.failed && !result.failed_conditions.is_empty() {
        data.insert("failed_conditions".to_string(), json!(result.failed_conditions));
    }

    if !result.warnings.is_empty() {
        data.insert("warnings".to_string(), json!(result.warnings));
    }

    if let Some(ref msg) = result.message {
        data.insert("msg".to_string(), json!(msg));
    }

    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": "task_complete",
        "host": result.host,
        "task": result.task_name,
        "status": status,
        "attempts": result.attempts,
        "duration_ms": result.duration.as_millis() as u64,
        "result": data,
    })
}

/// `recap` event for the whole run
pub fn recap_event(recap: &PlayRecap) -> Value {
    let hosts: Map<String, Value> = recap
        .hosts
        .iter()
        .map(|(host, stats)| {
            (
                host.clone(),
                json!({
                    "ok": stats.ok,
                    "failed": stats.failed,
                    "unreachable": stats.unreachable,
                }),
            )
        })
        .collect();

    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": "recap",
        "hosts": hosts,
        "total_duration_ms": recap.total_duration.as_millis() as u64,
        "total_failed": recap.total_failed(),
        "total_unreachable": recap.total_unreachable(),
        "has_failures": recap.has_failures(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    use crate::runtime::Response;

    #[test]
    fn test_failed_task_event() {
        let mut result = TaskResult::failed(
            "vyos01",
            "show version",
            "One or more conditional statements have not been satisfied",
        )
        .with_stdout(Response::from_text(["Version: VyOS 1.2.9\nRelease train: crux"]))
        .with_duration(Duration::from_millis(1234));
        result.attempts = 3;
        result.failed_conditions = vec!["result[0] contains 'VyOS 1.3.0'".to_string()];

        let event = task_event(&result, false);

        assert_eq!(event["event"], "task_complete");
        assert_eq!(event["status"], "failed");
        assert_eq!(event["attempts"], 3);
        assert_eq!(event["duration_ms"], 1234);
        assert_eq!(event["result"]["stdout"], json!(["Version: VyOS 1.2.9\nRelease train: crux"]));
        assert_eq!(
            event["result"]["stdout_lines"],
            json!([["Version: VyOS 1.2.9", "Release train: crux"]])
        );
        assert_eq!(
            event["result"]["failed_conditions"],
            json!(["result[0] contains 'VyOS 1.3.0'"])
        );
        assert!(event["timestamp"].as_str().is_some());
    }

    #[test]
    fn test_ok_event_always_carries_output() {
        let result = TaskResult::ok("vyos01", "show version")
            .with_stdout(Response::from_text(["Version: VyOS 1.3.0\nRelease train: equuleus"]));

        let event = task_event(&result, false);
        assert_eq!(event["status"], "ok");
        assert_eq!(event["result"]["stdout"], json!(["Version: VyOS 1.3.0\nRelease train: equuleus"]));
        assert_eq!(
            event["result"]["stdout_lines"],
            json!([["Version: VyOS 1.3.0", "Release train: equuleus"]])
        );
        assert!(event["result"].get("failed_conditions").is_none());
        assert!(event["result"].get("duration_secs").is_none());

        let verbose = task_event(&result, true);
        assert!(verbose["result"].get("duration_secs").is_some());
    }

    #[test]
    fn test_unreachable_and_recap_events() {
        let down = TaskResult::unreachable("vyos02", "show version", "vyos02: connection refused");
        assert_eq!(task_event(&down, false)["status"], "unreachable");

        let mut recap = PlayRecap::new();
        recap.record(&TaskResult::ok("vyos01", "show version"));
        recap.record(&down);
        recap.total_duration = Duration::from_secs(2);

        let event = recap_event(&recap);
        assert_eq!(event["event"], "recap");
        assert_eq!(event["hosts"]["vyos02"]["unreachable"], 1);
        assert_eq!(event["total_duration_ms"], 2000);
        assert_eq!(event["has_failures"], true);
    }
}
