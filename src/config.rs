// Run configuration - command line flags merged over a task file
//
// Precedence: flags, then the task file, then built-in defaults. The API key
// is taken from --key, --ask-key, connection.key, then VYOS_API_KEY.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::debug;

use crate::executor::ApiConfig;
use crate::output::errors::{ParseError, ParseErrorKind, VyosError};
use crate::parser::ast::MatchPolicy;
use crate::parser::{parse_task_file, ConnectionSettings, TaskFile, TaskParams};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "VYOS_API_KEY";

/// What to run and what to wait for
#[derive(Debug, Clone, Default, Args)]
pub struct TaskOverrides {
    /// YAML task file; command line flags override its values
    #[arg(long)]
    pub task: Option<PathBuf>,

    /// Command to run (repeatable)
    #[arg(short = 'c', long = "command")]
    pub commands: Vec<String>,

    /// Conditional to wait for (repeatable)
    #[arg(short = 'w', long = "wait-for", visible_alias = "waitfor")]
    pub wait_for: Vec<String>,

    /// How conditionals combine: all or any
    #[arg(long = "match")]
    pub match_policy: Option<MatchPolicy>,

    /// Maximum attempts while conditionals are pending
    #[arg(long)]
    pub retries: Option<u32>,

    /// Seconds between attempts
    #[arg(long)]
    pub interval: Option<f64>,

    /// Only run show commands; others are reported and skipped
    #[arg(long)]
    pub check: bool,

    /// Keep retrying past transport errors
    #[arg(long)]
    pub tolerant: bool,
}

/// How to reach the devices
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionOverrides {
    /// API key (insecure - prefer --ask-key or VYOS_API_KEY)
    #[arg(long)]
    pub key: Option<String>,

    /// Prompt for the API key
    #[arg(long)]
    pub ask_key: bool,

    /// HTTPS port
    #[arg(long)]
    pub port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Accept any TLS certificate
    #[arg(long)]
    pub no_validate_certs: bool,

    /// Extra PEM root certificate to trust
    #[arg(long)]
    pub ca_path: Option<PathBuf>,

    /// Ignore proxy environment variables
    #[arg(long)]
    pub no_proxy: bool,
}

/// Task, hosts and file connection settings after merging
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub task: TaskParams,
    pub hosts: Vec<String>,
    pub connection: ConnectionSettings,
}

/// Load the task file named by `--task` (if any) and merge the flags over it
pub fn load_task(overrides: TaskOverrides) -> Result<RunConfig, VyosError> {
    let file = match overrides.task {
        Some(ref path) => {
            let file = parse_task_file(path)?;
            debug!(file = %file.source_file, "loaded task file");
            Some(file)
        }
        None => None,
    };

    merge_task(file, overrides)
}

/// Merge command line flags over a parsed task file
pub fn merge_task(file: Option<TaskFile>, overrides: TaskOverrides) -> Result<RunConfig, VyosError> {
    let (mut task, hosts, connection) = match file {
        Some(file) => (file.task, file.hosts, file.connection),
        None => (TaskParams::default(), Vec::new(), ConnectionSettings::default()),
    };

    if !overrides.commands.is_empty() {
        task.commands = overrides.commands;
    }
    if !overrides.wait_for.is_empty() {
        task = task.with_wait_for(overrides.wait_for);
    }
    if let Some(policy) = overrides.match_policy {
        task = task.with_match(policy);
    }
    if let Some(retries) = overrides.retries {
        task = task.with_retries(retries);
    }
    if let Some(secs) = overrides.interval {
        let interval = Duration::try_from_secs_f64(secs).map_err(|_| {
            invalid_value(format!("Invalid interval: {}", secs), "Use a non-negative number of seconds")
        })?;
        task = task.with_interval(interval);
    }

    let check_mode = task.check_mode || overrides.check;
    let tolerant = task.tolerant || overrides.tolerant;
    let task = task.with_check_mode(check_mode).with_tolerant(tolerant);

    Ok(RunConfig {
        task,
        hosts,
        connection,
    })
}

/// Hosts from the flags, or from the task file when no flag names any
pub fn resolve_hosts(cli: Vec<String>, file: Vec<String>) -> Result<Vec<String>, VyosError> {
    let hosts: Vec<String> = (if cli.is_empty() { file } else { cli })
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    if hosts.is_empty() {
        return Err(missing_field(
            "No hosts to run against",
            "Pass -H/--host or set 'hosts:' in the task file",
        ));
    }
    Ok(hosts)
}

/// Resolve the API key
///
/// `prompt` is only called for `--ask-key`; `env_key` is the value of
/// [`API_KEY_ENV`], if set.
pub fn resolve_key<F>(
    overrides: &ConnectionOverrides,
    file: &ConnectionSettings,
    env_key: Option<String>,
    prompt: F,
) -> Result<String, VyosError>
where
    F: FnOnce() -> Result<String, VyosError>,
{
    if let Some(ref key) = overrides.key {
        return Ok(key.clone());
    }
    if overrides.ask_key {
        let key = prompt()?.trim().to_string();
        if key.is_empty() {
            return Err(invalid_value(
                "Empty API key".to_string(),
                "Enter the key configured under 'service https api keys'",
            ));
        }
        return Ok(key);
    }
    if let Some(ref key) = file.key {
        return Ok(key.clone());
    }
    if let Some(key) = env_key.filter(|k| !k.is_empty()) {
        return Ok(key);
    }

    Err(missing_field(
        "No API key given",
        &format!(
            "Pass --key, --ask-key, set 'connection.key' in the task file, or export {}",
            API_KEY_ENV
        ),
    ))
}

/// Connection options for one device
pub fn api_config(
    host: &str,
    key: &str,
    overrides: &ConnectionOverrides,
    file: &ConnectionSettings,
) -> ApiConfig {
    let mut config = ApiConfig::new(host, key);

    if let Some(port) = overrides.port.or(file.port) {
        config = config.with_port(port);
    }
    if let Some(secs) = overrides.timeout.or(file.timeout) {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    // A flag can only switch these off
    let validate_certs = !overrides.no_validate_certs && file.validate_certs.unwrap_or(true);
    let use_proxy = !overrides.no_proxy && file.use_proxy.unwrap_or(true);

    config
        .with_validate_certs(validate_certs)
        .with_ca_path(overrides.ca_path.clone().or_else(|| file.ca_path.clone()))
        .with_proxy(use_proxy)
}

fn invalid_value(message: String, suggestion: &str) -> VyosError {
    VyosError::Parse(Box::new(ParseError {
        kind: ParseErrorKind::InvalidValue,
        message,
        file: None,
        line: None,
        column: None,
        suggestion: Some(suggestion.to_string()),
    }))
}

fn missing_field(message: &str, suggestion: &str) -> VyosError {
    VyosError::Parse(Box::new(ParseError {
        kind: ParseErrorKind::MissingField,
        message: message.to_string(),
        file: None,
        line: None,
        column: None,
        suggestion: Some(suggestion.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_task_str;
    use pretty_assertions::assert_eq;

    const TASK_FILE: &str = r#"
hosts: [vyos01, vyos02]
connection:
  port: 8443
  key: from-file
  timeout: 5
  validate_certs: false
commands: [show version]
wait_for: ["result[0] contains 'VyOS 1.3.0'"]
match: any
retries: 4
interval: 2
tolerant: true
"#;

    fn task_file() -> TaskFile {
        parse_task_str(TASK_FILE, "upgrade.yml").unwrap()
    }

    fn no_prompt() -> Result<String, VyosError> {
        panic!("prompt must not be called")
    }

    #[test]
    fn test_file_values_without_flags() {
        let config = merge_task(Some(task_file()), TaskOverrides::default()).unwrap();

        assert_eq!(config.task.commands, vec!["show version"]);
        assert_eq!(config.task.match_policy, MatchPolicy::Any);
        assert_eq!(config.task.retries, 4);
        assert_eq!(config.task.interval, Duration::from_secs(2));
        assert!(config.task.tolerant);
        assert!(!config.task.check_mode);
        assert_eq!(config.hosts, vec!["vyos01", "vyos02"]);
    }

    #[test]
    fn test_flags_override_file() {
        let overrides = TaskOverrides {
            commands: vec!["show interfaces".to_string()],
            wait_for: vec!["result[0] contains eth0".to_string()],
            match_policy: Some(MatchPolicy::All),
            retries: Some(9),
            interval: Some(0.25),
            check: true,
            ..Default::default()
        };

        let config = merge_task(Some(task_file()), overrides).unwrap();

        assert_eq!(config.task.commands, vec!["show interfaces"]);
        assert_eq!(config.task.wait_for, vec!["result[0] contains eth0"]);
        assert_eq!(config.task.match_policy, MatchPolicy::All);
        assert_eq!(config.task.retries, 9);
        assert_eq!(config.task.interval, Duration::from_millis(250));
        assert!(config.task.check_mode);
        // A flag that is not given keeps the file value
        assert!(config.task.tolerant);
    }

    #[test]
    fn test_flags_supply_commands_for_connection_only_file() {
        let file = parse_task_str("hosts: vyos01\nconnection:\n  port: 8443\n", "conn.yml").unwrap();
        let overrides = TaskOverrides {
            commands: vec!["show version".to_string()],
            ..Default::default()
        };

        let config = merge_task(Some(file), overrides).unwrap();

        assert_eq!(config.task.commands, vec!["show version"]);
        assert_eq!(config.connection.port, Some(8443));
    }

    #[test]
    fn test_invalid_interval_flag() {
        let overrides = TaskOverrides {
            interval: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(merge_task(None, overrides), Err(VyosError::Parse(_))));
    }

    #[test]
    fn test_hosts_flag_replaces_file_hosts() {
        let hosts = resolve_hosts(vec!["vyos03 ".to_string()], vec!["vyos01".to_string()]).unwrap();
        assert_eq!(hosts, vec!["vyos03"]);

        let hosts = resolve_hosts(Vec::new(), vec!["vyos01".to_string()]).unwrap();
        assert_eq!(hosts, vec!["vyos01"]);

        assert!(resolve_hosts(Vec::new(), vec![" ".to_string()]).is_err());
    }

    #[test]
    fn test_key_source_order() {
        let file = ConnectionSettings {
            key: Some("from-file".to_string()),
            ..Default::default()
        };
        let env = || Some("from-env".to_string());

        let flag = ConnectionOverrides {
            key: Some("from-flag".to_string()),
            ask_key: true,
            ..Default::default()
        };
        assert_eq!(resolve_key(&flag, &file, env(), no_prompt).unwrap(), "from-flag");

        let ask = ConnectionOverrides {
            ask_key: true,
            ..Default::default()
        };
        let prompted = resolve_key(&ask, &file, env(), || Ok(" typed \n".to_string())).unwrap();
        assert_eq!(prompted, "typed");
        assert!(resolve_key(&ask, &file, env(), || Ok(String::new())).is_err());

        let none = ConnectionOverrides::default();
        assert_eq!(resolve_key(&none, &file, env(), no_prompt).unwrap(), "from-file");
        assert_eq!(
            resolve_key(&none, &ConnectionSettings::default(), env(), no_prompt).unwrap(),
            "from-env"
        );

        let err = resolve_key(&none, &ConnectionSettings::default(), Some(String::new()), no_prompt);
        assert!(matches!(err, Err(VyosError::Parse(ref e)) if e.kind == ParseErrorKind::MissingField));
    }

    #[test]
    fn test_api_config_merging() {
        let file = task_file().connection;

        let config = api_config("vyos01", "k", &ConnectionOverrides::default(), &file);
        assert_eq!(config.port, 8443);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.validate_certs);
        assert!(config.use_proxy);

        let overrides = ConnectionOverrides {
            port: Some(443),
            no_proxy: true,
            ca_path: Some(PathBuf::from("/etc/ssl/vyos-ca.pem")),
            ..Default::default()
        };
        let config = api_config("vyos01", "k", &overrides, &file);
        assert_eq!(config.port, 443);
        assert!(!config.use_proxy);
        assert_eq!(config.ca_path, Some(PathBuf::from("/etc/ssl/vyos-ca.pem")));
    }

    #[test]
    fn test_certificate_and_proxy_defaults() {
        let config = api_config(
            "vyos01",
            "k",
            &ConnectionOverrides::default(),
            &ConnectionSettings::default(),
        );
        assert!(config.validate_certs);
        assert!(config.use_proxy);
        assert_eq!(config.port, 443);

        let off = ConnectionOverrides {
            no_validate_certs: true,
            ..Default::default()
        };
        let file = ConnectionSettings {
            validate_certs: Some(true),
            use_proxy: Some(false),
            ..Default::default()
        };
        let config = api_config("vyos01", "k", &off, &file);
        assert!(!config.validate_certs);
        assert!(!config.use_proxy);
    }
}
