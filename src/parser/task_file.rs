// Task file parser - YAML description of one "run and verify" task

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ast::MatchPolicy;
use crate::output::errors::{ParseError, ParseErrorKind, VyosError};

/// A single string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Raw YAML task file structure (before conversion)
#[derive(Debug, Deserialize)]
struct RawTaskFile {
    name: Option<String>,
    hosts: Option<OneOrMany>,
    commands: Option<OneOrMany>,
    #[serde(alias = "waitfor")]
    wait_for: Option<OneOrMany>,
    #[serde(rename = "match")]
    match_policy: Option<String>,
    retries: Option<u32>,
    /// Seconds
    interval: Option<f64>,
    check: Option<bool>,
    tolerant: Option<bool>,
    #[serde(default)]
    connection: ConnectionSettings,
}

/// Connection options a task file may carry; unset fields fall back to CLI or defaults
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ConnectionSettings {
    pub port: Option<u16>,
    pub key: Option<String>,
    /// Seconds
    pub timeout: Option<u64>,
    pub validate_certs: Option<bool>,
    pub ca_path: Option<PathBuf>,
    pub use_proxy: Option<bool>,
}

/// What to run against a device and what to wait for
#[derive(Debug, Clone, PartialEq)]
pub struct TaskParams {
    pub name: Option<String>,
    pub commands: Vec<String>,
    pub wait_for: Vec<String>,
    pub match_policy: MatchPolicy,
    pub retries: u32,
    pub interval: Duration,
    pub check_mode: bool,
    pub tolerant: bool,
}

impl Default for TaskParams {
    fn default() -> Self {
        TaskParams {
            name: None,
            commands: Vec::new(),
            wait_for: Vec::new(),
            match_policy: MatchPolicy::All,
            retries: 10,
            interval: Duration::from_secs(1),
            check_mode: false,
            tolerant: false,
        }
    }
}

impl TaskParams {
    pub fn new<S: Into<String>>(commands: impl IntoIterator<Item = S>) -> Self {
        TaskParams {
            commands: commands.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_wait_for<S: Into<String>>(mut self, wait_for: impl IntoIterator<Item = S>) -> Self {
        self.wait_for = wait_for.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_match(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_tolerant(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    /// Display name of the task
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => match self.commands.as_slice() {
                [] => "vyos api".to_string(),
                [only] => only.clone(),
                [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
            },
        }
    }
}

/// A parsed task file
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFile {
    pub hosts: Vec<String>,
    pub connection: ConnectionSettings,
    pub task: TaskParams,
    pub source_file: String,
}

/// Parse a task file from disk
pub fn parse_task_file(path: &Path) -> Result<TaskFile, VyosError> {
    let content = std::fs::read_to_string(path).map_err(|e| VyosError::Io {
        message: format!("Failed to read task file: {}", e),
        path: Some(path.to_path_buf()),
    })?;

    parse_task_str(&content, path.display().to_string())
}

/// Parse task file content
pub fn parse_task_str(content: &str, source_file: impl Into<String>) -> Result<TaskFile, VyosError> {
    let source_file = source_file.into();

    let raw: RawTaskFile = serde_yaml::from_str(content).map_err(|e| {
        let (line, column) = yaml_error_location(&e);
        VyosError::Parse(Box::new(ParseError {
            kind: ParseErrorKind::InvalidYaml,
            message: format!("Invalid YAML: {}", e),
            file: Some(source_file.clone()),
            line,
            column,
            suggestion: Some("Check YAML syntax - ensure proper indentation and valid YAML".to_string()),
        }))
    })?;

    convert_task_file(raw, source_file)
}

fn yaml_error_location(e: &serde_yaml::Error) -> (Option<usize>, Option<usize>) {
    match e.location() {
        Some(loc) => (Some(loc.line()), Some(loc.column())),
        None => (None, None),
    }
}

fn convert_task_file(raw: RawTaskFile, source_file: String) -> Result<TaskFile, VyosError> {
    let invalid = |kind: ParseErrorKind, message: String, suggestion: &str| {
        VyosError::Parse(Box::new(ParseError {
            kind,
            message,
            file: Some(source_file.clone()),
            line: None,
            column: None,
            suggestion: Some(suggestion.to_string()),
        }))
    };

    // May be empty when the commands come from the command line
    let commands = raw.commands.map(OneOrMany::into_vec).unwrap_or_default();

    let mut task = TaskParams::new(commands);
    task.name = raw.name;
    task.wait_for = raw.wait_for.map(OneOrMany::into_vec).unwrap_or_default();

    if let Some(policy) = raw.match_policy {
        task.match_policy = policy
            .parse()
            .map_err(|e: String| invalid(ParseErrorKind::InvalidValue, e, "Use 'match: all' or 'match: any'"))?;
    }

    if let Some(retries) = raw.retries {
        task.retries = retries;
    }

    if let Some(secs) = raw.interval {
        task.interval = Duration::try_from_secs_f64(secs).map_err(|_| {
            invalid(
                ParseErrorKind::InvalidValue,
                format!("Invalid interval: {}", secs),
                "The interval is a non-negative number of seconds",
            )
        })?;
    }

    task.check_mode = raw.check.unwrap_or(false);
    task.tolerant = raw.tolerant.unwrap_or(false);

    Ok(TaskFile {
        hosts: raw.hosts.map(OneOrMany::into_vec).unwrap_or_default(),
        connection: raw.connection,
        task,
        source_file,
    })
}
