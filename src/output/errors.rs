// Human-readable error messages for vyos-api

use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

use colored::*;

/// Initialize color output based on TTY detection and NO_COLOR environment variable
fn should_use_colors() -> bool {
    // Check NO_COLOR environment variable first (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Errors are written to stderr
    std::io::stderr().is_terminal()
}

/// All error types in vyos-api
#[derive(Debug)]
pub enum VyosError {
    /// Task file parse errors
    Parse(Box<ParseError>),

    /// I/O errors
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// A wait_for conditional could not be compiled
    Conditional {
        expression: String,
        message: String,
        suggestion: Option<String>,
    },

    /// A command was rejected before dispatch
    Command {
        command: String,
        message: String,
        suggestion: Option<String>,
    },

    /// The device API could not run the batch
    Transport {
        host: String,
        message: String,
        suggestion: Option<String>,
    },

    /// The device answered but refused a command
    Rejected {
        host: String,
        command: String,
        message: String,
    },
}

#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidYaml,
    MissingField,
    InvalidValue,
}

impl VyosError {
    /// Build a malformed-conditional error
    pub fn conditional(expression: impl Into<String>, message: impl Into<String>) -> Self {
        VyosError::Conditional {
            expression: expression.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Build a transport error, attaching a hint when one is known
    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = VyosError::Transport {
            host: host.into(),
            message: message.into(),
            suggestion: None,
        };
        let hint = suggest_fix(&err);
        if let VyosError::Transport { suggestion, .. } = &mut err {
            *suggestion = hint;
        }
        err
    }

    /// Build an error for a command the device refused
    pub fn rejected(
        host: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        VyosError::Rejected {
            host: host.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    /// True when the commands could not be run at all
    pub fn is_transport(&self) -> bool {
        matches!(self, VyosError::Transport { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, VyosError::Rejected { .. })
    }

    /// Plain one-line message without colors
    pub fn summary(&self) -> String {
        match self {
            VyosError::Parse(err) => err.message.clone(),
            VyosError::Io { message, .. } => message.clone(),
            VyosError::Conditional {
                expression,
                message,
                ..
            } => format!("{}: {}", message, expression),
            VyosError::Command { message, .. } => message.clone(),
            VyosError::Transport { host, message, .. } => format!("{}: {}", host, message),
            VyosError::Rejected {
                host,
                command,
                message,
            } => format!("{}: device rejected '{}': {}", host, command, message),
        }
    }
}

impl std::error::Error for VyosError {}

impl fmt::Display for VyosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Set color mode based on TTY detection and NO_COLOR
        if !should_use_colors() {
            colored::control::set_override(false);
        }

        match self {
            VyosError::Parse(err) => {
                writeln!(f, "{}: {}", "ERROR".red().bold(), err.message)?;

                if let Some(ref file) = err.file {
                    write!(f, "  {} ", "-->".blue())?;
                    write!(f, "{}", file.cyan())?;
                    if let Some(line) = err.line {
                        write!(f, ":{}", line)?;
                        if let Some(col) = err.column {
                            write!(f, ":{}", col)?;
                        }
                    }
                    writeln!(f)?;
                }

                if let Some(ref suggestion) = err.suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            VyosError::Io { message, path } => {
                writeln!(f, "{}: {}", "I/O ERROR".red().bold(), message)?;
                if let Some(path) = path {
                    writeln!(f, "  {} {}", "Path:".dimmed(), path.display())?;
                }
                Ok(())
            }

            VyosError::Conditional {
                expression,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "CONDITIONAL ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Expression:".dimmed(), expression)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            VyosError::Command {
                command,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "COMMAND ERROR".red().bold(), message)?;
                if !command.is_empty() {
                    writeln!(f, "  {} {}", "Command:".dimmed(), command)?;
                }

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            VyosError::Transport {
                host,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "TRANSPORT ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Host:".dimmed(), host)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            VyosError::Rejected {
                host,
                command,
                message,
            } => {
                writeln!(f, "{}: {}", "COMMAND REJECTED".red().bold(), message)?;
                writeln!(f, "  {} {}", "Host:".dimmed(), host)?;
                writeln!(f, "  {} {}", "Command:".dimmed(), command)?;
                Ok(())
            }
        }
    }
}

/// Suggest common fixes for errors
pub fn suggest_fix(error: &VyosError) -> Option<String> {
    match error {
        VyosError::Transport { message, .. } => {
            let message = message.to_lowercase();
            if message.contains("connection refused") {
                Some("Ensure the HTTP API service is enabled on the device".to_string())
            } else if message.contains("timed out") || message.contains("timeout") {
                Some("Check network connectivity or raise --timeout".to_string())
            } else if message.contains("certificate") {
                Some("Use --ca-path for a private CA or --no-validate-certs for lab devices".to_string())
            } else if message.contains("401") || message.contains("403") || message.contains("api key") {
                Some("Verify the API key configured under 'service https api keys'".to_string())
            } else {
                None
            }
        }

        _ => None,
    }
}
