// Command module - allow-listed VyOS API commands and batches

use std::fmt;

use crate::output::errors::VyosError;

/// Command verbs the VyOS HTTP API accepts
pub const API_COMMANDS: [&str; 5] = ["show", "generate", "set", "delete", "comment"];

/// The leading verb of a command, which selects the API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Show,
    Generate,
    Set,
    Delete,
    Comment,
}

impl Verb {
    /// Match the allow-listed verb a command starts with
    pub fn detect(command: &str) -> Option<Self> {
        let verb = API_COMMANDS
            .iter()
            .find(|verb| command.starts_with(*verb))?;
        let v = match *verb {
            "show" => Verb::Show,
            "generate" => Verb::Generate,
            "set" => Verb::Set,
            "delete" => Verb::Delete,
            _ => Verb::Comment,
        };
        Some(v)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Show => "show",
            Verb::Generate => "generate",
            Verb::Set => "set",
            Verb::Delete => "delete",
            Verb::Comment => "comment",
        }
    }

    /// API endpoint the verb is posted to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Verb::Show => "show",
            Verb::Generate => "generate",
            Verb::Set | Verb::Delete | Verb::Comment => "configure",
        }
    }

    /// Whether the command changes device state
    pub fn is_read_only(&self) -> bool {
        matches!(self, Verb::Show)
    }
}

/// A single accepted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    verb: Verb,
}

impl Command {
    /// Accept a command if it starts with an allowed verb
    pub fn parse(text: impl Into<String>) -> Result<Self, VyosError> {
        let text = text.into();
        match Verb::detect(&text) {
            Some(verb) => Ok(Command { text, verb }),
            None => Err(VyosError::Command {
                message: format!("'{}' - is not an allowed command", text),
                command: text,
                suggestion: Some(format!(
                    "Commands must start with one of: {}",
                    API_COMMANDS.join(", ")
                )),
            }),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The words after the verb, as the API `path` array
    pub fn path(&self) -> Vec<String> {
        let rest = &self.text[self.verb.as_str().len()..];
        split_words(rest)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Ordered commands sent together on every attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    pub fn new(commands: Vec<Command>) -> Self {
        CommandBatch { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}

/// Validate raw commands and apply check-mode filtering
///
/// Returns the accepted batch plus any warnings. In check mode only `show`
/// commands are kept.
pub fn parse_commands<S: AsRef<str>>(
    raw: &[S],
    check_mode: bool,
) -> Result<(CommandBatch, Vec<String>), VyosError> {
    if raw.is_empty() {
        return Err(VyosError::Command {
            command: String::new(),
            message: "at least one command is required".to_string(),
            suggestion: Some("Pass commands with -c/--command or in the task file".to_string()),
        });
    }

    let mut warnings = Vec::new();
    let mut commands = Vec::with_capacity(raw.len());

    for item in raw {
        let command = Command::parse(item.as_ref())?;

        if check_mode && !command.verb().is_read_only() {
            warnings.push(format!(
                "Only show commands are supported when using check mode, not executing {}",
                command
            ));
            continue;
        }

        commands.push(command);
    }

    Ok((CommandBatch::new(commands), warnings))
}

/// Split a command tail into words, keeping quoted groups together
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in s.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(current);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disallowed_command() {
        let err = Command::parse("reboot now").unwrap_err();
        assert_eq!(err.summary(), "'reboot now' - is not an allowed command");
    }

    #[test]
    fn test_verb_endpoints() {
        let show = Command::parse("show version").unwrap();
        assert_eq!(show.verb().endpoint(), "show");

        let set = Command::parse("set system host-name vyos01").unwrap();
        assert_eq!(set.verb().endpoint(), "configure");
        assert_eq!(set.path(), vec!["system", "host-name", "vyos01"]);

        let generate = Command::parse("generate pki wireguard key-pair").unwrap();
        assert_eq!(generate.verb().endpoint(), "generate");
    }

    #[test]
    fn test_path_keeps_quoted_words() {
        let cmd = Command::parse("set interfaces ethernet eth0 description 'uplink to core'").unwrap();
        assert_eq!(
            cmd.path(),
            vec!["interfaces", "ethernet", "eth0", "description", "uplink to core"]
        );

        let cmd = Command::parse("comment system \"managed by automation\"").unwrap();
        assert_eq!(cmd.path(), vec!["system", "managed by automation"]);

        let cmd = Command::parse("set system login banner pre-login ''").unwrap();
        assert_eq!(cmd.path(), vec!["system", "login", "banner", "pre-login", ""]);
    }

    #[test]
    fn test_parse_commands_keeps_order() {
        let (batch, warnings) =
            parse_commands(&["show version", "show hardware cpu"], false).unwrap();
        assert!(warnings.is_empty());
        let texts: Vec<_> = batch.iter().map(|c| c.text()).collect();
        assert_eq!(texts, vec!["show version", "show hardware cpu"]);
    }

    #[test]
    fn test_check_mode_drops_config_commands() {
        let (batch, warnings) = parse_commands(
            &["show version", "set system host-name vyos01", "delete service ssh"],
            true,
        )
        .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(
            warnings,
            vec![
                "Only show commands are supported when using check mode, not executing set system host-name vyos01".to_string(),
                "Only show commands are supported when using check mode, not executing delete service ssh".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_and_invalid_batches() {
        let empty: [&str; 0] = [];
        assert!(parse_commands(&empty, false).is_err());
        assert!(parse_commands(&["show version", "ping 192.0.2.1"], false).is_err());
    }
}
