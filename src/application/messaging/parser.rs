//! Command parser - Extracts a command name and arguments from message text

/// A command found in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub prefix: String,
    pub name: String,
    pub args: Vec<String>,
}

/// Parses prefixed commands, honouring `/cmd@handle` mentions
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefixes: Vec<String>,
    handle: String,
}

impl CommandParser {
    /// `handle` is the host's own username, with or without the leading `@`
    pub fn new(prefixes: Vec<String>, handle: impl Into<String>) -> Self {
        let mut prefixes: Vec<String> = prefixes.into_iter().filter(|p| !p.is_empty()).collect();
        // Longest first; the sort is stable so configured order breaks ties
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
        Self {
            prefixes,
            handle: handle.into().trim_start_matches('@').to_string(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns `None` when the text is not a command addressed to this host
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let prefix = self.prefixes.iter().find(|p| text.starts_with(p.as_str()))?;
        let mut parts = text[prefix.len()..].split_whitespace();
        let token = parts.next()?;

        let name = match token.split_once('@') {
            Some((name, mention)) => {
                if !mention.eq_ignore_ascii_case(&self.handle) {
                    tracing::debug!("Ignoring /{} addressed to @{}", name, mention);
                    return None;
                }
                name
            }
            None => token,
        };
        if name.is_empty() {
            return None;
        }

        Some(ParsedCommand {
            prefix: prefix.clone(),
            name: name.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new(vec!["/".to_string(), "!".to_string()], "mybot")
    }

    #[test]
    fn test_parse_command_with_args() {
        let cmd = parser().parse("!echo hi there").unwrap();
        assert_eq!(cmd.prefix, "!");
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args, vec!["hi", "there"]);
    }

    #[test]
    fn test_non_command_is_ignored() {
        assert!(parser().parse("hello").is_none());
        assert!(parser().parse("/").is_none());
        assert!(parser().parse("/   ").is_none());
    }

    #[test]
    fn test_mention_must_match_own_handle() {
        assert!(parser().parse("/ping@otherbot").is_none());
        let cmd = parser().parse("/ping@MyBot now").unwrap();
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.args, vec!["now"]);
        assert!(parser().parse("/@mybot").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let parser = CommandParser::new(vec!["!".to_string(), "!!".to_string()], "@mybot");
        let cmd = parser.parse("!!deploy prod").unwrap();
        assert_eq!(cmd.prefix, "!!");
        assert_eq!(cmd.name, "deploy");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let cmd = parser().parse("/echo   a \t b").unwrap();
        assert_eq!(cmd.args, vec!["a", "b"]);
    }
}
