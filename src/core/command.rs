//! Command line composition
//!
//! Turns the invocation arguments plus the line typed at the prompt into the
//! string handed to the shell. The target and its default arguments are
//! quoted so each stays a single token; the interactive suffix is passed
//! through raw so the user can add pipes or redirections.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("no target command given")]
    MissingTarget,
}

/// Target executable plus its default arguments, in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    target: String,
    defaults: Vec<String>,
}

impl CommandSpec {
    /// Build from the positional invocation arguments (program name excluded)
    pub fn from_args<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let target = args.next().ok_or(UsageError::MissingTarget)?;
        Ok(Self {
            target,
            defaults: args.collect(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Attach the interactive input, yielding the final command line
    pub fn with_additional(&self, extra: &AdditionalArgs) -> CommandLine {
        let mut argv = Vec::with_capacity(1 + self.defaults.len());
        argv.push(self.target.clone());
        argv.extend(self.defaults.iter().cloned());
        CommandLine {
            argv,
            raw_suffix: extra.as_raw().map(str::to_string),
        }
    }
}

/// The single line typed at the prompt, whitespace-trimmed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalArgs(String);

impl AdditionalArgs {
    pub fn new(line: &str) -> Self {
        Self(line.trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The text to splice into the shell line, or `None` for "defaults only"
    pub fn as_raw(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

/// Quoted argument vector followed by an optional unquoted shell suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    argv: Vec<String>,
    raw_suffix: Option<String>,
}

impl CommandLine {
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn raw_suffix(&self) -> Option<&str> {
        self.raw_suffix.as_deref()
    }

    /// Render for `sh -c`
    pub fn to_shell_string(&self) -> String {
        let mut out = self
            .argv
            .iter()
            .map(|a| quote_sh(a))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(suffix) = &self.raw_suffix {
            out.push(' ');
            out.push_str(suffix);
        }
        out
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

fn is_safe_word(s: &str) -> bool {
    s.chars().all(|c| {
        matches!(c,
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
    })
}

/// Quote `s` so a POSIX shell reads it back as exactly one word
pub fn quote_sh(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if is_safe_word(s) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}
