//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its result
//! accordingly: framed output for humans, tab-separated rows for pipes, or
//! stable JSON.
//!
//! The mode is picked once per invocation, first match wins:
//! 1. `--json` or `--format`
//! 2. `FORMAT` env var (`pretty` | `text` | `json`)
//! 3. `output` in the user config
//! 4. [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped

use clap::ValueEnum;
use helpdesk_core::HelpdeskError;
use helpdesk_core::config;
use serde::Serialize;
use std::fmt;
use std::io::{self, IsTerminal, Write};

/// Column count of the `----` rule under pretty headings.
pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(PRETTY_RULE_WIDTH))
}

/// Heading line underlined with [`pretty_rule`].
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}").and_then(|()| pretty_rule(w))
}

/// `Key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<16} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output with sections and separators.
    Pretty,
    /// Tab-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

/// Resolve the output mode from flags, `FORMAT`, the user config and TTY
/// detection.
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    user_output: Option<&str>,
) -> OutputMode {
    let flag = if json_flag {
        Some(OutputMode::Json)
    } else {
        format_flag
    };
    let env_val = std::env::var("FORMAT").ok();
    OutputMode::from_name(config::resolve_output(
        flag.map(OutputMode::as_str),
        env_val.as_deref(),
        user_output,
        io::stdout().is_terminal(),
    ))
}

/// A failure as shown to the user: message, remediation hint and `E####`
/// code when one applies.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: Option<&str>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
            error_code: Some(error_code.into()),
        }
    }

    /// Best structured view of a command failure: our own errors keep their
    /// code, domain errors map through their [`helpdesk_core::ErrorCode`],
    /// anything else is reported by its context chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(cli) = err.downcast_ref::<Self>() {
            return Self {
                message: cli.message.clone(),
                suggestion: cli.suggestion.clone(),
                error_code: cli.error_code.clone(),
            };
        }
        if let Some(domain) = err.downcast_ref::<HelpdeskError>() {
            return Self::from(domain);
        }
        Self::new(format!("{err:#}"))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

impl From<&HelpdeskError> for CliError {
    fn from(err: &HelpdeskError) -> Self {
        let code = err.code();
        let message = match err {
            HelpdeskError::Storage(source) => format!("{}: {source:#}", code.message()),
            other => other.to_string(),
        };
        Self::with_details(message, code.hint(), code.code())
    }
}

fn write_json(out: &mut dyn Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Print a command result on stdout: JSON as is, otherwise through the
/// text or pretty writer.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Print a failure on stderr, as `{"error": {...}}` in JSON mode.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let mut out = io::stderr().lock();
    if mode.is_json() {
        return write_json(&mut out, &serde_json::json!({ "error": error }));
    }
    let code = error
        .error_code
        .as_deref()
        .map_or_else(String::new, |code| format!("[{code}]"));
    writeln!(out, "error{code}: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

/// Confirmation for commands with no entity to show (`hd delete`).
pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode.is_json() {
        return write_json(&mut out, &serde_json::json!({ "ok": true, "message": message }));
    }
    writeln!(out, "✓ {message}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::model::{Status, TicketId};
    use helpdesk_core::policy::DenyReason;

    #[test]
    fn output_mode_names_round_trip() {
        for mode in [OutputMode::Pretty, OutputMode::Text, OutputMode::Json] {
            assert_eq!(OutputMode::from_name(mode.as_str()), mode);
        }
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn json_flag_wins_over_format_flag() {
        let mode = resolve_output_mode(Some(OutputMode::Text), true, Some("pretty"));
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn domain_errors_carry_code_and_hint() {
        let err = HelpdeskError::InvalidStateTransition {
            ticket: TicketId(4),
            current: Status::Done,
            requested: Some(Status::Approved),
            attempted: "approve",
        };
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E4001"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("ticket 4"));
    }

    #[test]
    fn permission_denials_have_no_suggestion() {
        let err = HelpdeskError::PermissionDenied {
            reason: DenyReason::NotVisible,
        };
        let cli = CliError::from_anyhow(&anyhow::Error::new(err));
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
        assert!(cli.suggestion.is_none());
    }

    #[test]
    fn cli_errors_survive_anyhow_round_trip() {
        let original = CliError::with_details("not here", Some("run init"), "E1001");
        let cli = CliError::from_anyhow(&anyhow::Error::new(original));
        assert_eq!(cli.message, "not here");
        assert_eq!(cli.suggestion.as_deref(), Some("run init"));
    }

    #[test]
    fn plain_errors_keep_context_chain() {
        let err = anyhow::anyhow!("disk full").context("write ticket");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.message, "write ticket: disk full");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn cli_error_json_skips_missing_fields() {
        let json = serde_json::to_value(CliError::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "boom"}));
    }
}
