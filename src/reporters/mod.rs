//! Report producers behind the chat commands.
//!
//! Each reporter turns one command invocation into a complete, ready-to-send
//! report. Reporters are failure boundaries: they return `ReportError`
//! instead of raising, and the dispatcher renders failures as chat text.

pub mod connections;
pub mod metrics;
pub mod top_ips;
pub mod traffic;

use thiserror::Error;

/// Telegram parse mode for a text report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    Markdown,
    MarkdownV2,
    Html,
}

impl ParseMode {
    /// Wire value for the bot API; plain text sends no parse_mode at all.
    pub fn as_api_str(self) -> Option<&'static str> {
        match self {
            ParseMode::Plain => None,
            ParseMode::Markdown => Some("Markdown"),
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Html => Some("HTML"),
        }
    }
}

/// A complete report, ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Text {
        body: String,
        mode: ParseMode,
    },
    /// Delivered as a document attachment. The bytes are snapshotted at
    /// generation time so delivery cannot race a later overwrite of the
    /// transient file.
    Document {
        file_name: String,
        caption: String,
        bytes: Vec<u8>,
    },
}

/// Failure taxonomy for the reporters.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{tool}: {detail}")]
    Tool { tool: String, detail: String },
    #[error("unexpected {tool} output: {detail}")]
    Parse { tool: String, detail: String },
    #[error("failed to write report file: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn tool(tool: &str, detail: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }

    pub fn parse(tool: &str, detail: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_wire_values() {
        assert_eq!(ParseMode::Plain.as_api_str(), None);
        assert_eq!(ParseMode::Markdown.as_api_str(), Some("Markdown"));
        assert_eq!(ParseMode::MarkdownV2.as_api_str(), Some("MarkdownV2"));
        assert_eq!(ParseMode::Html.as_api_str(), Some("HTML"));
    }

    #[test]
    fn test_error_display_carries_detail() {
        let err = ReportError::tool("ss", "exit 1: unknown option");
        assert_eq!(err.to_string(), "ss: exit 1: unknown option");
        let err = ReportError::parse("vnstat", "expected at least 7 fields, got 3");
        assert_eq!(
            err.to_string(),
            "unexpected vnstat output: expected at least 7 fields, got 3"
        );
    }
}
