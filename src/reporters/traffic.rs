//! Network traffic summary from the vnstat counters.

use super::{ParseMode, Report, ReportError};
use crate::config::BotConfig;
use crate::execution::run_tool;
use crate::format::truncate_markdown;

/// `vnstat --oneline` fields: version tag, then the six values we extract.
const EXPECTED_FIELDS: usize = 7;

/// One parsed traffic summary line.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSummary {
    pub interface: String,
    pub date: String,
    pub received: String,
    pub transmitted: String,
    pub total: String,
    pub average_speed: String,
}

pub async fn report(config: &BotConfig) -> Result<Report, ReportError> {
    let raw = run_tool("vnstat", &["--oneline"], config.tool_timeout).await?;
    let summary = parse_summary(&raw)?;
    Ok(Report::Text {
        body: truncate_markdown(&render(&summary)),
        mode: ParseMode::Markdown,
    })
}

/// Split the one-line summary on `;` and extract the positional fields.
/// Fewer fields than expected is an error, never an out-of-range access.
pub fn parse_summary(raw: &str) -> Result<TrafficSummary, ReportError> {
    let fields: Vec<&str> = raw.trim().split(';').collect();
    if fields.len() < EXPECTED_FIELDS {
        return Err(ReportError::parse(
            "vnstat",
            format!(
                "expected at least {EXPECTED_FIELDS} fields, got {}",
                fields.len()
            ),
        ));
    }
    Ok(TrafficSummary {
        interface: fields[1].to_string(),
        date: fields[2].to_string(),
        received: fields[3].to_string(),
        transmitted: fields[4].to_string(),
        total: fields[5].to_string(),
        average_speed: fields[6].to_string(),
    })
}

// Field values come from a controlled host tool; the legacy Markdown dialect
// needs no further escaping here.
fn render(summary: &TrafficSummary) -> String {
    format!(
        "\u{1F4F6}  *Network traffic* ({}) on {}:\n\
         \u{2B07}\u{FE0F} Received: {}\n\
         \u{2B06}\u{FE0F} Transmitted: {}\n\
         \u{1F4CA}  Total: {}\n\
         \u{26A1}  Average speed: {}",
        summary.interface,
        summary.date,
        summary.received,
        summary.transmitted,
        summary.total,
        summary.average_speed
    )
}
