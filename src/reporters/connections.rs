//! Active connection report, delivered as a document attachment.
//!
//! Lists current sockets with `ss -tunap`, keeps at most the first 30 data
//! lines, renders them as a fixed-width table, and persists the table to the
//! configured transient file before delivery.

use chrono::Local;
use tokio::sync::Mutex;

use super::{Report, ReportError};
use crate::config::BotConfig;
use crate::execution::run_tool;

/// Row cap per report.
pub const MAX_ROWS: usize = 30;
/// A listing line needs this many whitespace fields to be usable.
const MIN_FIELDS: usize = 6;

/// One parsed line of the socket listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub protocol: String,
    pub state: String,
    pub local_address: String,
    pub peer_address: String,
}

/// Produce the connection report. The transient file is shared between
/// invocations, so the write is serialized on `report_lock`.
pub async fn report(config: &BotConfig, report_lock: &Mutex<()>) -> Result<Report, ReportError> {
    let listing = run_tool("ss", &["-tunap"], config.tool_timeout).await?;
    let records = parse_listing(&listing);
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let body = render(&records, &timestamp);

    {
        let _guard = report_lock.lock().await;
        tokio::fs::write(&config.report_path, &body).await?;
    }

    Ok(Report::Document {
        file_name: "report.txt".to_string(),
        caption: "\u{1F50C}  Active connections".to_string(),
        bytes: body.into_bytes(),
    })
}

/// Parse at most the first `MAX_ROWS` data lines. The header line is
/// skipped; lines with too few fields are dropped, not fatal.
pub fn parse_listing(raw: &str) -> Vec<ConnectionRecord> {
    raw.lines()
        .skip(1)
        .take(MAX_ROWS)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < MIN_FIELDS {
                return None;
            }
            Some(ConnectionRecord {
                protocol: parts[0].to_string(),
                state: parts[1].to_string(),
                local_address: parts[4].to_string(),
                peer_address: parts[5].to_string(),
            })
        })
        .collect()
}

/// Fixed-width table under a timestamped title. The returned text is
/// exactly what goes both to the transient file and the chat.
pub fn render(records: &[ConnectionRecord], timestamp: &str) -> String {
    let mut out = format!("Active connections report - {timestamp}\n");
    out.push_str(&format!(
        "{:<5} {:<12} {:<25} {}\n",
        "Proto", "State", "Local address", "Peer address"
    ));
    out.push_str(&"=".repeat(70));
    out.push('\n');
    let rows: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "{:<5} {:<12} {:<25} {}",
                r.protocol, r.state, r.local_address, r.peer_address
            )
        })
        .collect();
    out.push_str(&rows.join("\n"));
    out
}
