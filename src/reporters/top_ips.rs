//! Top remote IPs by connection count.
//!
//! A shell pipeline (awk | cut | grep | sort | uniq -c | head) could do all
//! of this in one opaque string. Instead the listing is one bounded `ss`
//! call and the remaining stages (peer extraction, port stripping, IPv4
//! filtering, counting, top-K selection) run in-process so each is
//! independently testable.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::{ParseMode, Report, ReportError};
use crate::config::BotConfig;
use crate::execution::run_tool;
use crate::format::{escape_html, truncate_html};

/// Ranking depth.
pub const MAX_ENTRIES: usize = 10;
/// Peer address column in the `ss -ntu` listing.
const PEER_FIELD: usize = 5;

fn ipv4_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap())
}

pub async fn report(config: &BotConfig) -> Result<Report, ReportError> {
    let listing = run_tool("ss", &["-ntu"], config.tool_timeout).await?;
    let ranked = rank_peers(&listing);
    Ok(Report::Text {
        body: truncate_html(&render(&ranked)),
        mode: ParseMode::Html,
    })
}

/// Pull the peer address field out of each data line of the listing.
pub fn extract_peer_addresses(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(PEER_FIELD))
        .collect()
}

/// Strip the port suffix, keeping the host portion.
pub fn strip_port(addr: &str) -> &str {
    addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(addr)
}

/// Count IPv4 peers and keep the `MAX_ENTRIES` most frequent, ties broken
/// by address for a stable ranking.
pub fn rank_peers(listing: &str) -> Vec<(usize, String)> {
    let pattern = ipv4_pattern();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for addr in extract_peer_addresses(listing) {
        let host = strip_port(addr);
        if pattern.is_match(host) {
            *counts.entry(host.to_string()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(usize, String)> = counts.into_iter().map(|(ip, n)| (n, ip)).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    ranked.truncate(MAX_ENTRIES);
    ranked
}

fn render(ranked: &[(usize, String)]) -> String {
    let content = if ranked.is_empty() {
        "No data".to_string()
    } else {
        ranked
            .iter()
            .map(|(count, ip)| format!("{count:>7} {ip}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "\u{1F310}  <b>Top IP addresses:</b>\n<pre>{}</pre>",
        escape_html(&content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Netid State  Recv-Q Send-Q  Local Address:Port   Peer Address:Port";

    fn listing_with_peers(peers: &[&str]) -> String {
        let mut raw = format!("{HEADER}\n");
        for peer in peers {
            raw.push_str(&format!("tcp   ESTAB  0      0       10.0.0.5:443         {peer}\n"));
        }
        raw
    }

    #[test]
    fn test_ranking_orders_by_count() {
        let mut peers = vec!["1.2.3.4:443"; 5];
        peers.extend(["5.6.7.8:80"; 2]);
        let ranked = rank_peers(&listing_with_peers(&peers));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], (5, "1.2.3.4".to_string()));
        assert_eq!(ranked[1], (2, "5.6.7.8".to_string()));
    }

    #[test]
    fn test_ranking_caps_at_ten_entries() {
        let peers: Vec<String> = (0..14).map(|i| format!("203.0.113.{i}:5000{i}")).collect();
        let refs: Vec<&str> = peers.iter().map(String::as_str).collect();
        assert_eq!(rank_peers(&listing_with_peers(&refs)).len(), MAX_ENTRIES);
    }

    #[test]
    fn test_non_ipv4_peers_are_dropped() {
        let ranked = rank_peers(&listing_with_peers(&[
            "[::1]:8080",
            "*:*",
            "1.2.3.4:443",
        ]));
        assert_eq!(ranked, vec![(1, "1.2.3.4".to_string())]);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("1.2.3.4:443"), "1.2.3.4");
        assert_eq!(strip_port("1.2.3.4"), "1.2.3.4");
    }

    #[test]
    fn test_render_preformatted_block() {
        let body = render(&[(5, "1.2.3.4".to_string()), (2, "5.6.7.8".to_string())]);
        assert!(body.contains("<pre>"));
        assert!(body.contains("      5 1.2.3.4"));
        assert!(body.contains("      2 5.6.7.8"));
        let first = body.find("1.2.3.4").unwrap();
        let second = body.find("5.6.7.8").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_empty_ranking_reports_no_data() {
        assert!(render(&[]).contains("<pre>No data</pre>"));
    }
}
