//! Application metrics report over a fixed Prometheus query catalog.
//!
//! Every catalog entry is rendered exactly once, in catalog order. A failed
//! or empty query renders as `No data` and never aborts the batch.

use tracing::warn;

use super::{ParseMode, Report, ReportError};
use crate::format::{escape_markdown, truncate_markdown};
use crate::prometheus::{MetricSample, PrometheusClient};

/// One named catalog query.
pub struct MetricDefinition {
    pub key: &'static str,
    pub query: &'static str,
    pub description: &'static str,
}

/// The metric catalog. Insertion order is display order.
pub const CATALOG: &[MetricDefinition] = &[
    MetricDefinition {
        key: "rps",
        query: "rate(http_request_duration_seconds_count[1m])",
        description: "RPS (requests per minute)",
    },
    MetricDefinition {
        key: "avg_response_time",
        query: "rate(http_request_duration_seconds_sum[1m]) / rate(http_request_duration_seconds_count[1m])",
        description: "Average response time (sec.)",
    },
    MetricDefinition {
        key: "5xx_rate",
        query: "sum(rate(http_request_duration_seconds_count{code=~\"5..\"}[1m]))",
        description: "5xx error rate (per sec.)",
    },
    MetricDefinition {
        key: "cpu_usage",
        query: "100 - (avg by (instance) (rate(node_cpu_seconds_total{mode=\"idle\"}[1m])) * 100)",
        description: "CPU usage (%)",
    },
    MetricDefinition {
        key: "memory_usage",
        query: "(1 - node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes) * 100",
        description: "Memory usage (%)",
    },
];

/// Query the whole catalog and render one MarkdownV2 message.
pub async fn report(client: &PrometheusClient) -> Result<Report, ReportError> {
    let mut sections = Vec::with_capacity(CATALOG.len());
    for def in CATALOG {
        let samples = match client.instant_query(def.query).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!("metric query {} failed: {:#}", def.key, e);
                Vec::new()
            }
        };
        sections.push((def, samples));
    }
    Ok(Report::Text {
        body: truncate_markdown(&render(&sections)),
        mode: ParseMode::MarkdownV2,
    })
}

/// Render the per-metric sections. Every dynamic fragment is strict-escaped
/// before interpolation.
fn render(sections: &[(&MetricDefinition, Vec<MetricSample>)]) -> String {
    let mut message = String::from("\u{1F4CA}  *Application metrics:*\n");
    for (def, samples) in sections {
        let desc = escape_markdown(def.description);
        if samples.is_empty() {
            message.push_str(&format!("\n*{desc}*: `No data`"));
        } else {
            message.push_str(&format!("\n*{desc}*:"));
            for sample in samples {
                message.push_str(&format!(
                    "\n  `{}` \u{2192} `{}`",
                    escape_markdown(&sample.instance),
                    escape_markdown(&sample.value)
                ));
            }
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(instance: &str, value: &str) -> MetricSample {
        MetricSample {
            instance: instance.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_every_catalog_entry_renders_once_in_order() {
        let sections: Vec<(&MetricDefinition, Vec<MetricSample>)> = CATALOG
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let samples = if i % 2 == 0 {
                    vec![sample("web-1:9100", "1.5")]
                } else {
                    Vec::new()
                };
                (def, samples)
            })
            .collect();
        let body = render(&sections);

        let mut last_pos = 0;
        for def in CATALOG {
            let needle = escape_markdown(def.description);
            let pos = body[last_pos..]
                .find(&needle)
                .unwrap_or_else(|| panic!("missing section for {}", def.key));
            assert_eq!(
                body.matches(&needle).count(),
                1,
                "{} rendered more than once",
                def.key
            );
            last_pos += pos;
        }
    }

    #[test]
    fn test_empty_result_renders_no_data() {
        let sections = vec![(&CATALOG[0], Vec::new())];
        let body = render(&sections);
        assert!(body.contains("`No data`"));
    }

    #[test]
    fn test_multiple_samples_render_under_one_section() {
        let sections = vec![(
            &CATALOG[3],
            vec![sample("web-1:9100", "12.5"), sample("db-1:9100", "73.0")],
        )];
        let body = render(&sections);
        assert!(body.contains("`web\\-1:9100`"));
        assert!(body.contains("`db\\-1:9100`"));
        assert!(body.contains("`12\\.5`"));
        assert!(body.contains("`73\\.0`"));
    }

    #[test]
    fn test_dynamic_fragments_are_escaped() {
        let sections = vec![(&CATALOG[0], vec![sample("host_a.example", "0.5")])];
        let body = render(&sections);
        assert!(body.contains("host\\_a\\.example"));
        assert!(body.contains("0\\.5"));
        // the description's parentheses are escaped too
        assert!(body.contains("RPS \\(requests per minute\\)"));
    }
}
