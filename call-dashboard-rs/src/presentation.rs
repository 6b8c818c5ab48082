//! HTML rendering for the homepage and the dashboard.
//!
//! Templates are embedded at compile time; `{{ name }}` placeholders are
//! replaced with rendered fields.

use serde_json::Value;

use crate::aggregation::{DashboardSummary, LocationCount};

const HOMEPAGE_TEMPLATE: &str = include_str!("../templates/homepage.html");
const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.html");

pub fn render_homepage() -> &'static str {
    HOMEPAGE_TEMPLATE
}

pub fn render_dashboard(summary: &DashboardSummary) -> String {
    let fields: [(&str, String); 10] = [
        ("total_calls", summary.total_calls.to_string()),
        ("success_count", summary.success_count.to_string()),
        ("fail_count", summary.fail_count.to_string()),
        ("ongoing_count", summary.ongoing_count.to_string()),
        ("success_rate", format_percent(summary.success_rate)),
        ("negotiation_under_pct", format_percent(summary.negotiation_under_pct)),
        ("pickups", location_rows(&summary.pickups)),
        ("dropoffs", location_rows(&summary.dropoffs)),
        (
            "last5_rates",
            table_rows(summary.last5_rates.iter().map(|pair| {
                [pair.start_rate.to_string(), pair.final_rate.to_string()]
            })),
        ),
        (
            "unsuccessful_reasons",
            table_rows(summary.unsuccessful_reasons.iter().map(|entry| {
                [escape_html(&reason_label(&entry.reason)), entry.count.to_string()]
            })),
        ),
    ];

    fields
        .iter()
        .fold(DASHBOARD_TEMPLATE.to_string(), |page, (name, rendered)| {
            page.replace(&format!("{{{{ {} }}}}", name), rendered)
        })
}

fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Display text for a failure reason; a missing tag shows as `None`.
pub fn reason_label(reason: &Value) -> String {
    match reason {
        Value::Null => "None".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn location_rows(entries: &[LocationCount]) -> String {
    table_rows(
        entries
            .iter()
            .map(|entry| [escape_html(&entry.location), entry.count.to_string()]),
    )
}

fn table_rows(rows: impl Iterator<Item = [String; 2]>) -> String {
    let rendered: Vec<String> = rows
        .map(|[left, right]| format!("    <tr><td>{}</td><td>{}</td></tr>", left, right))
        .collect();

    if rendered.is_empty() {
        "    <tr><td class=\"empty\" colspan=\"2\">No data yet</td></tr>".to_string()
    } else {
        rendered.join("\n")
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            // Keeps event text from forming template placeholders
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
