//! Rendering of a report snapshot for the screen, for printing, and as JSON.
//!
//! Both the preview and the print document are built from [`EventRow`], so
//! a row reads the same wherever it is shown.

use std::fmt::Write as _;

use tabled::{Table, Tabled};

use super::snapshot::ReportSnapshot;
use crate::api::types::EventRecord;
use crate::date_util::day_key;
use crate::error::Result;

pub const REPORT_TITLE: &str = "Fellowship Report";
pub const PRINT_HEADING: &str =
    "MULTIMEDIA UNIVERSITY REPENTANCE AND HOLINESS STUDENTS FELLOWSHIP REPORT";
pub const ACTIVITIES_HEADING: &str = "Monthly Fellowship Activities";

const PRINT_COLUMNS: [&str; 5] = [
    "DATE",
    "EVENT NAME",
    "NO. OF ATTENDEES",
    "NO. OF VISITORS",
    "THEME VERSE",
];

const MISSING_COUNT: &str = "-";

const PRINT_STYLE: &str = "body{font-family:sans-serif;} \
h2{text-align:center;} \
table{border-collapse:collapse;width:100%;} \
th,td{border:1px solid #ccc;padding:8px;} \
th{background:#f0f0f0;}";

/// An event formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct EventRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Event Name")]
    pub name: String,
    #[tabled(rename = "No. of Attendees")]
    pub attendees: String,
    #[tabled(rename = "No. of Visitors")]
    pub visitors: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl EventRow {
    pub fn from_event(event: &EventRecord) -> Self {
        Self {
            date: event.date.as_ref().map(day_key).unwrap_or_default(),
            name: event.name.clone(),
            attendees: count_cell(event.attendees_count),
            visitors: count_cell(event.visitors_count),
            description: describe(event),
        }
    }

    fn cells(&self) -> [&str; 5] {
        [
            &self.date,
            &self.name,
            &self.attendees,
            &self.visitors,
            &self.description,
        ]
    }
}

fn count_cell(count: Option<u64>) -> String {
    count.map_or_else(|| MISSING_COUNT.to_string(), |n| n.to_string())
}

/// The description, with the speaker appended when one is named.
fn describe(event: &EventRecord) -> String {
    match event.speakers.as_deref().filter(|s| !s.is_empty()) {
        Some(speakers) => format!("{} (Speaker: {speakers})", event.description),
        None => event.description.clone(),
    }
}

/// Rows for every event in the snapshot, in snapshot order.
pub fn event_rows(snapshot: &ReportSnapshot) -> Vec<EventRow> {
    snapshot.events().iter().map(EventRow::from_event).collect()
}

/// Plain-text preview of the report, as shown before printing.
pub fn render_preview(snapshot: &ReportSnapshot) -> String {
    let rows = event_rows(snapshot);
    let mut out = String::new();

    let _ = writeln!(out, "{REPORT_TITLE}");
    let _ = writeln!(
        out,
        "Period: {} ({})",
        snapshot.period().label(),
        snapshot.range()
    );
    for warning in snapshot.warnings() {
        let _ = writeln!(out, "Warning: {warning}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{ACTIVITIES_HEADING}");

    if rows.is_empty() {
        let _ = writeln!(out, "No completed events in this period.");
        return out;
    }

    let count = rows.len();
    let _ = writeln!(out, "{}", Table::new(rows));
    let _ = writeln!(out, "\n{count} events");
    out
}

/// Standalone HTML document for the print window.
pub fn render_print_html(snapshot: &ReportSnapshot) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{REPORT_TITLE}</title><style>{PRINT_STYLE}</style></head><body>"
    );
    let _ = write!(html, "<h2>{PRINT_HEADING}</h2>");
    let _ = write!(html, "<h2>{ACTIVITIES_HEADING}</h2>");
    html.push_str("<table><tr>");
    for column in PRINT_COLUMNS {
        let _ = write!(html, "<th>{column}</th>");
    }
    html.push_str("</tr>");
    for row in event_rows(snapshot) {
        html.push_str("<tr>");
        for cell in row.cells() {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></body></html>\n");
    html
}

/// The whole snapshot as pretty JSON.
pub fn render_json(snapshot: &ReportSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
