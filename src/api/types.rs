use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_util::parse_event_date;
use crate::range::DateRange;

/// One bucket of the attendance trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Bucket label as the server names it (e.g. `"Mar 2024"`).
    pub period: String,
    #[serde(default)]
    pub attendees: u64,
    #[serde(default)]
    pub visitors: u64,
}

/// Attendance over time for the selected window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceTrend {
    pub points: Vec<TrendPoint>,
}

/// Member count for one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentShare {
    pub department: String,
    #[serde(default)]
    pub members: u64,
}

/// Membership split by department. Not bounded by the reporting window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentDistribution {
    pub departments: Vec<DepartmentShare>,
}

/// Headline totals for the selected window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlySummary {
    pub total_events: u64,
    pub total_attendees: u64,
    pub total_visitors: u64,
    pub average_attendance: f64,
}

/// A best-attended event, as ranked by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvent {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_event_date")]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub attendees_count: u64,
}

/// Period-over-period growth, as percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrowthMetrics {
    pub member_growth: f64,
    pub attendance_growth: f64,
    pub visitor_growth: f64,
    pub new_members: u64,
}

/// Lifecycle status of an event on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Upcoming",
            EventStatus::Ongoing => "Ongoing",
            EventStatus::Completed => "Completed",
            EventStatus::Cancelled => "Cancelled",
            EventStatus::Unknown => "Unknown",
        }
    }
}

/// A single fellowship event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// As sent, offset included, so the calendar day matches the wire.
    #[serde(default, deserialize_with = "lenient_event_date")]
    pub date: Option<DateTime<FixedOffset>>,
    pub name: String,
    #[serde(default)]
    pub attendees_count: Option<u64>,
    #[serde(default)]
    pub visitors_count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub speakers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// An unreadable date leaves the event undated rather than failing the
/// whole listing.
fn lenient_event_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let parsed = parse_event_date(&s);
        if parsed.is_none() && !s.trim().is_empty() {
            log::warn!("Ignoring unreadable event date {s:?}");
        }
        parsed
    }))
}

/// Response envelope of the event listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsPage {
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Filters for the event listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub limit: u32,
    pub range: DateRange,
    pub status: EventStatus,
}

impl EventQuery {
    /// Completed events in `range`, capped at `limit`.
    pub fn completed(range: DateRange, limit: u32) -> Self {
        Self {
            limit,
            range,
            status: EventStatus::Completed,
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        params.extend(self.range.query_params());
        params.push(("status", self.status.as_str().to_string()));
        params
    }
}
