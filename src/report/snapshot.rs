use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::types::{
    AttendanceTrend, DepartmentDistribution, EventRecord, GrowthMetrics, MonthlySummary, TopEvent,
};
use crate::range::{DateRange, PeriodSelection, RangeParseWarning};

/// The independently fetched pieces of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPart {
    AttendanceTrend,
    DepartmentDistribution,
    MonthlySummary,
    TopEvents,
    GrowthMetrics,
    Events,
}

impl ReportPart {
    pub const ALL: [ReportPart; 6] = [
        ReportPart::AttendanceTrend,
        ReportPart::DepartmentDistribution,
        ReportPart::MonthlySummary,
        ReportPart::TopEvents,
        ReportPart::GrowthMetrics,
        ReportPart::Events,
    ];
}

impl std::fmt::Display for ReportPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportPart::AttendanceTrend => "attendance trend",
            ReportPart::DepartmentDistribution => "department distribution",
            ReportPart::MonthlySummary => "monthly summary",
            ReportPart::TopEvents => "top events",
            ReportPart::GrowthMetrics => "growth metrics",
            ReportPart::Events => "completed events",
        };
        f.write_str(name)
    }
}

/// The aggregate reports fetched alongside the event list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReports {
    pub attendance_trend: AttendanceTrend,
    pub department_distribution: DepartmentDistribution,
    pub monthly_summary: MonthlySummary,
    pub top_events: Vec<TopEvent>,
    pub growth_metrics: GrowthMetrics,
}

/// One completed report-generation cycle. Built once, never patched;
/// regenerating produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    period: PeriodSelection,
    range: DateRange,
    warnings: Vec<RangeParseWarning>,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    reports: AggregateReports,
    events: Vec<EventRecord>,
}

impl ReportSnapshot {
    /// Assemble a snapshot. `events` are sorted most recent first.
    pub fn new(
        period: PeriodSelection,
        range: DateRange,
        warnings: Vec<RangeParseWarning>,
        generated_at: DateTime<Utc>,
        reports: AggregateReports,
        mut events: Vec<EventRecord>,
    ) -> Self {
        sort_events_desc(&mut events);
        Self {
            period,
            range,
            warnings,
            generated_at,
            reports,
            events,
        }
    }

    pub fn period(&self) -> PeriodSelection {
        self.period
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn warnings(&self) -> &[RangeParseWarning] {
        &self.warnings
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn reports(&self) -> &AggregateReports {
        &self.reports
    }

    /// Completed events in range, most recent first.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }
}

/// Sort events by date, most recent first. Stable, so events sharing a
/// timestamp keep their incoming order. Undated events go last.
pub fn sort_events_desc(events: &mut [EventRecord]) {
    events.sort_by(|a, b| b.date.cmp(&a.date));
}
