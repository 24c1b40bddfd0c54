pub mod client;
pub mod rate_limit;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::range::DateRange;

/// The read operations a report is assembled from.
///
/// Every method is a pure read; implementations must not mutate remote state.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn attendance_trend(&self, range: &DateRange) -> Result<AttendanceTrend>;

    /// Department split is a point-in-time fact and takes no range.
    async fn department_distribution(&self) -> Result<DepartmentDistribution>;

    async fn monthly_summary(&self, range: &DateRange) -> Result<MonthlySummary>;

    async fn top_events(&self, range: &DateRange) -> Result<Vec<TopEvent>>;

    async fn growth_metrics(&self, range: &DateRange) -> Result<GrowthMetrics>;

    async fn list_events(&self, query: &EventQuery) -> Result<EventsPage>;
}
