pub mod api;
pub mod config;
pub mod date_util;
pub mod error;
pub mod range;
pub mod report;
pub mod storage;

pub use api::{ApiClient, ReportSource};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use range::{resolve, resolve_at, DateRange, PeriodSelection, RangeParseWarning, ResolvedRange};
pub use report::{ReportAggregator, ReportPart, ReportPhase, ReportSnapshot, ReportState};
pub use storage::repository::ReportRun;
pub use storage::Database;

use chrono::{DateTime, Local, TimeZone, Utc};

use date_util::to_query_timestamp;
use storage::repository;

/// Main entry point: generates reports, records each run, and holds the
/// current report view state.
pub struct FellowshipReports<S = ApiClient> {
    db: Database,
    aggregator: ReportAggregator<S>,
    state: ReportState,
}

impl FellowshipReports<ApiClient> {
    /// Build an API-backed instance from the configuration stored in `db`
    /// and the environment.
    pub async fn connect(db: Database) -> Result<Self> {
        let config = ClientConfig::load(&db).await?;
        Self::from_config(db, &config)
    }

    pub fn from_config(db: Database, config: &ClientConfig) -> Result<Self> {
        let client = ApiClient::from_config(config)?;
        log::info!("Reporting API at {}", client.base_url());
        let aggregator = ReportAggregator::new(client)
            .with_timeout(config.request_timeout)
            .with_event_limit(config.event_limit);
        Ok(Self::new(db, aggregator))
    }
}

impl<S: ReportSource> FellowshipReports<S> {
    pub fn new(db: Database, aggregator: ReportAggregator<S>) -> Self {
        Self {
            db,
            aggregator,
            state: ReportState::new(),
        }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    /// Generate a report as of the local clock.
    pub async fn generate_report(
        &mut self,
        period: PeriodSelection,
        custom_start: Option<&str>,
        custom_end: Option<&str>,
    ) -> Result<ReportSnapshot> {
        self.generate_report_at(period, custom_start, custom_end, &Local::now())
            .await
    }

    /// Generate a report as of `now`, move the view state to `Ready` or
    /// `Failed`, and record the outcome in the run history. Generation
    /// errors are returned; a history write that fails afterwards is logged
    /// and does not discard the report.
    pub async fn generate_report_at<Tz: TimeZone>(
        &mut self,
        period: PeriodSelection,
        custom_start: Option<&str>,
        custom_end: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<ReportSnapshot> {
        let resolved = resolve_at(period, custom_start, custom_end, now);
        let generated_at = now.with_timezone(&Utc);

        let run_id = self.record_start(period, &resolved.range).await?;
        let ticket = self.state.begin();

        match self.aggregator.assemble(period, resolved, generated_at).await {
            Ok(snapshot) => {
                let event_count = snapshot.events().len() as u64;
                self.state.succeed(ticket, snapshot.clone());
                let recorded = self
                    .db
                    .writer()
                    .call(move |conn| repository::complete_report_run(conn, run_id, event_count))
                    .await;
                if let Err(e) = recorded {
                    log::warn!("Report run {run_id} finished but was not recorded: {e}");
                }
                Ok(snapshot)
            }
            Err(e) => {
                log::error!("Report generation failed: {e}");
                let message = e.to_string();
                self.state.fail(ticket, message.clone());
                let recorded = self
                    .db
                    .writer()
                    .call(move |conn| repository::fail_report_run(conn, run_id, &message))
                    .await;
                if let Err(db_err) = recorded {
                    log::warn!("Failure of report run {run_id} was not recorded: {db_err}");
                }
                Err(e)
            }
        }
    }

    /// Dismiss the current report.
    pub fn close_report(&mut self) {
        self.state.close();
    }

    async fn record_start(&self, period: PeriodSelection, range: &DateRange) -> Result<i64> {
        let key = period.to_key();
        let start = range.start.as_ref().map(to_query_timestamp);
        let end = range.end.as_ref().map(to_query_timestamp);
        let run_id = self
            .db
            .writer()
            .call(move |conn| {
                repository::insert_report_run(conn, key, start.as_deref(), end.as_deref())
            })
            .await?;
        Ok(run_id)
    }

    // ── History ────────────────────────────────────────────────────

    pub async fn history(&self, limit: u32) -> Result<Vec<ReportRun>> {
        let runs = self
            .db
            .reader()
            .call(move |conn| repository::list_report_runs(conn, limit))
            .await?;
        Ok(runs)
    }
}
