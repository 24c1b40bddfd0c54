use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};

use super::snapshot::{sort_events_desc, AggregateReports, ReportPart, ReportSnapshot};
use crate::api::types::{EventQuery, EventRecord, EventStatus};
use crate::api::ReportSource;
use crate::config::{DEFAULT_EVENT_LIMIT, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::range::{resolve_at, PeriodSelection, ResolvedRange};

/// Builds report snapshots from a [`ReportSource`].
pub struct ReportAggregator<S> {
    source: S,
    timeout: Duration,
    event_limit: u32,
}

impl<S: ReportSource> ReportAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: DEFAULT_TIMEOUT,
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }

    /// Bound on the whole fan-out, not on each request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_event_limit(mut self, limit: u32) -> Self {
        self.event_limit = limit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generate a report for `period` as of the local clock.
    pub async fn generate(
        &self,
        period: PeriodSelection,
        custom_start: Option<&str>,
        custom_end: Option<&str>,
    ) -> Result<ReportSnapshot> {
        self.generate_at(period, custom_start, custom_end, &Local::now())
            .await
    }

    /// Generate a report for `period` as of `now`.
    pub async fn generate_at<Tz: TimeZone>(
        &self,
        period: PeriodSelection,
        custom_start: Option<&str>,
        custom_end: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<ReportSnapshot> {
        let resolved = resolve_at(period, custom_start, custom_end, now);
        self.assemble(period, resolved, now.with_timezone(&Utc))
            .await
    }

    /// Fetch every part for an already-resolved range and build the snapshot.
    ///
    /// All six reads run concurrently. The first failure aborts the rest and
    /// no snapshot is produced.
    pub async fn assemble(
        &self,
        period: PeriodSelection,
        resolved: ResolvedRange,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportSnapshot> {
        let range = resolved.range;
        let query = EventQuery::completed(range, self.event_limit);
        let source = &self.source;
        log::info!("Generating {} report for {range}", period.label());

        let fetch_all = async {
            tokio::try_join!(
                fetch(ReportPart::AttendanceTrend, source.attendance_trend(&range)),
                fetch(
                    ReportPart::DepartmentDistribution,
                    source.department_distribution()
                ),
                fetch(ReportPart::MonthlySummary, source.monthly_summary(&range)),
                fetch(ReportPart::TopEvents, source.top_events(&range)),
                fetch(ReportPart::GrowthMetrics, source.growth_metrics(&range)),
                fetch(ReportPart::Events, source.list_events(&query)),
            )
        };
        let (
            attendance_trend,
            department_distribution,
            monthly_summary,
            top_events,
            growth_metrics,
            page,
        ) = tokio::time::timeout(self.timeout, fetch_all)
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let events = completed_events(page.events, self.event_limit);
        log::info!("Report ready: {} completed events", events.len());

        Ok(ReportSnapshot::new(
            period,
            range,
            resolved.warnings,
            generated_at,
            AggregateReports {
                attendance_trend,
                department_distribution,
                monthly_summary,
                top_events,
                growth_metrics,
            },
            events,
        ))
    }
}

async fn fetch<T>(part: ReportPart, request: impl Future<Output = Result<T>>) -> Result<T> {
    request.await.map_err(|e| {
        log::warn!("Fetching {part} failed: {e}");
        Error::aggregation(part, e)
    })
}

/// Keep only completed events, most recent first, capped at `limit`.
/// Records without a status are trusted to match the server-side filter.
fn completed_events(events: Vec<EventRecord>, limit: u32) -> Vec<EventRecord> {
    let received = events.len();
    let mut kept: Vec<EventRecord> = events
        .into_iter()
        .filter(|e| match &e.status {
            Some(EventStatus::Completed) | None => true,
            Some(other) => {
                log::warn!(
                    "Dropping event '{}' with status {} from completed listing",
                    e.name,
                    other.as_str()
                );
                false
            }
        })
        .collect();
    sort_events_desc(&mut kept);
    if kept.len() > limit as usize {
        log::warn!("Server returned {received} events, keeping the first {limit}");
        kept.truncate(limit as usize);
    }
    kept
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::api::types::{
        AttendanceTrend, DepartmentDistribution, DepartmentShare, EventsPage, GrowthMetrics,
        MonthlySummary, TopEvent, TrendPoint,
    };
    use crate::range::DateRange;

    #[derive(Default)]
    struct FakeSource {
        fail: Option<ReportPart>,
        stall: Option<ReportPart>,
        events: Vec<EventRecord>,
        calls: Mutex<Vec<(ReportPart, Option<DateRange>)>>,
        event_query: Mutex<Option<EventQuery>>,
    }

    impl FakeSource {
        async fn hit(&self, part: ReportPart, range: Option<&DateRange>) -> Result<()> {
            self.calls.lock().unwrap().push((part, range.copied()));
            if self.stall == Some(part) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail == Some(part) {
                return Err(Error::Api {
                    status: 503,
                    message: format!("{part} unavailable"),
                });
            }
            Ok(())
        }

        fn range_for(&self, part: ReportPart) -> Option<DateRange> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(p, _)| *p == part)
                .and_then(|(_, r)| *r)
        }
    }

    #[async_trait]
    impl ReportSource for FakeSource {
        async fn attendance_trend(&self, range: &DateRange) -> Result<AttendanceTrend> {
            self.hit(ReportPart::AttendanceTrend, Some(range)).await?;
            Ok(AttendanceTrend {
                points: vec![TrendPoint {
                    period: "Mar 2024".into(),
                    attendees: 80,
                    visitors: 6,
                }],
            })
        }

        async fn department_distribution(&self) -> Result<DepartmentDistribution> {
            self.hit(ReportPart::DepartmentDistribution, None).await?;
            Ok(DepartmentDistribution {
                departments: vec![DepartmentShare {
                    department: "Ushering".into(),
                    members: 14,
                }],
            })
        }

        async fn monthly_summary(&self, range: &DateRange) -> Result<MonthlySummary> {
            self.hit(ReportPart::MonthlySummary, Some(range)).await?;
            Ok(MonthlySummary {
                total_events: 3,
                ..Default::default()
            })
        }

        async fn top_events(&self, range: &DateRange) -> Result<Vec<TopEvent>> {
            self.hit(ReportPart::TopEvents, Some(range)).await?;
            Ok(vec![TopEvent {
                name: "Revival Night".into(),
                date: None,
                attendees_count: 150,
            }])
        }

        async fn growth_metrics(&self, range: &DateRange) -> Result<GrowthMetrics> {
            self.hit(ReportPart::GrowthMetrics, Some(range)).await?;
            Ok(GrowthMetrics {
                member_growth: 4.0,
                ..Default::default()
            })
        }

        async fn list_events(&self, query: &EventQuery) -> Result<EventsPage> {
            *self.event_query.lock().unwrap() = Some(query.clone());
            self.hit(ReportPart::Events, Some(&query.range)).await?;
            Ok(EventsPage {
                events: self.events.clone(),
            })
        }
    }

    fn event(name: &str, day: u32, status: Option<EventStatus>) -> EventRecord {
        EventRecord {
            id: None,
            date: Some(
                Utc.with_ymd_and_hms(2024, 3, day, 18, 0, 0)
                    .unwrap()
                    .fixed_offset(),
            ),
            name: name.to_string(),
            attendees_count: Some(40),
            visitors_count: None,
            description: "Fellowship".into(),
            speakers: None,
            status,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_generate_assembles_all_parts() {
        let source = FakeSource {
            events: vec![
                event("Early", 2, Some(EventStatus::Completed)),
                event("Latest", 14, None),
                event("Middle", 9, Some(EventStatus::Completed)),
            ],
            ..Default::default()
        };
        let aggregator = ReportAggregator::new(source);

        let snapshot = aggregator
            .generate_at(PeriodSelection::CurrentMonth, None, None, &now())
            .await
            .unwrap();

        let expected_range = DateRange::new(
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            Some(now()),
        );
        assert_eq!(*snapshot.range(), expected_range);
        assert_eq!(snapshot.generated_at(), now());
        assert_eq!(snapshot.period(), PeriodSelection::CurrentMonth);

        let names: Vec<&str> = snapshot.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Latest", "Middle", "Early"]);

        let reports = snapshot.reports();
        assert_eq!(reports.attendance_trend.points[0].attendees, 80);
        assert_eq!(reports.department_distribution.departments[0].members, 14);
        assert_eq!(reports.monthly_summary.total_events, 3);
        assert_eq!(reports.top_events[0].name, "Revival Night");
        assert_eq!(reports.growth_metrics.member_growth, 4.0);
    }

    #[tokio::test]
    async fn test_range_reaches_every_part_except_departments() {
        let aggregator = ReportAggregator::new(FakeSource::default()).with_event_limit(250);

        aggregator
            .generate_at(PeriodSelection::Last3Months, None, None, &now())
            .await
            .unwrap();

        let source = aggregator.source();
        let expected = DateRange::new(
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Some(now()),
        );
        assert_eq!(source.calls.lock().unwrap().len(), 6);
        for part in [
            ReportPart::AttendanceTrend,
            ReportPart::MonthlySummary,
            ReportPart::TopEvents,
            ReportPart::GrowthMetrics,
            ReportPart::Events,
        ] {
            assert_eq!(source.range_for(part), Some(expected), "{part}");
        }
        assert_eq!(source.range_for(ReportPart::DepartmentDistribution), None);

        let query = source.event_query.lock().unwrap().clone().unwrap();
        assert_eq!(query, EventQuery::completed(expected, 250));
    }

    #[tokio::test]
    async fn test_any_failed_part_fails_whole_report() {
        for part in ReportPart::ALL {
            let source = FakeSource {
                fail: Some(part),
                events: vec![event("x", 3, None)],
                ..Default::default()
            };
            let aggregator = ReportAggregator::new(source);

            let err = aggregator
                .generate_at(PeriodSelection::ThisYear, None, None, &now())
                .await
                .unwrap_err();
            match err {
                Error::Aggregation { part: failed, source } => {
                    assert_eq!(failed, part);
                    assert!(matches!(*source, Error::Api { status: 503, .. }));
                }
                other => panic!("expected Aggregation error for {part}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_failure() {
        let source = FakeSource {
            stall: Some(ReportPart::GrowthMetrics),
            ..Default::default()
        };
        let aggregator =
            ReportAggregator::new(source).with_timeout(Duration::from_millis(50));

        let err = aggregator
            .generate_at(PeriodSelection::CurrentMonth, None, None, &now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_custom_range_and_warnings_carry_into_snapshot() {
        let aggregator = ReportAggregator::new(FakeSource::default());

        let snapshot = aggregator
            .generate_at(PeriodSelection::Custom, Some("2024-01-10"), Some("soon"), &now())
            .await
            .unwrap();

        assert_eq!(
            *snapshot.range(),
            DateRange::new(Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()), None)
        );
        assert_eq!(snapshot.warnings().len(), 1);
        assert_eq!(snapshot.warnings()[0].input, "soon");
    }

    #[test]
    fn test_completed_events_filters_and_caps() {
        let events = vec![
            event("done", 1, Some(EventStatus::Completed)),
            event("cancelled", 2, Some(EventStatus::Cancelled)),
            event("no status", 3, None),
            event("upcoming", 4, Some(EventStatus::Upcoming)),
            event("done again", 5, Some(EventStatus::Completed)),
        ];
        let kept = completed_events(events.clone(), 1000);
        let names: Vec<&str> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["done again", "no status", "done"]);

        let capped = completed_events(events, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_cap_keeps_most_recent_events() {
        let ascending = vec![
            event("d1", 1, Some(EventStatus::Completed)),
            event("d2", 2, Some(EventStatus::Completed)),
            event("d3", 3, Some(EventStatus::Completed)),
        ];
        let kept = completed_events(ascending, 2);
        let names: Vec<&str> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["d3", "d2"]);
    }
}
