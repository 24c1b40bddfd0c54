use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use super::period::PeriodSelection;
use crate::date_util::{
    day_key, first_of_month_before, local_midnight_utc, parse_date_input, to_query_timestamp,
};

/// A concrete reporting window. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Query parameters for API requests; open ends are omitted.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(start) = &self.start {
            params.push(("startDate", to_query_timestamp(start)));
        }
        if let Some(end) = &self.end {
            params.push(("endDate", to_query_timestamp(end)));
        }
        params
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.start.as_ref().map(day_key);
        let end = self.end.as_ref().map(day_key);
        write!(
            f,
            "{} .. {}",
            start.as_deref().unwrap_or("(open)"),
            end.as_deref().unwrap_or("(open)")
        )
    }
}

/// Which end of a custom range a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeBound {
    Start,
    End,
}

/// A custom bound that could not be parsed and was left open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeParseWarning {
    pub bound: RangeBound,
    pub input: String,
}

impl std::fmt::Display for RangeParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let which = match self.bound {
            RangeBound::Start => "start",
            RangeBound::End => "end",
        };
        write!(
            f,
            "could not parse custom {which} date '{}', leaving it unbounded",
            self.input
        )
    }
}

/// The result of resolving a period: the window plus any degraded inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub range: DateRange,
    pub warnings: Vec<RangeParseWarning>,
}

/// Resolve a period against the local clock.
pub fn resolve(
    period: PeriodSelection,
    custom_start: Option<&str>,
    custom_end: Option<&str>,
) -> ResolvedRange {
    resolve_at(period, custom_start, custom_end, &Local::now())
}

/// Resolve a period against an explicit `now`. Month and year starts are
/// taken at local midnight in `now`'s zone.
pub fn resolve_at<Tz: TimeZone>(
    period: PeriodSelection,
    custom_start: Option<&str>,
    custom_end: Option<&str>,
    now: &DateTime<Tz>,
) -> ResolvedRange {
    let tz = now.timezone();
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    if let Some(months) = period.months_back() {
        let start = local_midnight_utc(&tz, first_of_month_before(today, months));
        return ResolvedRange {
            range: DateRange::new(Some(start), Some(now_utc)),
            warnings: Vec::new(),
        };
    }

    match period {
        PeriodSelection::ThisYear => {
            let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("January 1st exists");
            ResolvedRange {
                range: DateRange::new(Some(local_midnight_utc(&tz, jan1)), Some(now_utc)),
                warnings: Vec::new(),
            }
        }
        _ => {
            let mut warnings = Vec::new();
            let start = custom_bound(custom_start, RangeBound::Start, &tz, &mut warnings);
            let end = custom_bound(custom_end, RangeBound::End, &tz, &mut warnings);
            ResolvedRange {
                range: DateRange::new(start, end),
                warnings,
            }
        }
    }
}

fn custom_bound<Tz: TimeZone>(
    input: Option<&str>,
    bound: RangeBound,
    tz: &Tz,
    warnings: &mut Vec<RangeParseWarning>,
) -> Option<DateTime<Utc>> {
    let input = input.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_date_input(input, tz);
    if parsed.is_none() {
        let warning = RangeParseWarning {
            bound,
            input: input.to_string(),
        };
        log::warn!("{warning}");
        warnings.push(warning);
    }
    parsed
}
