use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static RE_LAST_MONTHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:last[-_ ]?)?(\d{1,2})[-_ ]?(?:m|mo|months?)$").unwrap()
});

/// A named reporting window as picked in the period selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodSelection {
    #[default]
    CurrentMonth,
    #[serde(rename = "last-3-months")]
    Last3Months,
    #[serde(rename = "last-6-months")]
    Last6Months,
    ThisYear,
    Custom,
}

impl PeriodSelection {
    pub const ALL: [PeriodSelection; 5] = [
        PeriodSelection::CurrentMonth,
        PeriodSelection::Last3Months,
        PeriodSelection::Last6Months,
        PeriodSelection::ThisYear,
        PeriodSelection::Custom,
    ];

    /// Parse a period selection.
    ///
    /// Supported forms (case-insensitive):
    /// - labels: `Current Month`, `Last 3 Months`, `Last 6 Months`, `This Year`, `Custom`
    /// - keys: `current-month`, `last-3-months`, `last-6-months`, `this-year`, `custom`
    /// - shorthands: `mtd`, `3m`, `6m`, `ytd`
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();

        match normalized.as_str() {
            "current month" | "current-month" | "current_month" | "mtd" | "month" => {
                return Ok(PeriodSelection::CurrentMonth)
            }
            "this year" | "this-year" | "this_year" | "ytd" | "year" => {
                return Ok(PeriodSelection::ThisYear)
            }
            "custom" => return Ok(PeriodSelection::Custom),
            _ => {}
        }

        // "last 3 months", "last-6-months", "3m", "6 months"
        if let Some(caps) = RE_LAST_MONTHS.captures(&normalized) {
            return match &caps[1] {
                "3" => Ok(PeriodSelection::Last3Months),
                "6" => Ok(PeriodSelection::Last6Months),
                n => Err(Error::PeriodParse(format!(
                    "only 3 or 6 month windows are supported, got {n}"
                ))),
            };
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Canonical key used in run history and JSON.
    pub fn to_key(self) -> &'static str {
        match self {
            PeriodSelection::CurrentMonth => "current-month",
            PeriodSelection::Last3Months => "last-3-months",
            PeriodSelection::Last6Months => "last-6-months",
            PeriodSelection::ThisYear => "this-year",
            PeriodSelection::Custom => "custom",
        }
    }

    /// Human label, as shown in the period selector.
    pub fn label(self) -> &'static str {
        match self {
            PeriodSelection::CurrentMonth => "Current Month",
            PeriodSelection::Last3Months => "Last 3 Months",
            PeriodSelection::Last6Months => "Last 6 Months",
            PeriodSelection::ThisYear => "This Year",
            PeriodSelection::Custom => "Custom",
        }
    }

    /// How many whole months before the current one the window starts,
    /// or `None` for windows not anchored on a month.
    pub(crate) fn months_back(self) -> Option<u32> {
        match self {
            PeriodSelection::CurrentMonth => Some(0),
            PeriodSelection::Last3Months => Some(2),
            PeriodSelection::Last6Months => Some(5),
            PeriodSelection::ThisYear | PeriodSelection::Custom => None,
        }
    }
}

impl std::fmt::Display for PeriodSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl std::str::FromStr for PeriodSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PeriodSelection::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(
            PeriodSelection::parse("Current Month").unwrap(),
            PeriodSelection::CurrentMonth
        );
        assert_eq!(
            PeriodSelection::parse("Last 3 Months").unwrap(),
            PeriodSelection::Last3Months
        );
        assert_eq!(
            PeriodSelection::parse("Last 6 Months").unwrap(),
            PeriodSelection::Last6Months
        );
        assert_eq!(
            PeriodSelection::parse("This Year").unwrap(),
            PeriodSelection::ThisYear
        );
        assert_eq!(PeriodSelection::parse("Custom").unwrap(), PeriodSelection::Custom);
    }

    #[test]
    fn test_parse_shorthands() {
        assert_eq!(PeriodSelection::parse("mtd").unwrap(), PeriodSelection::CurrentMonth);
        assert_eq!(PeriodSelection::parse("3m").unwrap(), PeriodSelection::Last3Months);
        assert_eq!(PeriodSelection::parse("6M").unwrap(), PeriodSelection::Last6Months);
        assert_eq!(PeriodSelection::parse(" ytd ").unwrap(), PeriodSelection::ThisYear);
        assert_eq!(
            PeriodSelection::parse("last_6_months").unwrap(),
            PeriodSelection::Last6Months
        );
    }

    #[test]
    fn test_parse_keys_round_trip() {
        for p in PeriodSelection::ALL {
            assert_eq!(PeriodSelection::parse(p.to_key()).unwrap(), p);
            assert_eq!(PeriodSelection::parse(p.label()).unwrap(), p);
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PeriodSelection::parse("garbage").is_err());
        assert!(PeriodSelection::parse("last 4 months").is_err());
        assert!(PeriodSelection::parse("").is_err());
    }

    #[test]
    fn test_serde_uses_keys() {
        let json = serde_json::to_string(&PeriodSelection::Last3Months).unwrap();
        assert_eq!(json, "\"last-3-months\"");
        let back: PeriodSelection = serde_json::from_str("\"this-year\"").unwrap();
        assert_eq!(back, PeriodSelection::ThisYear);
    }
}
