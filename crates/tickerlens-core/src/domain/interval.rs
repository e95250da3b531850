use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Spacing between history bars. Intraday spacing is not offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Interval {
    /// Yahoo chart `interval` parameter; also the CLI spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Alpha Vantage `function` name and the JSON key holding its bars.
    pub const fn alphavantage_series(self) -> (&'static str, &'static str) {
        match self {
            Self::Daily => ("TIME_SERIES_DAILY", "Time Series (Daily)"),
            Self::Weekly => ("TIME_SERIES_WEEKLY", "Weekly Time Series"),
            Self::Monthly => ("TIME_SERIES_MONTHLY", "Monthly Time Series"),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let interval = match lowered.as_str() {
            "1d" | "d" | "day" | "daily" => Self::Daily,
            "1wk" | "1w" | "w" | "week" | "weekly" => Self::Weekly,
            "1mo" | "1m" | "mo" | "month" | "monthly" => Self::Monthly,
            _ => return Err(ValidationError::InvalidInterval { value: lowered }),
        };
        Ok(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_and_long_spellings() {
        assert_eq!("1wk".parse::<Interval>(), Ok(Interval::Weekly));
        assert_eq!(" Monthly ".parse::<Interval>(), Ok(Interval::Monthly));
        assert_eq!(Interval::default().to_string(), "1d");
    }

    #[test]
    fn intraday_spacing_is_rejected() {
        assert_eq!(
            "5m".parse::<Interval>(),
            Err(ValidationError::InvalidInterval {
                value: String::from("5m")
            })
        );
    }

    #[test]
    fn each_interval_maps_to_its_own_alphavantage_series() {
        assert_eq!(Interval::Weekly.alphavantage_series().0, "TIME_SERIES_WEEKLY");
        assert_eq!(Interval::Monthly.alphavantage_series().1, "Monthly Time Series");
    }
}
