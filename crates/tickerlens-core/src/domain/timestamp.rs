use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, UtcOffset, Weekday};

use crate::{Interval, ValidationError};

/// Instant in UTC, serialized as RFC 3339 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Accepts RFC 3339 text whose offset is exactly UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        OffsetDateTime::parse(input, &Rfc3339)
            .ok()
            .filter(|parsed| parsed.offset() == UtcOffset::UTC)
            .map(Self)
            .ok_or_else(|| ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            })
    }

    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp(seconds).ok().map(Self)
    }

    pub fn unix_seconds(self) -> i64 {
        self.0.unix_timestamp()
    }
}

impl fmt::Display for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "@{}", self.0.unix_timestamp()),
        }
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.to_string()
    }
}

/// Calendar day of a trading session, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingDate(Date);

impl TradingDate {
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input.trim(), format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        Month::try_from(month)
            .ok()
            .and_then(|month| Date::from_calendar_date(year, month, day).ok())
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidDate {
                value: format!("{year:04}-{month:02}-{day:02}"),
            })
    }

    /// UTC calendar day of an epoch timestamp. Shift by the exchange offset first for local sessions.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        UtcDateTime::from_unix_seconds(seconds).map(|instant| Self(instant.0.date()))
    }

    /// Epoch seconds at 00:00 UTC.
    pub fn unix_seconds(self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }

    pub fn saturating_add_days(self, days: u32) -> Self {
        Self(
            self.0
                .checked_add(time::Duration::days(i64::from(days)))
                .unwrap_or(Date::MAX),
        )
    }

    pub fn saturating_sub_days(self, days: u32) -> Self {
        Self(
            self.0
                .checked_sub(time::Duration::days(i64::from(days)))
                .unwrap_or(Date::MIN),
        )
    }

    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    /// Whole days from `self` to `later`; negative when `later` comes first.
    pub fn days_until(self, later: Self) -> i64 {
        (later.0 - self.0).whole_days()
    }

    pub fn is_weekend(self) -> bool {
        matches!(self.0.weekday(), Weekday::Saturday | Weekday::Sunday)
    }

    /// First day of the bar this date falls into: itself, its Monday, or the 1st of its month.
    pub fn period_start(self, interval: Interval) -> Self {
        let start = match interval {
            Interval::Daily => Some(self.0),
            Interval::Weekly => self.0.checked_sub(time::Duration::days(i64::from(
                self.0.weekday().number_days_from_monday(),
            ))),
            Interval::Monthly => self.0.replace_day(1).ok(),
        };
        start.map_or(self, Self)
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl TryFrom<String> for TradingDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TradingDate> for String {
    fn from(value: TradingDate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(text: &str) -> TradingDate {
        TradingDate::parse(text).expect("valid date")
    }

    #[test]
    fn utc_timestamps_round_trip_through_json() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("utc");
        assert_eq!(parsed.to_string(), "2024-01-01T00:00:00Z");

        let json = serde_json::to_string(&parsed).expect("serializes");
        assert_eq!(json, "\"2024-01-01T00:00:00Z\"");
        assert_eq!(serde_json::from_str::<UtcDateTime>(&json).expect("parses"), parsed);
    }

    #[test]
    fn offsets_other_than_utc_are_rejected() {
        assert!(matches!(
            UtcDateTime::parse("2024-01-01T01:00:00+01:00"),
            Err(ValidationError::TimestampNotUtc { .. })
        ));
        assert!(serde_json::from_str::<UtcDateTime>("\"yesterday\"").is_err());
    }

    #[test]
    fn dates_parse_and_print_as_iso() {
        assert_eq!(date(" 2024-03-05 ").to_string(), "2024-03-05");
        assert_eq!(date("2024-03-05"), TradingDate::from_ymd(2024, 3, 5).expect("valid"));
        assert!(TradingDate::from_ymd(2023, 2, 29).is_err());
        assert!(matches!(
            TradingDate::parse("02/01/2024"),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn epoch_conversion_uses_utc_midnight() {
        // 2024-01-02T14:30:00Z
        let session = TradingDate::from_unix_seconds(1_704_205_800).expect("in range");
        assert_eq!(session, date("2024-01-02"));
        assert_eq!(session.unix_seconds(), 1_704_153_600);
    }

    #[test]
    fn calendar_helpers() {
        let friday = date("2024-03-08");
        assert!(!friday.is_weekend());
        assert!(date("2024-03-09").is_weekend());
        assert_eq!(friday.next_day(), Some(date("2024-03-09")));
        assert_eq!(date("2024-03-01").days_until(friday), 7);
        assert_eq!(friday.saturating_sub_days(8), date("2024-02-29"));
    }

    #[test]
    fn period_start_snaps_to_monday_or_first_of_month() {
        let thursday = date("2024-02-29");
        assert_eq!(thursday.period_start(Interval::Daily), thursday);
        assert_eq!(thursday.period_start(Interval::Weekly), date("2024-02-26"));
        assert_eq!(thursday.period_start(Interval::Monthly), date("2024-02-01"));
    }
}
