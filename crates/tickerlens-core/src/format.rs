//! Display strings for dashboard magnitudes.
//!
//! Provider fields arrive as numbers, numeric strings or not at all; [`RawNumber`]
//! covers all three so callers can pass whatever the payload held.

/// A magnitude as received from a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawNumber<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl RawNumber<'_> {
    /// Parsed value; unparsable text is NaN and `Missing` is `None`.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Missing => None,
            Self::Number(value) => Some(value),
            Self::Text(text) => Some(text.trim().parse::<f64>().unwrap_or(f64::NAN)),
        }
    }

    /// The value when it is present, finite and strictly positive.
    fn positive(self) -> Option<f64> {
        self.value()
            .filter(|value| value.is_finite() && *value > 0.0)
    }
}

impl From<f64> for RawNumber<'_> {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for RawNumber<'_> {
    fn from(value: u64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i64> for RawNumber<'_> {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<'a> From<&'a str> for RawNumber<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for RawNumber<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

impl<'a, T> From<Option<T>> for RawNumber<'a>
where
    T: Into<RawNumber<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

const TRILLION: f64 = 1e12;
const BILLION: f64 = 1e9;
const MILLION: f64 = 1e6;
const THOUSAND: f64 = 1e3;

/// `"$2.9T"`, `"$1.5B"`, `"$350.0M"`, `"$950000"`; `"N/A"` when absent, NaN or not positive.
pub fn format_market_cap<'a>(value: impl Into<RawNumber<'a>>) -> String {
    let Some(value) = value.into().positive() else {
        return String::from("N/A");
    };

    if value >= TRILLION {
        format!("${:.1}T", value / TRILLION)
    } else if value >= BILLION {
        format!("${:.1}B", value / BILLION)
    } else if value >= MILLION {
        format!("${:.1}M", value / MILLION)
    } else {
        format!("${value:.0}")
    }
}

/// `"1.2B"`, `"2.5M"`, `"12.3K"`, `"950"`; `"0"` when absent, NaN or not positive.
pub fn format_volume<'a>(value: impl Into<RawNumber<'a>>) -> String {
    let Some(value) = value.into().positive() else {
        return String::from("0");
    };

    if value >= BILLION {
        format!("{:.1}B", value / BILLION)
    } else if value >= MILLION {
        format!("{:.1}M", value / MILLION)
    } else if value >= THOUSAND {
        format!("{:.1}K", value / THOUSAND)
    } else {
        format!("{value:.0}")
    }
}

/// Signed two-decimal percent such as `"+1.23%"`; `"N/A"` when absent or not finite.
pub fn format_percent<'a>(value: impl Into<RawNumber<'a>>) -> String {
    match value.into().value().filter(|v| v.is_finite()) {
        Some(value) if value >= 0.0 => format!("+{value:.2}%"),
        Some(value) => format!("{value:.2}%"),
        None => String::from("N/A"),
    }
}

/// `"$123.45"`; `"N/A"` when absent or not finite.
pub fn format_price<'a>(value: impl Into<RawNumber<'a>>) -> String {
    match value.into().value().filter(|v| v.is_finite()) {
        Some(value) => format!("${value:.2}"),
        None => String::from("N/A"),
    }
}
