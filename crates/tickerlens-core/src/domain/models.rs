use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, TradingDate, UtcDateTime, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Index,
    Crypto,
    Forex,
    Fund,
    Other,
}

impl AssetClass {
    /// Yahoo `quoteType` (`EQUITY`, `MUTUALFUND`) or Alpha Vantage `type` (`Common Stock`).
    pub fn from_provider_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "equity" | "stock" | "common stock" => Self::Equity,
            "etf" | "exchange traded fund" => Self::Etf,
            "index" => Self::Index,
            "crypto" | "cryptocurrency" => Self::Crypto,
            "forex" | "currency" => Self::Forex,
            "fund" | "mutualfund" | "mutual fund" => Self::Fund,
            _ => Self::Other,
        }
    }
}

/// One row of ticker search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub name: String,
    pub exchange: Option<String>,
    pub asset_class: AssetClass,
}

impl Instrument {
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        exchange: Option<String>,
        asset_class: AssetClass,
    ) -> Self {
        Self {
            symbol,
            name: name.into(),
            exchange,
            asset_class,
        }
    }
}

/// Company metrics shown on the overview page. Yields and growth are fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub revenue_growth: Option<f64>,
}

impl Fundamentals {
    /// Keeps every value already present and takes the rest from `fallback`.
    pub fn merge(self, fallback: Fundamentals) -> Self {
        Self {
            market_cap: self.market_cap.or(fallback.market_cap),
            trailing_pe: self.trailing_pe.or(fallback.trailing_pe),
            dividend_yield: self.dividend_yield.or(fallback.dividend_yield),
            beta: self.beta.or(fallback.beta),
            fifty_two_week_high: self.fifty_two_week_high.or(fallback.fifty_two_week_high),
            fifty_two_week_low: self.fifty_two_week_low.or(fallback.fifty_two_week_low),
            price_to_sales: self.price_to_sales.or(fallback.price_to_sales),
            revenue_growth: self.revenue_growth.or(fallback.revenue_growth),
        }
    }

    /// Drops NaN and infinities, and negatives where a metric cannot be negative.
    pub fn sanitized(self) -> Self {
        let any = |value: Option<f64>| value.filter(|v| v.is_finite());
        let positive = |value: Option<f64>| any(value).filter(|v| *v >= 0.0);
        Self {
            market_cap: positive(self.market_cap),
            trailing_pe: any(self.trailing_pe),
            dividend_yield: positive(self.dividend_yield),
            beta: any(self.beta),
            fifty_two_week_high: positive(self.fifty_two_week_high),
            fifty_two_week_low: positive(self.fifty_two_week_low),
            price_to_sales: any(self.price_to_sales),
            revenue_growth: any(self.revenue_growth),
        }
    }
}

/// Latest market snapshot for a symbol.
///
/// Feeds omit price, change or volume for halted instruments and indices,
/// so each of them is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub currency: String,
    pub as_of: UtcDateTime,
    #[serde(default)]
    pub fundamentals: Fundamentals,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: Option<f64>,
        change: Option<f64>,
        change_percent: Option<f64>,
        volume: Option<u64>,
        currency: impl AsRef<str>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        if let Some(price) = price {
            non_negative("price", price)?;
        }
        finite("change", change)?;
        finite("change_percent", change_percent)?;

        Ok(Self {
            symbol,
            name: None,
            price,
            change,
            change_percent,
            volume,
            currency: validate_currency_code(currency.as_ref())?,
            as_of,
            fundamentals: Fundamentals::default(),
        })
    }

    /// Blank names are treated as missing.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|name| !name.trim().is_empty());
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: Fundamentals) -> Self {
        self.fundamentals = fundamentals.sanitized();
        self
    }
}

/// OHLCV for one period. Resampled bars are dated at the start of their period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl Bar {
    /// Prices must be finite and non-negative with open and close inside `low..=high`.
    /// Without an adjusted close, `close` is used.
    pub fn new(
        date: TradingDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adj_close: Option<f64>,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            non_negative(field, value)?;
        }
        if let Some(adjusted) = adj_close {
            non_negative("adj_close", adjusted)?;
        }
        if low > high {
            return Err(ValidationError::InvalidBarRange);
        }
        let range = low..=high;
        if !range.contains(&open) || !range.contains(&close) {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            adj_close: adj_close.unwrap_or(close),
            volume,
        })
    }

    /// Widens `self` to cover a later bar of the same period.
    fn absorb(&mut self, later: &Bar) {
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
        self.adj_close = later.adj_close;
        self.volume = self.volume.saturating_add(later.volume);
    }
}

/// Bars for one symbol at one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Self {
        Self {
            symbol,
            interval,
            bars,
        }
    }

    /// Stable sort by date, oldest first.
    pub fn into_chronological(mut self) -> Self {
        self.bars.sort_by_key(|bar| bar.date);
        self
    }

    /// Rolls chronological daily bars up into `interval` bars dated at each period start.
    pub fn resample(self, interval: Interval) -> Self {
        if interval == Interval::Daily {
            return Self { interval, ..self };
        }

        let mut rolled: Vec<Bar> = Vec::new();
        for bar in self.bars {
            let period = bar.date.period_start(interval);
            match rolled.last_mut() {
                Some(current) if current.date == period => current.absorb(&bar),
                _ => rolled.push(Bar { date: period, ..bar }),
            }
        }
        Self::new(self.symbol, interval, rolled)
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|bar| bar.close)
    }
}

/// Upper-cases a three-letter ISO 4217 code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        })
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::NonFiniteValue { field }),
        _ => Ok(()),
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    finite(field, Some(value))?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
