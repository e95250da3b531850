//! Technical indicators over a daily bar series.
//!
//! Every function expects bars ordered oldest first (see
//! [`BarSeries::into_chronological`](crate::BarSeries::into_chronological)) and
//! degrades to an empty result instead of failing on short input.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Bar, TradingDate};

/// Number of most recent closes considered by [`support_resistance`].
pub const SUPPORT_RESISTANCE_LOOKBACK: usize = 50;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// One value of an indicator series, dated by the bar it describes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub date: TradingDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub support: f64,
    pub resistance: f64,
}

/// Simple moving average of closes.
///
/// One point per full window of `period` bars, dated by the window's last bar,
/// so the output has `bars.len() - period + 1` points.
pub fn sma(bars: &[Bar], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let divisor = period as f64;
    bars.windows(period)
        .map(|window| IndicatorPoint {
            date: window[period - 1].date,
            value: window.iter().map(|bar| bar.close).sum::<f64>() / divisor,
        })
        .collect()
}

/// Relative strength index using plain (unsmoothed) averages of gains and losses.
///
/// For each `i` in `period..gains.len()` the window is `gains[i - period..i]`
/// and the point is dated by bar `i`, the bar whose change closes the window.
/// A window without losses reads exactly 100.
pub fn rsi(bars: &[Bar], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || bars.len() < 2 {
        return Vec::new();
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = bars
        .windows(2)
        .map(|pair| {
            let change = pair[1].close - pair[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let divisor = period as f64;
    (period..gains.len())
        .map(|i| {
            let avg_gain = gains[i - period..i].iter().sum::<f64>() / divisor;
            let avg_loss = losses[i - period..i].iter().sum::<f64>() / divisor;
            let value = if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            };
            IndicatorPoint {
                date: bars[i].date,
                value,
            }
        })
        .collect()
}

/// Percentile band over the last [`SUPPORT_RESISTANCE_LOOKBACK`] closes.
///
/// Support is the 10th and resistance the 90th percentile (`floor(n * p)` into the
/// sorted closes). This is a static band, not a search for local extrema.
pub fn support_resistance(bars: &[Bar]) -> Option<PriceLevels> {
    let recent = &bars[bars.len().saturating_sub(SUPPORT_RESISTANCE_LOOKBACK)..];
    if recent.is_empty() {
        return None;
    }

    let mut closes = recent.iter().map(|bar| bar.close).collect::<Vec<_>>();
    closes.sort_by(f64::total_cmp);

    let n = closes.len();
    let support = closes[n / 10];
    let resistance = closes[(n * 9 / 10).min(n - 1)];
    Some(PriceLevels {
        support,
        resistance,
    })
}

/// Metrics the dashboard grades with a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Year-over-year revenue growth as a fraction.
    RevenueGrowth,
    TrailingPe,
    PriceToSales,
    /// Dividend yield as a fraction.
    DividendYield,
    Rsi,
}

impl Metric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RevenueGrowth => "revenue_growth",
            Self::TrailingPe => "trailing_pe",
            Self::PriceToSales => "price_to_sales",
            Self::DividendYield => "dividend_yield",
            Self::Rsi => "rsi",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub level: Level,
    pub tier: Tier,
}

impl Badge {
    pub const fn new(level: Level, tier: Tier) -> Self {
        Self { level, tier }
    }

    const fn positive(tier: Tier) -> Self {
        Self::new(Level::Positive, tier)
    }

    const fn negative(tier: Tier) -> Self {
        Self::new(Level::Negative, tier)
    }

    const fn neutral() -> Self {
        Self::new(Level::Neutral, Tier::Weak)
    }
}

/// Grades a metric value. Non-finite values have no badge.
pub fn classify(metric: Metric, value: f64) -> Option<Badge> {
    if !value.is_finite() {
        return None;
    }

    let badge = match metric {
        Metric::RevenueGrowth => match value {
            v if v >= 0.20 => Badge::positive(Tier::Strong),
            v if v >= 0.10 => Badge::positive(Tier::Moderate),
            v if v >= 0.0 => Badge::neutral(),
            v if v <= -0.10 => Badge::negative(Tier::Strong),
            _ => Badge::negative(Tier::Moderate),
        },
        // Zero or negative earnings make the ratio meaningless.
        Metric::TrailingPe => match value {
            v if v <= 0.0 => Badge::negative(Tier::Strong),
            v if v < 15.0 => Badge::positive(Tier::Strong),
            v if v < 25.0 => Badge::positive(Tier::Moderate),
            v if v < 40.0 => Badge::neutral(),
            _ => Badge::negative(Tier::Moderate),
        },
        Metric::PriceToSales => match value {
            v if v < 0.0 => Badge::negative(Tier::Strong),
            v if v < 1.0 => Badge::positive(Tier::Strong),
            v if v < 3.0 => Badge::positive(Tier::Moderate),
            v if v < 8.0 => Badge::neutral(),
            _ => Badge::negative(Tier::Moderate),
        },
        Metric::DividendYield => match value {
            v if v < 0.0 => Badge::negative(Tier::Strong),
            v if v >= 0.04 => Badge::positive(Tier::Strong),
            v if v >= 0.02 => Badge::positive(Tier::Moderate),
            _ => Badge::neutral(),
        },
        Metric::Rsi => match value {
            v if v <= RSI_OVERSOLD => Badge::positive(Tier::Strong),
            v if v >= RSI_OVERBOUGHT => Badge::negative(Tier::Strong),
            _ => Badge::neutral(),
        },
    };

    Some(badge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = TradingDate::from_ymd(2024, 1, 1).expect("valid date");
        closes
            .iter()
            .enumerate()
            .map(|(offset, &close)| {
                let date = start.saturating_add_days(u32::try_from(offset).expect("small offset"));
                Bar::new(date, close, close, close, close, None, 1_000).expect("valid bar")
            })
            .collect()
    }

    #[test]
    fn sma_over_ten_to_twenty() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0]);

        let points = sma(&bars, 5);

        assert_eq!(points.len(), 7);
        assert_eq!(points[0].value, 12.0);
        assert_eq!(points[0].date, bars[4].date);
        assert_eq!(points[6].value, 18.0);
        assert_eq!(points[6].date, bars[10].date);
    }

    #[test]
    fn short_input_and_zero_period_are_empty() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        assert!(sma(&bars, 4).is_empty());
        assert!(sma(&bars, 0).is_empty());
        assert!(rsi(&bars, 3).is_empty());
        assert!(rsi(&bars, 0).is_empty());
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_length_and_dates() {
        let bars = bars_from_closes(&[44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1]);

        let points = rsi(&bars, 3);

        assert_eq!(points.len(), bars.len() - 3 - 1);
        // First window is gains[0..3], which closes on bar 3.
        assert_eq!(points[0].date, bars[3].date);
        assert!(points.iter().all(|p| (0.0..=100.0).contains(&p.value)));
    }

    #[test]
    fn rsi_saturates_at_one_hundred_without_losses() {
        let bars = bars_from_closes(&[1.0, 2.0, 2.0, 3.0, 5.0, 8.0, 13.0]);
        let points = rsi(&bars, 3);
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.value == 100.0));
    }

    #[test]
    fn rsi_is_zero_without_gains() {
        let bars = bars_from_closes(&[9.0, 8.0, 7.0, 6.0, 5.0]);
        let points = rsi(&bars, 2);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn rsi_balanced_window_is_fifty() {
        let bars = bars_from_closes(&[10.0, 11.0, 10.0, 11.0]);
        let points = rsi(&bars, 2);
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn support_resistance_uses_percentile_indices() {
        let closes = (1..=20).map(f64::from).rev().collect::<Vec<_>>();
        let bars = bars_from_closes(&closes);

        let levels = support_resistance(&bars).expect("non-empty");

        // sorted = 1..=20, floor(20 * 0.1) = 2, floor(20 * 0.9) = 18.
        assert_eq!(levels.support, 3.0);
        assert_eq!(levels.resistance, 19.0);
    }

    #[test]
    fn support_resistance_only_looks_at_last_fifty_closes() {
        let mut closes = vec![1_000.0; 30];
        closes.extend((0..50).map(|i| 100.0 + f64::from(i)));
        let bars = bars_from_closes(&closes);

        let levels = support_resistance(&bars).expect("non-empty");

        assert_eq!(levels.support, 105.0);
        assert_eq!(levels.resistance, 145.0);
    }

    #[test]
    fn support_resistance_on_single_and_empty_series() {
        let bars = bars_from_closes(&[42.0]);
        let levels = support_resistance(&bars).expect("one bar is enough");
        assert_eq!(levels.support, 42.0);
        assert_eq!(levels.resistance, 42.0);
        assert!(support_resistance(&[]).is_none());
    }

    #[test]
    fn classify_thresholds() {
        use Level::*;
        use Tier::*;

        let cases = [
            (Metric::RevenueGrowth, 0.25, Positive, Strong),
            (Metric::RevenueGrowth, 0.10, Positive, Moderate),
            (Metric::RevenueGrowth, 0.0, Neutral, Weak),
            (Metric::RevenueGrowth, -0.05, Negative, Moderate),
            (Metric::RevenueGrowth, -0.10, Negative, Strong),
            (Metric::TrailingPe, 12.0, Positive, Strong),
            (Metric::TrailingPe, 15.0, Positive, Moderate),
            (Metric::TrailingPe, 30.0, Neutral, Weak),
            (Metric::TrailingPe, 40.0, Negative, Moderate),
            (Metric::TrailingPe, -3.0, Negative, Strong),
            (Metric::PriceToSales, 0.8, Positive, Strong),
            (Metric::PriceToSales, 2.0, Positive, Moderate),
            (Metric::PriceToSales, 5.0, Neutral, Weak),
            (Metric::PriceToSales, 8.0, Negative, Moderate),
            (Metric::DividendYield, 0.05, Positive, Strong),
            (Metric::DividendYield, 0.02, Positive, Moderate),
            (Metric::DividendYield, 0.01, Neutral, Weak),
            (Metric::DividendYield, 0.0, Neutral, Weak),
            (Metric::Rsi, 30.0, Positive, Strong),
            (Metric::Rsi, 50.0, Neutral, Weak),
            (Metric::Rsi, 70.0, Negative, Strong),
        ];

        for (metric, value, level, tier) in cases {
            assert_eq!(
                classify(metric, value),
                Some(Badge::new(level, tier)),
                "{metric} = {value}"
            );
        }
    }

    #[test]
    fn classify_rejects_non_finite() {
        assert_eq!(classify(Metric::TrailingPe, f64::NAN), None);
        assert_eq!(classify(Metric::Rsi, f64::INFINITY), None);
    }
}
