//! Deterministic market data served when an adapter has no real transport.
//!
//! Values derive from a hash of the symbol and a per-provider salt, so the same
//! request always yields the same payload and the two providers disagree slightly.

use crate::data_source::{HistoryRequest, QuoteBatch, SearchBatch, SearchRequest};
use crate::{
    AssetClass, Bar, BarSeries, Fundamentals, Instrument, Interval, Quote, SourceError, Symbol,
    UtcDateTime,
};

/// Symbols reported by the offline trending endpoint. `^VIX` has no volume.
const TRENDING_UNIVERSE: [&str; 16] = [
    "AAPL", "MSFT", "NVDA", "TSLA", "AMZN", "META", "GOOGL", "AMD", "NFLX", "INTC", "BA", "DIS",
    "PFE", "F", "T", "^VIX",
];

const CATALOG: [(&str, &str, &str, AssetClass); 10] = [
    ("AAPL", "Apple Inc.", "NASDAQ", AssetClass::Equity),
    ("MSFT", "Microsoft Corporation", "NASDAQ", AssetClass::Equity),
    ("NVDA", "NVIDIA Corporation", "NASDAQ", AssetClass::Equity),
    ("TSLA", "Tesla, Inc.", "NASDAQ", AssetClass::Equity),
    ("AMZN", "Amazon.com, Inc.", "NASDAQ", AssetClass::Equity),
    ("GOOGL", "Alphabet Inc.", "NASDAQ", AssetClass::Equity),
    ("META", "Meta Platforms, Inc.", "NASDAQ", AssetClass::Equity),
    ("SPY", "SPDR S&P 500 ETF Trust", "NYSEArca", AssetClass::Etf),
    ("QQQ", "Invesco QQQ Trust", "NASDAQ", AssetClass::Etf),
    ("^GSPC", "S&P 500", "SNP", AssetClass::Index),
];

/// Offline data generator for one provider.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OfflineMarket {
    salt: u64,
}

impl OfflineMarket {
    pub(crate) const fn new(salt: u64) -> Self {
        Self { salt }
    }

    fn seed(self, symbol: &Symbol) -> u64 {
        symbol_seed(symbol) ^ self.salt
    }

    pub(crate) fn quote(self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let seed = self.seed(symbol);
        let mut rng = fastrand::Rng::with_seed(seed);
        let price = round2(20.0 + (seed % 4_800) as f64 / 10.0);
        let change_percent = round2(rng.f64() * 12.0 - 6.0);
        let change = round2(price * change_percent / (100.0 + change_percent));
        let volume = if symbol.is_index() {
            None
        } else {
            Some(500_000 + rng.u64(0..80_000_000))
        };

        let quote = Quote::new(
            symbol.clone(),
            Some(price),
            Some(change),
            Some(change_percent),
            volume,
            "USD",
            UtcDateTime::now(),
        )?;
        Ok(quote
            .with_name(catalog_name(symbol))
            .with_fundamentals(self.fundamentals(symbol)))
    }

    pub(crate) fn quotes<'s>(
        self,
        symbols: impl IntoIterator<Item = &'s Symbol>,
    ) -> Result<QuoteBatch, SourceError> {
        let quotes = symbols
            .into_iter()
            .map(|symbol| self.quote(symbol))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QuoteBatch { quotes })
    }

    /// Seeded random walk over the weekdays in range, rolled up to the requested interval.
    pub(crate) fn history(self, req: &HistoryRequest) -> Result<BarSeries, SourceError> {
        let seed = self.seed(&req.symbol);
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut close = 20.0 + (seed % 4_800) as f64 / 10.0;
        let mut bars = Vec::new();
        let mut cursor = Some(req.start);

        while let Some(date) = cursor.filter(|date| *date <= req.end) {
            cursor = date.next_day();
            if date.is_weekend() {
                continue;
            }
            let open = close;
            close = (open * (1.0 + (rng.f64() - 0.5) * 0.04)).max(1.0);
            let high = round2(open.max(close) * (1.0 + rng.f64() * 0.01));
            let low = round2(open.min(close) * (1.0 - rng.f64() * 0.01));
            let volume = 1_000_000 + rng.u64(0..40_000_000);
            bars.push(Bar::new(
                date,
                round2(open).clamp(low, high),
                high,
                low,
                round2(close).clamp(low, high),
                None,
                volume,
            )?);
        }

        Ok(BarSeries::new(req.symbol.clone(), Interval::Daily, bars).resample(req.interval))
    }

    pub(crate) fn fundamentals(self, symbol: &Symbol) -> Fundamentals {
        let seed = self.seed(symbol);
        let mut rng = fastrand::Rng::with_seed(seed.rotate_left(17));
        let low = 20.0 + (seed % 4_800) as f64 / 10.0 * 0.7;
        Fundamentals {
            market_cap: Some(5.0e8 + rng.f64() * 3.0e12),
            trailing_pe: Some(round2(5.0 + rng.f64() * 55.0)),
            dividend_yield: Some(round4(rng.f64() * 0.05)),
            beta: Some(round2(0.5 + rng.f64() * 1.5)),
            fifty_two_week_high: Some(round2(low * 1.6)),
            fifty_two_week_low: Some(round2(low)),
            price_to_sales: Some(round2(0.5 + rng.f64() * 12.0)),
            revenue_growth: Some(round4(rng.f64() * 0.5 - 0.15)),
        }
    }

    pub(crate) fn search(self, req: &SearchRequest) -> SearchBatch {
        let query = req.query.to_ascii_lowercase();
        let results = CATALOG
            .iter()
            .filter(|(symbol, name, _, _)| {
                symbol.to_ascii_lowercase().contains(&query)
                    || name.to_ascii_lowercase().contains(&query)
            })
            .filter_map(|(symbol, name, exchange, asset_class)| {
                let symbol = Symbol::parse(symbol).ok()?;
                Some(Instrument::new(
                    symbol,
                    *name,
                    Some((*exchange).to_owned()),
                    *asset_class,
                ))
            })
            .take(req.limit)
            .collect();

        SearchBatch {
            query: req.query.clone(),
            results,
        }
    }

    pub(crate) fn trending(self, limit: usize) -> Result<QuoteBatch, SourceError> {
        let symbols = TRENDING_UNIVERSE
            .iter()
            .filter_map(|symbol| Symbol::parse(symbol).ok())
            .take(limit)
            .collect::<Vec<_>>();
        self.quotes(&symbols)
    }
}

pub(crate) fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(5_381_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn catalog_name(symbol: &Symbol) -> Option<String> {
    CATALOG
        .iter()
        .find(|(ticker, _, _, _)| *ticker == symbol.as_str())
        .map(|(_, name, _, _)| (*name).to_owned())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
