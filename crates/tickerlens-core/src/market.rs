//! Market movers: top gainers, top losers and most active quotes.

use serde::{Deserialize, Serialize};

use crate::Quote;

/// Maximum entries in each market list.
pub const MARKET_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub gainers: Vec<Quote>,
    pub losers: Vec<Quote>,
    pub actives: Vec<Quote>,
}

/// Quote fields the aggregator ranks on, present only when all three are.
#[derive(Clone, Copy)]
struct Ranked<'a> {
    quote: &'a Quote,
    change_percent: f64,
    volume: u64,
}

impl<'a> Ranked<'a> {
    fn eligible(quote: &'a Quote) -> Option<Self> {
        quote.price?;
        Some(Self {
            quote,
            change_percent: quote.change_percent?,
            volume: quote.volume?,
        })
    }
}

/// Splits quotes into gainers, losers and actives, [`MARKET_LIST_LIMIT`] each.
///
/// Quotes missing a price, change percent or volume are left out of every list.
/// Sorts are stable, so ties keep their input order.
pub fn summarize(quotes: &[Quote]) -> MarketSummary {
    summarize_with_limit(quotes, MARKET_LIST_LIMIT)
}

/// Like [`summarize`] with shorter lists; `limit` never raises a list above [`MARKET_LIST_LIMIT`].
pub fn summarize_with_limit(quotes: &[Quote], limit: usize) -> MarketSummary {
    let limit = limit.min(MARKET_LIST_LIMIT);
    let pool = quotes.iter().filter_map(Ranked::eligible).collect::<Vec<_>>();

    let mut gainers = pool
        .iter()
        .filter(|ranked| ranked.change_percent > 0.0)
        .copied()
        .collect::<Vec<_>>();
    gainers.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));

    let mut losers = pool
        .iter()
        .filter(|ranked| ranked.change_percent < 0.0)
        .copied()
        .collect::<Vec<_>>();
    losers.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));

    let mut actives = pool;
    actives.sort_by(|a, b| b.volume.cmp(&a.volume));

    MarketSummary {
        gainers: take_quotes(gainers, limit),
        losers: take_quotes(losers, limit),
        actives: take_quotes(actives, limit),
    }
}

fn take_quotes(ranked: Vec<Ranked<'_>>, limit: usize) -> Vec<Quote> {
    ranked
        .into_iter()
        .take(limit)
        .map(|ranked| ranked.quote.clone())
        .collect()
}
