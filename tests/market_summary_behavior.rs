//! Market mover aggregation over generated quote pools.

use std::collections::HashSet;

use tickerlens_core::{
    summarize, summarize_with_limit, Quote, Symbol, UtcDateTime, MARKET_LIST_LIMIT,
};

fn quote(symbol: &str, change_percent: Option<f64>, volume: Option<u64>) -> Quote {
    Quote::new(
        Symbol::parse(symbol).expect("valid symbol"),
        Some(50.0),
        change_percent.map(|pct| pct / 2.0),
        change_percent,
        volume,
        "USD",
        UtcDateTime::now(),
    )
    .expect("valid quote")
}

fn random_pool(seed: u64, len: usize) -> Vec<Quote> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..len)
        .map(|index| {
            let change = match rng.u8(0..10) {
                0 => None,
                1 => Some(0.0),
                _ => Some((rng.f64() - 0.5) * 20.0),
            };
            let volume = (rng.u8(0..10) != 0).then(|| rng.u64(0..5_000_000));
            quote(&format!("S{index}"), change, volume)
        })
        .collect()
}

fn symbols(quotes: &[Quote]) -> Vec<&str> {
    quotes.iter().map(|quote| quote.symbol.as_str()).collect()
}

#[test]
fn when_pool_is_random_then_lists_respect_partition_order_and_cap() {
    for seed in 0..40_u64 {
        // Given: a pool mixing movers, flat quotes and incomplete quotes
        let pool = random_pool(seed, 5 + (seed as usize * 3) % 40);
        let eligible = pool
            .iter()
            .filter(|quote| quote.change_percent.is_some() && quote.volume.is_some())
            .map(|quote| quote.symbol.as_str())
            .collect::<HashSet<_>>();

        // When: the pool is summarized
        let summary = summarize(&pool);

        // Then: every list is capped and drawn only from complete quotes
        for list in [&summary.gainers, &summary.losers, &summary.actives] {
            assert!(list.len() <= MARKET_LIST_LIMIT, "seed {seed}");
            assert!(symbols(list).iter().all(|symbol| eligible.contains(symbol)));
        }

        // Then: gainers and losers never share a quote
        let gainers = symbols(&summary.gainers).into_iter().collect::<HashSet<_>>();
        assert!(symbols(&summary.losers)
            .iter()
            .all(|symbol| !gainers.contains(symbol)));

        // Then: each list is ordered by its ranking key
        let pcts = |list: &[Quote]| {
            list.iter()
                .filter_map(|quote| quote.change_percent)
                .collect::<Vec<_>>()
        };
        assert!(pcts(&summary.gainers).iter().all(|pct| *pct > 0.0));
        assert!(pcts(&summary.losers).iter().all(|pct| *pct < 0.0));
        assert!(pcts(&summary.gainers).windows(2).all(|pair| pair[0] >= pair[1]));
        assert!(pcts(&summary.losers).windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(summary
            .actives
            .windows(2)
            .all(|pair| pair[0].volume >= pair[1].volume));

        // Then: actives are full whenever enough quotes qualify
        assert_eq!(
            summary.actives.len(),
            eligible.len().min(MARKET_LIST_LIMIT),
            "seed {seed}"
        );
    }
}

#[test]
fn when_a_gainer_outranks_the_cut_then_it_replaces_the_weakest_entry() {
    // Given: twelve gainers from +1% to +12%
    let quotes = (1..=12)
        .map(|pct| quote(&format!("G{pct}"), Some(f64::from(pct)), Some(1_000)))
        .collect::<Vec<_>>();

    // When
    let summary = summarize(&quotes);

    // Then: the top ten run from +12% down to +3%
    let expected = (3..=12).rev().map(|pct| format!("G{pct}")).collect::<Vec<_>>();
    assert_eq!(symbols(&summary.gainers), expected);
}

#[test]
fn when_change_percent_is_nan_then_quote_is_only_ranked_by_volume() {
    let mut unknown = quote("NAN", Some(1.0), Some(9_000_000));
    unknown.change_percent = Some(f64::NAN);
    let quotes = vec![
        unknown,
        quote("UP", Some(2.0), Some(10)),
        quote("DOWN", Some(-2.0), Some(20)),
    ];

    let summary = summarize(&quotes);

    assert_eq!(symbols(&summary.gainers), vec!["UP"]);
    assert_eq!(symbols(&summary.losers), vec!["DOWN"]);
    assert_eq!(symbols(&summary.actives), vec!["NAN", "DOWN", "UP"]);
}

#[test]
fn when_losses_tie_then_input_order_is_kept() {
    let quotes = vec![
        quote("FIRST", Some(-3.0), Some(5)),
        quote("DEEP", Some(-7.5), Some(5)),
        quote("SECOND", Some(-3.0), Some(5)),
    ];

    let summary = summarize(&quotes);

    assert_eq!(symbols(&summary.losers), vec!["DEEP", "FIRST", "SECOND"]);
    assert_eq!(symbols(&summary.actives), vec!["FIRST", "DEEP", "SECOND"]);
}

#[test]
fn when_a_custom_limit_is_given_then_each_list_is_cut_to_it() {
    let pool = random_pool(99, 60);

    let summary = summarize_with_limit(&pool, 3);

    assert!(summary.gainers.len() <= 3);
    assert!(summary.losers.len() <= 3);
    assert_eq!(summary.actives.len(), 3);
    assert_eq!(summary.gainers, summarize(&pool).gainers[..summary.gainers.len()]);
}

#[test]
fn when_a_limit_above_the_cap_is_given_then_lists_stay_at_ten() {
    let pool = (0..30)
        .map(|i| {
            let pct = f64::from(i) - 14.5;
            quote(&format!("T{i}"), Some(pct), Some(1_000 + i as u64))
        })
        .collect::<Vec<_>>();

    let summary = summarize_with_limit(&pool, 25);

    assert_eq!(summary.gainers.len(), MARKET_LIST_LIMIT);
    assert_eq!(summary.losers.len(), MARKET_LIST_LIMIT);
    assert_eq!(summary.actives.len(), MARKET_LIST_LIMIT);
    assert_eq!(summary, summarize(&pool));
}
