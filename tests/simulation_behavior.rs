//! Behaviour tests for the deterministic market simulation engine.
//!
//! The engine is a pure function of the wall-clock bucket: the same instant
//! always yields the same market, and every generated quote respects the
//! ranking invariants clients rely on.

use std::sync::Arc;

use stockpulse_core::simulation::symbol_seed;
use stockpulse_core::{
    FixedClock, FreshnessLabel, GatewayConfig, InMemoryCacheStore, MarketDataGateway,
    MarketSentiment, MarketSimulationEngine, MAX_RANKED,
};
use stockpulse_tests::ScriptedRemote;
use time::macros::{date, datetime};
use time::{Duration, OffsetDateTime};

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn same_bucket_yields_identical_markets() {
    // Given: two engines and two instants inside one three-minute bucket
    let first = MarketSimulationEngine::default();
    let second = MarketSimulationEngine::default();
    let early = datetime!(2024-03-05 10:30:05 -5);
    let late = datetime!(2024-03-05 10:32:55 -5);

    // When
    let a = first.generate_snapshot(early);
    let b = second.generate_snapshot(late);

    // Then
    assert_eq!(a, b);
    assert_eq!(a.snapshot.freshness, FreshnessLabel::Simulated);
}

#[tokio::test]
async fn offline_gateway_serves_the_engine_market_for_its_clock() {
    // Given: a gateway with no key, pinned to a known instant
    let now = datetime!(2024-03-05 15:31 UTC);
    let gateway = MarketDataGateway::new(
        Arc::new(ScriptedRemote::failing()),
        Arc::new(InMemoryCacheStore::new()),
        GatewayConfig::default(),
    )
    .with_clock(Arc::new(FixedClock::new(now)));

    // When
    let snapshot = gateway.get_snapshot(false).await;

    // Then: identical to a direct engine pass in the market offset
    let expected = MarketSimulationEngine::default()
        .generate_snapshot(now.to_offset(GatewayConfig::default().market_offset))
        .snapshot;
    assert_eq!(snapshot, expected);
}

// =============================================================================
// Sentiment rules
// =============================================================================

#[test]
fn opening_window_mood_depends_on_day_of_year() {
    // Given / When / Then: day 3 at 09:10 is volatile, day 4 is bullish
    assert_eq!(MarketSentiment::classify(3, 9, 10), MarketSentiment::Volatile);
    assert_eq!(MarketSentiment::classify(4, 9, 10), MarketSentiment::Bullish);
}

#[test]
fn fixed_hours_override_the_day_pattern() {
    assert_eq!(MarketSentiment::classify(100, 8, 59), MarketSentiment::AfterHours);
    assert_eq!(MarketSentiment::classify(100, 17, 0), MarketSentiment::AfterHours);
    assert_eq!(MarketSentiment::classify(100, 12, 30), MarketSentiment::Neutral);
    assert_eq!(MarketSentiment::classify(100, 15, 0), MarketSentiment::Volatile);
    assert_eq!(MarketSentiment::classify(7, 11, 0), MarketSentiment::Weekend);
    assert_eq!(MarketSentiment::classify(6, 11, 0), MarketSentiment::Weekend);
}

#[test]
fn snapshot_reports_the_classified_sentiment() {
    let engine = MarketSimulationEngine::default();
    let now = datetime!(2024-01-03 09:10 -5);

    let pass = engine.generate_snapshot(now);

    assert_eq!(pass.clock.day_of_year, 3);
    assert_eq!(pass.sentiment, MarketSentiment::Volatile);
}

// =============================================================================
// Quote invariants across a week of buckets
// =============================================================================

#[test]
fn every_generated_quote_respects_ranking_invariants() {
    // Given: a week of instants, 37 minutes apart, covering every session
    let engine = MarketSimulationEngine::default();
    let limit = engine.params().max_change_percent;
    let start = datetime!(2024-03-04 00:00 -5);

    for step in 0..(7 * 24 * 60 / 37) {
        let now: OffsetDateTime = start + Duration::minutes(37 * step);

        // When
        let snapshot = engine.generate_snapshot(now).snapshot;

        // Then
        assert!(!snapshot.is_empty(), "empty market at {now}");
        for list in [&snapshot.gainers, &snapshot.losers, &snapshot.most_active] {
            assert!(list.len() <= MAX_RANKED);
        }
        for quote in snapshot.quotes() {
            assert!(quote.price > 0.0, "{} price at {now}", quote.ticker);
            assert!(quote.volume > 0, "{} volume at {now}", quote.ticker);
            assert!(quote.change_percent.abs() <= limit, "{} change at {now}", quote.ticker);
        }
        assert!(snapshot.gainers.iter().all(|quote| quote.change_percent > 0.0));
        assert!(snapshot.losers.iter().all(|quote| quote.change_percent < 0.0));
        assert!(snapshot
            .gainers
            .windows(2)
            .all(|pair| pair[0].change_percent >= pair[1].change_percent));
        assert!(snapshot
            .losers
            .windows(2)
            .all(|pair| pair[0].change_percent <= pair[1].change_percent));
        assert!(snapshot
            .most_active
            .windows(2)
            .all(|pair| pair[0].volume >= pair[1].volume));
    }
}

// =============================================================================
// Fundamentals and history
// =============================================================================

#[test]
fn company_overview_is_a_pure_function_of_the_symbol() {
    let engine = MarketSimulationEngine::default();

    let first = engine.generate_company_overview("AAPL").expect("known");
    let again = MarketSimulationEngine::default()
        .generate_company_overview("aapl")
        .expect("known");

    assert_eq!(first, again);
    assert_eq!(first.name, "Apple Inc.");
    assert!(engine.generate_company_overview("ZZZFAKE9").is_none());
}

#[test]
fn funds_carry_no_earnings_multiple() {
    let engine = MarketSimulationEngine::default();

    let spy = engine.generate_company_overview("SPY").expect("known fund");

    assert_eq!(spy.pe_ratio, None);
}

#[test]
fn symbol_seed_ignores_case_and_padding() {
    assert_eq!(symbol_seed("msft"), symbol_seed(" MSFT "));
    assert_ne!(symbol_seed("MSFT"), symbol_seed("AAPL"));
}

#[test]
fn daily_series_is_stable_per_day_and_moves_between_days() {
    let engine = MarketSimulationEngine::default();

    let monday = engine
        .generate_daily_series("NVDA", 120.0, date!(2024 - 03 - 04))
        .expect("series");
    let monday_again = engine
        .generate_daily_series("NVDA", 120.0, date!(2024 - 03 - 04))
        .expect("series");
    let tuesday = engine
        .generate_daily_series("NVDA", 120.0, date!(2024 - 03 - 05))
        .expect("series");

    assert_eq!(monday, monday_again);
    assert_eq!(monday.last().price, 120.0);
    assert_eq!(tuesday.last().price, 120.0);
    assert_ne!(monday.points()[0].price, tuesday.points()[0].price);
}
