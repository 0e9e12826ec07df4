//! Validity filter applied to every remote quote before it is cached or
//! returned.

use stockpulse_warehouse::CachedStockRecord;

use crate::remote::{RemoteQuote, RemoteRankings};
use crate::{FreshnessLabel, Quote, RankingSnapshot, Ticker};

/// Admit a raw row only if its ticker is well-formed and not reserved, its
/// price is positive and its volume is non-zero.
pub fn admit(raw: &RemoteQuote) -> Option<Quote> {
    let ticker = match Ticker::parse(&raw.symbol) {
        Ok(ticker) => ticker,
        Err(error) => {
            tracing::debug!(symbol = %raw.symbol, %error, "filtered remote quote");
            return None;
        }
    };

    Quote::new(
        ticker,
        raw.price,
        raw.change_amount,
        raw.change_percent,
        raw.volume,
    )
    .map_err(|error| tracing::debug!(symbol = %raw.symbol, %error, "filtered remote quote"))
    .ok()
}

/// Filter each list independently, then rank and truncate.
pub fn filter_rankings(raw: &RemoteRankings, freshness: FreshnessLabel, limit: usize) -> RankingSnapshot {
    let keep = |rows: &[RemoteQuote]| rows.iter().filter_map(admit).collect::<Vec<_>>();
    RankingSnapshot::ranked(
        keep(&raw.gainers),
        keep(&raw.losers),
        keep(&raw.most_active),
        freshness,
        limit,
    )
}

/// Rebuild a ranking from cached rows. Rows that no longer pass the filter
/// are skipped; losers are rows with a negative change.
pub fn snapshot_from_cache(rows: &[CachedStockRecord], freshness: FreshnessLabel, limit: usize) -> RankingSnapshot {
    let quotes = rows
        .iter()
        .filter_map(|row| {
            admit(&RemoteQuote {
                symbol: row.symbol.clone(),
                price: row.price,
                change_amount: row.change,
                change_percent: row.change_percent,
                volume: row.volume,
            })
        })
        .collect::<Vec<_>>();

    let gainers = quotes
        .iter()
        .filter(|quote| quote.change_percent > 0.0)
        .cloned()
        .collect();
    let losers = quotes
        .iter()
        .filter(|quote| quote.change_percent < 0.0)
        .cloned()
        .collect();

    RankingSnapshot::ranked(gainers, losers, quotes, freshness, limit)
}
