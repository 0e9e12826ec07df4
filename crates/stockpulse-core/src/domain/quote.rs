use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Ticker, ValidationError};

/// Maximum entries kept in each ranking list.
pub const MAX_RANKED: usize = 8;

/// Top-of-list quote used in rankings and single lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: Ticker,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: u64,
}

impl Quote {
    pub fn new(
        ticker: Ticker,
        price: f64,
        change_amount: f64,
        change_percent: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_finite("change_amount", change_amount)?;
        validate_finite("change_percent", change_percent)?;
        if volume == 0 {
            return Err(ValidationError::NonPositiveValue { field: "volume" });
        }

        Ok(Self {
            ticker,
            price,
            change_amount,
            change_percent,
            volume,
        })
    }
}

/// Where a snapshot's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreshnessLabel {
    Live,
    AfterHours,
    Weekend,
    Cached,
    Simulated,
}

impl FreshnessLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::AfterHours => "after-hours",
            Self::Weekend => "weekend",
            Self::Cached => "cached",
            Self::Simulated => "simulated",
        }
    }
}

impl Display for FreshnessLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranked gainers, losers and most-active quotes for one fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub gainers: Vec<Quote>,
    pub losers: Vec<Quote>,
    pub most_active: Vec<Quote>,
    pub freshness: FreshnessLabel,
}

impl RankingSnapshot {
    /// Sort each list by its ranking criterion and keep the top `limit`.
    pub fn ranked(
        mut gainers: Vec<Quote>,
        mut losers: Vec<Quote>,
        mut most_active: Vec<Quote>,
        freshness: FreshnessLabel,
        limit: usize,
    ) -> Self {
        gainers.sort_by(|left, right| right.change_percent.total_cmp(&left.change_percent));
        gainers.truncate(limit);

        losers.sort_by(|left, right| left.change_percent.total_cmp(&right.change_percent));
        losers.truncate(limit);

        most_active.sort_by(|left, right| right.volume.cmp(&left.volume));
        most_active.truncate(limit);

        Self {
            gainers,
            losers,
            most_active,
            freshness,
        }
    }

    pub fn empty(freshness: FreshnessLabel) -> Self {
        Self {
            gainers: Vec::new(),
            losers: Vec::new(),
            most_active: Vec::new(),
            freshness,
        }
    }

    pub fn with_freshness(mut self, freshness: FreshnessLabel) -> Self {
        self.freshness = freshness;
        self
    }

    /// Every quote across the three lists, in list order.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.gainers
            .iter()
            .chain(self.losers.iter())
            .chain(self.most_active.iter())
    }

    pub fn total_len(&self) -> usize {
        self.gainers.len() + self.losers.len() + self.most_active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Case-insensitive ticker membership across all three lists.
    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        self.quotes()
            .any(|quote| quote.ticker.as_str().eq_ignore_ascii_case(symbol))
    }
}

pub(crate) fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

pub(crate) fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(ticker: &str, change_percent: f64, volume: u64) -> Quote {
        Quote::new(
            Ticker::parse(ticker).expect("ticker"),
            10.0,
            change_percent / 10.0,
            change_percent,
            volume,
        )
        .expect("quote")
    }

    #[test]
    fn rejects_non_positive_price_and_volume() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        assert_eq!(
            Quote::new(ticker.clone(), 0.0, 0.0, 0.0, 10),
            Err(ValidationError::NonPositiveValue { field: "price" })
        );
        assert_eq!(
            Quote::new(ticker.clone(), 1.0, 0.0, 0.0, 0),
            Err(ValidationError::NonPositiveValue { field: "volume" })
        );
        assert_eq!(
            Quote::new(ticker, 1.0, f64::NAN, 0.0, 1),
            Err(ValidationError::NonFiniteValue {
                field: "change_amount"
            })
        );
    }

    #[test]
    fn ranked_orders_and_truncates_each_list() {
        let candidates = (0..12)
            .map(|index| quote(&format!("T{index}"), index as f64 - 6.0, 100 + index))
            .collect::<Vec<_>>();

        let snapshot = RankingSnapshot::ranked(
            candidates.clone(),
            candidates.clone(),
            candidates,
            FreshnessLabel::Simulated,
            MAX_RANKED,
        );

        assert_eq!(snapshot.gainers.len(), MAX_RANKED);
        assert_eq!(snapshot.gainers[0].ticker.as_str(), "T11");
        assert_eq!(snapshot.losers[0].ticker.as_str(), "T0");
        assert_eq!(snapshot.most_active[0].volume, 111);
        assert!(snapshot
            .gainers
            .windows(2)
            .all(|pair| pair[0].change_percent >= pair[1].change_percent));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let snapshot = RankingSnapshot::ranked(
            vec![quote("AAPL", 1.0, 10)],
            Vec::new(),
            Vec::new(),
            FreshnessLabel::Live,
            MAX_RANKED,
        );
        assert!(snapshot.contains("aapl"));
        assert!(!snapshot.contains("MSFT"));
    }

    #[test]
    fn freshness_serializes_kebab_case() {
        let value = serde_json::to_value(FreshnessLabel::AfterHours).expect("serialize");
        assert_eq!(value, serde_json::json!("after-hours"));
    }
}
