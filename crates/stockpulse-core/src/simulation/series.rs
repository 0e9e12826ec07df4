use time::{Date, Duration};

use crate::simulation::{round_to, symbol_seed, MarketSimulationEngine};
use crate::{ChartPoint, PriceSeries, ValidationError, SERIES_LEN};

const DEFAULT_BASE_PRICE: f64 = 100.0;
const DEFAULT_VOLATILITY: f64 = 0.02;
const MIN_PRICE: f64 = 0.01;

impl MarketSimulationEngine {
    /// Synthesize a 30-day daily history ending at `today` with `base_price`.
    ///
    /// Deterministic for a given symbol, base price and date. The walk runs
    /// backwards from the base so the latest point always equals it.
    pub fn generate_daily_series(
        &self,
        symbol: &str,
        base_price: f64,
        today: Date,
    ) -> Result<PriceSeries, ValidationError> {
        let base_price = if base_price.is_finite() && base_price > 0.0 {
            base_price
        } else {
            DEFAULT_BASE_PRICE
        };
        let volatility = self
            .directory()
            .get(symbol)
            .map_or(DEFAULT_VOLATILITY, |profile| profile.volatility);

        let seed = symbol_seed(symbol).wrapping_add(today.to_julian_day() as u64);
        let mut rng = fastrand::Rng::with_seed(seed);

        let mut prices = vec![base_price; SERIES_LEN];
        for index in (0..SERIES_LEN - 1).rev() {
            let step = (rng.f64() - 0.5) * 2.0 * volatility;
            prices[index] = (prices[index + 1] / (1.0 + step)).max(MIN_PRICE);
        }

        let points = prices
            .into_iter()
            .enumerate()
            .map(|(index, price)| {
                let days_back = (SERIES_LEN - 1 - index) as i64;
                let price = if index == SERIES_LEN - 1 {
                    price
                } else {
                    round_to(price, 2).max(MIN_PRICE)
                };
                ChartPoint::new(today - Duration::days(days_back), price)
            })
            .collect::<Result<Vec<_>, _>>()?;

        PriceSeries::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn series_ends_at_base_price_on_today() {
        let engine = MarketSimulationEngine::default();
        let today = date!(2024 - 04 - 15);
        let series = engine
            .generate_daily_series("AAPL", 187.25, today)
            .expect("series");

        assert_eq!(series.points().len(), SERIES_LEN);
        assert_eq!(series.last().price, 187.25);
        assert_eq!(series.last().date, today);
        assert_eq!(series.points()[0].date, date!(2024 - 03 - 17));
        assert!(series.points().iter().all(|point| point.price > 0.0));
    }

    #[test]
    fn series_is_deterministic() {
        let engine = MarketSimulationEngine::default();
        let today = date!(2024 - 04 - 15);
        let first = engine.generate_daily_series("MSFT", 410.0, today).expect("series");
        let second = engine.generate_daily_series("MSFT", 410.0, today).expect("series");
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_base_price_falls_back() {
        let engine = MarketSimulationEngine::default();
        let series = engine
            .generate_daily_series("UNLISTED", f64::NAN, date!(2024 - 04 - 15))
            .expect("series");
        assert_eq!(series.last().price, DEFAULT_BASE_PRICE);
    }
}
