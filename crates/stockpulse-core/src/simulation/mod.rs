//! # Market Simulation Engine
//!
//! Synthesizes believable gainers, losers and most-active lists from the
//! [`CompanyDirectory`] when no live data is available.
//!
//! A pass is a pure function of the wall-clock time truncated to a 3-minute
//! bucket: one `fastrand::Rng` is seeded from the bucket and threaded through
//! every draw, so repeated calls inside a bucket return identical snapshots.
//!
//! Each symbol is quoted at most once per pass. Gainers and losers claim
//! disjoint symbols, and a most-active entry reuses the quote a symbol
//! already drew for the other lists.

mod fundamentals;
mod params;
mod series;
mod session;

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::directory::{CompanyDirectory, CompanyProfile, Sector};
use crate::{FreshnessLabel, Quote, RankingSnapshot, Ticker, MAX_RANKED};

pub use fundamentals::symbol_seed;
pub use params::{NewsBand, SentimentFactors, SimulationParams};
pub use session::{
    HourWindow, MarketClock, MarketSentiment, NewsEffect, TradingWindow, BUCKET_MILLIS,
};

/// Result of one simulation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedSnapshot {
    pub snapshot: RankingSnapshot,
    pub sentiment: MarketSentiment,
    pub news: NewsEffect,
    pub clock: MarketClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Either,
}

/// Per-pass context shared by every quote draw.
struct PassContext {
    clock: MarketClock,
    window: TradingWindow,
    sentiment: MarketSentiment,
    news: NewsEffect,
}

/// Deterministic generator of ranking snapshots, overviews and price series.
#[derive(Debug, Clone)]
pub struct MarketSimulationEngine {
    directory: Arc<CompanyDirectory>,
    params: Arc<SimulationParams>,
}

impl Default for MarketSimulationEngine {
    fn default() -> Self {
        Self::new(CompanyDirectory::builtin())
    }
}

impl MarketSimulationEngine {
    pub fn new(directory: Arc<CompanyDirectory>) -> Self {
        Self {
            directory,
            params: Arc::new(SimulationParams::default()),
        }
    }

    pub fn with_params(mut self, params: SimulationParams) -> Self {
        self.params = Arc::new(params);
        self
    }

    pub fn directory(&self) -> &CompanyDirectory {
        &self.directory
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Generate the snapshot for the bucket containing `now`.
    ///
    /// Calendar fields are read in `now`'s own offset; callers convert to the
    /// market's offset first.
    pub fn generate_snapshot(&self, now: OffsetDateTime) -> SimulatedSnapshot {
        let clock = MarketClock::at(now);
        let mut rng = fastrand::Rng::with_seed(clock.seed());

        let sentiment = MarketSentiment::classify(clock.day_of_year, clock.hour, clock.minute);
        let news = NewsEffect::draw(&mut rng, clock.hour, &self.params.news_bands);
        let context = PassContext {
            clock,
            window: TradingWindow::at(&clock),
            sentiment,
            news,
        };

        let gainer_pool = self.pool(|profile| favours_gain(news, sentiment, profile));
        let loser_pool = self.pool(|profile| favours_loss(news, sentiment, profile));
        let active_pool = self.pool(|profile| {
            self.params.is_mega_cap(&profile.symbol)
                || profile.sector == Sector::Fund
                || profile.volatility >= self.params.high_volatility
                || (news != NewsEffect::None && favours_gain(news, sentiment, profile))
        });

        let hour = usize::from(clock.hour);
        let minute = usize::from(clock.minute);
        let mut claimed = HashSet::new();
        let gainer_candidates = self.candidates(&gainer_pool, hour * 3 + minute / 10, &claimed);
        claimed.extend(gainer_candidates.iter().map(|profile| profile.symbol.as_str()));
        let loser_candidates = self.candidates(&loser_pool, hour * 5 + minute / 15, &claimed);
        let active_candidates =
            self.candidates(&active_pool, hour * 2 + minute / 20, &HashSet::new());

        let mut drawn = HashMap::new();
        let gainers =
            self.draw_quotes(&gainer_candidates, Direction::Up, &context, &mut rng, &mut drawn);
        let losers =
            self.draw_quotes(&loser_candidates, Direction::Down, &context, &mut rng, &mut drawn);
        let most_active = self.draw_quotes(
            &active_candidates,
            Direction::Either,
            &context,
            &mut rng,
            &mut drawn,
        );

        tracing::debug!(
            sentiment = sentiment.as_str(),
            news = ?news,
            bucket = clock.bucket_start_millis,
            "generated simulated snapshot"
        );

        SimulatedSnapshot {
            snapshot: RankingSnapshot::ranked(
                gainers,
                losers,
                most_active,
                FreshnessLabel::Simulated,
                MAX_RANKED,
            ),
            sentiment,
            news,
            clock,
        }
    }

    fn pool<F>(&self, include: F) -> Vec<&CompanyProfile>
    where
        F: Fn(&CompanyProfile) -> bool,
    {
        self.directory
            .profiles()
            .iter()
            .filter(|profile| include(*profile))
            .collect()
    }

    /// Rotate `pool` by `offset`, take the candidate count, then top up from
    /// the whole directory when the themed pool is too thin. Symbols in
    /// `claimed` are never picked.
    fn candidates<'a>(
        &'a self,
        pool: &[&'a CompanyProfile],
        offset: usize,
        claimed: &HashSet<&str>,
    ) -> Vec<&'a CompanyProfile> {
        let wanted = self.params.candidates_per_list;
        let mut picked: Vec<&CompanyProfile> = Vec::with_capacity(wanted);

        if !pool.is_empty() {
            let start = offset % pool.len();
            picked.extend(
                pool.iter()
                    .cycle()
                    .skip(start)
                    .take(pool.len())
                    .filter(|profile| !claimed.contains(profile.symbol.as_str()))
                    .take(wanted),
            );
        }

        for profile in self.directory.profiles() {
            if picked.len() >= wanted {
                break;
            }
            if !claimed.contains(profile.symbol.as_str())
                && !picked.iter().any(|existing| existing.symbol == profile.symbol)
            {
                picked.push(profile);
            }
        }

        picked
    }

    /// Quote every candidate, reusing any quote already drawn this pass.
    fn draw_quotes(
        &self,
        candidates: &[&CompanyProfile],
        direction: Direction,
        context: &PassContext,
        rng: &mut fastrand::Rng,
        drawn: &mut HashMap<String, Quote>,
    ) -> Vec<Quote> {
        let mut quotes = Vec::with_capacity(candidates.len());
        for profile in candidates {
            if let Some(quote) = drawn.get(&profile.symbol) {
                quotes.push(quote.clone());
                continue;
            }
            if let Some(quote) = self.draw_quote(profile, direction, context, rng) {
                drawn.insert(profile.symbol.clone(), quote.clone());
                quotes.push(quote);
            }
        }
        quotes
    }

    fn draw_quote(
        &self,
        profile: &CompanyProfile,
        direction: Direction,
        context: &PassContext,
        rng: &mut fastrand::Rng,
    ) -> Option<Quote> {
        let params = &self.params;
        let price = self.draw_price(profile, context, rng);

        let (low, high) = params.base_change_percent;
        let magnitude = (low + rng.f64() * (high - low))
            * (profile.volatility / params.reference_volatility).clamp(0.5, 2.5)
            * params.momentum_at(context.clock.minute_of_day());

        let rising = match direction {
            Direction::Up => true,
            Direction::Down => false,
            Direction::Either => {
                let bias = match context.sentiment {
                    MarketSentiment::Bullish => 0.65,
                    MarketSentiment::Bearish => 0.35,
                    _ => 0.5,
                };
                rng.f64() < bias
            }
        };

        let percent = if rising {
            let tilt = if favours_gain(context.news, context.sentiment, profile)
                && context.news != NewsEffect::None
            {
                params.news_boost
            } else {
                1.0
            };
            (magnitude * tilt * params.gain_factors.get(context.sentiment))
                .min(params.max_change_percent)
                .max(0.01)
        } else {
            let tilt = if favours_loss(context.news, context.sentiment, profile)
                && context.news != NewsEffect::None
            {
                params.news_drag
            } else {
                1.0
            };
            -(magnitude * tilt * params.loss_factors.get(context.sentiment))
                .min(params.max_change_percent)
                .max(0.01)
        };

        let price = round_to(price, 2).max(0.01);
        let percent = round_to(percent, 2);
        let change = round_to(price - price / (1.0 + percent / 100.0), 2);
        let volume = self.draw_volume(profile, context, rng);

        let ticker = Ticker::parse(&profile.symbol).ok()?;
        Quote::new(ticker, price, change, percent, volume).ok()
    }

    fn draw_price(&self, profile: &CompanyProfile, context: &PassContext, rng: &mut fastrand::Rng) -> f64 {
        let (min, max) = (profile.min_price, profile.max_price);
        let base = min + rng.f64() * (max - min);
        let intraday = (TAU * context.clock.day_progress()).sin()
            * profile.volatility
            * context.window.volatility_factor()
            * base;
        let noise = (rng.f64() - 0.5) * 2.0 * self.params.price_noise * base;

        (base + intraday + noise).clamp(min, max).max(0.01)
    }

    fn draw_volume(&self, profile: &CompanyProfile, context: &PassContext, rng: &mut fastrand::Rng) -> u64 {
        let params = &self.params;
        let (low, high) = if params.is_mega_cap(&profile.symbol) {
            params.mega_cap_volume
        } else {
            params.regular_volume
        };
        let baseline = rng.u64(low..=high.max(low)) as f64;
        let micro = 1.0
            + params.volume_micro_amplitude * (f64::from(context.clock.minute) * 0.7).sin();

        let volume = baseline
            * context.window.volume_factor()
            * params.volume_factors.get(context.sentiment)
            * micro;

        (volume.round() as u64).max(1)
    }
}

/// Whether the news/sentiment mix pushes `profile` onto the gainers list.
fn favours_gain(news: NewsEffect, sentiment: MarketSentiment, profile: &CompanyProfile) -> bool {
    match news {
        NewsEffect::TechBreakthrough => profile.is_tech,
        NewsEffect::EarningsBeat => {
            profile.is_tech
                || matches!(
                    profile.sector,
                    Sector::ConsumerDiscretionary | Sector::Communication
                )
        }
        NewsEffect::FedAnnouncement => profile.sector.is_rate_sensitive(),
        NewsEffect::SectorRotation => profile.sector.is_cyclical(),
        NewsEffect::None => match sentiment {
            MarketSentiment::Bullish => {
                profile.is_tech || profile.sector == Sector::ConsumerDiscretionary
            }
            MarketSentiment::Bearish => {
                profile.sector.is_defensive() || profile.sector == Sector::Energy
            }
            MarketSentiment::Volatile => profile.volatility >= 0.025,
            MarketSentiment::Neutral | MarketSentiment::Weekend | MarketSentiment::AfterHours => {
                true
            }
        },
    }
}

/// Whether the news/sentiment mix pushes `profile` onto the losers list.
fn favours_loss(news: NewsEffect, sentiment: MarketSentiment, profile: &CompanyProfile) -> bool {
    match news {
        NewsEffect::TechBreakthrough => !profile.is_tech && profile.sector != Sector::Fund,
        NewsEffect::EarningsBeat => {
            profile.sector.is_defensive() || profile.sector == Sector::Energy
        }
        NewsEffect::FedAnnouncement => {
            profile.is_tech || profile.sector == Sector::ConsumerDiscretionary
        }
        NewsEffect::SectorRotation => profile.is_tech,
        NewsEffect::None => match sentiment {
            MarketSentiment::Bullish => profile.sector.is_defensive(),
            MarketSentiment::Bearish => {
                profile.is_tech || profile.sector == Sector::ConsumerDiscretionary
            }
            MarketSentiment::Volatile => profile.volatility >= 0.025,
            MarketSentiment::Neutral | MarketSentiment::Weekend | MarketSentiment::AfterHours => {
                true
            }
        },
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
