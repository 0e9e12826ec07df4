use serde::{Deserialize, Serialize};

use crate::simulation::session::{HourWindow, MarketSentiment, NewsEffect};

/// One disjoint probability band for a news event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewsBand {
    pub effect: NewsEffect,
    pub window: HourWindow,
    pub lower: f64,
    pub upper: f64,
}

/// Multiplier per sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentFactors {
    pub bullish: f64,
    pub bearish: f64,
    pub neutral: f64,
    pub volatile: f64,
    pub weekend: f64,
    pub after_hours: f64,
}

impl SentimentFactors {
    pub const fn get(&self, sentiment: MarketSentiment) -> f64 {
        match sentiment {
            MarketSentiment::Bullish => self.bullish,
            MarketSentiment::Bearish => self.bearish,
            MarketSentiment::Neutral => self.neutral,
            MarketSentiment::Volatile => self.volatile,
            MarketSentiment::Weekend => self.weekend,
            MarketSentiment::AfterHours => self.after_hours,
        }
    }
}

/// Tunable constants of the simulation engine.
///
/// The defaults are calibrated to produce believable intraday movers; tests
/// rely only on the structural guarantees, never on specific numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Checked in order against a single roll; first match wins.
    pub news_bands: Vec<NewsBand>,
    /// Candidates generated per list before ranking trims to the display size.
    pub candidates_per_list: usize,
    /// Uniform range for the unscaled change magnitude, in percent.
    pub base_change_percent: (f64, f64),
    pub max_change_percent: f64,
    /// Half-width of the per-quote price noise as a fraction of price.
    pub price_noise: f64,
    pub gain_factors: SentimentFactors,
    pub loss_factors: SentimentFactors,
    pub volume_factors: SentimentFactors,
    /// Multiplier for names the current news favours on the way up.
    pub news_boost: f64,
    /// Multiplier for names the current news punishes.
    pub news_drag: f64,
    /// `(minute_of_day_start, factor)` steps; must be sorted by start.
    pub momentum_steps: Vec<(u32, f64)>,
    /// Volatility above which a name joins the high-activity pools.
    pub high_volatility: f64,
    /// Reference volatility used to normalize per-name move size.
    pub reference_volatility: f64,
    pub mega_caps: Vec<String>,
    pub mega_cap_volume: (u64, u64),
    pub regular_volume: (u64, u64),
    pub volume_micro_amplitude: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            news_bands: vec![
                NewsBand {
                    effect: NewsEffect::EarningsBeat,
                    window: HourWindow::Morning,
                    lower: 0.0,
                    upper: 0.15,
                },
                NewsBand {
                    effect: NewsEffect::FedAnnouncement,
                    window: HourWindow::Afternoon,
                    lower: 0.15,
                    upper: 0.25,
                },
                NewsBand {
                    effect: NewsEffect::TechBreakthrough,
                    window: HourWindow::Midday,
                    lower: 0.25,
                    upper: 0.33,
                },
                NewsBand {
                    effect: NewsEffect::TechBreakthrough,
                    window: HourWindow::Morning,
                    lower: 0.25,
                    upper: 0.33,
                },
                NewsBand {
                    effect: NewsEffect::SectorRotation,
                    window: HourWindow::Anytime,
                    lower: 0.33,
                    upper: 0.38,
                },
            ],
            candidates_per_list: 12,
            base_change_percent: (0.5, 5.0),
            max_change_percent: 25.0,
            price_noise: 0.004,
            gain_factors: SentimentFactors {
                bullish: 1.4,
                bearish: 0.6,
                neutral: 0.85,
                volatile: 1.7,
                weekend: 0.3,
                after_hours: 0.5,
            },
            loss_factors: SentimentFactors {
                bullish: 0.6,
                bearish: 1.4,
                neutral: 0.85,
                volatile: 1.7,
                weekend: 0.3,
                after_hours: 0.5,
            },
            volume_factors: SentimentFactors {
                bullish: 1.1,
                bearish: 1.2,
                neutral: 0.9,
                volatile: 1.5,
                weekend: 0.3,
                after_hours: 0.4,
            },
            news_boost: 1.8,
            news_drag: 1.5,
            momentum_steps: vec![
                (0, 0.5),
                (570, 1.6),
                (600, 1.25),
                (690, 1.0),
                (720, 0.75),
                (810, 1.0),
                (900, 1.35),
                (960, 0.55),
            ],
            high_volatility: 0.03,
            reference_volatility: 0.02,
            mega_caps: ["AAPL", "MSFT", "TSLA", "NVDA", "AMZN", "SPY", "QQQ"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            mega_cap_volume: (50_000_000, 90_000_000),
            regular_volume: (5_000_000, 25_000_000),
            volume_micro_amplitude: 0.05,
        }
    }
}

impl SimulationParams {
    pub fn is_mega_cap(&self, symbol: &str) -> bool {
        self.mega_caps
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(symbol))
    }

    /// Momentum factor for the step covering `minute_of_day`.
    pub fn momentum_at(&self, minute_of_day: u32) -> f64 {
        self.momentum_steps
            .iter()
            .take_while(|(start, _)| *start <= minute_of_day)
            .last()
            .map_or(1.0, |(_, factor)| *factor)
    }
}
