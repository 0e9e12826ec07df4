//! Clock bucketing, market sentiment and breaking-news classification.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::simulation::params::NewsBand;

/// Width of a determinism bucket.
pub const BUCKET_MILLIS: i64 = 180_000;
const BUCKET_MINUTES: u8 = 3;

/// Wall-clock time truncated to its 3-minute bucket.
///
/// Every time-derived quantity in a simulation pass reads from this value,
/// so two instants in the same bucket of the same day are indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketClock {
    pub day_of_year: u16,
    pub hour: u8,
    /// Minute truncated down to a multiple of three.
    pub minute: u8,
    /// Start of the bucket in Unix epoch milliseconds.
    pub bucket_start_millis: i64,
}

impl MarketClock {
    /// Bucket `now` using the calendar fields of its own offset.
    pub fn at(now: OffsetDateTime) -> Self {
        let epoch_millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        Self::from_parts(now.ordinal(), now.hour(), now.minute(), epoch_millis)
    }

    pub fn from_parts(day_of_year: u16, hour: u8, minute: u8, epoch_millis: i64) -> Self {
        Self {
            day_of_year,
            hour,
            minute: minute - minute % BUCKET_MINUTES,
            bucket_start_millis: epoch_millis.div_euclid(BUCKET_MILLIS) * BUCKET_MILLIS,
        }
    }

    pub fn daily_seed(&self) -> u64 {
        u64::from(self.day_of_year)
    }

    pub fn micro_seed(&self) -> u64 {
        u64::from(self.hour) * 60 + u64::from(self.minute / BUCKET_MINUTES)
    }

    pub fn intraday_seed(&self) -> u64 {
        self.bucket_start_millis.div_euclid(BUCKET_MILLIS) as u64
    }

    /// Seed for the single generator threaded through one pass.
    pub fn seed(&self) -> u64 {
        self.daily_seed()
            .wrapping_add(self.micro_seed())
            .wrapping_add(self.intraday_seed())
    }

    pub fn minute_of_day(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }

    /// Fraction of the day elapsed, in `[0, 1)`.
    pub fn day_progress(&self) -> f64 {
        f64::from(self.minute_of_day()) / 1_440.0
    }
}

/// Overall market mood for a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
    Volatile,
    Weekend,
    AfterHours,
}

impl MarketSentiment {
    /// Rules are applied in order: outside 09-16 is after hours; the opening
    /// window, noon and the 15:00 hour have fixed moods; everything else
    /// follows a pseudo day-of-week pattern over `day_of_year % 7`.
    pub fn classify(day_of_year: u16, hour: u8, minute: u8) -> Self {
        if !(9..=16).contains(&hour) {
            return Self::AfterHours;
        }

        if hour == 9 && minute < 45 {
            return if day_of_year % 3 == 0 {
                Self::Volatile
            } else {
                Self::Bullish
            };
        }

        if hour == 12 {
            return Self::Neutral;
        }

        if hour == 15 {
            return Self::Volatile;
        }

        match day_of_year % 7 {
            0 | 6 => Self::Weekend,
            1 => Self::Bullish,
            5 => Self::Volatile,
            _ if day_of_year % 3 == 0 => Self::Bearish,
            _ => Self::Bullish,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
            Self::Volatile => "VOLATILE",
            Self::Weekend => "WEEKEND",
            Self::AfterHours => "AFTER_HOURS",
        }
    }
}

impl Display for MarketSentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hour-of-day windows a news band can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourWindow {
    Morning,
    Midday,
    Afternoon,
    Anytime,
}

impl HourWindow {
    pub const fn contains(self, hour: u8) -> bool {
        match self {
            Self::Morning => hour >= 9 && hour <= 11,
            Self::Midday => hour >= 12 && hour <= 13,
            Self::Afternoon => hour >= 14 && hour <= 16,
            Self::Anytime => true,
        }
    }
}

/// Breaking-news event that tilts which names move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsEffect {
    None,
    EarningsBeat,
    FedAnnouncement,
    TechBreakthrough,
    SectorRotation,
}

impl NewsEffect {
    /// Draw once from `rng` and walk `bands` in priority order; the first band
    /// whose window holds `hour` and whose `[lower, upper)` range holds the
    /// roll wins.
    pub fn draw(rng: &mut fastrand::Rng, hour: u8, bands: &[NewsBand]) -> Self {
        let roll = rng.f64();
        bands
            .iter()
            .find(|band| band.window.contains(hour) && roll >= band.lower && roll < band.upper)
            .map_or(Self::None, |band| band.effect)
    }
}

/// Time-of-day regime used for volatility and volume scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingWindow {
    Closed,
    Opening,
    Lunch,
    Closing,
    Regular,
}

impl TradingWindow {
    pub fn at(clock: &MarketClock) -> Self {
        match clock.minute_of_day() {
            570..=629 => Self::Opening,
            720..=779 => Self::Lunch,
            900..=959 => Self::Closing,
            630..=899 => Self::Regular,
            _ => Self::Closed,
        }
    }

    pub const fn volatility_factor(self) -> f64 {
        match self {
            Self::Opening => 1.5,
            Self::Closing => 1.3,
            Self::Lunch => 0.7,
            Self::Regular => 1.0,
            Self::Closed => 0.4,
        }
    }

    pub const fn volume_factor(self) -> f64 {
        match self {
            Self::Opening => 1.8,
            Self::Closing => 1.6,
            Self::Lunch => 0.6,
            Self::Regular => 1.0,
            Self::Closed => 0.2,
        }
    }
}
