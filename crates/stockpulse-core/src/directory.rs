//! Immutable reference table of the companies the simulation knows about.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Broad market sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Technology,
    Communication,
    ConsumerDiscretionary,
    ConsumerStaples,
    Financials,
    Healthcare,
    Energy,
    Industrials,
    Materials,
    Utilities,
    RealEstate,
    Fund,
}

impl Sector {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Communication => "Communication Services",
            Self::ConsumerDiscretionary => "Consumer Discretionary",
            Self::ConsumerStaples => "Consumer Staples",
            Self::Financials => "Financials",
            Self::Healthcare => "Healthcare",
            Self::Energy => "Energy",
            Self::Industrials => "Industrials",
            Self::Materials => "Materials",
            Self::Utilities => "Utilities",
            Self::RealEstate => "Real Estate",
            Self::Fund => "Exchange Traded Fund",
        }
    }

    /// Industries a synthesized overview may report for this sector.
    pub const fn industries(self) -> &'static [&'static str] {
        match self {
            Self::Technology => &[
                "Semiconductors",
                "Software - Infrastructure",
                "Consumer Electronics",
                "Software - Application",
            ],
            Self::Communication => &["Internet Content & Information", "Entertainment"],
            Self::ConsumerDiscretionary => &["Internet Retail", "Auto Manufacturers", "Restaurants"],
            Self::ConsumerStaples => &["Discount Stores", "Beverages - Non-Alcoholic", "Household Products"],
            Self::Financials => &["Banks - Diversified", "Credit Services", "Asset Management"],
            Self::Healthcare => &["Drug Manufacturers", "Healthcare Plans", "Medical Devices"],
            Self::Energy => &["Oil & Gas Integrated", "Oil & Gas E&P"],
            Self::Industrials => &["Aerospace & Defense", "Farm & Heavy Machinery", "Railroads"],
            Self::Materials => &["Specialty Chemicals", "Copper", "Steel"],
            Self::Utilities => &["Utilities - Regulated Electric", "Utilities - Renewable"],
            Self::RealEstate => &["REIT - Specialty", "REIT - Industrial"],
            Self::Fund => &["Index Fund"],
        }
    }

    /// Rate-sensitive sectors that move on central-bank news.
    pub const fn is_rate_sensitive(self) -> bool {
        matches!(self, Self::Financials | Self::RealEstate | Self::Utilities)
    }

    /// Sectors that rotate in on cyclical moves.
    pub const fn is_cyclical(self) -> bool {
        matches!(self, Self::Energy | Self::Industrials | Self::Materials)
    }

    /// Sectors that hold up on down days.
    pub const fn is_defensive(self) -> bool {
        matches!(
            self,
            Self::ConsumerStaples | Self::Healthcare | Self::Utilities
        )
    }
}

impl Display for Sector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference facts for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub min_price: f64,
    pub max_price: f64,
    pub sector: Sector,
    /// Typical daily move as a fraction of price.
    pub volatility: f64,
    pub is_tech: bool,
}

impl CompanyProfile {
    pub fn mid_price(&self) -> f64 {
        (self.min_price + self.max_price) / 2.0
    }
}

/// Ticker → company lookup table. Built once and shared by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDirectory {
    profiles: Vec<CompanyProfile>,
    index: HashMap<String, usize>,
}

type Row = (&'static str, &'static str, f64, f64, Sector, f64, bool);

const BUILTIN: &[Row] = &[
    ("AAPL", "Apple Inc.", 165.0, 235.0, Sector::Technology, 0.018, true),
    ("MSFT", "Microsoft Corporation", 360.0, 460.0, Sector::Technology, 0.016, true),
    ("NVDA", "NVIDIA Corporation", 95.0, 150.0, Sector::Technology, 0.035, true),
    ("GOOGL", "Alphabet Inc.", 140.0, 200.0, Sector::Communication, 0.020, true),
    ("AMZN", "Amazon.com, Inc.", 160.0, 230.0, Sector::ConsumerDiscretionary, 0.022, true),
    ("META", "Meta Platforms, Inc.", 450.0, 640.0, Sector::Communication, 0.028, true),
    ("TSLA", "Tesla, Inc.", 170.0, 360.0, Sector::ConsumerDiscretionary, 0.045, true),
    ("AMD", "Advanced Micro Devices, Inc.", 110.0, 190.0, Sector::Technology, 0.038, true),
    ("INTC", "Intel Corporation", 18.0, 45.0, Sector::Technology, 0.030, true),
    ("CRM", "Salesforce, Inc.", 230.0, 340.0, Sector::Technology, 0.024, true),
    ("ORCL", "Oracle Corporation", 110.0, 190.0, Sector::Technology, 0.022, true),
    ("ADBE", "Adobe Inc.", 400.0, 620.0, Sector::Technology, 0.025, true),
    ("NFLX", "Netflix, Inc.", 550.0, 900.0, Sector::Communication, 0.030, true),
    ("PLTR", "Palantir Technologies Inc.", 20.0, 80.0, Sector::Technology, 0.050, true),
    ("JPM", "JPMorgan Chase & Co.", 180.0, 250.0, Sector::Financials, 0.015, false),
    ("BAC", "Bank of America Corporation", 32.0, 47.0, Sector::Financials, 0.018, false),
    ("GS", "The Goldman Sachs Group, Inc.", 400.0, 600.0, Sector::Financials, 0.019, false),
    ("V", "Visa Inc.", 250.0, 320.0, Sector::Financials, 0.012, false),
    ("MA", "Mastercard Incorporated", 420.0, 530.0, Sector::Financials, 0.013, false),
    ("JNJ", "Johnson & Johnson", 145.0, 170.0, Sector::Healthcare, 0.010, false),
    ("PFE", "Pfizer Inc.", 25.0, 32.0, Sector::Healthcare, 0.016, false),
    ("UNH", "UnitedHealth Group Incorporated", 480.0, 620.0, Sector::Healthcare, 0.017, false),
    ("LLY", "Eli Lilly and Company", 700.0, 960.0, Sector::Healthcare, 0.024, false),
    ("XOM", "Exxon Mobil Corporation", 100.0, 125.0, Sector::Energy, 0.017, false),
    ("CVX", "Chevron Corporation", 140.0, 170.0, Sector::Energy, 0.017, false),
    ("COP", "ConocoPhillips", 95.0, 130.0, Sector::Energy, 0.021, false),
    ("WMT", "Walmart Inc.", 60.0, 95.0, Sector::ConsumerStaples, 0.011, false),
    ("KO", "The Coca-Cola Company", 58.0, 73.0, Sector::ConsumerStaples, 0.009, false),
    ("PG", "The Procter & Gamble Company", 150.0, 175.0, Sector::ConsumerStaples, 0.009, false),
    ("COST", "Costco Wholesale Corporation", 700.0, 950.0, Sector::ConsumerStaples, 0.014, false),
    ("DIS", "The Walt Disney Company", 85.0, 120.0, Sector::Communication, 0.020, false),
    ("NKE", "NIKE, Inc.", 60.0, 100.0, Sector::ConsumerDiscretionary, 0.022, false),
    ("MCD", "McDonald's Corporation", 250.0, 310.0, Sector::ConsumerDiscretionary, 0.010, false),
    ("BA", "The Boeing Company", 140.0, 220.0, Sector::Industrials, 0.028, false),
    ("CAT", "Caterpillar Inc.", 300.0, 400.0, Sector::Industrials, 0.020, false),
    ("UNP", "Union Pacific Corporation", 220.0, 255.0, Sector::Industrials, 0.013, false),
    ("LIN", "Linde plc", 420.0, 480.0, Sector::Materials, 0.011, false),
    ("FCX", "Freeport-McMoRan Inc.", 35.0, 55.0, Sector::Materials, 0.030, false),
    ("NEE", "NextEra Energy, Inc.", 60.0, 85.0, Sector::Utilities, 0.016, false),
    ("DUK", "Duke Energy Corporation", 95.0, 120.0, Sector::Utilities, 0.010, false),
    ("AMT", "American Tower Corporation", 180.0, 240.0, Sector::RealEstate, 0.017, false),
    ("PLD", "Prologis, Inc.", 100.0, 135.0, Sector::RealEstate, 0.018, false),
    ("SPY", "SPDR S&P 500 ETF Trust", 480.0, 600.0, Sector::Fund, 0.009, false),
    ("QQQ", "Invesco QQQ Trust", 400.0, 520.0, Sector::Fund, 0.012, false),
    ("IWM", "iShares Russell 2000 ETF", 190.0, 240.0, Sector::Fund, 0.014, false),
];

impl CompanyDirectory {
    pub fn new(profiles: Vec<CompanyProfile>) -> Self {
        let index = profiles
            .iter()
            .enumerate()
            .map(|(position, profile)| (profile.symbol.to_ascii_uppercase(), position))
            .collect();
        Self { profiles, index }
    }

    /// The built-in table, constructed on first use.
    pub fn builtin() -> Arc<Self> {
        static BUILTIN_DIRECTORY: OnceLock<Arc<CompanyDirectory>> = OnceLock::new();
        Arc::clone(BUILTIN_DIRECTORY.get_or_init(|| {
            let profiles = BUILTIN
                .iter()
                .map(
                    |&(symbol, name, min_price, max_price, sector, volatility, is_tech)| {
                        CompanyProfile {
                            symbol: symbol.to_owned(),
                            name: name.to_owned(),
                            min_price,
                            max_price,
                            sector,
                            volatility,
                            is_tech,
                        }
                    },
                )
                .collect();
            Arc::new(CompanyDirectory::new(profiles))
        }))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, symbol: &str) -> Option<&CompanyProfile> {
        let key = symbol.trim().to_ascii_uppercase();
        self.index
            .get(&key)
            .and_then(|position| self.profiles.get(*position))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn profiles(&self) -> &[CompanyProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ticker;

    #[test]
    fn builtin_symbols_are_valid_tickers_with_sane_bands() {
        let directory = CompanyDirectory::builtin();
        assert!(directory.len() >= 40);
        for profile in directory.profiles() {
            Ticker::parse(&profile.symbol).expect("directory ticker must be admissible");
            assert!(profile.min_price > 0.0);
            assert!(profile.max_price > profile.min_price, "{}", profile.symbol);
            assert!(profile.volatility > 0.0);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let directory = CompanyDirectory::builtin();
        assert_eq!(
            directory.get("aapl").map(|profile| profile.name.as_str()),
            Some("Apple Inc.")
        );
        assert!(!directory.contains("ZZZFAKE9"));
    }
}
