use crate::directory::{CompanyProfile, Sector};
use crate::simulation::{round_to, MarketSimulationEngine};
use crate::CompanyOverview;

/// Stable per-symbol seed. Case-insensitive.
pub fn symbol_seed(symbol: &str) -> u64 {
    symbol
        .trim()
        .to_ascii_uppercase()
        .bytes()
        .fold(11_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u64))
}

impl MarketSimulationEngine {
    /// Synthesize fundamentals for a directory symbol.
    ///
    /// Seeded only by the symbol, so the result never changes between calls.
    /// Returns `None` when the symbol is not in the directory.
    pub fn generate_company_overview(&self, symbol: &str) -> Option<CompanyOverview> {
        let profile = self.directory().get(symbol)?;
        Some(synthesize(profile))
    }
}

fn synthesize(profile: &CompanyProfile) -> CompanyOverview {
    let mut rng = fastrand::Rng::with_seed(symbol_seed(&profile.symbol));
    let is_fund = profile.sector == Sector::Fund;

    let price = profile.mid_price() * (0.92 + rng.f64() * 0.16);
    let shares_billions = if profile.is_tech {
        1.0 + rng.f64() * 14.0
    } else {
        0.3 + rng.f64() * 4.0
    };
    let market_cap = (price * shares_billions * 1e9).round();

    let week_52_high = price.max(profile.max_price) * (1.02 + rng.f64() * 0.18);
    let week_52_low = price.min(profile.min_price) * (0.70 + rng.f64() * 0.22);

    let pe_ratio = match profile.sector {
        Sector::Fund => None,
        Sector::Technology | Sector::Communication => Some(25.0 + rng.f64() * 35.0),
        Sector::Financials => Some(8.0 + rng.f64() * 8.0),
        Sector::Utilities => Some(12.0 + rng.f64() * 10.0),
        _ => Some(12.0 + rng.f64() * 23.0),
    };

    let dividend_yield = match profile.sector {
        Sector::Fund => 0.005 + rng.f64() * 0.01,
        Sector::Utilities | Sector::RealEstate => 0.025 + rng.f64() * 0.02,
        Sector::Energy => 0.03 + rng.f64() * 0.02,
        _ if profile.sector.is_defensive() => 0.02 + rng.f64() * 0.015,
        _ if profile.is_tech => rng.f64() * 0.01,
        _ => 0.005 + rng.f64() * 0.02,
    };

    let eps = pe_ratio.map(|pe| price / pe);
    let revenue_per_share = (!is_fund).then(|| price / (1.5 + rng.f64() * 8.5));

    let industries = profile.sector.industries();
    let industry = industries[rng.usize(..industries.len())];

    let description = if is_fund {
        format!(
            "{} is an exchange traded fund. Figures are simulated from reference price bands and do not reflect reported holdings.",
            profile.name
        )
    } else {
        format!(
            "{} operates in {} within the {} sector. Figures are simulated from reference price bands and do not reflect reported financials.",
            profile.name,
            industry.to_ascii_lowercase(),
            profile.sector
        )
    };

    CompanyOverview {
        symbol: profile.symbol.clone(),
        name: profile.name.clone(),
        description,
        sector: profile.sector.as_str().to_string(),
        industry: industry.to_string(),
        market_cap: Some(market_cap),
        week_52_high: Some(round_to(week_52_high, 2)),
        week_52_low: Some(round_to(week_52_low, 2)),
        pe_ratio: pe_ratio.map(|value| round_to(value, 2)),
        dividend_yield: Some(round_to(dividend_yield, 4)),
        eps: eps.map(|value| round_to(value, 2)),
        revenue_per_share: revenue_per_share.map(|value| round_to(value, 2)),
    }
}
