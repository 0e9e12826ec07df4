use serde::{Deserialize, Serialize};

/// Company fundamentals, either parsed from the provider or synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub eps: Option<f64>,
    pub revenue_per_share: Option<f64>,
}

/// Names providers return when they have nothing real to say.
const PLACEHOLDER_NAMES: &[&str] = &["", "-", "N/A", "NA", "NONE", "NULL", "UNKNOWN", "TBD"];

impl CompanyOverview {
    /// True when the name is a real display name rather than an echo of the
    /// symbol or a placeholder token.
    pub fn has_meaningful_name(&self, raw_symbol: &str) -> bool {
        let name = self.name.trim();
        !name.is_empty()
            && !name.eq_ignore_ascii_case(raw_symbol.trim())
            && !PLACEHOLDER_NAMES
                .iter()
                .any(|placeholder| placeholder.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overview(name: &str) -> CompanyOverview {
        CompanyOverview {
            symbol: "ACME".to_string(),
            name: name.to_string(),
            description: String::new(),
            sector: String::new(),
            industry: String::new(),
            market_cap: None,
            week_52_high: None,
            week_52_low: None,
            pe_ratio: None,
            dividend_yield: None,
            eps: None,
            revenue_per_share: None,
        }
    }

    #[test]
    fn rejects_echoed_symbol_and_placeholders() {
        assert!(overview("Acme Corp").has_meaningful_name("ACME"));
        assert!(!overview("acme").has_meaningful_name("ACME"));
        assert!(!overview("  ").has_meaningful_name("ACME"));
        assert!(!overview("None").has_meaningful_name("ACME"));
    }
}
