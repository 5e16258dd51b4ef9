//! Tradable universe and security-type classification.
//!
//! The universe is a fresh snapshot each trading day. Only the
//! classification is carried here; liquidity ranking happens in the
//! factor engine because it depends on price history.

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityType {
    CommonStock,
    Other(String),
}

impl SecurityType {
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case("common stock") {
            SecurityType::CommonStock
        } else {
            SecurityType::Other(trimmed.to_string())
        }
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityType::CommonStock => write!(f, "Common Stock"),
            SecurityType::Other(label) => write!(f, "{}", label),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: String,
    pub security_type: SecurityType,
}

impl Asset {
    pub fn new(id: impl Into<String>, security_type: SecurityType) -> Self {
        Self {
            id: id.into(),
            security_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub assets: Vec<Asset>,
}

impl Universe {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    pub fn count(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Keep only the listed ids, preserving universe order. Ids match
    /// case-insensitively.
    pub fn restrict_to(&self, ids: &[String]) -> Universe {
        let wanted: HashSet<String> = ids.iter().map(|id| id.to_uppercase()).collect();
        Universe {
            assets: self
                .assets
                .iter()
                .filter(|a| wanted.contains(&a.id.to_uppercase()))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),
}

pub fn parse_asset_ids(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let id = trimmed.to_uppercase();
        if !seen.insert(id.clone()) {
            return Err(UniverseError::DuplicateAsset(id));
        }
        ids.push(id);
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_security_type() {
        assert_eq!(SecurityType::parse("Common Stock"), SecurityType::CommonStock);
        assert_eq!(SecurityType::parse(" common stock "), SecurityType::CommonStock);
        assert_eq!(
            SecurityType::parse("ETP"),
            SecurityType::Other("ETP".to_string())
        );
    }

    #[test]
    fn security_type_display_round_trips_label() {
        assert_eq!(SecurityType::CommonStock.to_string(), "Common Stock");
        assert_eq!(SecurityType::Other("REIT".into()).to_string(), "REIT");
    }

    #[test]
    fn test_parse_asset_ids_basic() {
        let result = parse_asset_ids("AAPL,MSFT,XOM").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "XOM"]);
    }

    #[test]
    fn test_parse_asset_ids_whitespace_and_case() {
        let result = parse_asset_ids("  aapl , Msft ").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_parse_asset_ids_empty_token() {
        let result = parse_asset_ids("AAPL,,MSFT");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_asset_ids_duplicate() {
        let result = parse_asset_ids("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateAsset(s)) if s == "AAPL"));
    }

    #[test]
    fn restrict_to_preserves_order() {
        let universe = Universe::new(vec![
            Asset::new("AAPL", SecurityType::CommonStock),
            Asset::new("SPY", SecurityType::Other("ETP".into())),
            Asset::new("XOM", SecurityType::CommonStock),
        ]);
        let restricted = universe.restrict_to(&["XOM".to_string(), "AAPL".to_string()]);
        let ids: Vec<_> = restricted.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["AAPL", "XOM"]);
        assert_eq!(universe.count(), 3);
    }

    #[test]
    fn restrict_to_ignores_id_case() {
        let universe = Universe::new(vec![
            Asset::new("aapl", SecurityType::CommonStock),
            Asset::new("Xom", SecurityType::CommonStock),
            Asset::new("MSFT", SecurityType::CommonStock),
        ]);
        let ids = parse_asset_ids("AAPL, xom").unwrap();
        let restricted = universe.restrict_to(&ids);
        let kept: Vec<_> = restricted.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(kept, vec!["aapl", "Xom"]);
    }
}
