//! Life categories tracked by the progression engine

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProgressionError;

/// One of the fixed life domains, each leveled independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Physical,
    Mental,
    Financial,
    Social,
    Spiritual,
    Career,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 6] = [
        Self::Physical,
        Self::Mental,
        Self::Financial,
        Self::Social,
        Self::Spiritual,
        Self::Career,
    ];

    /// Stable storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Mental => "mental",
            Self::Financial => "financial",
            Self::Social => "social",
            Self::Spiritual => "spiritual",
            Self::Career => "career",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Physical => "Physical",
            Self::Mental => "Mental",
            Self::Financial => "Financial",
            Self::Social => "Social",
            Self::Spiritual => "Spiritual",
            Self::Career => "Career",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| ProgressionError::InvalidArgument(format!("Unknown category: {}", s)))
    }
}

/// XP deltas for one event, keyed by category
pub type XpGains = BTreeMap<Category, i64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_storage_key() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!(" Physical ".parse::<Category>().unwrap(), Category::Physical);
    }

    #[test]
    fn test_unknown_category_is_invalid_argument() {
        let err = "cooking".parse::<Category>().unwrap_err();
        assert!(matches!(err, ProgressionError::InvalidArgument(_)));
    }
}
