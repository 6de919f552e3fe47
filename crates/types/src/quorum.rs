//! Stake fraction a signature group must exceed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strand_errors::ConfigError;

/// Exact rational threshold written as `"numerator/denominator"`
///
/// A group reaches quorum when its weight is strictly greater than
/// `total * numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuorumFraction {
    numerator: u64,
    denominator: u64,
}

impl QuorumFraction {
    /// Strictly more than one third of total stake
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    /// # Errors
    ///
    /// Returns `InvalidValue` unless `0 < numerator <= denominator`.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, ConfigError> {
        if numerator == 0 || denominator == 0 || numerator > denominator {
            return Err(ConfigError::invalid_value(
                "quorum",
                format!("{numerator}/{denominator}"),
            ));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    #[must_use]
    pub fn numerator(self) -> u64 {
        self.numerator
    }

    #[must_use]
    pub fn denominator(self) -> u64 {
        self.denominator
    }

    /// Whether `weight` out of `total` is strictly above the threshold
    #[must_use]
    pub fn is_exceeded_by(self, weight: u64, total: u64) -> bool {
        u128::from(weight) * u128::from(self.denominator)
            > u128::from(self.numerator) * u128::from(total)
    }
}

impl Default for QuorumFraction {
    fn default() -> Self {
        Self::ONE_THIRD
    }
}

impl fmt::Display for QuorumFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for QuorumFraction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::invalid_value("quorum", s);
        let (numerator, denominator) = s.split_once('/').ok_or_else(invalid)?;
        let numerator = numerator.trim().parse().map_err(|_| invalid())?;
        let denominator = denominator.trim().parse().map_err(|_| invalid())?;
        Self::new(numerator, denominator)
    }
}

impl TryFrom<String> for QuorumFraction {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QuorumFraction> for String {
    fn from(value: QuorumFraction) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_third_is_strict() {
        let q = QuorumFraction::default();
        assert!(!q.is_exceeded_by(1, 3));
        assert!(q.is_exceeded_by(2, 3));
        assert!(!q.is_exceeded_by(100, 300));
        assert!(q.is_exceeded_by(101, 300));
        assert!(!q.is_exceeded_by(0, 0));
    }

    #[test]
    fn test_no_overflow_for_large_stakes() {
        let q = QuorumFraction::default();
        assert!(q.is_exceeded_by(u64::MAX / 2, u64::MAX));
        assert!(!q.is_exceeded_by(u64::MAX / 3, u64::MAX));
    }

    #[test]
    fn test_parse_and_display() {
        let q: QuorumFraction = "2/3".parse().unwrap();
        assert_eq!(q.numerator(), 2);
        assert_eq!(q.denominator(), 3);
        assert_eq!(q.to_string(), "2/3");
        assert!("0/3".parse::<QuorumFraction>().is_err());
        assert!("4/3".parse::<QuorumFraction>().is_err());
        assert!("half".parse::<QuorumFraction>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&QuorumFraction::ONE_THIRD).unwrap();
        assert_eq!(json, "\"1/3\"");
        let back: QuorumFraction = serde_json::from_str("\"1/2\"").unwrap();
        assert_eq!(back, QuorumFraction::new(1, 2).unwrap());
    }
}
