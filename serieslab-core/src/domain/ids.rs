use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one remote time series (an SGS series code).
///
/// Always positive. Raw configuration cells and provider column labels go
/// through [`SeriesId::coerce`]; anything that does not name a valid code
/// becomes `None` and is excluded downstream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeriesId(u32);

impl SeriesId {
    /// Build an identifier from a raw integer. Zero is not a valid code.
    pub fn new(code: u32) -> Option<Self> {
        (code > 0).then_some(Self(code))
    }

    /// Coerce raw text into an identifier.
    ///
    /// Accepts integers (`"433"`) and finite decimals, which are truncated
    /// (`"433.0"` → 433, as spreadsheet exports tend to produce). Empty,
    /// non-numeric, non-positive and out-of-range input yields `None`.
    pub fn coerce(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(n) = raw.parse::<i64>() {
            return u32::try_from(n).ok().and_then(Self::new);
        }

        let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?.trunc();
        if f < 1.0 || f > u32::MAX as f64 {
            return None;
        }
        Self::new(f as u32)
    }

    pub fn code(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SeriesId {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::new(code).ok_or_else(|| "series code must be positive".to_string())
    }
}

impl From<SeriesId> for u32 {
    fn from(id: SeriesId) -> Self {
        id.0
    }
}

/// Deterministic dataset hash (content hash of the consolidated table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn from_hash(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_accepts_integers_and_decimals() {
        assert_eq!(SeriesId::coerce("433"), SeriesId::new(433));
        assert_eq!(SeriesId::coerce(" 433 "), SeriesId::new(433));
        assert_eq!(SeriesId::coerce("433.0"), SeriesId::new(433));
        assert_eq!(SeriesId::coerce("433.9"), SeriesId::new(433));
    }

    #[test]
    fn coerce_rejects_invalid_codes() {
        assert_eq!(SeriesId::coerce(""), None);
        assert_eq!(SeriesId::coerce("abc"), None);
        assert_eq!(SeriesId::coerce("0"), None);
        assert_eq!(SeriesId::coerce("-5"), None);
        assert_eq!(SeriesId::coerce("0.5"), None);
        assert_eq!(SeriesId::coerce("NaN"), None);
        assert_eq!(SeriesId::coerce("99999999999"), None);
    }

    #[test]
    fn ordering_follows_code() {
        let mut ids = vec![
            SeriesId::new(20).unwrap(),
            SeriesId::new(3).unwrap(),
            SeriesId::new(100).unwrap(),
        ];
        ids.sort();
        let codes: Vec<u32> = ids.iter().map(|id| id.code()).collect();
        assert_eq!(codes, vec![3, 20, 100]);
    }

    #[test]
    fn serde_rejects_zero() {
        assert!(serde_json::from_str::<SeriesId>("0").is_err());
        assert_eq!(
            serde_json::from_str::<SeriesId>("11").unwrap(),
            SeriesId::new(11).unwrap()
        );
    }
}
