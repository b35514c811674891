//! Report identity system using year-scoped sequential codes
//!
//! Report keys look like `2024-007`: the calendar year of the report's
//! business date, a dash, and a counter padded to at least three digits.
//! The counter is derived from whatever keys are currently visible locally,
//! so nothing is reserved: two clients working from the same stale view will
//! produce the same code.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum width of the sequence part
const SEQUENCE_WIDTH: usize = 3;

/// A parsed report identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId {
    year: i32,
    sequence: u64,
}

impl ReportId {
    pub fn new(year: i32, sequence: u64) -> Self {
        Self { year, sequence }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Parse a ReportId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// Compute the next identifier for `year` given the keys currently held
    ///
    /// Keys outside `<year>-` are ignored. A suffix that is not a number
    /// counts as 0, so it never pushes the sequence forward. The sequence
    /// saturates at `u64::MAX` instead of wrapping.
    pub fn next<'a>(keys: impl IntoIterator<Item = &'a str>, year: i32) -> Self {
        let prefix = format!("{:04}-", year);
        let max = keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|suffix| suffix.parse::<u64>().unwrap_or(0))
            .max()
            .unwrap_or(0);

        Self::new(year, max.saturating_add(1))
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:0width$}",
            self.year,
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for ReportId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year_str, seq_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        if year_str.len() != 4 {
            return Err(IdParseError::InvalidYear(year_str.to_string()));
        }
        let year = year_str
            .parse::<i32>()
            .map_err(|_| IdParseError::InvalidYear(year_str.to_string()))?;
        let sequence = seq_str
            .parse::<u64>()
            .map_err(|_| IdParseError::InvalidSequence(seq_str.to_string()))?;

        Ok(Self { year, sequence })
    }
}

/// Errors that can occur when parsing report IDs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("missing '-' delimiter in report ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid year '{0}' (expected four digits)")]
    InvalidYear(String),

    #[error("invalid sequence number '{0}'")]
    InvalidSequence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_id_of_year() {
        let id = ReportId::next(["2024-001", "2024-002"], 2025);
        assert_eq!(id.to_string(), "2025-001");
    }

    #[test]
    fn test_next_id_continues_year() {
        let id = ReportId::next(["2024-001", "2024-002"], 2024);
        assert_eq!(id.to_string(), "2024-003");
    }

    #[test]
    fn test_next_id_uses_max_not_count() {
        let id = ReportId::next(["2024-010", "2024-002"], 2024);
        assert_eq!(id.to_string(), "2024-011");
    }

    #[test]
    fn test_unparsable_suffix_counts_as_zero() {
        let id = ReportId::next(["2024-abc", "2024-"], 2024);
        assert_eq!(id.to_string(), "2024-001");

        let id = ReportId::next(["2024-abc", "2024-004"], 2024);
        assert_eq!(id.to_string(), "2024-005");
    }

    #[test]
    fn test_other_years_ignored() {
        let id = ReportId::next(["2023-099", "12024-005"], 2024);
        assert_eq!(id.to_string(), "2024-001");
    }

    #[test]
    fn test_sequence_widens_past_999() {
        let id = ReportId::next(["2024-999"], 2024);
        assert_eq!(id.to_string(), "2024-1000");
    }

    #[test]
    fn test_huge_sequence_does_not_overflow() {
        let id = ReportId::next(["2024-4294967295", "2024-002"], 2024);
        assert_eq!(id.to_string(), "2024-4294967296");

        let id = ReportId::next(["2024-18446744073709551615"], 2024);
        assert_eq!(id.sequence(), u64::MAX);
    }

    #[test]
    fn test_year_always_four_digits() {
        let id = ReportId::next(std::iter::empty::<&str>(), 999);
        assert_eq!(id.to_string(), "0999-001");

        let id = ReportId::next(["0999-004"], 999);
        assert_eq!(id.to_string(), "0999-005");
        assert_eq!(ReportId::parse("0999-005").unwrap(), id);
    }

    #[test]
    fn test_parse() {
        let id = ReportId::parse("2024-017").unwrap();
        assert_eq!(id.year(), 2024);
        assert_eq!(id.sequence(), 17);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ReportId::parse("2024017"),
            Err(IdParseError::MissingDelimiter(_))
        ));
        assert!(matches!(
            ReportId::parse("24-001"),
            Err(IdParseError::InvalidYear(_))
        ));
        assert!(matches!(
            ReportId::parse("2024-x1"),
            Err(IdParseError::InvalidSequence(_))
        ));
    }
}
