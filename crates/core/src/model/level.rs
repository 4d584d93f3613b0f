use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a level string is not one of the six CEFR levels.
///
/// Seeing this at runtime means a stored profile or content row is corrupt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid proficiency level: {raw:?}")]
pub struct InvalidLevelError {
    pub raw: String,
}

/// CEFR proficiency level, ordered from least (`A1`) to most (`C2`) proficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProficiencyLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyLevel {
    /// Every level in ascending order.
    pub const ALL: [ProficiencyLevel; 6] = [
        ProficiencyLevel::A1,
        ProficiencyLevel::A2,
        ProficiencyLevel::B1,
        ProficiencyLevel::B2,
        ProficiencyLevel::C1,
        ProficiencyLevel::C2,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProficiencyLevel::A1 => "A1",
            ProficiencyLevel::A2 => "A2",
            ProficiencyLevel::B1 => "B1",
            ProficiencyLevel::B2 => "B2",
            ProficiencyLevel::C1 => "C1",
            ProficiencyLevel::C2 => "C2",
        }
    }

    /// Position in `ALL`.
    #[must_use]
    pub fn rank(self) -> usize {
        self as usize
    }

    /// The level one step below, or `None` for `A1`.
    #[must_use]
    pub fn lower(self) -> Option<Self> {
        self.rank().checked_sub(1).map(|idx| Self::ALL[idx])
    }

    /// The level one step above, or `None` for `C2`.
    #[must_use]
    pub fn higher(self) -> Option<Self> {
        Self::ALL.get(self.rank() + 1).copied()
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = InvalidLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| InvalidLevelError { raw: s.to_owned() })
    }
}

impl TryFrom<String> for ProficiencyLevel {
    type Error = InvalidLevelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProficiencyLevel> for String {
    fn from(level: ProficiencyLevel) -> Self {
        level.as_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        for pair in ProficiencyLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn neighbours_stop_at_the_ends() {
        assert_eq!(ProficiencyLevel::A1.lower(), None);
        assert_eq!(ProficiencyLevel::A1.higher(), Some(ProficiencyLevel::A2));
        assert_eq!(ProficiencyLevel::C2.higher(), None);
        assert_eq!(ProficiencyLevel::C2.lower(), Some(ProficiencyLevel::C1));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" b2 ".parse::<ProficiencyLevel>().unwrap(), ProficiencyLevel::B2);
        let err = "Z9".parse::<ProficiencyLevel>().unwrap_err();
        assert_eq!(err.raw, "Z9");
    }

    #[test]
    fn display_matches_as_str() {
        for level in ProficiencyLevel::ALL {
            assert_eq!(level.to_string(), level.as_str());
        }
    }
}
