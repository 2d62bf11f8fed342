//! Dungeon rank
//!
//! Ranks are ordered from weakest (`E`) to strongest (`SS`).
//! Parsing is case-insensitive; anything unrecognised falls back to `E`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dungeon rank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[default]
    E,
    D,
    C,
    B,
    A,
    S,
    SS,
}

impl Rank {
    /// All ranks, weakest first
    pub const ALL: [Rank; 7] = [Rank::E, Rank::D, Rank::C, Rank::B, Rank::A, Rank::S, Rank::SS];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::E => "E",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
            Rank::SS => "SS",
        }
    }

    /// Lenient parse used for free text: unknown input becomes `E`.
    ///
    /// The whole value is tried first, then its first word, so
    /// `"ss"` and `"S (boss rush)"` both resolve.
    pub fn parse_lenient(value: &str) -> Rank {
        let trimmed = value.trim();
        if let Ok(rank) = trimmed.parse() {
            return rank;
        }
        trimmed
            .split_whitespace()
            .next()
            .and_then(|word| word.parse().ok())
            .unwrap_or_default()
    }

    /// Comma-separated list of every rank, used in help output.
    pub fn list() -> String {
        Rank::ALL.iter().map(Rank::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for a value that names no rank
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rank: {0}")]
pub struct UnknownRank(pub String);

impl FromStr for Rank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "E" => Ok(Rank::E),
            "D" => Ok(Rank::D),
            "C" => Ok(Rank::C),
            "B" => Ok(Rank::B),
            "A" => Ok(Rank::A),
            "S" => Ok(Rank::S),
            "SS" => Ok(Rank::SS),
            _ => Err(UnknownRank(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ss".parse::<Rank>(), Ok(Rank::SS));
        assert_eq!(" a ".parse::<Rank>(), Ok(Rank::A));
        assert!("X".parse::<Rank>().is_err());
    }

    #[test]
    fn test_parse_lenient_falls_back_to_e() {
        assert_eq!(Rank::parse_lenient("Z"), Rank::E);
        assert_eq!(Rank::parse_lenient(""), Rank::E);
        assert_eq!(Rank::parse_lenient("S (boss rush)"), Rank::S);
    }

    #[test]
    fn test_default_is_weakest() {
        assert_eq!(Rank::default(), Rank::E);
        assert_eq!(Rank::default(), Rank::ALL[0]);
    }

    #[test]
    fn test_ordering_weakest_first() {
        assert!(Rank::E < Rank::D);
        assert!(Rank::S < Rank::SS);
        assert_eq!(Rank::list(), "E, D, C, B, A, S, SS");
    }
}
