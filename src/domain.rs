use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MinerError;

/// Prefix letter the I-TASSER queue puts in front of every job number.
pub const IDENTIFIER_PREFIX: char = 'S';

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S(\d+)$").expect("identifier pattern compiles"));

/// A job identifier such as `S438773`.
///
/// Ordering follows the numeric part, so a sorted collection of identifiers
/// is in queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(u64);

impl Identifier {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IDENTIFIER_PREFIX}{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = MinerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let number = IDENTIFIER_RE
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse::<u64>().ok())
            .ok_or_else(|| MinerError::InvalidIdentifier(value.to_string()))?;
        Ok(Self(number))
    }
}

impl TryFrom<String> for Identifier {
    type Error = MinerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

/// Inclusive span of identifiers between two bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentifierRange {
    pub first: Identifier,
    pub last: Identifier,
}

impl IdentifierRange {
    pub fn new(first: Identifier, last: Identifier) -> Self {
        Self { first, last }
    }

    /// Identifiers from `first` to `last`, both included. Empty when the
    /// bounds are reversed.
    pub fn iter(&self) -> impl Iterator<Item = Identifier> + use<> {
        (self.first.number()..=self.last.number()).map(Identifier::new)
    }

    /// Number of identifiers in the range, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        self.last
            .number()
            .checked_sub(self.first.number())
            .map_or(0, |span| span.saturating_add(1))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for IdentifierRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}
