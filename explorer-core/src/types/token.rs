//! Token types
//!
//! A token is identified by the content address of its mint seed
//! (`"{level} {number}"`). Tokens are immutable once minted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MINTED_TOKEN_VALUE, TOKEN_TYPE_RBT};
use crate::error::CoreError;

/// Content address identifying a token
pub type TokenId = String;

/// A slot in the minting order
///
/// Ordering is lexicographic on `(level, number)`, which is the order in
/// which tokens are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MintPosition {
    /// Level in the schedule (0-based)
    pub level: u32,
    /// Number within the level (1-based)
    pub number: u64,
}

impl MintPosition {
    /// Create a new position
    pub fn new(level: u32, number: u64) -> Self {
        Self { level, number }
    }

    /// The first slot of an empty ledger
    pub fn origin() -> Self {
        Self { level: 0, number: 1 }
    }

    /// The slot immediately after this one within the same level
    pub fn next_number(&self) -> Self {
        Self {
            level: self.level,
            number: self.number + 1,
        }
    }

    /// The first slot of the following level
    pub fn next_level(&self) -> Self {
        Self {
            level: self.level + 1,
            number: 1,
        }
    }
}

impl fmt::Display for MintPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.number)
    }
}

impl FromStr for MintPosition {
    type Err = CoreError;

    /// Parses `"{level} {number}"` (the mint seed form) or `"{level}:{number}"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (level, number) = s
            .trim()
            .split_once(|c: char| c == ' ' || c == ':')
            .ok_or_else(|| CoreError::InvalidPosition(s.to_string()))?;

        let level = level
            .trim()
            .parse::<u32>()
            .map_err(|e| CoreError::InvalidPosition(format!("{}: {}", s, e)))?;
        let number = number
            .trim()
            .parse::<u64>()
            .map_err(|e| CoreError::InvalidPosition(format!("{}: {}", s, e)))?;

        if number == 0 {
            return Err(CoreError::InvalidPosition(format!(
                "{}: numbers start at 1",
                s
            )));
        }

        Ok(Self { level, number })
    }
}

/// A minted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Content address of the mint seed
    pub token_id: TokenId,
    /// Schedule level
    pub level: u32,
    /// Number within the level
    pub number: u64,
    /// Token value
    pub value: Decimal,
    /// Parent token, if this token was split from another
    pub parent_token_id: Option<TokenId>,
    /// Type tag
    pub token_type: String,
}

impl Token {
    /// Build the row for a freshly minted token
    pub fn minted(token_id: impl Into<TokenId>, position: MintPosition) -> Self {
        Self {
            token_id: token_id.into(),
            level: position.level,
            number: position.number,
            value: Decimal::from(MINTED_TOKEN_VALUE),
            parent_token_id: None,
            token_type: TOKEN_TYPE_RBT.to_string(),
        }
    }

    /// Position of this token in the minting order
    pub fn position(&self) -> MintPosition {
        MintPosition::new(self.level, self.number)
    }
}
