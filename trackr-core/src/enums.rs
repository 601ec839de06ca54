//! Enum discriminators shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which per-project collection a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    CustomFields,
    Members,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::CustomFields => write!(f, "custom_fields"),
            CollectionKind::Members => write!(f, "members"),
        }
    }
}

/// Strength of a text match between a query and a candidate.
///
/// Variants are declared weakest first so the derived `Ord` ranks
/// `ExactCaseSensitive` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    WordPrefix,
    Substring,
    Prefix,
    ExactCaseInsensitive,
    ExactCaseSensitive,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::ExactCaseSensitive => write!(f, "exact"),
            MatchTier::ExactCaseInsensitive => write!(f, "exact, case-insensitive"),
            MatchTier::Prefix => write!(f, "prefix"),
            MatchTier::Substring => write!(f, "substring"),
            MatchTier::WordPrefix => write!(f, "word prefix"),
        }
    }
}
