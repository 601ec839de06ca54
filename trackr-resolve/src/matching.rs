//! Per-candidate match tiers.
//!
//! A candidate is scored once against a query and lands in at most one
//! [`MatchTier`], the strongest it satisfies. Comparison uses normalized
//! text: trimmed, lowercased, inner whitespace collapsed to single spaces.

use trackr_core::{AllowedValue, MatchTier, Member};

/// Normalize text for comparison.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A query prepared once for scoring many candidates.
#[derive(Debug, Clone)]
pub struct Query {
    /// Trimmed query as typed; used for the case-sensitive tier.
    pub raw: String,
    pub normalized: String,
    pub words: Vec<String>,
}

impl Query {
    /// `None` when the query is empty after trimming.
    pub fn parse(query: &str) -> Option<Self> {
        let raw = query.trim();
        if raw.is_empty() {
            return None;
        }
        let normalized = normalize(raw);
        let words = normalized.split(' ').map(str::to_string).collect();
        Some(Self {
            raw: raw.to_string(),
            normalized,
            words,
        })
    }
}

/// Something a free-text query can resolve to.
pub trait Candidate {
    /// How many labels a no-match error lists. `None` lists all of them.
    const NOT_FOUND_SAMPLE: Option<usize>;

    /// Identifier returned on success; usable as input to the remote.
    fn canonical(&self) -> &str;

    /// Human-readable label for error listings.
    fn label(&self) -> String;

    /// Strongest tier this candidate satisfies for `query`.
    fn match_tier(&self, query: &Query) -> Option<MatchTier>;
}

impl Candidate for Member {
    const NOT_FOUND_SAMPLE: Option<usize> = Some(5);

    fn canonical(&self) -> &str {
        &self.login
    }

    fn label(&self) -> String {
        Member::label(self)
    }

    fn match_tier(&self, query: &Query) -> Option<MatchTier> {
        if self.login == query.raw {
            return Some(MatchTier::ExactCaseSensitive);
        }

        let q = query.normalized.as_str();
        let login = normalize(&self.login);
        let name = normalize(&self.full_name);
        let email = self.email.as_deref().map(normalize).unwrap_or_default();

        if login == q || name == q || email == q {
            Some(MatchTier::ExactCaseInsensitive)
        } else if login.starts_with(q) || name.starts_with(q) || email.starts_with(q) {
            Some(MatchTier::Prefix)
        } else if login.contains(q) || name.contains(q) || email.contains(q) {
            Some(MatchTier::Substring)
        } else if words_align(&query.words, &name) {
            Some(MatchTier::WordPrefix)
        } else {
            None
        }
    }
}

impl Candidate for AllowedValue {
    const NOT_FOUND_SAMPLE: Option<usize> = None;

    fn canonical(&self) -> &str {
        &self.name
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn match_tier(&self, query: &Query) -> Option<MatchTier> {
        if self.name == query.raw {
            return Some(MatchTier::ExactCaseSensitive);
        }

        let q = query.normalized.as_str();
        let name = normalize(&self.name);

        if name == q {
            Some(MatchTier::ExactCaseInsensitive)
        } else if name.starts_with(q) {
            Some(MatchTier::Prefix)
        } else if name.contains(q) {
            Some(MatchTier::Substring)
        } else if words_align(&query.words, &name) {
            Some(MatchTier::WordPrefix)
        } else {
            None
        }
    }
}

/// True when every query word is a prefix of a distinct word of `display`.
///
/// `display` must already be normalized.
pub fn words_align(query_words: &[String], display: &str) -> bool {
    let words: Vec<&str> = display.split(' ').filter(|w| !w.is_empty()).collect();
    if query_words.is_empty() || query_words.len() > words.len() {
        return false;
    }
    let mut used = vec![false; words.len()];
    assign(query_words, &words, &mut used)
}

fn assign(query_words: &[String], words: &[&str], used: &mut [bool]) -> bool {
    let Some((first, rest)) = query_words.split_first() else {
        return true;
    };
    for (i, word) in words.iter().enumerate() {
        if !used[i] && word.starts_with(first.as_str()) {
            used[i] = true;
            if assign(rest, words, used) {
                return true;
            }
            used[i] = false;
        }
    }
    false
}
