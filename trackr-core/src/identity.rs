//! Identity types for trackr entities

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Project key or database id as the remote tracker reports it (`DEMO`, `0-12`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Human-readable issue id (`DEMO-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project short name encoded in a readable id, if the id has one.
    ///
    /// `DEMO-42` yields `DEMO`; database ids such as `2-17` and bare words
    /// yield `None`.
    pub fn project_prefix(&self) -> Option<ProjectId> {
        let (prefix, number) = self.0.rsplit_once('-')?;
        let numeric_suffix = !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
        let named_prefix = prefix.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        (numeric_suffix && named_prefix).then(|| ProjectId::new(prefix))
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pseudonymous caller identity: hex SHA-256 of the caller's credential.
///
/// The raw credential never leaves [`IdentityKey::from_credential`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Derive the key by one-way hashing a credential.
    pub fn from_credential(credential: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credential.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_is_hex_sha256() {
        let key = IdentityKey::from_credential("perm:secret-token");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!key.as_str().contains("secret"));
    }

    #[test]
    fn test_identity_key_is_stable_and_distinct() {
        let a = IdentityKey::from_credential("token-a");
        let b = IdentityKey::from_credential("token-b");
        assert_eq!(a, IdentityKey::from_credential("token-a"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_issue_project_prefix() {
        assert_eq!(
            IssueId::new("DEMO-42").project_prefix(),
            Some(ProjectId::new("DEMO"))
        );
        assert_eq!(
            IssueId::new("MY-APP-7").project_prefix(),
            Some(ProjectId::new("MY-APP"))
        );
        assert_eq!(IssueId::new("2-17").project_prefix(), None);
        assert_eq!(IssueId::new("DEMO").project_prefix(), None);
        assert_eq!(IssueId::new("DEMO-").project_prefix(), None);
    }

    #[test]
    fn test_project_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ProjectId::new("DEMO")).unwrap();
        assert_eq!(json, "\"DEMO\"");
    }
}
