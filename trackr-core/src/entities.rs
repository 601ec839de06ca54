//! Resolvable entity types.
//!
//! These are transient snapshots of remote data. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A project team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Canonical identifier accepted by the remote as user input.
    pub login: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Member {
    pub fn new(login: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            full_name: full_name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// `login (Full Name)`, or just the login when the name is blank.
    pub fn label(&self) -> String {
        if self.full_name.trim().is_empty() {
            self.login.clone()
        } else {
            format!("{} ({})", self.login, self.full_name)
        }
    }
}

/// One allowed value of a bundle-backed custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedValue {
    #[serde(default)]
    pub id: String,
    /// Display name; this is the canonical form.
    pub name: String,
}

impl AllowedValue {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Non-bundle field kinds. These have no finite value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleKind {
    Text,
    Period,
    Group,
    /// Integer, float, date and anything else the remote calls "simple".
    Other(String),
}

/// Declared kind of a project custom field, decoded once from the remote
/// `$type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values")]
pub enum FieldKind {
    Enum(Vec<AllowedValue>),
    State(Vec<AllowedValue>),
    Owned(Vec<AllowedValue>),
    Version(Vec<AllowedValue>),
    Build(Vec<AllowedValue>),
    User,
    Simple(SimpleKind),
}

impl FieldKind {
    /// Map a remote `$type` tag plus its bundle values onto a kind.
    ///
    /// Bundle values are ignored for kinds that cannot carry them.
    pub fn from_remote(type_tag: &str, values: Vec<AllowedValue>) -> Self {
        let tag = type_tag
            .strip_suffix("ProjectCustomField")
            .unwrap_or(type_tag);
        match tag {
            "Enum" => Self::Enum(values),
            "State" => Self::State(values),
            "Owned" => Self::Owned(values),
            "Version" => Self::Version(values),
            "Build" => Self::Build(values),
            "User" => Self::User,
            "Text" => Self::Simple(SimpleKind::Text),
            "Period" => Self::Simple(SimpleKind::Period),
            "Group" => Self::Simple(SimpleKind::Group),
            other => Self::Simple(SimpleKind::Other(other.to_string())),
        }
    }

    /// The finite value set, for bundle-backed kinds only.
    pub fn allowed_values(&self) -> Option<&[AllowedValue]> {
        match self {
            Self::Enum(values)
            | Self::State(values)
            | Self::Owned(values)
            | Self::Version(values)
            | Self::Build(values) => Some(values),
            Self::User | Self::Simple(_) => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(_) => write!(f, "enum"),
            Self::State(_) => write!(f, "state"),
            Self::Owned(_) => write!(f, "owned"),
            Self::Version(_) => write!(f, "version"),
            Self::Build(_) => write!(f, "build"),
            Self::User => write!(f, "user"),
            Self::Simple(SimpleKind::Text) => write!(f, "text"),
            Self::Simple(SimpleKind::Period) => write!(f, "period"),
            Self::Simple(SimpleKind::Group) => write!(f, "group"),
            Self::Simple(SimpleKind::Other(tag)) => write!(f, "{}", tag.to_lowercase()),
        }
    }
}

/// A custom field as attached to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectField {
    pub name: String,
    pub kind: FieldKind,
}

impl ProjectField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}
