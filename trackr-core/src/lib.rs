//! trackr Core - Entity Types and Collaborator Traits
//!
//! Pure data structures shared by every other crate: identifiers, the
//! resolvable candidate types, the error taxonomy, and the narrow
//! capability traits the remote client and the cache layer implement.
//! This crate contains no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod remote;

pub use entities::{AllowedValue, FieldKind, Member, ProjectField, SimpleKind};
pub use enums::{CollectionKind, MatchTier};
pub use error::{
    FieldError, InputError, ResolveError, ResolveErrorKind, TrackrError, TrackrResult,
    TransportError,
};
pub use identity::{IdentityKey, IssueId, ProjectId};
pub use remote::{
    AllowedValueDirectory, CommandApplier, FieldFetcher, MemberDirectory, MemberFetcher,
    UserLookup,
};
