//! trackr Resolve - Entity Resolution and Command Rewriting
//!
//! Turns loose human or agent input into canonical identifiers:
//! - [`EntityResolver`] scores a free-text query against a project's
//!   members or a field's allowed values and picks the single strongest
//!   match, or reports ambiguity or absence with candidates listed.
//! - [`CommandRewriter`] finds field segments in a command string and
//!   substitutes each value with its canonical form.
//!
//! Both are stateless. Candidates come from the directory traits in
//! `trackr-core`, normally implemented by the cached collection client.

pub mod matching;
pub mod resolver;
pub mod rewrite;

pub use matching::{normalize, Candidate, Query};
pub use resolver::{resolve, EntityResolver, Resolution, ResolutionOutcome};
pub use rewrite::{default_rules, CommandRewriter, FieldRule, ME, PASSTHROUGH_KEYWORDS};
