//! Entity resolution against project candidate sets.

use trackr_core::{
    AllowedValueDirectory, MatchTier, MemberDirectory, ProjectId, ResolveError, TrackrError,
    TrackrResult,
};

use crate::matching::{Candidate, Query};

/// Result of scoring a candidate set against one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Exactly one candidate holds the strongest tier.
    Resolved { value: String, tier: MatchTier },
    /// Every candidate tied at the strongest tier, as `(label, tier)`.
    Ambiguous(Vec<(String, MatchTier)>),
    /// No candidate matched. Holds a sample of candidate labels.
    NotFound(Vec<String>),
}

impl ResolutionOutcome {
    /// Turn the outcome into a value or a user-facing error.
    pub fn into_resolution(self, field: &str, query: &str) -> Result<Resolution, ResolveError> {
        match self {
            Self::Resolved { value, tier } => Ok(Resolution {
                value,
                tier: Some(tier),
            }),
            Self::Ambiguous(tied) => Err(ResolveError::ambiguous(
                field,
                query,
                tied.into_iter()
                    .map(|(label, tier)| format!("{} [{}]", label, tier))
                    .collect(),
            )),
            Self::NotFound(sample) => Err(ResolveError::not_found(field, query, sample)),
        }
    }
}

/// A successfully resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical value, or the query itself when resolution was skipped.
    pub value: String,
    /// `None` when the value passed through unresolved.
    pub tier: Option<MatchTier>,
}

impl Resolution {
    fn unresolved(query: &str) -> Self {
        Self {
            value: query.to_string(),
            tier: None,
        }
    }
}

/// Score every candidate and select the strongest tier.
///
/// Ties within the strongest tier are never broken.
pub fn resolve<C: Candidate>(candidates: &[C], query: &str) -> ResolutionOutcome {
    let Some(query) = Query::parse(query) else {
        return ResolutionOutcome::NotFound(sample_labels(candidates));
    };

    let scored: Vec<(&C, MatchTier)> = candidates
        .iter()
        .filter_map(|c| c.match_tier(&query).map(|tier| (c, tier)))
        .collect();

    let Some(best) = scored.iter().map(|(_, tier)| *tier).max() else {
        return ResolutionOutcome::NotFound(sample_labels(candidates));
    };

    let mut top = scored.into_iter().filter(|(_, tier)| *tier == best);
    match (top.next(), top.next()) {
        (Some((only, tier)), None) => ResolutionOutcome::Resolved {
            value: only.canonical().to_string(),
            tier,
        },
        (Some(first), Some(second)) => {
            let tied = [first, second]
                .into_iter()
                .chain(top)
                .map(|(c, tier)| (c.label(), tier))
                .collect();
            ResolutionOutcome::Ambiguous(tied)
        }
        (None, _) => ResolutionOutcome::NotFound(sample_labels(candidates)),
    }
}

fn sample_labels<C: Candidate>(candidates: &[C]) -> Vec<String> {
    match C::NOT_FOUND_SAMPLE {
        Some(limit) if candidates.len() > limit => {
            let mut labels: Vec<String> = candidates[..limit].iter().map(C::label).collect();
            labels.push(format!("...and {} more", candidates.len() - limit));
            labels
        }
        _ => candidates.iter().map(C::label).collect(),
    }
}

/// Resolves free-text member and field-value queries in a project.
///
/// Stateless apart from the directory it reads candidates from.
#[derive(Debug, Clone)]
pub struct EntityResolver<D> {
    directory: D,
}

impl<D> EntityResolver<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

impl<D: MemberDirectory> EntityResolver<D> {
    /// Resolve a query to a member login.
    pub async fn resolve_member(
        &self,
        project: &ProjectId,
        query: &str,
    ) -> TrackrResult<Resolution> {
        if query.trim().is_empty() {
            return Err(ResolveError::empty_query("member").into());
        }

        let members = self.directory.all_members(project).await?;
        let resolution = resolve(&members, query).into_resolution("member", query.trim())?;
        tracing::debug!(project = %project, query, value = %resolution.value, "Resolved member");
        Ok(resolution)
    }
}

impl<D: AllowedValueDirectory> EntityResolver<D> {
    /// Resolve a query to an allowed value name of `field`.
    ///
    /// When the field is unknown in the project or has no fixed value set,
    /// the query is returned unchanged and the remote validates it.
    pub async fn resolve_enum_value(
        &self,
        project: &ProjectId,
        field: &str,
        query: &str,
    ) -> TrackrResult<Resolution> {
        if query.trim().is_empty() {
            return Err(ResolveError::empty_query(field).into());
        }

        let values = match self.directory.allowed_values(project, field).await {
            Ok(values) => values,
            Err(TrackrError::Field(reason)) => {
                tracing::debug!(
                    project = %project,
                    field,
                    reason = %reason,
                    "Passing value through unresolved"
                );
                return Ok(Resolution::unresolved(query));
            }
            Err(e) => return Err(e),
        };

        let resolution = resolve(&values, query).into_resolution(field, query.trim())?;
        tracing::debug!(
            project = %project,
            field,
            query,
            value = %resolution.value,
            "Resolved field value"
        );
        Ok(resolution)
    }
}
