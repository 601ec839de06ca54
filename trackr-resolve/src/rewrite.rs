//! Command rewriting.
//!
//! A command is a run of whitespace-separated tokens. Known field keywords
//! start a segment whose value runs to the end of the command, or to an
//! earlier keyword when the longer span does not resolve. Each value is
//! resolved and substituted in place. Everything else, spacing included,
//! is copied through untouched.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use trackr_core::{
    AllowedValueDirectory, InputError, MemberDirectory, ProjectId, TrackrError, TrackrResult,
};

use crate::resolver::{EntityResolver, Resolution};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("Invalid token regex"));

/// Value the remote interprets as the calling user.
pub const ME: &str = "me";

/// Command keywords that take no resolvable value.
pub const PASSTHROUGH_KEYWORDS: &[&str] = &[
    "tag", "untag", "star", "unstar", "vote", "unvote", "comment", "visible", "remove", "add",
];

/// A command keyword bound to a project field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// Keyword as written in commands; may span several words.
    pub keyword: String,
    /// Field whose candidates resolve the value.
    pub field: String,
    /// Resolve against project members instead of allowed values.
    pub user: bool,
}

impl FieldRule {
    pub fn value(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            field: keyword.clone(),
            keyword,
            user: false,
        }
    }

    pub fn user(keyword: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            field: field.into(),
            user: true,
        }
    }

    fn keyword_words(&self) -> Vec<String> {
        self.keyword
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

/// Built-in field keywords.
pub fn default_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::value("State"),
        FieldRule::value("Type"),
        FieldRule::value("Priority"),
        FieldRule::user("Assignee", "Assignee"),
        FieldRule::value("Subsystem"),
        FieldRule::value("Severity"),
        FieldRule::value("Resolution"),
        FieldRule::user("for", "Assignee"),
    ]
}

#[derive(Debug)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Keyword<'r> {
    Field(&'r FieldRule),
    Passthrough,
}

/// A field segment found in a command.
#[derive(Debug)]
struct Segment<'r> {
    rule: &'r FieldRule,
    /// Token index of the keyword.
    keyword: usize,
    /// Token index of the first value token.
    start: usize,
    /// Nearest token index the value may end at.
    end: usize,
    /// Later boundaries, ending with the end of the command.
    later: Vec<usize>,
}

impl Segment<'_> {
    fn span(&self, tokens: &[Token<'_>], end: usize) -> Range<usize> {
        tokens[self.start].span.start..tokens[end - 1].span.end
    }
}

/// Rewrites command strings so every field value is canonical.
#[derive(Debug, Clone)]
pub struct CommandRewriter<D> {
    resolver: EntityResolver<D>,
    rules: Vec<FieldRule>,
}

impl<D> CommandRewriter<D> {
    pub fn new(resolver: EntityResolver<D>) -> Self {
        Self {
            resolver,
            rules: default_rules(),
        }
    }

    /// Add field rules. A rule whose keyword matches an existing one
    /// (case-insensitively) replaces it.
    pub fn with_fields(mut self, rules: impl IntoIterator<Item = FieldRule>) -> Self {
        for rule in rules {
            let words = rule.keyword_words();
            if words.is_empty() {
                continue;
            }
            self.rules.retain(|r| r.keyword_words() != words);
            self.rules.push(rule);
        }
        self
    }

    pub fn resolver(&self) -> &EntityResolver<D> {
        &self.resolver
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// True when the command names at least one known field with a value.
    pub fn is_rewritable(&self, command: &str) -> bool {
        !self.segments(&tokenize(command)).is_empty()
    }

    fn keyword_at(&self, tokens: &[Token<'_>], at: usize) -> Option<(Keyword<'_>, usize)> {
        let field = self
            .rules
            .iter()
            .filter_map(|rule| {
                let words = rule.keyword_words();
                let fits = !words.is_empty()
                    && tokens.len() >= at + words.len()
                    && words
                        .iter()
                        .zip(&tokens[at..])
                        .all(|(word, token)| token.text.to_lowercase() == *word);
                fits.then_some((Keyword::Field(rule), words.len()))
            })
            .max_by_key(|(_, len)| *len);
        if field.is_some() {
            return field;
        }

        let text = tokens.get(at)?.text;
        PASSTHROUGH_KEYWORDS
            .iter()
            .any(|k| k.eq_ignore_ascii_case(text))
            .then_some((Keyword::Passthrough, 1))
    }

    fn segments(&self, tokens: &[Token<'_>]) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut at = 0;
        // Leading text before the first keyword is skipped.
        while at < tokens.len() {
            let Some((keyword, len)) = self.keyword_at(tokens, at) else {
                at += 1;
                continue;
            };

            let start = at + len;
            let mut end = start;
            while end < tokens.len() && self.keyword_at(tokens, end).is_none() {
                end += 1;
            }

            if let Keyword::Field(rule) = keyword {
                if end > start {
                    let mut later: Vec<usize> = (end + 1..tokens.len())
                        .filter(|&i| self.keyword_at(tokens, i).is_some())
                        .collect();
                    if end < tokens.len() {
                        later.push(tokens.len());
                    }
                    segments.push(Segment {
                        rule,
                        keyword: at,
                        start,
                        end,
                        later,
                    });
                }
            }
            at = end;
        }
        segments
    }
}

impl<D: MemberDirectory + AllowedValueDirectory> CommandRewriter<D> {
    /// Resolve every field value in `command` and substitute canonical
    /// values. Any resolution failure aborts the whole rewrite.
    pub async fn rewrite(&self, project: &ProjectId, command: &str) -> TrackrResult<String> {
        let tokens = tokenize(command);
        let segments = self.segments(&tokens);
        if segments.is_empty() {
            return Err(InputError::UnrecognizedCommand {
                command: command.to_string(),
            }
            .into());
        }

        let mut replacements = Vec::with_capacity(segments.len());
        let mut consumed = 0;
        for segment in &segments {
            // Swallowed by a longer value.
            if segment.keyword < consumed {
                continue;
            }
            let (end, span, value) = self
                .resolve_segment(project, command, &tokens, segment)
                .await?;
            replacements.push((span, value));
            consumed = end;
        }

        let mut rewritten = String::with_capacity(command.len());
        let mut cursor = 0;
        for (span, value) in replacements {
            rewritten.push_str(&command[cursor..span.start]);
            rewritten.push_str(&value);
            cursor = span.end;
        }
        rewritten.push_str(&command[cursor..]);

        tracing::debug!(project = %project, command, rewritten = %rewritten, "Rewrote command");
        Ok(rewritten)
    }

    /// Resolve the longest span of `segment` that matches a candidate.
    ///
    /// Longer spans only win on a real match; a value passed through
    /// unresolved keeps the nearest boundary.
    async fn resolve_segment(
        &self,
        project: &ProjectId,
        command: &str,
        tokens: &[Token<'_>],
        segment: &Segment<'_>,
    ) -> TrackrResult<(usize, Range<usize>, String)> {
        for &end in segment.later.iter().rev() {
            let span = segment.span(tokens, end);
            match self.resolve_value(project, segment.rule, &command[span.clone()]).await {
                Ok(Resolution {
                    value,
                    tier: Some(_),
                }) => return Ok((end, span, value)),
                Ok(_) | Err(TrackrError::Resolve(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let span = segment.span(tokens, segment.end);
        let resolution = self
            .resolve_value(project, segment.rule, &command[span.clone()])
            .await?;
        Ok((segment.end, span, resolution.value))
    }

    async fn resolve_value(
        &self,
        project: &ProjectId,
        rule: &FieldRule,
        raw: &str,
    ) -> TrackrResult<Resolution> {
        if !rule.user {
            return self.resolver.resolve_enum_value(project, &rule.field, raw).await;
        }
        if raw.eq_ignore_ascii_case(ME) {
            return Ok(Resolution {
                value: raw.to_string(),
                tier: None,
            });
        }
        self.resolver.resolve_member(project, raw).await
    }
}

fn tokenize(command: &str) -> Vec<Token<'_>> {
    TOKEN
        .find_iter(command)
        .map(|m| Token {
            text: m.as_str(),
            span: m.range(),
        })
        .collect()
}
