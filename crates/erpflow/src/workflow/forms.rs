//! Field-by-field filling for the dynamic form segments.
//!
//! Each segment step declares its fields as [`FieldSpec`]s paired with the
//! payload value. A field without a value is skipped. A field that cannot
//! be filled is recorded and only fails the step when it is required.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::context::StepContext;
use super::step::StepResult;
use crate::driver::NodeHandle;
use crate::error::{DriverError, StepError};
use crate::matcher::{select_best_match, MatchDecision, MatchKind};
use crate::resolver::Resolution;

pub const FORM_DATA_PREFIX: &str = "form.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    /// Type-to-search dropdown populated by the server.
    Search(MatchKind),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Selector catalog key.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Text,
            required: false,
        }
    }

    pub const fn numeric(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Numeric,
            required: false,
        }
    }

    pub const fn search(key: &'static str, label: &'static str, kind: MatchKind) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Search(kind),
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Filled { value: String },
    Selected { value: String, score: i32 },
    /// Nothing scored above zero; the first option was taken.
    FirstOption { value: String },
    /// The dropdown offered no options; the typed text was kept as-is.
    TypedFallback { value: String },
    /// No value in the request.
    Skipped,
    /// Optional field missing from the screen.
    NotPresent,
    Failed { reason: String },
}

impl FieldOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FieldOutcome::Failed { .. })
    }

    pub fn describe(&self, label: &str) -> String {
        match self {
            FieldOutcome::Filled { value } => format!("{label}: set to '{value}'"),
            FieldOutcome::Selected { value, score } => {
                format!("{label}: selected '{value}' (score {score})")
            }
            FieldOutcome::FirstOption { value } => {
                format!("{label}: no close match, took first option '{value}'")
            }
            FieldOutcome::TypedFallback { value } => {
                format!("{label}: no options offered, kept typed text '{value}'")
            }
            FieldOutcome::Skipped => format!("{label}: not provided"),
            FieldOutcome::NotPresent => format!("{label}: not on screen"),
            FieldOutcome::Failed { reason } => format!("{label}: {reason}"),
        }
    }
}

fn numeric_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+(?:\.\d+)?$").ok())
        .as_ref()
}

pub fn is_numeric(value: &str) -> bool {
    match numeric_pattern() {
        Some(pattern) => pattern.is_match(value),
        None => value.parse::<f64>().map_or(false, |v| v.is_finite() && v >= 0.0),
    }
}

/// Fills one field. Only a closed browsing context is returned as an
/// error; everything else is folded into the outcome.
pub async fn fill_field(
    ctx: &StepContext<'_>,
    spec: &FieldSpec,
    value: Option<&str>,
) -> Result<FieldOutcome, DriverError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(FieldOutcome::Skipped);
    };

    if spec.kind == FieldKind::Numeric && !is_numeric(value) {
        return Ok(FieldOutcome::Failed {
            reason: format!("'{value}' is not a valid number"),
        });
    }

    let resolver = ctx.resolver();
    let node = match resolver.resolve(ctx.candidates(spec.key)).await? {
        Resolution::Found(resolved) => resolved.node,
        Resolution::Unusable(_, reason) => {
            return Ok(FieldOutcome::Failed {
                reason: format!("field is {}", reason.describe()),
            });
        }
        Resolution::NotFound if spec.required => {
            return Ok(FieldOutcome::Failed {
                reason: "field not found on screen".to_string(),
            });
        }
        Resolution::NotFound => {
            debug!(field = spec.label, "Optional field not on screen");
            return Ok(FieldOutcome::NotPresent);
        }
    };

    let outcome = match spec.kind {
        FieldKind::Text | FieldKind::Numeric => set_value(ctx, &node, value).await,
        FieldKind::Search(kind) => search_and_select(ctx, &node, value, kind).await,
    };

    match outcome {
        Ok(outcome) => {
            ctx.pause(ctx.timings().field_settle()).await;
            Ok(outcome)
        }
        Err(e) if e.is_context_closed() => Err(e),
        Err(e) => Ok(FieldOutcome::Failed {
            reason: e.to_string(),
        }),
    }
}

async fn set_value(
    ctx: &StepContext<'_>,
    node: &NodeHandle,
    value: &str,
) -> Result<FieldOutcome, DriverError> {
    ctx.resolver().click(node).await?;
    ctx.page.fill(node, value).await?;
    Ok(FieldOutcome::Filled {
        value: value.to_string(),
    })
}

async fn search_and_select(
    ctx: &StepContext<'_>,
    node: &NodeHandle,
    value: &str,
    kind: MatchKind,
) -> Result<FieldOutcome, DriverError> {
    ctx.resolver().click(node).await?;
    ctx.page.fill(node, value).await?;
    ctx.pause(ctx.timings().dropdown_wait()).await;

    Ok(match choose_option(ctx, value, kind).await? {
        Some((text, MatchDecision::Exact(c) | MatchDecision::Best(c))) => FieldOutcome::Selected {
            value: text,
            score: c.score,
        },
        Some((text, _)) => FieldOutcome::FirstOption { value: text },
        None => FieldOutcome::TypedFallback {
            value: value.to_string(),
        },
    })
}

/// Reads the open dropdown's options, picks the best match for `target`
/// and clicks it. Returns `None` when the dropdown shows no options.
pub async fn choose_option(
    ctx: &StepContext<'_>,
    target: &str,
    kind: MatchKind,
) -> Result<Option<(String, MatchDecision)>, DriverError> {
    let options = read_options(ctx).await?;
    let texts: Vec<&str> = options.iter().map(|(_, text)| text.as_str()).collect();

    let decision = select_best_match(target, &texts, kind);
    let Some(chosen) = decision.chosen() else {
        return Ok(None);
    };

    let Some((node, text)) = options.iter().find(|(_, text)| text.trim() == chosen) else {
        return Ok(None);
    };
    ctx.resolver().click(node).await?;
    debug!(wanted = target, chosen = %text, score = ?decision.score(), "Dropdown option selected");

    Ok(Some((text.trim().to_string(), decision)))
}

async fn read_options(ctx: &StepContext<'_>) -> Result<Vec<(NodeHandle, String)>, DriverError> {
    for selector in ctx.candidates("dropdown.options") {
        let nodes = match ctx.page.query_all(selector).await {
            Ok(nodes) => nodes,
            Err(e) if e.is_context_closed() => return Err(e),
            Err(_) => continue,
        };
        if nodes.is_empty() {
            continue;
        }

        let mut options = Vec::with_capacity(nodes.len());
        for node in nodes {
            match ctx.page.text(&node).await {
                Ok(text) => options.push((node, text)),
                Err(e) if e.is_context_closed() => return Err(e),
                Err(_) => continue,
            }
        }
        return Ok(options);
    }
    Ok(Vec::new())
}

/// Fills every field of a segment and folds the outcomes into one step
/// result. The outcomes are kept under `form.<segment>` in the result data.
pub async fn fill_segment(
    ctx: &StepContext<'_>,
    segment: &str,
    fields: &[(FieldSpec, Option<&str>)],
) -> Result<StepResult, StepError> {
    let mut outcomes = serde_json::Map::new();
    let mut errors = Vec::new();
    let mut failed_required = Vec::new();
    let mut filled = 0usize;

    for (spec, value) in fields {
        let outcome = fill_field(ctx, spec, *value).await?;

        match &outcome {
            FieldOutcome::Failed { .. } => {
                let message = outcome.describe(spec.label);
                warn!(segment, field = spec.label, "{}", message);
                if spec.required {
                    failed_required.push(spec.label);
                }
                errors.push(message);
            }
            FieldOutcome::Skipped | FieldOutcome::NotPresent => {}
            _ => filled += 1,
        }

        outcomes.insert(
            spec.label.to_string(),
            serde_json::json!({
                "outcome": &outcome,
                "message": outcome.describe(spec.label),
            }),
        );
    }

    let key = format!("{FORM_DATA_PREFIX}{segment}");
    let result = if failed_required.is_empty() {
        StepResult::success(format!(
            "{segment}: {filled} of {} field(s) filled",
            fields.len()
        ))
        .with_errors(errors)
    } else {
        let message = format!(
            "{segment}: required field(s) could not be filled: {}",
            failed_required.join(", ")
        );
        let mut result = StepResult::failure(message);
        result.errors.extend(errors);
        result
    };

    Ok(result.with_data(&key, outcomes))
}
