//! Command interpretation
//!
//! Sends the command and a snapshot to the model, then turns whatever comes
//! back into a list of action candidates:
//! - strips a markdown code fence if the model added one
//! - parses and normalizes the batch
//! - rewrites `add` requests for things that are not shapes into `search`
//!
//! Candidates are returned unvalidated; per-element problems belong to the
//! validator so that one bad element never sinks the batch.

use crate::error::InterpreterError;
use crate::model::LanguageModel;
use crate::prompt::PromptBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use sculpt_action::{is_recognized, normalize_batch, ActionTag};
use sculpt_scene::{SceneSnapshot, ShapeKind};
use serde_json::{json, Map, Value};
use std::sync::Arc;

static CODE_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\s*```\s*$").ok());

/// Turns free text into action candidates
#[derive(Clone)]
pub struct CommandInterpreter {
    model: Arc<dyn LanguageModel>,
    prompt: PromptBuilder,
}

impl std::fmt::Debug for CommandInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInterpreter")
            .field("model", &self.model.model_name())
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl CommandInterpreter {
    /// Create interpreter over a model
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            prompt: PromptBuilder::new(),
        }
    }

    /// With a custom prompt builder
    #[inline]
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    /// Interpret one command against a snapshot
    ///
    /// # Errors
    /// Any `InterpreterError`; all are terminal for the command.
    pub async fn interpret(&self, text: &str, snapshot: &SceneSnapshot) -> Result<Vec<Value>, InterpreterError> {
        let request = self.prompt.build(text, snapshot);
        let raw = self.model.complete(&request).await.map_err(|e| {
            tracing::warn!(model = %self.model.model_name(), error = %e, "language model call failed");
            e
        })?;

        let candidates = parse_response(&raw).map_err(|e| {
            tracing::warn!(error = %e, response_bytes = raw.len(), "model output rejected");
            e
        })?;
        tracing::debug!(candidates = candidates.len(), "model output parsed");
        Ok(candidates)
    }
}

/// Remove a surrounding markdown code fence
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let inner = CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1));
    match inner {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Parse raw model output into normalized candidates
///
/// # Errors
/// - `EmptyResponse` for blank output
/// - `Malformed` for invalid JSON
/// - `Unrecognized` when no element carries a known tag
pub fn parse_response(raw: &str) -> Result<Vec<Value>, InterpreterError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(InterpreterError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| InterpreterError::Malformed(e.to_string()))?;
    let candidates = normalize_batch(value).map_err(|_| InterpreterError::Unrecognized)?;
    if !candidates.iter().any(is_recognized) {
        return Err(InterpreterError::Unrecognized);
    }
    Ok(redirect_unknown_kinds(candidates))
}

/// Whether a name is meant as a geometry (possibly misspelled)
fn looks_like_geometry(name: &str) -> bool {
    name.trim().to_ascii_lowercase().ends_with("geometry")
}

/// Search term for a `type` that names a thing rather than a shape
fn redirect_term(raw: Option<&Value>) -> Option<String> {
    let name = raw?.as_str()?.trim();
    if name.is_empty() || name.parse::<ShapeKind>().is_ok() || looks_like_geometry(name) {
        return None;
    }
    Some(name.to_string())
}

fn search(term: String) -> Value {
    json!({"action": "search", "value": term})
}

fn add_type(obj: &Map<String, Value>) -> Option<&Value> {
    obj.get("type").or_else(|| obj.get("shape"))
}

/// Rewrite `add`s of non-shapes into `search`es
///
/// `addMultiple` items for non-shapes are split out into searches placed right
/// after it; an `addMultiple` left with no items is dropped.
fn redirect_unknown_kinds(candidates: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(candidates.len());
    for mut candidate in candidates {
        match ActionTag::of(&candidate) {
            Ok(ActionTag::Add) => {
                let term = candidate.as_object().and_then(|o| redirect_term(add_type(o)));
                match term {
                    Some(term) => {
                        tracing::debug!(%term, "add of unknown kind redirected to search");
                        out.push(search(term));
                    }
                    None => out.push(candidate),
                }
            }
            Ok(ActionTag::AddMultiple) => {
                let searches = split_add_multiple(&mut candidate);
                let emptied = searches.as_ref().is_some_and(|(_, left)| *left == 0);
                if !emptied {
                    out.push(candidate);
                }
                if let Some((terms, _)) = searches {
                    out.extend(terms.into_iter().map(search));
                }
            }
            _ => out.push(candidate),
        }
    }
    out
}

/// Pull non-shape items out of an `addMultiple`
///
/// Returns the redirected terms and the number of items left, or `None` when
/// nothing was redirected.
fn split_add_multiple(candidate: &mut Value) -> Option<(Vec<String>, usize)> {
    let items = match candidate.get_mut("value") {
        Some(Value::Array(items)) => items,
        _ => return None,
    };

    let mut terms = Vec::new();
    items.retain(|item| {
        match item.as_object().and_then(|o| redirect_term(add_type(o))) {
            Some(term) => {
                terms.push(term);
                false
            }
            None => true,
        }
    });

    if terms.is_empty() {
        None
    } else {
        tracing::debug!(redirected = terms.len(), "addMultiple items redirected to search");
        Some((terms, items.len()))
    }
}
