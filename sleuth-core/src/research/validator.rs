//! Cross-source validation of collected evidence.
//!
//! The collaborator is asked for a strict JSON document; its answer is
//! semi-structured at best, so parsing is lenient about wrapping (code fences)
//! and strict about shape (required claim fields).

use super::excerpt;
use super::state::{ClaimValidation, Evidence, StateUpdate};
use super::trace::{Stage, TraceEvent};
use crate::brain::LlmProvider;
use crate::error::ResearchError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const VALIDATOR_SYSTEM: &str =
    "You are an information analyst who validates facts by cross-referencing sources.";

/// A claim as emitted by the collaborator, before clamping.
#[derive(Debug, Deserialize)]
struct RawClaim {
    claim: String,
    is_validated: bool,
    confidence: f64,
    reasoning: String,
    #[serde(default, alias = "supporting_sources")]
    supporting_source_ids: Vec<String>,
    #[serde(default)]
    conflicting_info: Option<String>,
}

/// Parsed validator output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValidation {
    pub validations: Vec<ClaimValidation>,
    pub conflicts_detected: bool,
    pub summary: Option<String>,
    /// Index and reason of every claim dropped for a bad shape.
    pub dropped: Vec<(usize, String)>,
    /// Raw `conflicts_detected` value when it was not a JSON boolean.
    pub coerced_conflicts: Option<String>,
}

/// Result of one validation pass.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub validations: Vec<ClaimValidation>,
    pub conflicts_detected: bool,
    pub summary: Option<String>,
    pub error: Option<ResearchError>,
    pub trace: Vec<TraceEvent>,
}

impl From<ValidationOutcome> for StateUpdate {
    fn from(outcome: ValidationOutcome) -> Self {
        StateUpdate {
            validations: outcome.validations,
            conflicts_detected: Some(outcome.conflicts_detected),
            error: outcome.error,
            trace: outcome.trace,
            ..StateUpdate::default()
        }
    }
}

/// Cross-references evidence through the text-generation collaborator.
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Build the cross-reference prompt.
    pub fn prompt(query: &str, evidence: &[Evidence]) -> String {
        let sources = evidence
            .iter()
            .enumerate()
            .map(|(i, e)| format!("SOURCE {} ({}):\n{}", i + 1, e.source_id, e.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        format!(
            "Analyze the following information from multiple sources about: \"{query}\"\n\n\
{sources}\n\n\
Your task:\n\
1. Identify the main claims\n\
2. Check whether the sources agree\n\
3. Detect conflicts or contradictions\n\
4. Assess how reliable each claim is\n\n\
Return JSON in exactly this format:\n\
{{\n\
  \"validations\": [\n\
    {{\n\
      \"claim\": \"the claim\",\n\
      \"is_validated\": true,\n\
      \"confidence\": 0.0,\n\
      \"supporting_source_ids\": [\"source id\"],\n\
      \"conflicting_info\": \"description of conflicts, if any\",\n\
      \"reasoning\": \"why\"\n\
    }}\n\
  ],\n\
  \"conflicts_detected\": false,\n\
  \"summary\": \"summary of the validation\"\n\
}}"
        )
    }

    /// Validate the accumulated evidence for `query`.
    ///
    /// Never fails: collaborator and parse failures yield an empty, conflict-free
    /// pass with `error` set.
    pub async fn validate(
        &self,
        llm: &dyn LlmProvider,
        query: &str,
        evidence: &[Evidence],
    ) -> ValidationOutcome {
        let mut trace = vec![TraceEvent::info(
            Stage::Validation,
            format!("Validating {} evidence item(s)", evidence.len()),
        )];

        if evidence.is_empty() {
            trace.push(TraceEvent::warning(
                Stage::Validation,
                "No evidence to validate",
            ));
            return Self::empty(trace, None);
        }

        let response = match llm
            .generate(VALIDATOR_SYSTEM, &Self::prompt(query, evidence))
            .await
        {
            Ok(text) => text,
            Err(err) => {
                trace.push(TraceEvent::warning(
                    Stage::Validation,
                    format!("Validation call failed: {err}"),
                ));
                return Self::empty(trace, Some(ResearchError::Validation(err)));
            }
        };

        let parsed = match Self::parse(&response) {
            Ok(parsed) => parsed,
            Err(message) => {
                warn!(error = %message, "Failed to parse validation output");
                trace.push(TraceEvent::warning(
                    Stage::Validation,
                    format!("Could not parse validation output: {message}"),
                ));
                return Self::empty(trace, Some(ResearchError::Parse { message }));
            }
        };

        if let Some(raw) = &parsed.coerced_conflicts {
            trace.push(TraceEvent::warning(
                Stage::Validation,
                format!(
                    "conflicts_detected is not a boolean ({raw}); read as {}",
                    parsed.conflicts_detected
                ),
            ));
        }
        for (index, reason) in &parsed.dropped {
            trace.push(TraceEvent::warning(
                Stage::Validation,
                format!("Dropped malformed claim #{}: {reason}", index + 1),
            ));
        }

        trace.push(TraceEvent::info(
            Stage::Validation,
            format!("{} claim(s) validated", parsed.validations.len()),
        ));
        if parsed.conflicts_detected {
            trace.push(TraceEvent::warning(
                Stage::Validation,
                "Conflicts detected between sources",
            ));
        } else {
            trace.push(TraceEvent::info(Stage::Validation, "No conflicts detected"));
        }
        for (i, v) in parsed.validations.iter().enumerate() {
            trace.push(TraceEvent::info(
                Stage::Validation,
                format!(
                    "  {}. {} (confidence: {:.0}%)",
                    i + 1,
                    excerpt(&v.claim, 60),
                    v.confidence * 100.0
                ),
            ));
        }
        trace.push(TraceEvent::info(
            Stage::Validation,
            parsed
                .summary
                .clone()
                .unwrap_or_else(|| "Validation complete".to_string()),
        ));

        ValidationOutcome {
            validations: parsed.validations,
            conflicts_detected: parsed.conflicts_detected,
            summary: parsed.summary,
            error: None,
            trace,
        }
    }

    fn empty(trace: Vec<TraceEvent>, error: Option<ResearchError>) -> ValidationOutcome {
        ValidationOutcome {
            validations: Vec::new(),
            conflicts_detected: false,
            summary: None,
            error,
            trace,
        }
    }

    /// Parse the collaborator's answer.
    ///
    /// Returns `Err` only when the document as a whole is unusable; individual
    /// malformed claims are dropped and reported in `dropped`.
    pub fn parse(response: &str) -> Result<ParsedValidation, String> {
        let body = strip_code_fence(response);
        let document: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
        let object = document
            .as_object()
            .ok_or_else(|| "expected a JSON object at the top level".to_string())?;

        let (conflicts_detected, coerced_conflicts) = match object.get("conflicts_detected") {
            None | Some(Value::Null) => (false, None),
            Some(Value::Bool(flag)) => (*flag, None),
            Some(other) => (truthy(other), Some(other.to_string())),
        };
        let summary = object
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string);

        let raw_claims = match object.get("validations") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return Err("'validations' must be an array".to_string()),
        };

        let mut validations = Vec::with_capacity(raw_claims.len());
        let mut dropped = Vec::new();
        for (index, item) in raw_claims.into_iter().enumerate() {
            match serde_json::from_value::<RawClaim>(item) {
                Ok(raw) if raw.confidence.is_finite() => validations.push(ingest(raw)),
                Ok(_) => dropped.push((index, "confidence is not a finite number".to_string())),
                Err(err) => dropped.push((index, err.to_string())),
            }
        }
        debug!(
            kept = validations.len(),
            dropped = dropped.len(),
            "Parsed validation claims"
        );

        Ok(ParsedValidation {
            validations,
            conflicts_detected,
            summary,
            dropped,
            coerced_conflicts,
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a non-boolean flag leniently: recognised falsy spellings, zero and
/// empty values are `false`, anything else is `true`.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "0" | "none" | "null"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Clamp confidence and deduplicate supporting ids.
fn ingest(raw: RawClaim) -> ClaimValidation {
    let mut supporting_source_ids: Vec<String> = Vec::new();
    for id in raw.supporting_source_ids {
        if !supporting_source_ids.contains(&id) {
            supporting_source_ids.push(id);
        }
    }
    ClaimValidation {
        claim: raw.claim,
        is_validated: raw.is_validated,
        confidence: raw.confidence.clamp(0.0, 1.0),
        supporting_source_ids,
        conflicting_info: raw.conflicting_info.filter(|s| !s.trim().is_empty()),
        reasoning: raw.reasoning,
    }
}

/// Return the content of a ```json fence, else of the first ``` fence, else the trimmed input.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}
