//! Research synthesis: reduces evidence and validations into the final report.
//!
//! The report prose comes from the collaborator; references and the
//! confidence level are computed here, deterministically.

use super::excerpt;
use super::state::{ClaimValidation, Evidence, Reference, StateUpdate};
use super::trace::{Stage, TraceEvent};
use crate::brain::LlmProvider;
use crate::error::ResearchError;

const SYNTHESIS_SYSTEM: &str =
    "You are an academic researcher who writes clear, well-referenced reports.";

/// Confidence reported when no claim could be validated.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Output of the synthesis stage.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub report: String,
    pub references: Vec<Reference>,
    pub confidence_level: f64,
    pub error: Option<ResearchError>,
    pub trace: Vec<TraceEvent>,
}

impl From<Synthesis> for StateUpdate {
    fn from(synthesis: Synthesis) -> Self {
        StateUpdate {
            final_report: Some(synthesis.report),
            references: Some(synthesis.references),
            confidence_level: Some(synthesis.confidence_level),
            error: synthesis.error,
            trace: synthesis.trace,
            ..StateUpdate::default()
        }
    }
}

/// Arithmetic mean of claim confidences, or the neutral default when there are none.
pub fn aggregate_confidence(validations: &[ClaimValidation]) -> f64 {
    if validations.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }
    validations.iter().map(|v| v.confidence).sum::<f64>() / validations.len() as f64
}

/// One reference per evidence item, in evidence order. Duplicates are kept.
pub fn derive_references(evidence: &[Evidence]) -> Vec<Reference> {
    evidence.iter().map(Reference::from).collect()
}

/// Writes the final report.
pub struct ResearchSynthesizer {
    excerpt_chars: usize,
}

impl ResearchSynthesizer {
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    /// Build the synthesis prompt.
    pub fn prompt(&self, query: &str, evidence: &[Evidence], validations: &[ClaimValidation]) -> String {
        let sources = evidence
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "SOURCE {}: {}\n{}",
                    i + 1,
                    e.source_id,
                    excerpt(&e.content, self.excerpt_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let claims = validations
            .iter()
            .map(|v| format!("- {} (confidence: {:.0}%)", v.claim, v.confidence * 100.0))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Based on the research carried out on \"{query}\", write a complete final report.\n\n\
SOURCES CONSULTED:\n{sources}\n\n\
VALIDATIONS:\n{claims}\n\n\
Write a report that:\n\
1. Answers the original question directly\n\
2. Presents the validated information\n\
3. Mentions uncertainties or conflicts found\n\
4. Cites the sources appropriately\n\
5. States the overall confidence level\n\n\
Format: professional Markdown"
        )
    }

    /// Synthesize the report.
    ///
    /// A collaborator failure still yields references and a confidence level;
    /// the report becomes an error notice and `error` is set.
    pub async fn synthesize(
        &self,
        llm: &dyn LlmProvider,
        query: &str,
        evidence: &[Evidence],
        validations: &[ClaimValidation],
    ) -> Synthesis {
        let mut trace = vec![
            TraceEvent::info(
                Stage::Synthesis,
                format!("Synthesizing report from {} source(s)", evidence.len()),
            ),
            TraceEvent::info(
                Stage::Synthesis,
                format!("Integrating {} validation(s)", validations.len()),
            ),
        ];

        let confidence_level = aggregate_confidence(validations);
        let references = derive_references(evidence);

        let (report, error) = match llm
            .generate(SYNTHESIS_SYSTEM, &self.prompt(query, evidence, validations))
            .await
        {
            Ok(report) => {
                trace.push(TraceEvent::info(
                    Stage::Synthesis,
                    format!(
                        "Report generated (confidence: {:.0}%)",
                        confidence_level * 100.0
                    ),
                ));
                (report, None)
            }
            Err(err) => {
                trace.push(TraceEvent::warning(
                    Stage::Synthesis,
                    format!("Report generation failed: {err}"),
                ));
                (
                    format!("**Error:** the report could not be generated ({err})."),
                    Some(ResearchError::Synthesis(err)),
                )
            }
        };

        trace.push(TraceEvent::info(
            Stage::Synthesis,
            format!("{} reference(s) included", references.len()),
        ));

        Synthesis {
            report,
            references,
            confidence_level,
            error,
            trace,
        }
    }
}

impl Default for ResearchSynthesizer {
    fn default() -> Self {
        Self::new(500)
    }
}
