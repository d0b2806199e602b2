//! Query planning: turns the research question into search sub-queries.

use super::state::StateUpdate;
use super::trace::{Stage, TraceEvent};
use crate::brain::LlmProvider;
use crate::error::LlmError;
use tracing::debug;

const PLANNER_SYSTEM: &str = "You are an expert research assistant.";

/// Asks the text-generation collaborator for complementary sub-queries.
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build the planning prompt for `query`.
    pub fn prompt(query: &str) -> String {
        format!(
            "You are an experienced researcher. Given the research question below, \
generate 3-5 specific, complementary search queries that together will produce a complete answer. \
Avoid redundant queries.\n\n\
Question: {query}\n\n\
Return only the queries, one per line, without numbering or extra formatting."
        )
    }

    /// Plan sub-queries for `query`.
    ///
    /// An empty plan is not an error: the update carries a warning and no
    /// sub-queries. A collaborator failure is returned to the caller.
    pub async fn plan(&self, llm: &dyn LlmProvider, query: &str) -> Result<StateUpdate, LlmError> {
        let response = llm.generate(PLANNER_SYSTEM, &Self::prompt(query)).await?;
        let sub_queries = Self::parse_sub_queries(&response);
        debug!(count = sub_queries.len(), "Parsed planner output");

        let mut trace = vec![TraceEvent::info(
            Stage::Planning,
            format!("Planning research: {query}"),
        )];
        if sub_queries.is_empty() {
            trace.push(TraceEvent::warning(
                Stage::Planning,
                "Planner returned no usable sub-queries; retrieval will be a no-op",
            ));
        } else {
            trace.push(TraceEvent::info(
                Stage::Planning,
                format!("{} search sub-queries generated", sub_queries.len()),
            ));
            for (i, sub_query) in sub_queries.iter().enumerate() {
                trace.push(TraceEvent::info(
                    Stage::Planning,
                    format!("  {}. {sub_query}", i + 1),
                ));
            }
        }

        Ok(StateUpdate {
            sub_queries,
            trace,
            ..StateUpdate::default()
        })
    }

    /// Split the collaborator's answer into sub-queries: one per non-empty
    /// line, trimmed, with list markers the model added anyway removed.
    pub fn parse_sub_queries(text: &str) -> Vec<String> {
        text.lines()
            .map(strip_list_marker)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove a leading `-`, `*`, `•` or `N.`/`N)` marker. A line holding
/// nothing but a marker becomes empty.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start();
    if matches!(line.trim_end(), "-" | "*" | "•") {
        return "";
    }
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest;
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if matches!(rest.trim_end(), "." | ")") {
            return "";
        }
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest;
        }
    }
    line
}
