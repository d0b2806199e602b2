//! Iteration controller: decides between gathering more evidence and finalizing.
//!
//! A two-state machine: `Gathering` until the first `Finalize`, then
//! `Finalizing`, which is terminal.

use serde::{Deserialize, Serialize};

/// Validations needed before the controller stops asking for more evidence.
pub const DEFAULT_MIN_VALIDATIONS: usize = 3;

/// What the research loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Run another retrieval pass.
    Continue,
    /// Proceed to synthesis.
    Finalize,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    ConflictsDetected,
    InsufficientValidations,
    IterationsExhausted,
    Sufficient,
}

impl DecisionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            DecisionReason::ConflictsDetected => "conflicts detected, gathering more evidence",
            DecisionReason::InsufficientValidations => {
                "too few validated claims, gathering more evidence"
            }
            DecisionReason::IterationsExhausted => "iteration budget exhausted, finalizing",
            DecisionReason::Sufficient => "evidence sufficient, finalizing",
        }
    }
}

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    Gathering,
    Finalizing,
}

impl ControllerPhase {
    /// The only transition is `Gathering -> Finalizing` on `Finalize`.
    pub fn next(self, decision: Decision) -> ControllerPhase {
        match (self, decision) {
            (ControllerPhase::Gathering, Decision::Continue) => ControllerPhase::Gathering,
            _ => ControllerPhase::Finalizing,
        }
    }
}

/// Pure decision function over the accumulated research state.
#[derive(Debug, Clone, Copy)]
pub struct IterationController {
    min_validations: usize,
}

impl IterationController {
    pub fn new(min_validations: usize) -> Self {
        Self { min_validations }
    }

    /// Decide the next step. Rules are evaluated in order:
    /// 1. conflicts and iterations left → continue
    /// 2. fewer than `min_validations` validations and iterations left → continue
    /// 3. otherwise → finalize
    pub fn decide(
        &self,
        current_iteration: usize,
        max_iterations: usize,
        conflicts_detected: bool,
        validation_count: usize,
    ) -> (Decision, DecisionReason) {
        let iterations_left = current_iteration < max_iterations;

        if conflicts_detected && iterations_left {
            return (Decision::Continue, DecisionReason::ConflictsDetected);
        }
        if validation_count < self.min_validations && iterations_left {
            return (Decision::Continue, DecisionReason::InsufficientValidations);
        }
        if iterations_left {
            (Decision::Finalize, DecisionReason::Sufficient)
        } else {
            (Decision::Finalize, DecisionReason::IterationsExhausted)
        }
    }
}

impl Default for IterationController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_VALIDATIONS)
    }
}

/// Decide with the default validation threshold.
pub fn decide(
    current_iteration: usize,
    max_iterations: usize,
    conflicts_detected: bool,
    validation_count: usize,
) -> Decision {
    IterationController::default()
        .decide(
            current_iteration,
            max_iterations,
            conflicts_detected,
            validation_count,
        )
        .0
}

/// Mermaid flowchart of the research workflow.
pub fn workflow_mermaid() -> String {
    [
        "flowchart TD",
        "    start([start]) --> plan[plan_research]",
        "    plan --> retrieve[retrieve_evidence]",
        "    retrieve --> validate[validate_information]",
        "    validate --> decide{decide_next_step}",
        "    decide -- continue --> retrieve",
        "    decide -- finalize --> synthesize[synthesize_report]",
        "    synthesize --> finish([end])",
    ]
    .join("\n")
}
