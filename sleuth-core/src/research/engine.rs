//! Research engine: plan → retrieve → validate → decide → synthesize.
//!
//! One call owns one `ResearchState`; collaborator handles are shared and
//! may serve many concurrent calls.

use super::controller::{ControllerPhase, Decision, IterationController};
use super::output::ResearchResult;
use super::planner::QueryPlanner;
use super::retriever::Retriever;
use super::state::{ResearchState, StateUpdate};
use super::synthesis::ResearchSynthesizer;
use super::trace::{NoOpResearchCallback, ResearchCallback, Stage, TraceEvent};
use super::validator::Validator;
use crate::brain::LlmProvider;
use crate::config::{ResearchConfig, SleuthConfig};
use crate::error::{ResearchError, Result};
use crate::search::{SearchMode, SearchPreference, SearchProvider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// The research agent: the single entry point presentation layers call.
pub struct ResearchAgent {
    llm: Arc<dyn LlmProvider>,
    search: Option<Arc<dyn SearchProvider>>,
    config: ResearchConfig,
    planner: QueryPlanner,
    retriever: Retriever,
    validator: Validator,
    controller: IterationController,
    synthesizer: ResearchSynthesizer,
    callback: Arc<dyn ResearchCallback>,
}

impl ResearchAgent {
    /// Create an agent from collaborator handles and configuration.
    ///
    /// Pass `None` for `search` to run every query in simulated mode.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Option<Arc<dyn SearchProvider>>,
        config: &SleuthConfig,
    ) -> Self {
        let research = config.research.clone();
        Self {
            llm,
            search,
            planner: QueryPlanner::new(),
            retriever: Retriever::new(
                config.search.results_per_query,
                research.simulated_relevance,
            ),
            validator: Validator::new(),
            controller: IterationController::new(research.min_validations),
            synthesizer: ResearchSynthesizer::new(research.excerpt_chars),
            config: research,
            callback: Arc::new(NoOpResearchCallback),
        }
    }

    /// Attach a progress callback.
    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// The research config in effect.
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Whether a live search provider is configured.
    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    /// Run a complete research call.
    ///
    /// `max_iterations` falls back to the configured default. Never fails:
    /// stage errors are reported on the result.
    pub async fn run_research(
        &self,
        query: &str,
        max_iterations: Option<usize>,
        preference: SearchPreference,
    ) -> ResearchResult {
        let cancel = CancellationToken::new();
        self.run_research_with_cancel(query, max_iterations, preference, &cancel)
            .await
    }

    /// Like [`run_research`](Self::run_research), checking `cancel` between stages.
    ///
    /// On cancellation the state as of the last completed stage is returned
    /// with a `Cancelled` error.
    pub async fn run_research_with_cancel(
        &self,
        query: &str,
        max_iterations: Option<usize>,
        preference: SearchPreference,
        cancel: &CancellationToken,
    ) -> ResearchResult {
        let max_iterations = max_iterations.unwrap_or(self.config.max_iterations);
        let mode = preference.resolve(self.search.is_some());
        let span = info_span!("research", run_id = %Uuid::new_v4(), max_iterations, %mode);

        async move {
            info!(query, "Starting research");
            let state = self
                .drive(query, max_iterations, preference, mode, cancel)
                .await;
            info!(
                evidence = state.evidence.len(),
                validations = state.validations.len(),
                iterations = state.current_iteration,
                errored = state.error.is_some(),
                "Research finished"
            );
            ResearchResult::from_state(state, mode)
        }
        .instrument(span)
        .await
    }

    /// Blocking variant of [`run_research`](Self::run_research).
    ///
    /// Drives the same future on a private current-thread runtime. Called from
    /// inside an async context it returns `ResearchError::NestedRuntime`
    /// instead; fails otherwise only if the private runtime cannot be created.
    pub fn run_research_blocking(
        &self,
        query: &str,
        max_iterations: Option<usize>,
        preference: SearchPreference,
    ) -> Result<ResearchResult> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ResearchError::NestedRuntime.into());
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run_research(query, max_iterations, preference)))
    }

    async fn drive(
        &self,
        query: &str,
        max_iterations: usize,
        preference: SearchPreference,
        mode: SearchMode,
        cancel: &CancellationToken,
    ) -> ResearchState {
        let llm = self.llm.as_ref();
        let search = self.search.as_deref();
        let mut state = ResearchState::new(query, max_iterations);

        if preference == SearchPreference::Live && mode == SearchMode::Simulated {
            self.record(
                &mut state,
                StateUpdate::trace(vec![TraceEvent::warning(
                    Stage::Retrieval,
                    "Live search requested but no search provider is configured; using simulation",
                )]),
            );
        }

        if cancel.is_cancelled() {
            self.cancel(&mut state, "start");
            return state;
        }

        self.callback.on_stage_start(Stage::Planning);
        match self.planner.plan(llm, query).await {
            Ok(update) => self.merge(&mut state, Stage::Planning, update),
            Err(err) => {
                let error = ResearchError::Planning(err);
                let update = StateUpdate {
                    trace: vec![TraceEvent::warning(Stage::Planning, error.to_string())],
                    final_report: Some(format!("Research failed: {error}")),
                    references: Some(Vec::new()),
                    confidence_level: Some(0.0),
                    error: Some(error),
                    ..StateUpdate::default()
                };
                self.merge(&mut state, Stage::Planning, update);
                return state;
            }
        }

        let mut phase = ControllerPhase::Gathering;
        let mut last_stage = Stage::Planning;
        while phase == ControllerPhase::Gathering {
            if cancel.is_cancelled() {
                self.cancel(&mut state, last_stage.as_str());
                return state;
            }
            self.callback.on_stage_start(Stage::Retrieval);
            let update = self
                .retriever
                .retrieve(llm, search, &state.sub_queries, mode)
                .await;
            self.merge(&mut state, Stage::Retrieval, update);

            if cancel.is_cancelled() {
                self.cancel(&mut state, Stage::Retrieval.as_str());
                return state;
            }
            self.callback.on_stage_start(Stage::Validation);
            let outcome = self
                .validator
                .validate(llm, &state.query, &state.evidence)
                .await;
            self.merge(&mut state, Stage::Validation, outcome.into());
            last_stage = Stage::Validation;

            let (decision, reason) = self.controller.decide(
                state.current_iteration,
                state.max_iterations,
                state.conflicts_detected,
                state.validations.len(),
            );
            self.callback.on_decision(decision, state.current_iteration);
            let mut update = StateUpdate::trace(vec![TraceEvent::info(
                Stage::Decision,
                format!(
                    "Iteration {}/{}: {}",
                    state.current_iteration,
                    state.max_iterations,
                    reason.describe()
                ),
            )]);
            if decision == Decision::Continue {
                update.current_iteration = Some(state.current_iteration + 1);
            }
            self.merge(&mut state, Stage::Decision, update);
            last_stage = Stage::Decision;
            phase = phase.next(decision);
        }

        if cancel.is_cancelled() {
            self.cancel(&mut state, last_stage.as_str());
            return state;
        }
        self.callback.on_stage_start(Stage::Synthesis);
        let synthesis = self
            .synthesizer
            .synthesize(llm, &state.query, &state.evidence, &state.validations)
            .await;
        self.merge(&mut state, Stage::Synthesis, synthesis.into());

        state
    }

    /// Apply a stage update, reporting its events and the resulting sizes.
    fn merge(&self, state: &mut ResearchState, stage: Stage, update: StateUpdate) {
        for event in &update.trace {
            self.callback.on_event(event);
        }
        state.apply(update);
        self.callback.on_stage_complete(stage, &state.snapshot());
    }

    /// Apply an update outside any stage.
    fn record(&self, state: &mut ResearchState, update: StateUpdate) {
        for event in &update.trace {
            self.callback.on_event(event);
        }
        state.apply(update);
    }

    fn cancel(&self, state: &mut ResearchState, stage: &str) {
        let update = StateUpdate {
            trace: vec![TraceEvent::warning(
                Stage::Decision,
                format!("Research cancelled after {stage} stage"),
            )],
            error: Some(ResearchError::Cancelled {
                stage: stage.to_string(),
            }),
            ..StateUpdate::default()
        };
        self.record(state, update);
    }
}
