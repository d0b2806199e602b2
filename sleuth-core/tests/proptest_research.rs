//! Property-based tests for the research pipeline's pure parts using proptest.

use proptest::prelude::*;

use sleuth_core::research::controller::{Decision, IterationController, decide};
use sleuth_core::research::planner::QueryPlanner;
use sleuth_core::research::retriever::synthetic_source_id;
use sleuth_core::research::state::{ClaimValidation, ResearchState, StateUpdate};
use sleuth_core::research::synthesis::{NEUTRAL_CONFIDENCE, aggregate_confidence};
use sleuth_core::research::validator::strip_code_fence;

fn validation(confidence: f64) -> ClaimValidation {
    ClaimValidation {
        claim: "c".into(),
        is_validated: true,
        confidence,
        supporting_source_ids: vec![],
        conflicting_info: None,
        reasoning: String::new(),
    }
}

// --- Iteration controller properties ---

proptest! {
    #[test]
    fn exhausted_budget_always_finalizes(
        max in 0usize..20,
        extra in 0usize..5,
        conflicts in any::<bool>(),
        count in 0usize..10,
    ) {
        prop_assert_eq!(decide(max + extra, max, conflicts, count), Decision::Finalize);
    }

    #[test]
    fn conflicts_with_budget_always_continue(
        cur in 0usize..20,
        gap in 1usize..5,
        count in 0usize..10,
    ) {
        prop_assert_eq!(decide(cur, cur + gap, true, count), Decision::Continue);
    }

    #[test]
    fn decision_is_pure(
        cur in 0usize..10,
        max in 0usize..10,
        conflicts in any::<bool>(),
        count in 0usize..10,
        min in 0usize..6,
    ) {
        let controller = IterationController::new(min);
        prop_assert_eq!(
            controller.decide(cur, max, conflicts, count),
            controller.decide(cur, max, conflicts, count)
        );
    }

    #[test]
    fn loop_terminates_within_budget(max in 0usize..15, count in 0usize..3) {
        // Worst case: conflicts every pass and never enough validations.
        let mut cur = 0;
        let mut passes = 0;
        while decide(cur, max, true, count) == Decision::Continue {
            cur += 1;
            passes += 1;
            prop_assert!(passes <= max);
        }
        prop_assert_eq!(cur, max);
    }
}

// --- Confidence aggregation properties ---

proptest! {
    #[test]
    fn confidence_is_arithmetic_mean(values in prop::collection::vec(0.0f64..=1.0, 1..20)) {
        let validations: Vec<_> = values.iter().copied().map(validation).collect();
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        prop_assert!((aggregate_confidence(&validations) - expected).abs() < 1e-9);
    }

    #[test]
    fn confidence_stays_in_unit_interval(values in prop::collection::vec(0.0f64..=1.0, 0..20)) {
        let validations: Vec<_> = values.into_iter().map(validation).collect();
        let confidence = aggregate_confidence(&validations);
        prop_assert!((0.0..=1.0).contains(&confidence));
        if validations.is_empty() {
            prop_assert_eq!(confidence, NEUTRAL_CONFIDENCE);
        }
    }
}

// --- Identifier and parsing properties ---

proptest! {
    #[test]
    fn synthetic_id_is_stable(query in ".{0,80}") {
        let id = synthetic_source_id(&query);
        prop_assert_eq!(&id, &synthetic_source_id(&query));
        prop_assert!(id.starts_with("simulated-source-"));
        prop_assert!(id.ends_with(".local"));
    }

    #[test]
    fn sub_queries_are_trimmed_and_non_empty(text in "[a-z \\n\\-*0-9.]{0,200}") {
        for sub_query in QueryPlanner::parse_sub_queries(&text) {
            prop_assert!(!sub_query.is_empty());
            prop_assert_eq!(sub_query.trim(), sub_query.as_str());
        }
    }

    #[test]
    fn fence_stripping_recovers_json(body in "\\{\"[a-z]{1,8}\": [0-9]{1,4}\\}") {
        let fenced = format!("Here you go:\n```json\n{body}\n```\nDone.");
        prop_assert_eq!(strip_code_fence(&fenced), body.as_str());
    }
}

// --- State reducer properties ---

proptest! {
    #[test]
    fn append_fields_never_shrink(
        batches in prop::collection::vec((0usize..4, 0usize..4, prop::option::of(0usize..10)), 0..12),
    ) {
        let mut state = ResearchState::new("q", 10);
        for (queries, claims, iteration) in batches {
            let before = state.snapshot();
            state.apply(StateUpdate {
                sub_queries: (0..queries).map(|i| format!("sq{i}")).collect(),
                validations: (0..claims).map(|_| validation(0.5)).collect(),
                current_iteration: iteration,
                ..StateUpdate::default()
            });
            let after = state.snapshot();
            prop_assert_eq!(after.sub_queries, before.sub_queries + queries);
            prop_assert_eq!(after.validations, before.validations + claims);
            prop_assert!(after.iteration >= before.iteration);
        }
    }
}
