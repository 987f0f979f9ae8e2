//! Property-based tests for routing.

mod common;

use std::sync::atomic::Ordering;

use common::{scratch, scratch_with, Counting};
use proptest::prelude::*;
use taskrune::{AgentConfig, FailureKind, Predicate, Registry, TaskOutcome, TaskText};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

fn arb_task_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,80}",
        Just("format and extract data".to_string()),
        Just("extract only".to_string()),
        "(format|extract|sort|dance) [a-z ]{0,20}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unmatched_text_runs_no_handler(text in arb_task_text()) {
        let (format, format_hits) = Counting::new("format");
        let (extract, extract_hits) = Counting::new("extract");
        let registry = Registry::builder()
            .register("F", Predicate::contains_all(&["format"]), format)
            .register("E", Predicate::contains_all(&["extract"]), extract)
            .build()
            .unwrap();
        let s = scratch_with(registry, AgentConfig::default());
        let task = TaskText::new(text.as_str());
        let expected: Vec<String> = s.agent.registry().matching_ids(&task).iter().map(|id| id.to_string()).collect();

        let outcome = runtime().block_on(s.agent.invoke(&text));
        let hits = format_hits.load(Ordering::SeqCst) + extract_hits.load(Ordering::SeqCst);
        if task.is_blank() || expected.is_empty() {
            prop_assert_eq!(outcome.kind(), Some(FailureKind::BadRequest));
            prop_assert_eq!(hits, 0);
        } else {
            let winner = if expected[0] == "F" { "format" } else { "extract" };
            prop_assert_eq!(outcome, TaskOutcome::success(winner, None));
            prop_assert_eq!(hits, 1);
        }
    }

    #[test]
    fn prop_builtin_routing_always_yields_one_outcome(text in "\\PC{0,120}") {
        let s = scratch();
        let outcome = runtime().block_on(s.agent.invoke(&text));
        // Any variant is fine; reaching here means no panic escaped.
        prop_assert!(outcome.is_success() || outcome.kind().is_some());
    }

    #[test]
    fn prop_call_order_does_not_change_the_winner(
        order in Just(
            (0..100)
                .map(|i| ["format and extract data", "extract data", "format it"][i % 3])
                .collect::<Vec<_>>()
        )
        .prop_shuffle()
    ) {
        let (format, _) = Counting::new("format");
        let (extract, _) = Counting::new("extract");
        let registry = Registry::builder()
            .register("F", Predicate::contains_all(&["format"]), format)
            .register("E", Predicate::contains_all(&["extract"]), extract)
            .build()
            .unwrap();
        let s = scratch_with(registry, AgentConfig::default());
        let rt = runtime();
        for text in order {
            let outcome = rt.block_on(s.agent.invoke(text));
            let expected = if text.contains("format") { "format" } else { "extract" };
            prop_assert_eq!(outcome, TaskOutcome::success(expected, None));
        }
    }
}
