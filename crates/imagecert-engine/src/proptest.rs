//! Property-based tests for the engine.
//!
//! Whatever the mix of verdicts, a completed run records every policy member exactly
//! once, in policy order within each bucket.

use crate::check::Requirement;
use crate::engine::{CheckEngine, EngineOptions, Services};
use crate::registry::CheckRegistry;
use crate::target::Target;
use crate::test_support::{Behavior, StubCheck, leak};
use proptest::prelude::*;

const NAMES: [&str; 8] = ["C0", "C1", "C2", "C3", "C4", "C5", "C6", "C7"];

fn arb_behavior() -> impl Strategy<Value = Behavior> {
    prop_oneof![
        Just(Behavior::Pass),
        Just(Behavior::Fail),
        Just(Behavior::Error),
    ]
}

fn arb_policy() -> impl Strategy<Value = Vec<(usize, Behavior)>> {
    prop::collection::vec(arb_behavior(), 1..=NAMES.len()).prop_flat_map(|behaviors| {
        let len = behaviors.len();
        (Just(behaviors), Just((0..len).collect::<Vec<_>>()).prop_shuffle()).prop_map(
            |(behaviors, order)| order.into_iter().map(|i| (i, behaviors[i])).collect(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_member_lands_in_exactly_one_bucket(policy in arb_policy()) {
        let mut builder = CheckRegistry::builder();
        let mut sorted = policy.clone();
        sorted.sort_by_key(|(i, _)| *i);
        for (i, behavior) in &sorted {
            let check = leak(StubCheck::new(NAMES[*i], Requirement::Reference, *behavior));
            builder.register(check, &["p"]).expect("register");
        }
        let registry = builder.build();

        let names: Vec<&str> = policy.iter().map(|(i, _)| NAMES[*i]).collect();
        let mut engine = CheckEngine::for_policy(
            &registry,
            &names,
            Target::Image("quay.io/p/q:1".to_string()),
            EngineOptions::default(),
        )
        .expect("engine");
        engine.execute_checks(Services::default()).expect("run");
        let results = engine.results();

        prop_assert_eq!(results.len(), names.len());
        for name in &names {
            prop_assert_eq!(results.find(name).len(), 1);
        }

        for (bucket, expected) in [
            (&results.passed, Behavior::Pass),
            (&results.failed, Behavior::Fail),
            (&results.errors, Behavior::Error),
        ] {
            let got: Vec<&str> = bucket.iter().map(|r| r.name.as_str()).collect();
            let want: Vec<&str> = policy
                .iter()
                .filter(|(_, b)| std::mem::discriminant(b) == std::mem::discriminant(&expected))
                .map(|(i, _)| NAMES[*i])
                .collect();
            prop_assert_eq!(got, want);
        }
    }
}
