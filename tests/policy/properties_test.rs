/*!
 * Property Tests
 * Validation, self-correction and dispatch purity over arbitrary inputs
 */

use super::common::{image, kernel, process};
use hardening_kernel::{
    validate_request, validate_result, FeatureState, FeatureStateKind, FlagSet, Mitigation,
    PolicyError, SimpleFeatureState,
};
use proptest::prelude::*;

fn known_bits() -> u32 {
    FlagSet::all().bits()
}

fn mitigation() -> impl Strategy<Value = Mitigation> {
    (0..Mitigation::ALL.len()).prop_map(|i| Mitigation::ALL[i])
}

/// A known, conflict-free request: each mitigation enabled, disabled or unset
fn valid_request() -> impl Strategy<Value = FlagSet> {
    (prop::collection::vec(0u8..3, Mitigation::ALL.len()), any::<bool>()).prop_map(
        |(choices, prefer)| {
            let mut flags = FlagSet::empty();
            for (m, choice) in Mitigation::ALL.iter().zip(choices) {
                match choice {
                    1 => flags |= m.enable(),
                    2 => flags |= m.disable(),
                    _ => {}
                }
            }
            if prefer {
                flags |= FlagSet::PREFER_ACL;
            }
            flags
        },
    )
}

proptest! {
    #[test]
    fn prop_unknown_bits_are_malformed(raw in any::<u32>()) {
        prop_assume!(raw & !known_bits() != 0);
        let result = validate_request(FlagSet::from_raw(raw));
        prop_assert_eq!(result, Err(PolicyError::MalformedRequest { flags: raw }));
    }

    #[test]
    fn prop_conflicting_pair_is_rejected(base in valid_request(), m in mitigation()) {
        let mode = base | m.pair();
        prop_assert_eq!(
            validate_request(mode),
            Err(PolicyError::ConflictingRequest { flags: mode.bits() })
        );
    }

    #[test]
    fn prop_valid_requests_pass(mode in valid_request()) {
        prop_assert!(validate_request(mode).is_ok());
        prop_assert!(validate_result(mode).is_ok());
    }

    #[test]
    fn prop_four_way_validator_stabilizes(raw in any::<i64>()) {
        let first = FeatureState::validate(raw);
        if (0..=3).contains(&raw) {
            prop_assert!(first.ok);
            prop_assert_eq!(first.state.as_raw(), raw);
        } else {
            prop_assert!(!first.ok);
            prop_assert_eq!(first.state, FeatureState::SAFE_DEFAULT);
        }
        let second = FeatureState::validate(first.state.as_raw());
        prop_assert!(second.ok);
        prop_assert_eq!(second.state, first.state);
    }

    #[test]
    fn prop_simple_validator_stabilizes(raw in any::<i64>()) {
        let first = SimpleFeatureState::validate(raw);
        prop_assert_eq!(first.ok, raw == 0 || raw == 1);
        if !first.ok {
            prop_assert_eq!(first.state, SimpleFeatureState::Enabled);
        }
        let second = SimpleFeatureState::validate(first.state.as_raw());
        prop_assert!(second.ok);
        prop_assert_eq!(second.state, first.state);
    }

    #[test]
    fn prop_activation_is_idempotent(mode in valid_request()) {
        let kernel = kernel();
        let thread = process(&kernel, "app");
        // keep the sticky short-circuit out of the second run
        let mode = mode - FlagSet::PREFER_ACL;
        let img = image("/opt/app").with_extattr_flags(mode.bits());

        let first = kernel.engine().activate(&thread, &img).unwrap();
        let second = kernel.engine().activate(&thread, &img).unwrap();
        prop_assert_eq!(first.committed, second.committed);
        prop_assert!(!second.skipped);
    }

    #[test]
    fn prop_committed_policy_is_valid_and_complete(mode in valid_request()) {
        let kernel = kernel();
        let thread = process(&kernel, "app");
        let img = image("/opt/app").with_acl_flags(mode.bits());

        let report = kernel.engine().activate(&thread, &img).unwrap();
        prop_assert!(validate_result(report.committed).is_ok());
        prop_assert_eq!(
            report.committed.contains(FlagSet::PREFER_ACL),
            mode.contains(FlagSet::PREFER_ACL)
        );
        // every standard module decides its mitigation one way or the other
        for m in Mitigation::ALL {
            prop_assert!(report.committed.intersects(m.pair()));
        }
    }
}
