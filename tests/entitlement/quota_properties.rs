use proptest::prelude::*;
use subtrack_core::{EffectiveEntitlement, Feature};

fn quota_feature() -> Feature {
    Feature::quota("active_subs", "Active subscriptions")
}

proptest! {
    #[test]
    fn remaining_is_never_negative(limit in 0i64..10_000, used in 0i64..20_000) {
        let entry = EffectiveEntitlement::quota(&quota_feature(), Some(limit), used);
        let remaining = entry.remaining.unwrap();
        prop_assert!(remaining >= 0);
        prop_assert_eq!(remaining, (limit - used).max(0));
    }

    #[test]
    fn enabled_limited_quota_has_headroom(limit in 0i64..10_000, used in 0i64..20_000) {
        let entry = EffectiveEntitlement::quota(&quota_feature(), Some(limit), used);
        prop_assert_eq!(entry.enabled, used < limit);
        if entry.enabled {
            prop_assert!(entry.remaining.unwrap() > 0);
        }
    }

    #[test]
    fn unlimited_quota_is_always_enabled(used in any::<i64>()) {
        let entry = EffectiveEntitlement::quota(&quota_feature(), None, used);
        prop_assert!(entry.enabled);
        prop_assert_eq!(entry.remaining, None);
        prop_assert_eq!(entry.used, Some(used));
    }

    #[test]
    fn extreme_values_do_not_overflow(limit in any::<i64>(), used in any::<i64>()) {
        let entry = EffectiveEntitlement::quota(&quota_feature(), Some(limit), used);
        prop_assert!(entry.remaining.unwrap() >= 0);
    }
}
