// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use proptest::prelude::*;

use super::RetryPolicy;

#[test]
fn bidirectional_schedule_starts_at_one_second() {
    let policy = RetryPolicy::bidirectional();
    assert_eq!(policy.delay(0), Some(Duration::from_millis(1000)));
    assert_eq!(policy.delay(1), Some(Duration::from_millis(1500)));
    assert_eq!(policy.delay(2), Some(Duration::from_millis(2250)));
    assert_eq!(policy.delay(3), Some(Duration::from_millis(3375)));
}

#[test]
fn bidirectional_schedule_caps_at_thirty_seconds() {
    let policy = RetryPolicy::bidirectional();
    // 1000 * 1.5^9 = 38443ms, past the cap.
    assert_eq!(policy.delay(9), Some(Duration::from_millis(30_000)));
    assert_eq!(policy.delay(19), Some(Duration::from_millis(30_000)));
}

#[test]
fn bidirectional_budget_is_twenty_attempts() {
    let policy = RetryPolicy::bidirectional();
    assert!(policy.delay(19).is_some());
    assert_eq!(policy.delay(20), None);
    assert_eq!(policy.delay(u32::MAX), None);
}

#[test]
fn unidirectional_retries_forever_at_fixed_interval() {
    let policy = RetryPolicy::unidirectional();
    for attempt in [0, 1, 19, 20, 1000, u32::MAX] {
        assert_eq!(policy.delay(attempt), Some(Duration::from_millis(5000)));
    }
}

proptest! {
    #[test]
    fn bidirectional_delay_matches_formula(n in 0u32..20) {
        let expected = (1000.0 * 1.5f64.powi(n as i32)).min(30_000.0) as u64;
        prop_assert_eq!(RetryPolicy::bidirectional().delay(n), Some(Duration::from_millis(expected)));
    }

    #[test]
    fn bidirectional_delay_is_non_decreasing(n in 0u32..19) {
        let policy = RetryPolicy::bidirectional();
        let (Some(a), Some(b)) = (policy.delay(n), policy.delay(n + 1)) else {
            return Err(TestCaseError::fail("attempt within budget had no delay"));
        };
        prop_assert!(a <= b);
        prop_assert!(b <= Duration::from_millis(30_000));
    }
}
