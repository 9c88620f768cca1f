// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry backoff: exponential growth with a cap and jitter.

use fuku_core::RetryPolicy;
use std::time::Duration;

/// Delay before start attempt `attempt` (1-based; attempt 1 is the first
/// retry). Grows as `base * 2^(attempt-1)` up to the policy cap, with a
/// ±25% jitter derived from `seed` so simultaneous failures do not restart
/// in lockstep.
pub(crate) fn retry_delay(policy: &RetryPolicy, attempt: u32, seed: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let unjittered = policy
        .base_delay
        .saturating_mul(1u32 << exponent.min(31))
        .min(policy.max_delay);

    let base_ms = unjittered.as_millis() as u64;
    let span = base_ms / 4;
    if span == 0 {
        return unjittered;
    }
    // seed → offset in [-span, +span]
    let offset = seed % (2 * span + 1);
    Duration::from_millis(base_ms - span + offset)
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
