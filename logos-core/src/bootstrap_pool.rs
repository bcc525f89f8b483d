// SPDX-License-Identifier: Apache-2.0

//! Pure connection-pool sizing, eviction, and retry/redirect math for a bootstrap attempt. Kept
//! as free functions over plain numbers so the heuristics are unit-testable without a network,
//! the same way `commit_syncer.rs`'s scheduling math (`unhandled_commits_threshold`,
//! parallel-fetch capping) is tested independently of any socket.

use std::time::Duration;

/// How many pull attempts a `PullRequest` gets against ordinary pool peers before it is
/// redirected to the peer that answered the original frontier request.
pub const MAX_ORDINARY_PULL_ATTEMPTS: u32 = 16;

/// Target connection count: `min(max, base + (max - base) * min(1, pulls / 50000))`. A small
/// sync (a handful of pulls) only ever needs `base` connections; a large catch-up scales up to
/// `max` as the pending-pull count approaches 50,000.
pub fn target_connection_count(base: u32, max: u32, pending_pulls: usize) -> u32 {
    let max = max.max(base);
    let scale = (pending_pulls as f64 / 50_000.0).min(1.0);
    let target = base as f64 + (max - base) as f64 * scale;
    target.round() as u32
}

/// Number of slowest peers to evict in one eviction round, once more than 2/3 of the target
/// connection count is active: `round(sqrt(target - 2))`. Below the 2/3-active watermark, no
/// eviction round runs.
pub fn eviction_round_size(active_connections: usize, target: u32) -> usize {
    if target < 2 {
        return 0;
    }
    if active_connections * 3 < target as usize * 2 {
        return 0;
    }
    ((target as f64 - 2.0).sqrt()).round() as usize
}

/// True if a peer connection open for `elapsed` and having transferred `blocks_received`
/// blocks / `bytes_received` bytes should be evicted: below 10 blocks/sec after a 5-second
/// warmup, or below 1500 bit/s after 30 seconds.
pub fn is_peer_too_slow(elapsed: Duration, blocks_received: u64, bytes_received: u64) -> bool {
    let secs = elapsed.as_secs_f64();
    if secs < 5.0 {
        return false;
    }
    let block_rate = blocks_received as f64 / secs;
    if block_rate < 10.0 {
        return true;
    }
    if secs >= 30.0 {
        let bit_rate = (bytes_received as f64 * 8.0) / secs;
        if bit_rate < 1500.0 {
            return true;
        }
    }
    false
}

/// What should happen to a pull after its in-flight connection was dropped or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullRetryDecision {
    /// Re-queue onto the ordinary pool with `attempts + 1`.
    RetryOrdinary,
    /// `attempts` has reached the limit: redirect this one pull to the peer that answered the
    /// original frontier request, rather than any pool peer.
    RedirectToFrontierPeer,
    /// Past the redirect attempt too: give up and log it.
    Abandon,
}

/// Classifies what to do with a pull whose `attempts` count is about to become `attempts + 1`:
/// after a retry limit of 16 the pull is redirected to the frontier peer, and beyond that it is
/// abandoned.
pub fn classify_retry(attempts_before_this_failure: u32) -> PullRetryDecision {
    if attempts_before_this_failure < MAX_ORDINARY_PULL_ATTEMPTS {
        PullRetryDecision::RetryOrdinary
    } else if attempts_before_this_failure == MAX_ORDINARY_PULL_ATTEMPTS {
        PullRetryDecision::RedirectToFrontierPeer
    } else {
        PullRetryDecision::Abandon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sync_stays_at_base() {
        assert_eq!(target_connection_count(4, 64, 0), 4);
        assert_eq!(target_connection_count(4, 64, 10), 4);
    }

    #[test]
    fn huge_catchup_scales_to_max() {
        assert_eq!(target_connection_count(4, 64, 50_000), 64);
        assert_eq!(target_connection_count(4, 64, 1_000_000), 64);
    }

    #[test]
    fn scales_linearly_between_base_and_max() {
        let half = target_connection_count(4, 64, 25_000);
        assert_eq!(half, 34); // 4 + 60 * 0.5 = 34
    }

    #[test]
    fn eviction_is_zero_below_two_thirds_active() {
        assert_eq!(eviction_round_size(2, 10), 0);
    }

    #[test]
    fn eviction_round_size_matches_sqrt_formula() {
        // target=11, 2/3 watermark is active*3 >= 22 => active >= 8.
        assert_eq!(eviction_round_size(8, 11), 3); // round(sqrt(9)) = 3
    }

    #[test]
    fn warmup_period_never_evicts() {
        assert!(!is_peer_too_slow(Duration::from_secs(2), 0, 0));
    }

    #[test]
    fn slow_block_rate_after_warmup_is_evicted() {
        assert!(is_peer_too_slow(Duration::from_secs(6), 5, 1_000_000));
        assert!(!is_peer_too_slow(Duration::from_secs(6), 100, 1_000_000));
    }

    #[test]
    fn slow_bit_rate_only_applies_after_30s() {
        // low bit rate but fast enough block rate, and before 30s: not evicted.
        assert!(!is_peer_too_slow(Duration::from_secs(10), 1000, 10));
        // same low bit rate after 30s: evicted.
        assert!(is_peer_too_slow(Duration::from_secs(31), 1000, 10));
    }

    #[test]
    fn retry_classification_follows_attempt_thresholds() {
        assert_eq!(classify_retry(0), PullRetryDecision::RetryOrdinary);
        assert_eq!(classify_retry(15), PullRetryDecision::RetryOrdinary);
        assert_eq!(
            classify_retry(16),
            PullRetryDecision::RedirectToFrontierPeer
        );
        assert_eq!(classify_retry(17), PullRetryDecision::Abandon);
    }
}
