//! Poll interval strategies.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the delay between receipt polls evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStrategy {
    /// Same delay after every empty poll.
    #[default]
    Fixed,
    /// Doubling delay with up to 10% jitter, capped.
    Exponential,
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay to wait after the `attempt`-th empty poll (1-based).
pub fn poll_delay(strategy: PollStrategy, attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    match strategy {
        PollStrategy::Fixed => Duration::from_millis(base_ms),
        PollStrategy::Exponential => calculate_backoff(attempt, base_ms, max_ms),
    }
}
