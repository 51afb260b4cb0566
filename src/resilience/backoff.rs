//! Exponential backoff with jitter between attempts on the same instance.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is the number of attempts already made; attempt 0 never waits.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 || base_ms == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Up to 10% jitter on top of the capped delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 50, 500), Duration::ZERO);

        let b1 = calculate_backoff(1, 50, 500);
        assert!(b1.as_millis() >= 50 && b1.as_millis() < 55);

        let b2 = calculate_backoff(2, 50, 500);
        assert!(b2.as_millis() >= 100);

        let capped = calculate_backoff(10, 50, 500);
        assert!(capped.as_millis() >= 500 && capped.as_millis() < 550);
    }

    #[test]
    fn test_zero_base_disables_backoff() {
        assert_eq!(calculate_backoff(3, 0, 500), Duration::ZERO);
    }
}
