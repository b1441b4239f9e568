//! Jitter envelope shared by every strategy: `delay +/- 10%`, uniform.
//!
//! Derives pseudo-randomness from the low bits of the system clock instead
//! of pulling in the `rand` crate purely for this.

use std::time::SystemTime;

/// Apply a uniform `[-0.1, +0.1]` jitter envelope to `delay_secs`, floored at
/// zero, matching spec.md §4.1.1's `ExponentialBackoff`/`FixedDelay` jitter.
pub fn apply_jitter(delay_secs: f64) -> f64 {
    if delay_secs <= 0.0 {
        return 0.0;
    }
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    // Map the low bits of the clock to a uniform value in [-1.0, 1.0].
    let unit = (nanos % 2000) as f64 / 1000.0 - 1.0;
    (delay_secs + delay_secs * 0.1 * unit).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(apply_jitter(0.0), 0.0);
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        for _ in 0..50 {
            let jittered = apply_jitter(10.0);
            assert!(jittered >= 9.0 && jittered <= 11.0, "got {jittered}");
        }
    }
}
