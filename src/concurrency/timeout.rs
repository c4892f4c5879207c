//! Randomized lock wait windows.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws one wait window per lock request from `[min, max]`.
///
/// Randomizing the window keeps two transactions that wait on each other
/// from timing out in lockstep. With a fixed seed the sequence of windows
/// is reproducible.
#[derive(Debug)]
pub struct TimeoutPolicy {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl TimeoutPolicy {
    /// Create a policy. Bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration, seed: Option<u64>) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            min,
            max,
            rng: Mutex::new(rng),
        }
    }

    /// Draw the window for one request.
    pub fn draw(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        self.rng.lock().gen_range(self.min..=self.max)
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_within_bounds() {
        let policy = TimeoutPolicy::new(Duration::from_millis(10), Duration::from_millis(30), None);
        for _ in 0..100 {
            let window = policy.draw();
            assert!(window >= Duration::from_millis(10));
            assert!(window <= Duration::from_millis(30));
        }
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let a = TimeoutPolicy::new(Duration::from_millis(1000), Duration::from_millis(3000), Some(9));
        let b = TimeoutPolicy::new(Duration::from_millis(1000), Duration::from_millis(3000), Some(9));

        let first: Vec<Duration> = (0..10).map(|_| a.draw()).collect();
        let second: Vec<Duration> = (0..10).map(|_| b.draw()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_range() {
        let policy = TimeoutPolicy::new(Duration::from_millis(5), Duration::from_millis(5), None);
        assert_eq!(policy.draw(), Duration::from_millis(5));
    }

    #[test]
    fn test_swapped_bounds() {
        let policy = TimeoutPolicy::new(Duration::from_millis(9), Duration::from_millis(3), Some(1));
        assert_eq!(
            policy.bounds(),
            (Duration::from_millis(3), Duration::from_millis(9))
        );
    }
}
