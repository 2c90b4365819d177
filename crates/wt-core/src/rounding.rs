//! Rounding policies for adjusted times.

use serde::{Deserialize, Serialize};

/// How a time is moved onto a rounding grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Leave the time unchanged.
    #[default]
    None,
    /// Smallest multiple of the interval at or above the time.
    Up,
    /// Largest multiple of the interval at or below the time.
    Down,
    /// Closest multiple of the interval; ties round up.
    Nearest,
}

/// A rounding mode together with its grid interval in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    /// The rounding mode.
    pub mode: RoundingMode,
    /// Grid interval in minutes. Values of zero or less disable rounding.
    pub interval: i32,
}

impl RoundingPolicy {
    /// A policy that never changes the time.
    pub const NONE: Self = Self {
        mode: RoundingMode::None,
        interval: 0,
    };

    /// Creates a policy.
    #[must_use]
    pub const fn new(mode: RoundingMode, interval: i32) -> Self {
        Self { mode, interval }
    }

    /// Applies the policy to a time in minutes.
    ///
    /// An interval of zero or less behaves as [`RoundingMode::None`]; a
    /// misconfigured plan must not corrupt times.
    #[must_use]
    pub const fn apply(self, time: i32) -> i32 {
        if self.interval <= 0 {
            return time;
        }
        match self.mode {
            RoundingMode::None => time,
            RoundingMode::Up => {
                let rem = time.rem_euclid(self.interval);
                if rem == 0 { time } else { time + (self.interval - rem) }
            }
            RoundingMode::Down => time - time.rem_euclid(self.interval),
            RoundingMode::Nearest => {
                let rem = time.rem_euclid(self.interval);
                let down = time - rem;
                // Ties (exactly half the interval) round up.
                if rem * 2 >= self.interval {
                    down + self.interval
                } else {
                    down
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_leaves_time_unchanged() {
        let policy = RoundingPolicy::new(RoundingMode::None, 15);
        assert_eq!(policy.apply(483), 483);
    }

    #[test]
    fn up_moves_to_next_multiple() {
        let policy = RoundingPolicy::new(RoundingMode::Up, 15);
        assert_eq!(policy.apply(483), 495);
        assert_eq!(policy.apply(480), 480, "multiples stay put");
    }

    #[test]
    fn down_moves_to_previous_multiple() {
        let policy = RoundingPolicy::new(RoundingMode::Down, 15);
        assert_eq!(policy.apply(483), 480);
        assert_eq!(policy.apply(495), 495);
    }

    #[test]
    fn nearest_picks_closer_multiple() {
        let policy = RoundingPolicy::new(RoundingMode::Nearest, 15);
        assert_eq!(policy.apply(483), 480);
        assert_eq!(policy.apply(492), 495);
        // 08:00 on a 15-minute grid stays 08:00.
        assert_eq!(policy.apply(480), 480);
    }

    #[test]
    fn nearest_ties_round_up() {
        let policy = RoundingPolicy::new(RoundingMode::Nearest, 10);
        assert_eq!(policy.apply(485), 490);
        let policy = RoundingPolicy::new(RoundingMode::Nearest, 2);
        assert_eq!(policy.apply(481), 482);
    }

    #[test]
    fn down_bounds_time_bounds_up() {
        for time in [0, 1, 7, 8, 59, 60, 481, 1439] {
            let down = RoundingPolicy::new(RoundingMode::Down, 15).apply(time);
            let up = RoundingPolicy::new(RoundingMode::Up, 15).apply(time);
            assert!(down <= time, "down({time}) = {down}");
            assert!(time <= up, "up({time}) = {up}");
        }
    }

    #[test]
    fn nearest_stays_within_half_interval() {
        let policy = RoundingPolicy::new(RoundingMode::Nearest, 15);
        for time in 0..200 {
            let rounded = policy.apply(time);
            assert!((rounded - time).abs() * 2 <= 15, "nearest({time}) = {rounded}");
        }
    }

    #[test]
    fn rounding_is_idempotent() {
        for mode in [RoundingMode::Up, RoundingMode::Down, RoundingMode::Nearest] {
            let policy = RoundingPolicy::new(mode, 15);
            for time in [0, 1, 7, 8, 483, 492, 495] {
                let once = policy.apply(time);
                assert_eq!(policy.apply(once), once);
            }
        }
    }

    #[test]
    fn non_positive_interval_is_treated_as_none() {
        for interval in [0, -5] {
            let policy = RoundingPolicy::new(RoundingMode::Up, interval);
            assert_eq!(policy.apply(483), 483);
        }
    }
}
