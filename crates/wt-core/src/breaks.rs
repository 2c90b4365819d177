//! Break deduction rules.
//!
//! Booked break pairs always deduct their actual duration; the configured
//! rules then add to that baseline. Rules run in the day plan's order and
//! each sees the running total left by its predecessors, which is what makes
//! stacked minimum rules compose.

use serde::{Deserialize, Serialize};

use crate::types::Interval;

/// One configured break rule.
///
/// Plain configuration data; evaluation lives in [`resolve_breaks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakRule {
    /// Deduct `minutes` whenever work touches `window`, booked or not.
    Fixed {
        /// The clock window the rule guards.
        window: Interval,
        /// Minutes to deduct.
        minutes: i32,
    },
    /// Prefer a break booked inside `window`; deduct `minutes` only when
    /// none was booked there.
    Variable {
        /// The clock window the rule guards.
        window: Interval,
        /// Default minutes to deduct without a booked break.
        minutes: i32,
    },
    /// After `after_minutes` of worked time, ensure at least `minutes` of
    /// break have been deducted in total.
    Minimum {
        /// Worked-time threshold that arms the rule.
        after_minutes: i32,
        /// Minimum total break once armed.
        minutes: i32,
    },
}

/// Outcome of break resolution for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakResolution {
    /// Minutes deducted from gross time.
    pub break_minutes: i32,
    /// Resulting net minutes (`gross − break`, floored at zero).
    pub net_minutes: i32,
}

/// Computes break minutes for a day's work and break intervals.
///
/// The baseline deduction is the booked break time: a recorded absence from
/// work never counts as work, whether or not a rule mentions it. Rules then
/// apply in order:
///
/// - **fixed** adds its duration when any work interval overlaps its window;
/// - **variable** adds its default only when no booked break overlaps its
///   window (a booked break satisfies the rule with its actual duration,
///   which is already in the baseline);
/// - **minimum** arms once provisional net time exceeds its threshold and
///   tops the running total up to its duration.
///
/// The total never exceeds gross time.
pub fn resolve_breaks(
    work: &[Interval],
    booked_breaks: &[Interval],
    rules: &[BreakRule],
) -> BreakResolution {
    let gross: i32 = work.iter().map(|i| i.minutes()).sum();
    let mut total: i32 = booked_breaks.iter().map(|i| i.minutes()).sum();

    for rule in rules {
        match *rule {
            BreakRule::Fixed { window, minutes } => {
                if work.iter().any(|w| w.overlaps(window)) {
                    total += minutes;
                }
            }
            BreakRule::Variable { window, minutes } => {
                let booked_in_window = booked_breaks.iter().any(|b| b.overlaps(window));
                if !booked_in_window {
                    total += minutes;
                }
            }
            BreakRule::Minimum {
                after_minutes,
                minutes,
            } => {
                let provisional_net = gross - total;
                if provisional_net > after_minutes && total < minutes {
                    total = minutes;
                }
            }
        }
    }

    let break_minutes = total.clamp(0, gross);
    BreakResolution {
        break_minutes,
        net_minutes: gross - break_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: i32, end: i32) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn no_rules_no_breaks_deducts_nothing() {
        let resolution = resolve_breaks(&[iv(480, 1020)], &[], &[]);
        assert_eq!(resolution.break_minutes, 0);
        assert_eq!(resolution.net_minutes, 540);
    }

    #[test]
    fn booked_break_deducts_actual_duration() {
        let resolution = resolve_breaks(&[iv(480, 1020)], &[iv(720, 740)], &[]);
        assert_eq!(resolution.break_minutes, 20);
        assert_eq!(resolution.net_minutes, 520);
    }

    #[test]
    fn fixed_rule_deducts_without_booking() {
        let rules = [BreakRule::Fixed {
            window: iv(720, 750),
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 1020)], &[], &rules);
        assert_eq!(resolution.break_minutes, 30);
    }

    #[test]
    fn fixed_rule_deducts_on_top_of_booked_break() {
        // Fixed rules apply regardless of whether a break was booked.
        let rules = [BreakRule::Fixed {
            window: iv(720, 750),
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 1020)], &[iv(720, 740)], &rules);
        assert_eq!(resolution.break_minutes, 50);
    }

    #[test]
    fn fixed_rule_ignores_untouched_window() {
        let rules = [BreakRule::Fixed {
            window: iv(720, 750),
            minutes: 30,
        }];
        // Work ends before the window opens.
        let resolution = resolve_breaks(&[iv(360, 700)], &[], &rules);
        assert_eq!(resolution.break_minutes, 0);
    }

    #[test]
    fn variable_rule_uses_default_without_booking() {
        // Work 08:03-17:07, variable rule 12:00-12:30 default 30.
        let rules = [BreakRule::Variable {
            window: iv(720, 750),
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(483, 1027)], &[], &rules);
        assert_eq!(resolution.break_minutes, 30);
        assert_eq!(resolution.net_minutes, 514);
    }

    #[test]
    fn variable_rule_prefers_booked_duration() {
        let rules = [BreakRule::Variable {
            window: iv(720, 750),
            minutes: 30,
        }];
        // 20 booked minutes inside the window stand in for the default.
        let resolution = resolve_breaks(&[iv(480, 1020)], &[iv(725, 745)], &rules);
        assert_eq!(resolution.break_minutes, 20);
    }

    #[test]
    fn variable_rule_default_applies_when_booking_misses_window() {
        let rules = [BreakRule::Variable {
            window: iv(720, 750),
            minutes: 30,
        }];
        // Booked break in the morning: deducts itself, and the window rule
        // still adds its default.
        let resolution = resolve_breaks(&[iv(480, 1020)], &[iv(600, 615)], &rules);
        assert_eq!(resolution.break_minutes, 45);
    }

    #[test]
    fn minimum_rule_tops_up_shortfall() {
        // Worked 420, booked break 10, minimum "after 360, at least 30":
        // provisional net 410 > 360, so 20 more minutes are deducted.
        let rules = [BreakRule::Minimum {
            after_minutes: 360,
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 900)], &[iv(700, 710)], &rules);
        assert_eq!(resolution.break_minutes, 30);
        assert_eq!(resolution.net_minutes, 390);
    }

    #[test]
    fn minimum_rule_stays_quiet_below_threshold() {
        let rules = [BreakRule::Minimum {
            after_minutes: 360,
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 820)], &[], &rules);
        assert_eq!(resolution.break_minutes, 0, "340 net does not arm the rule");
    }

    #[test]
    fn minimum_rule_satisfied_by_existing_deduction() {
        let rules = [BreakRule::Minimum {
            after_minutes: 360,
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 1020)], &[iv(720, 760)], &rules);
        assert_eq!(resolution.break_minutes, 40, "40 booked already satisfies 30");
    }

    #[test]
    fn stacked_minimum_rules_apply_in_threshold_order() {
        // German-style: 30 after 6h, 45 after 9h.
        let rules = [
            BreakRule::Minimum {
                after_minutes: 360,
                minutes: 30,
            },
            BreakRule::Minimum {
                after_minutes: 540,
                minutes: 45,
            },
        ];
        // 10h gross: first rule deducts 30, provisional net 570 > 540 arms
        // the second, which tops up to 45.
        let resolution = resolve_breaks(&[iv(420, 1020)], &[], &rules);
        assert_eq!(resolution.break_minutes, 45);
        assert_eq!(resolution.net_minutes, 555);

        // 8h gross: only the first rule fires.
        let resolution = resolve_breaks(&[iv(480, 960)], &[], &rules);
        assert_eq!(resolution.break_minutes, 30);
    }

    #[test]
    fn later_rules_see_earlier_deductions() {
        let rules = [
            BreakRule::Variable {
                window: iv(720, 750),
                minutes: 30,
            },
            BreakRule::Minimum {
                after_minutes: 360,
                minutes: 45,
            },
        ];
        // 9h gross, no bookings: variable adds 30, net 510 arms the minimum,
        // which only needs to add the 15-minute shortfall.
        let resolution = resolve_breaks(&[iv(480, 1020)], &[], &rules);
        assert_eq!(resolution.break_minutes, 45);
    }

    #[test]
    fn break_total_never_exceeds_gross() {
        let rules = [BreakRule::Fixed {
            window: iv(480, 510),
            minutes: 60,
        }];
        let resolution = resolve_breaks(&[iv(480, 510)], &[], &rules);
        assert_eq!(resolution.break_minutes, 30);
        assert_eq!(resolution.net_minutes, 0);
    }

    #[test]
    fn split_work_intervals_count_together() {
        let rules = [BreakRule::Minimum {
            after_minutes: 360,
            minutes: 30,
        }];
        let resolution = resolve_breaks(&[iv(480, 720), iv(780, 1020)], &[], &rules);
        // 480 gross across two spans arms the rule.
        assert_eq!(resolution.break_minutes, 30);
        assert_eq!(resolution.net_minutes, 450);
    }
}
