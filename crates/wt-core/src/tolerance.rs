//! Snapping paired times to expected boundaries.

/// Snaps `time` to `expected` when within `tolerance` minutes of it.
///
/// Applied independently to the come and go boundaries, which may carry
/// different tolerance values. Break times are never adjusted. A tolerance of
/// zero snaps only an exact match; a negative tolerance never snaps.
#[must_use]
pub const fn snap_to_expected(time: i32, expected: i32, tolerance: i32) -> i32 {
    if (time - expected).abs() <= tolerance {
        expected
    } else {
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_within_tolerance() {
        // 07:58 with expected 08:00 and tolerance 5 adjusts to 08:00.
        assert_eq!(snap_to_expected(478, 480, 5), 480);
        assert_eq!(snap_to_expected(485, 480, 5), 480);
        assert_eq!(snap_to_expected(480, 480, 5), 480);
    }

    #[test]
    fn is_a_no_op_outside_tolerance() {
        assert_eq!(snap_to_expected(474, 480, 5), 474);
        assert_eq!(snap_to_expected(486, 480, 5), 486);
    }

    #[test]
    fn boundary_of_window_still_snaps() {
        assert_eq!(snap_to_expected(475, 480, 5), 480);
        assert_eq!(snap_to_expected(485, 480, 5), 480);
    }

    #[test]
    fn idempotent_on_its_own_output() {
        for time in [474, 478, 480, 485, 486] {
            let once = snap_to_expected(time, 480, 5);
            assert_eq!(snap_to_expected(once, 480, 5), once);
        }
    }

    #[test]
    fn zero_tolerance_snaps_only_exact_match() {
        assert_eq!(snap_to_expected(480, 480, 0), 480);
        assert_eq!(snap_to_expected(481, 480, 0), 481);
    }

    #[test]
    fn negative_tolerance_never_snaps() {
        assert_eq!(snap_to_expected(480, 480, -1), 480);
        assert_eq!(snap_to_expected(481, 480, -1), 481);
    }
}
