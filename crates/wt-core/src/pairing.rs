//! Matching a day's bookings into directional pairs.
//!
//! A single forward pass over the chronologically sorted bookings keeps one
//! open slot per interval kind. Start categories open the slot, the next end
//! of the same kind closes it into a pair. Nothing here ever fails: unmatched
//! events are reported with a reason and the rest of the day still pairs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::booking::{Booking, PairKind};
use crate::types::{BookingId, Interval};

/// A matched start/end pair of bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPair {
    /// The opening booking.
    pub start_id: BookingId,
    /// The closing booking.
    pub end_id: BookingId,
    /// Effective time of the opening booking.
    pub start: i32,
    /// Effective time of the closing booking.
    pub end: i32,
    /// Interval kind of both bookings.
    pub kind: PairKind,
}

impl BookingPair {
    /// The pair as a minute interval.
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end).expect("pairing only closes forward in time")
    }

    /// Pair length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> i32 {
        self.end - self.start
    }
}

/// Why a booking could not be paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpairedReason {
    /// A second start of the same kind arrived while this start was open.
    Overlapping,
    /// An end arrived with no open start of its kind.
    EndWithoutStart,
    /// A start was still open at the end of the day.
    StartWithoutEnd,
}

/// A booking left without a counterpart, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unpaired {
    /// The affected booking.
    pub booking_id: BookingId,
    /// Interval kind the booking belongs to.
    pub kind: PairKind,
    /// Why it stayed unpaired.
    pub reason: UnpairedReason,
}

/// Result of pairing one employee-day's bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Matched pairs in chronological order.
    pub pairs: Vec<BookingPair>,
    /// Bookings without a counterpart, in scan order.
    pub unpaired: Vec<Unpaired>,
}

impl Pairing {
    /// Intervals of the pairs counting toward gross work time.
    pub fn work_intervals(&self) -> Vec<Interval> {
        self.pairs
            .iter()
            .filter(|p| p.kind.is_work_time())
            .map(BookingPair::interval)
            .collect()
    }

    /// Intervals of the break pairs.
    pub fn break_intervals(&self) -> Vec<Interval> {
        self.pairs
            .iter()
            .filter(|p| p.kind == PairKind::Break)
            .map(BookingPair::interval)
            .collect()
    }

    /// Whether any unpaired booking carries the given reason.
    pub fn has_unpaired(&self, reason: UnpairedReason) -> bool {
        self.unpaired.iter().any(|u| u.reason == reason)
    }
}

/// One open start waiting for its end.
struct OpenStart {
    id: BookingId,
    time: i32,
}

/// Pairs the bookings of one employee-day by category and chronology.
///
/// Bookings are ordered by `(effective time, category sort rank, id)`, which
/// makes the result deterministic for any input order, including same-minute
/// ties (starts before ends, outer kinds outermost). When a second start of an
/// already open kind arrives, the superseded start is reported as
/// [`UnpairedReason::Overlapping`] and the newer start takes the slot.
pub fn pair_bookings(bookings: &[Booking]) -> Pairing {
    let mut ordered: Vec<&Booking> = bookings.iter().collect();
    ordered.sort_by(|a, b| {
        (a.effective_time(), a.category.sort_rank(), &a.id).cmp(&(
            b.effective_time(),
            b.category.sort_rank(),
            &b.id,
        ))
    });

    let mut open: HashMap<PairKind, OpenStart> = HashMap::new();
    let mut pairs = Vec::new();
    let mut unpaired = Vec::new();

    for booking in ordered {
        let kind = booking.category.kind();
        let time = booking.effective_time();

        if booking.category.is_start() {
            if let Some(superseded) = open.insert(
                kind,
                OpenStart {
                    id: booking.id.clone(),
                    time,
                },
            ) {
                unpaired.push(Unpaired {
                    booking_id: superseded.id,
                    kind,
                    reason: UnpairedReason::Overlapping,
                });
            }
        } else if let Some(start) = open.remove(&kind) {
            pairs.push(BookingPair {
                start_id: start.id,
                end_id: booking.id.clone(),
                start: start.time,
                end: time,
                kind,
            });
        } else {
            unpaired.push(Unpaired {
                booking_id: booking.id.clone(),
                kind,
                reason: UnpairedReason::EndWithoutStart,
            });
        }
    }

    // Anything still open at day's end has no go booking.
    let mut leftovers: Vec<(PairKind, OpenStart)> = open.into_iter().collect();
    leftovers.sort_by_key(|(_, start)| (start.time, start.id.clone()));
    for (kind, start) in leftovers {
        unpaired.push(Unpaired {
            booking_id: start.id,
            kind,
            reason: UnpairedReason::StartWithoutEnd,
        });
    }

    Pairing { pairs, unpaired }
}
