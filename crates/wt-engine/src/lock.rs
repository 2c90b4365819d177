//! Per-day calculation locking.
//!
//! At most one calculation may be in flight per (employee, date): two
//! concurrent recalculations of the same day could interleave their
//! DailyValue and AccountValue writes. Locking is keyed, so different
//! employees and different dates never block each other.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use chrono::NaiveDate;

use wt_core::EmployeeId;

type Key = (EmployeeId, NaiveDate);

/// Keyed mutual exclusion over (employee, date) pairs.
#[derive(Debug, Default)]
pub struct DayLock {
    held: Mutex<HashSet<Key>>,
    released: Condvar,
}

impl DayLock {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the (employee, date) slot is free, then holds it.
    ///
    /// The slot is released when the returned guard drops.
    pub fn acquire(&self, employee: &EmployeeId, date: NaiveDate) -> DayGuard<'_> {
        let key = (employee.clone(), date);
        let mut held = self.held.lock().expect("day lock poisoned");
        while held.contains(&key) {
            held = self.released.wait(held).expect("day lock poisoned");
        }
        held.insert(key.clone());
        drop(held);
        DayGuard { lock: self, key }
    }
}

/// Holds one (employee, date) slot; releases it on drop.
#[derive(Debug)]
pub struct DayGuard<'a> {
    lock: &'a DayLock,
    key: Key,
}

impl Drop for DayGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.lock.held.lock().expect("day lock poisoned");
        held.remove(&self.key);
        drop(held);
        self.lock.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn employee(id: &str) -> EmployeeId {
        EmployeeId::new(id).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn same_key_is_mutually_exclusive() {
        let lock = Arc::new(DayLock::new());
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let in_flight = Arc::clone(&in_flight);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    let _guard = lock.acquire(&employee("emp-1"), date());
                    if in_flight.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(2));
                    in_flight.store(false, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0, "no two holders at once");
    }

    #[test]
    fn different_keys_do_not_block() {
        let lock = DayLock::new();
        let _a = lock.acquire(&employee("emp-1"), date());
        // A different employee and a different date acquire immediately.
        let _b = lock.acquire(&employee("emp-2"), date());
        let _c = lock.acquire(&employee("emp-1"), date().succ_opt().unwrap());
    }

    #[test]
    fn slot_is_reusable_after_release() {
        let lock = DayLock::new();
        drop(lock.acquire(&employee("emp-1"), date()));
        let _again = lock.acquire(&employee("emp-1"), date());
    }
}
