//! Recalculation service for the worktime platform.
//!
//! This crate owns the operational concerns around the pure calculation
//! pipeline in `wt-core`:
//! - Per-day locking: at most one in-flight calculation per (employee, date)
//! - The closing gate: mutating a closed month aborts before any write
//! - Atomic commits: DailyValue, account postings and booking write-backs
//!   land in one transaction, replaced wholesale on every recalculation
//! - Batch month recalculation and monthly aggregation with carryover

pub mod lock;
pub mod providers;
pub mod service;

pub use lock::{DayGuard, DayLock};
pub use providers::{Calendar, PlanError, PlanSource, StaticPlan};
pub use service::{Engine, EngineError};
