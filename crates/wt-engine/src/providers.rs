//! External collaborator seams.
//!
//! Tariff and week-plan resolution, absence records and the holiday calendar
//! are owned by the surrounding service layer; the engine only consumes
//! their resolved answers through these traits.

use chrono::NaiveDate;
use thiserror::Error;

use wt_core::{Absence, DayPlan, EmployeeId};

/// Failure to resolve a day plan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// No plan is configured for the employee-date.
    #[error("no day plan for employee {employee} on {date}")]
    NotFound { employee: String, date: NaiveDate },
    /// The plan source itself failed.
    #[error("plan source unavailable: {message}")]
    Unavailable { message: String },
}

/// Resolves the effective day plan for an employee-date.
pub trait PlanSource {
    /// The resolved plan for the date.
    fn day_plan(&self, employee: &EmployeeId, date: NaiveDate) -> Result<DayPlan, PlanError>;
}

/// Absence and holiday lookups.
pub trait Calendar {
    /// The absence recorded for the employee-date, if any.
    fn absence(&self, employee: &EmployeeId, date: NaiveDate) -> Option<Absence>;

    /// Whether the date is a public holiday.
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// A plan source answering every date with the same plan.
///
/// Stands in for real tariff resolution in tests and single-plan setups.
#[derive(Debug, Clone)]
pub struct StaticPlan(pub DayPlan);

impl PlanSource for StaticPlan {
    fn day_plan(&self, _employee: &EmployeeId, _date: NaiveDate) -> Result<DayPlan, PlanError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_plan_answers_every_date() {
        let plan = DayPlan {
            target_minutes: 480,
            ..DayPlan::default()
        };
        let source = StaticPlan(plan.clone());
        let employee = EmployeeId::new("emp-1").unwrap();
        let resolved = source
            .day_plan(&employee, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
            .unwrap();
        assert_eq!(resolved, plan);
    }
}
