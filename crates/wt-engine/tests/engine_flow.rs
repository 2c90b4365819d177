//! End-to-end tests for the calculation pipeline.
//!
//! Walks the full flow: bookings in, daily values and postings out, monthly
//! aggregation with carryover, closing and reopening.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use wt_core::breaks::BreakRule;
use wt_core::dayplan::Boundary;
use wt_core::ledger::{AccountMetric, PostingSource};
use wt_core::rounding::{RoundingMode, RoundingPolicy};
use wt_core::{
    Absence, AbsenceCredit, AccountId, AccountMapping, AccountPosting, Booking, BookingCategory,
    BookingId, DayPlan, EmployeeId, ErrorCode, FlextimeCaps, Interval, YearMonth,
};
use wt_db::{Database, StoreError};
use wt_engine::{Calendar, Engine, EngineError, StaticPlan};

struct FlowCalendar {
    holidays: Vec<NaiveDate>,
    absences: Vec<(NaiveDate, Absence)>,
}

impl FlowCalendar {
    fn empty() -> Self {
        Self {
            holidays: Vec::new(),
            absences: Vec::new(),
        }
    }
}

impl Calendar for FlowCalendar {
    fn absence(&self, _employee: &EmployeeId, date: NaiveDate) -> Option<Absence> {
        self.absences
            .iter()
            .find(|(d, _)| *d == date)
            .map(|(_, a)| a.clone())
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

fn employee() -> EmployeeId {
    EmployeeId::new("emp-1").unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

/// Office plan: 08:00-17:00 expected with 5-minute tolerance, nearest-15
/// rounding on come, a lunch-window rule and a statutory minimum break.
fn office_plan() -> DayPlan {
    DayPlan {
        come: Boundary {
            expected: Some(8 * 60),
            tolerance: 5,
            rounding: RoundingPolicy::new(RoundingMode::Nearest, 15),
        },
        go: Boundary {
            expected: Some(17 * 60),
            tolerance: 5,
            rounding: RoundingPolicy::NONE,
        },
        earliest_come: Some(6 * 60),
        latest_go: Some(20 * 60),
        target_minutes: 480,
        max_net_minutes: Some(660),
        break_rules: vec![
            BreakRule::Variable {
                window: Interval::new(12 * 60, 12 * 60 + 30).unwrap(),
                minutes: 30,
            },
            BreakRule::Minimum {
                after_minutes: 360,
                minutes: 30,
            },
        ],
        ..DayPlan::default()
    }
}

/// Bare plan for isolated break-rule scenarios: no boundaries, one rule set.
fn bare_plan(rules: Vec<BreakRule>) -> DayPlan {
    DayPlan {
        target_minutes: 480,
        break_rules: rules,
        ..DayPlan::default()
    }
}

fn mappings() -> Vec<AccountMapping> {
    vec![
        AccountMapping {
            account: AccountId::new("overtime").unwrap(),
            metric: AccountMetric::Overtime,
        },
        AccountMapping {
            account: AccountId::new("flextime").unwrap(),
            metric: AccountMetric::FlextimeDelta,
        },
    ]
}

fn add_booking(
    engine: &Engine<StaticPlan, FlowCalendar>,
    id: &str,
    date: NaiveDate,
    category: BookingCategory,
    time: i32,
) {
    let booking = Booking::new(
        BookingId::new(id).unwrap(),
        employee(),
        date,
        category,
        time,
    );
    engine.insert_booking(&booking).unwrap();
}

#[test]
fn full_month_flow_with_close_and_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("wt.db");
    let engine = Engine::new(
        Database::open(&path).unwrap(),
        StaticPlan(office_plan()),
        FlowCalendar {
            holidays: vec![day(17)],
            absences: vec![(
                day(12),
                Absence {
                    credit: AbsenceCredit::Full,
                },
            )],
        },
        mappings(),
    );
    let march = YearMonth::new(2025, 3).unwrap();

    // Mon 03-10: 07:58 to 17:03 with a booked lunch.
    add_booking(&engine, "d10-come", day(10), BookingCategory::WorkStart, 478);
    add_booking(&engine, "d10-bs", day(10), BookingCategory::BreakStart, 720);
    add_booking(&engine, "d10-be", day(10), BookingCategory::BreakEnd, 750);
    add_booking(&engine, "d10-go", day(10), BookingCategory::WorkEnd, 1023);
    // Tue 03-11: forgot to clock out.
    add_booking(&engine, "d11-come", day(11), BookingCategory::WorkStart, 480);

    let values = engine.recalculate_month_at(&employee(), march, now()).unwrap();
    assert_eq!(values.len(), 31, "one value per calendar day");

    // 03-10: come snaps 07:58 -> 08:00, go snaps 17:03 -> 17:00; the booked
    // 30-minute lunch satisfies both break rules.
    let d10 = engine.daily_value(&employee(), day(10)).unwrap().unwrap();
    assert_eq!(d10.gross_time, 540);
    assert_eq!(d10.break_time, 30);
    assert_eq!(d10.net_time, 510);
    assert_eq!(d10.overtime, 30);
    assert!(!d10.has_error);
    let come = engine
        .booking(&BookingId::new("d10-come").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(come.calculated_time(), Some(480));
    assert_eq!(come.original_time(), 478);
    assert_eq!(come.pair_id.as_ref().map(BookingId::as_str), Some("d10-go"));

    // 03-11: missing go is flagged but the day still has a record.
    let d11 = engine.daily_value(&employee(), day(11)).unwrap().unwrap();
    assert!(d11.has_error);
    assert_eq!(d11.error_codes, vec![ErrorCode::MissingGo]);
    assert_eq!(d11.net_time, 0);

    // 03-12 absence and 03-17 holiday credit the target.
    let d12 = engine.daily_value(&employee(), day(12)).unwrap().unwrap();
    assert_eq!(d12.net_time, 480);
    assert!(!d12.has_error);
    let d17 = engine.daily_value(&employee(), day(17)).unwrap().unwrap();
    assert_eq!(d17.net_time, 480);

    // Aggregate March. Every plan day carries a 480 target, so the month is
    // deep in undertime and the change clamps at the lower cap.
    let caps = FlextimeCaps {
        lower: -1200,
        upper: 1200,
    };
    let monthly = engine.aggregate_month(&employee(), march, caps).unwrap();
    assert_eq!(monthly.net_time, 510 + 480 + 480);
    assert_eq!(monthly.target_time, 31 * 480);
    assert_eq!(
        monthly.flextime_change,
        monthly.net_time - monthly.target_time
    );
    assert_eq!(monthly.flextime_end, caps.lower);
    assert_eq!(
        monthly.forfeited,
        monthly.flextime_change - caps.lower,
        "clamped-away amount is reported"
    );
    assert_eq!(monthly.error_days, 1, "only 03-11 carries an error");

    engine.close_month_at(&employee(), march, now()).unwrap();

    // Closed month rejects recalculation, booking edits and postings.
    assert!(matches!(
        engine.recalculate_day_at(&employee(), day(10), now()),
        Err(EngineError::Store(StoreError::MonthClosed { .. }))
    ));
    assert!(matches!(
        engine.edit_booking_time(&BookingId::new("d10-go").unwrap(), 1050),
        Err(EngineError::Store(StoreError::MonthClosed { .. }))
    ));
    let posting = AccountPosting {
        employee: employee(),
        account: AccountId::new("overtime").unwrap(),
        date: day(10),
        minutes: 15,
        source: PostingSource::Manual,
    };
    assert!(matches!(
        engine.post_account_value(&posting),
        Err(EngineError::Store(StoreError::MonthClosed { .. }))
    ));

    // Reopen: the same writes succeed immediately.
    engine.reopen_month(&employee(), march).unwrap();
    engine
        .edit_booking_time(&BookingId::new("d10-go").unwrap(), 1050)
        .unwrap();
    let recalculated = engine.recalculate_day_at(&employee(), day(10), now()).unwrap();
    assert_eq!(recalculated.gross_time, 570, "edited go time flows through");
    engine.post_account_value(&posting).unwrap();
}

#[test]
fn minimum_break_scenario_end_to_end() {
    let engine = Engine::new(
        Database::open_in_memory().unwrap(),
        StaticPlan(bare_plan(vec![BreakRule::Minimum {
            after_minutes: 360,
            minutes: 30,
        }])),
        FlowCalendar::empty(),
        mappings(),
    );
    // 08:00-15:10 with a 10-minute booked break: 430 gross, 420 provisional
    // net, which exceeds the 360 threshold, so the rule tops the 10 booked
    // minutes up to 30.
    add_booking(&engine, "come", day(20), BookingCategory::WorkStart, 480);
    add_booking(&engine, "bs", day(20), BookingCategory::BreakStart, 700);
    add_booking(&engine, "be", day(20), BookingCategory::BreakEnd, 710);
    add_booking(&engine, "go", day(20), BookingCategory::WorkEnd, 910);

    let value = engine.recalculate_day_at(&employee(), day(20), now()).unwrap();
    assert_eq!(value.gross_time, 430);
    assert_eq!(value.break_time, 30);
    assert_eq!(value.net_time, 400);
}

#[test]
fn variable_break_scenario_end_to_end() {
    let engine = Engine::new(
        Database::open_in_memory().unwrap(),
        StaticPlan(bare_plan(vec![BreakRule::Variable {
            window: Interval::new(720, 750).unwrap(),
            minutes: 30,
        }])),
        FlowCalendar::empty(),
        mappings(),
    );
    // 08:03-17:07 without a break booking: the rule deducts its default.
    add_booking(&engine, "come", day(21), BookingCategory::WorkStart, 483);
    add_booking(&engine, "go", day(21), BookingCategory::WorkEnd, 1027);

    let value = engine.recalculate_day_at(&employee(), day(21), now()).unwrap();
    assert_eq!(value.gross_time, 544);
    assert_eq!(value.break_time, 30);
    assert_eq!(value.net_time, value.gross_time - value.break_time);
}

#[test]
fn flextime_carryover_chains_across_three_months() {
    let engine = Engine::new(
        Database::open_in_memory().unwrap(),
        StaticPlan(bare_plan(Vec::new())),
        FlowCalendar::empty(),
        mappings(),
    );
    let caps = FlextimeCaps {
        lower: -120,
        upper: 120,
    };
    let months = [
        YearMonth::new(2025, 1).unwrap(),
        YearMonth::new(2025, 2).unwrap(),
        YearMonth::new(2025, 3).unwrap(),
    ];

    // One +90 overtime day per month against the +120 cap.
    for (i, month) in months.iter().enumerate() {
        let date = month.first_day();
        add_booking(
            &engine,
            &format!("come-{i}"),
            date,
            BookingCategory::WorkStart,
            480,
        );
        add_booking(
            &engine,
            &format!("go-{i}"),
            date,
            BookingCategory::WorkEnd,
            480 + 480 + 90,
        );
        engine.recalculate_day_at(&employee(), date, now()).unwrap();
    }

    let jan = engine.aggregate_month(&employee(), months[0], caps).unwrap();
    assert_eq!(jan.flextime_end, 90);
    assert_eq!(jan.forfeited, 0);

    let feb = engine.aggregate_month(&employee(), months[1], caps).unwrap();
    assert_eq!(feb.flextime_start, 90, "start equals previous end");
    assert_eq!(feb.flextime_end, 120, "clamped at the positive cap");
    assert_eq!(feb.forfeited, 60, "clamped amount reported, not deferred");

    let mar = engine.aggregate_month(&employee(), months[2], caps).unwrap();
    assert_eq!(mar.flextime_start, 120);
    assert_eq!(mar.flextime_end, 120);
    assert_eq!(mar.forfeited, 90, "forfeited time does not reappear later");
}
