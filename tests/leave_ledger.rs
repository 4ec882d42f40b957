mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use hr_portal::error::AppError;
use hr_portal::ledger::{LeaveLedger, LeavePolicy, SkipReason};
use hr_portal::model::employment::EmploymentType;
use hr_portal::model::leave_request::{LeaveStatus, LeaveType};
use hr_portal::store::{LeaveRequestFilter, MemoryStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{credit_record, ledger_with, year};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[actix_web::test]
async fn first_allocation_follows_the_table() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(1, Some(EmploymentType::Permanent));
    store.add_employee(2, Some(EmploymentType::Contractual));
    store.add_employee(3, Some(EmploymentType::JobOrder));
    store.add_employee(4, Some(EmploymentType::PartTime));
    let ledger = ledger_with(&store);

    let summary = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    assert_eq!(summary.employees_processed, 4);
    assert!(summary.skipped.is_empty());
    for (employee_id, expected) in [(1, dec!(15)), (2, dec!(10)), (3, dec!(5)), (4, dec!(7))] {
        let record = ledger.balance(employee_id, year(2025)).await.unwrap();
        assert_eq!(record.total_credits, expected);
        assert_eq!(record.carried_over_credits, dec!(0));
        assert_eq!(record.used_credits, dec!(0));
        assert_eq!(record.monetizable_credits, dec!(0));
    }
}

#[actix_web::test]
async fn remainder_is_split_into_carryover_and_monetizable() {
    for remaining in [dec!(0), dec!(2.5), dec!(5), dec!(8), dec!(12.5)] {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(1, Some(EmploymentType::Permanent));
        store.put_credit_record(credit_record(
            1,
            year(2024),
            EmploymentType::Permanent,
            remaining,
            dec!(0),
            dec!(0),
        ));
        let ledger = ledger_with(&store);

        ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

        let record = ledger.balance(1, year(2025)).await.unwrap();
        assert_eq!(record.carried_over_credits, remaining.min(dec!(5)), "r={remaining}");
        assert_eq!(
            record.monetizable_credits,
            (remaining - dec!(5)).max(Decimal::ZERO),
            "r={remaining}"
        );
    }
}

#[actix_web::test]
async fn permanent_employee_with_eight_days_left() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(7, Some(EmploymentType::Permanent));
    // 15 + 3 carried - 10 used = 8 remaining
    store.put_credit_record(credit_record(
        7,
        year(2024),
        EmploymentType::Permanent,
        dec!(15),
        dec!(3),
        dec!(10),
    ));
    let ledger = ledger_with(&store);

    let summary = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    let record = ledger.balance(7, year(2025)).await.unwrap();
    assert_eq!(record.total_credits, dec!(15));
    assert_eq!(record.carried_over_credits, dec!(5));
    assert_eq!(record.monetizable_credits, dec!(3));
    assert_eq!(record.used_credits, dec!(0));

    let detail = &summary.details[0];
    assert_eq!(detail.previous_total_credits, dec!(15));
    assert_eq!(detail.previous_carried_over_credits, dec!(3));
    assert_eq!(detail.previous_used_credits, dec!(10));
    assert_eq!(detail.previous_remaining, dec!(8));
    assert_eq!(detail.forfeited_credits, dec!(0));
}

#[actix_web::test]
async fn monetization_cap_forfeits_the_rest() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(1, Some(EmploymentType::Contractual));
    store.put_credit_record(credit_record(
        1,
        year(2024),
        EmploymentType::Contractual,
        dec!(10),
        dec!(0),
        dec!(0),
    ));
    let ledger = LeaveLedger::new(
        store.clone(),
        LeavePolicy::with_monetization_cap(Some(dec!(2))),
    );

    let summary = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    let detail = &summary.details[0];
    assert_eq!(detail.carried_over_credits, dec!(5));
    assert_eq!(detail.monetizable_credits, dec!(2));
    assert_eq!(detail.forfeited_credits, dec!(3));
}

#[actix_web::test]
async fn rerunning_the_reset_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(1, Some(EmploymentType::Permanent));
    store.add_employee(2, Some(EmploymentType::PartTime));
    let ledger = ledger_with(&store);

    ledger.reset_credits_for_school_year(year(2025)).await.unwrap();
    ledger.apply_leave_debit(1, year(2025), dec!(2)).await.unwrap();
    let before = ledger.balance(1, year(2025)).await.unwrap();

    let again = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    assert_eq!(again.employees_processed, 0);
    assert_eq!(again.skipped.len(), 2);
    assert!(
        again
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::AlreadyAllocated)
    );
    assert_eq!(ledger.balance(1, year(2025)).await.unwrap(), before);
    assert_eq!(store.credit_record_count(), 2);
}

#[actix_web::test]
async fn employees_without_a_contract_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(1, Some(EmploymentType::Permanent));
    store.add_employee(2, None);
    store.add_employee(3, Some(EmploymentType::JobOrder));
    store.add_employee(4, Some(EmploymentType::Permanent));
    store.deactivate_employee(4);
    let ledger = ledger_with(&store);

    let summary = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    assert_eq!(summary.employees_processed, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].employee_id, 2);
    assert_eq!(summary.skipped[0].reason, SkipReason::NoEmploymentType);
    assert!(ledger.balance(4, year(2025)).await.is_err());
}

#[actix_web::test]
async fn failed_allocation_does_not_stop_the_batch() {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(1, Some(EmploymentType::Permanent));
    store.add_employee(2, Some(EmploymentType::Contractual));
    store.add_employee(3, Some(EmploymentType::PartTime));
    store.fail_allocation_for(2);
    let ledger = ledger_with(&store);

    let summary = ledger.reset_credits_for_school_year(year(2025)).await.unwrap();

    assert_eq!(summary.employees_processed, 2);
    let allocated: Vec<_> = summary.details.iter().map(|d| d.employee_id).collect();
    assert_eq!(allocated, [1, 3]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].employee_id, 2);
    assert!(matches!(summary.skipped[0].reason, SkipReason::Failed(_)));

    assert!(ledger.balance(2, year(2025)).await.is_err());
    assert_eq!(ledger.balance(3, year(2025)).await.unwrap().total_credits, dec!(7));
}

#[actix_web::test]
async fn debit_never_exceeds_the_available_balance() {
    let store = Arc::new(MemoryStore::new());
    store.put_credit_record(credit_record(
        1,
        year(2025),
        EmploymentType::JobOrder,
        dec!(5),
        dec!(1),
        dec!(4),
    ));
    let ledger = ledger_with(&store);

    let record = ledger.apply_leave_debit(1, year(2025), dec!(1.5)).await.unwrap();
    assert_eq!(record.used_credits, dec!(5.5));

    let err = ledger.apply_leave_debit(1, year(2025), dec!(1)).await.unwrap_err();
    match err {
        AppError::InsufficientCredits {
            requested,
            available,
        } => {
            assert_eq!(requested, dec!(1));
            assert_eq!(available, dec!(0.5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.balance(1, year(2025)).await.unwrap().used_credits, dec!(5.5));

    assert!(matches!(
        ledger.apply_leave_debit(1, year(2025), dec!(0)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        ledger.apply_leave_debit(1, year(2025), dec!(-1)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        ledger.apply_leave_debit(2, year(2025), dec!(1)).await,
        Err(AppError::NotFound(_))
    ));
}

#[actix_web::test]
async fn approving_leave_debits_its_school_year() {
    let store = Arc::new(MemoryStore::new());
    store.put_credit_record(credit_record(
        1,
        year(2025),
        EmploymentType::Permanent,
        dec!(15),
        dec!(0),
        dec!(0),
    ));
    let ledger = ledger_with(&store);

    let leave = ledger
        .submit_leave(1, LeaveType::Annual, date(2025, 9, 1), date(2025, 9, 3))
        .await
        .unwrap();
    assert_eq!(leave.status, LeaveStatus::Pending);
    assert_eq!(leave.days_requested, dec!(3));

    let approved = ledger.approve_leave(leave.id).await.unwrap();
    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(ledger.balance(1, year(2025)).await.unwrap().used_credits, dec!(3));

    assert!(matches!(
        ledger.approve_leave(leave.id).await,
        Err(AppError::InvalidTransition { .. })
    ));
    assert_eq!(ledger.balance(1, year(2025)).await.unwrap().used_credits, dec!(3));
}

#[actix_web::test]
async fn leave_over_the_balance_stays_pending() {
    let store = Arc::new(MemoryStore::new());
    store.put_credit_record(credit_record(
        1,
        year(2025),
        EmploymentType::PartTime,
        dec!(7),
        dec!(0),
        dec!(6),
    ));
    let ledger = ledger_with(&store);

    let leave = ledger
        .submit_leave(1, LeaveType::Sick, date(2026, 2, 2), date(2026, 2, 3))
        .await
        .unwrap();

    assert!(matches!(
        ledger.approve_leave(leave.id).await,
        Err(AppError::InsufficientCredits { .. })
    ));
    assert_eq!(
        ledger.find_leave(leave.id).await.unwrap().status,
        LeaveStatus::Pending
    );
    assert_eq!(ledger.balance(1, year(2025)).await.unwrap().used_credits, dec!(6));
}

#[actix_web::test]
async fn unpaid_leave_does_not_touch_the_ledger() {
    let store = Arc::new(MemoryStore::new());
    let ledger = ledger_with(&store);

    let leave = ledger
        .submit_leave(1, LeaveType::Unpaid, date(2025, 7, 1), date(2025, 7, 10))
        .await
        .unwrap();
    let approved = ledger.approve_leave(leave.id).await.unwrap();

    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(store.credit_record_count(), 0);
}

#[actix_web::test]
async fn rejected_leave_is_final() {
    let store = Arc::new(MemoryStore::new());
    let ledger = ledger_with(&store);

    let leave = ledger
        .submit_leave(1, LeaveType::Annual, date(2025, 7, 1), date(2025, 7, 1))
        .await
        .unwrap();
    let rejected = ledger.reject_leave(leave.id).await.unwrap();
    assert_eq!(rejected.status, LeaveStatus::Rejected);

    assert!(matches!(
        ledger.approve_leave(leave.id).await,
        Err(AppError::InvalidTransition { .. })
    ));
}

#[actix_web::test]
async fn leave_with_inverted_dates_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let ledger = ledger_with(&store);

    assert!(matches!(
        ledger
            .submit_leave(1, LeaveType::Annual, date(2025, 7, 2), date(2025, 7, 1))
            .await,
        Err(AppError::Validation(_))
    ));
}

#[actix_web::test]
async fn history_is_newest_first() {
    let store = Arc::new(MemoryStore::new());
    for start in [2023, 2025, 2024] {
        store.put_credit_record(credit_record(
            1,
            year(start),
            EmploymentType::Permanent,
            dec!(15),
            dec!(0),
            dec!(0),
        ));
    }
    store.put_credit_record(credit_record(
        2,
        year(2025),
        EmploymentType::Permanent,
        dec!(15),
        dec!(0),
        dec!(0),
    ));
    let ledger = ledger_with(&store);

    let years: Vec<_> = ledger
        .history(1)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.school_year.to_string())
        .collect();
    assert_eq!(years, ["2025-2026", "2024-2025", "2023-2024"]);
}

#[actix_web::test]
async fn leave_list_filters_and_pages_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let ledger = ledger_with(&store);

    let mut ids = Vec::new();
    for day in 1..=5 {
        let leave = ledger
            .submit_leave(1, LeaveType::Sick, date(2025, 9, day), date(2025, 9, day))
            .await
            .unwrap();
        ids.push(leave.id);
    }
    ledger
        .submit_leave(2, LeaveType::Annual, date(2025, 10, 1), date(2025, 10, 2))
        .await
        .unwrap();
    ledger.reject_leave(ids[0]).await.unwrap();

    let page = ledger
        .list_leaves(LeaveRequestFilter {
            employee_id: Some(1),
            status: Some(LeaveStatus::Pending),
            page: 1,
            per_page: 3,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    let listed: Vec<_> = page.data.iter().map(|l| l.id).collect();
    assert_eq!(listed, [ids[4], ids[3], ids[2]]);

    let rest = ledger
        .list_leaves(LeaveRequestFilter {
            employee_id: Some(1),
            status: Some(LeaveStatus::Pending),
            page: 2,
            per_page: 3,
        })
        .await
        .unwrap();
    let listed: Vec<_> = rest.data.iter().map(|l| l.id).collect();
    assert_eq!(listed, [ids[1]]);

    let everything = ledger
        .list_leaves(LeaveRequestFilter::default())
        .await
        .unwrap();
    assert_eq!(everything.total, 6);
    assert_eq!(everything.page, 1);
    assert_eq!(everything.per_page, 10);
}
