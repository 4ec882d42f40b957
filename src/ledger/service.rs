use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use super::policy::LeavePolicy;
use crate::error::AppError;
use crate::model::employment::EmploymentType;
use crate::model::leave_credit::LeaveCreditRecord;
use crate::model::leave_request::{LeaveRequest, LeaveType, NewLeaveRequest};
use crate::model::school_year::SchoolYear;
use crate::store::{
    Allocation, EmployeeDirectory, LeaveRequestFilter, LedgerStore, Page, credit_not_found,
};

/// Audit line for one allocated employee. Every number of the new record can be
/// recomputed from the `previous_*` fields and the allocation table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResetDetail {
    pub employee_id: u64,
    #[schema(value_type = String)]
    pub employment_type: EmploymentType,
    pub previous_total_credits: Decimal,
    pub previous_carried_over_credits: Decimal,
    pub previous_used_credits: Decimal,
    pub previous_remaining: Decimal,
    pub total_credits: Decimal,
    pub carried_over_credits: Decimal,
    pub monetizable_credits: Decimal,
    pub forfeited_credits: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A record for this school year already exists; it was not touched.
    AlreadyAllocated,
    NoEmploymentType,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkippedEmployee {
    pub employee_id: u64,
    #[schema(value_type = Object)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResetSummary {
    #[schema(value_type = String, example = "2025-2026")]
    pub school_year: SchoolYear,
    pub employees_processed: usize,
    pub details: Vec<ResetDetail>,
    pub skipped: Vec<SkippedEmployee>,
}

enum Outcome {
    Allocated(ResetDetail),
    Skipped(SkipReason),
}

pub struct LeaveLedger<S> {
    store: Arc<S>,
    policy: LeavePolicy,
}

impl<S> LeaveLedger<S>
where
    S: LedgerStore + EmployeeDirectory,
{
    pub fn new(store: Arc<S>, policy: LeavePolicy) -> Self {
        Self { store, policy }
    }

    /// Allocate `school_year` credits to every active employee that has none yet.
    ///
    /// Employees that already hold a record for the year are reported as
    /// `already_allocated` and left untouched, so repeated runs never add credits.
    /// Per-employee failures are collected; only failing to enumerate employees
    /// aborts the batch.
    #[instrument(name = "reset_credits", skip(self, school_year), fields(school_year = %school_year))]
    pub async fn reset_credits_for_school_year(
        &self,
        school_year: SchoolYear,
    ) -> Result<ResetSummary, AppError> {
        let employees = self.store.active_employee_ids().await?;
        info!(employees = employees.len(), "Starting leave credit reset");

        let mut details = Vec::new();
        let mut skipped = Vec::new();

        for employee_id in employees {
            match self.allocate_employee(employee_id, school_year).await {
                Ok(Outcome::Allocated(detail)) => details.push(detail),
                Ok(Outcome::Skipped(reason)) => {
                    debug!(employee_id, ?reason, "Employee skipped");
                    skipped.push(SkippedEmployee { employee_id, reason });
                }
                Err(e) => {
                    error!(error = %e, employee_id, "Leave credit allocation failed");
                    skipped.push(SkippedEmployee {
                        employee_id,
                        reason: SkipReason::Failed(e.to_string()),
                    });
                }
            }
        }

        info!(
            processed = details.len(),
            skipped = skipped.len(),
            "Leave credit reset complete"
        );

        Ok(ResetSummary {
            school_year,
            employees_processed: details.len(),
            details,
            skipped,
        })
    }

    async fn allocate_employee(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
    ) -> Result<Outcome, AppError> {
        let Some(employment_type) = self.store.active_employment_type(employee_id).await? else {
            return Ok(Outcome::Skipped(SkipReason::NoEmploymentType));
        };

        let policy = self.policy;
        let mut detail = None;

        let allocation = self
            .store
            .allocate_credit_record(employee_id, school_year, |previous| {
                let (record, audit) =
                    derive_record(&policy, employee_id, school_year, employment_type, previous);
                detail = Some(audit);
                record
            })
            .await?;

        match (allocation, detail) {
            (Allocation::Created(_), Some(detail)) => Ok(Outcome::Allocated(detail)),
            _ => Ok(Outcome::Skipped(SkipReason::AlreadyAllocated)),
        }
    }

    /// Consume `days` from the employee's balance for `school_year`.
    #[instrument(skip(self, school_year), fields(school_year = %school_year))]
    pub async fn apply_leave_debit(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
        days: Decimal,
    ) -> Result<LeaveCreditRecord, AppError> {
        let record = self
            .store
            .update_credit_record(employee_id, school_year, |record| {
                record.debit(days, Utc::now())
            })
            .await?;

        info!(
            used = %record.used_credits,
            remaining = %record.remaining(),
            "Leave debit applied"
        );
        Ok(record)
    }

    pub async fn balance(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
    ) -> Result<LeaveCreditRecord, AppError> {
        self.store
            .find_credit_record(employee_id, school_year)
            .await?
            .ok_or_else(|| credit_not_found(employee_id, school_year))
    }

    pub async fn history(&self, employee_id: u64) -> Result<Vec<LeaveCreditRecord>, AppError> {
        self.store.credit_history(employee_id).await
    }

    pub async fn submit_leave(
        &self,
        employee_id: u64,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<LeaveRequest, AppError> {
        let leave = NewLeaveRequest::new(employee_id, leave_type, start_date, end_date)?;
        let created = self.store.insert_leave_request(leave).await?;
        debug!(leave_id = created.id, employee_id, "Leave request submitted");
        Ok(created)
    }

    pub async fn find_leave(&self, leave_id: u64) -> Result<LeaveRequest, AppError> {
        self.store
            .find_leave_request(leave_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("leave request {leave_id}")))
    }

    pub async fn list_leaves(
        &self,
        filter: LeaveRequestFilter,
    ) -> Result<Page<LeaveRequest>, AppError> {
        self.store.list_leave_requests(&filter.normalized()).await
    }

    /// Approve a pending leave and debit the ledger in one atomic step. If the
    /// debit fails the request stays pending and the ledger is unchanged.
    #[instrument(skip(self))]
    pub async fn approve_leave(&self, leave_id: u64) -> Result<LeaveRequest, AppError> {
        let result = self
            .store
            .settle_leave_request(leave_id, |leave, credit| {
                leave.approve()?;
                if leave.leave_type.consumes_credits() {
                    let school_year = leave.school_year();
                    let record =
                        credit.ok_or_else(|| credit_not_found(leave.employee_id, school_year))?;
                    record.debit(leave.days_requested, Utc::now())?;
                }
                Ok(())
            })
            .await;

        match &result {
            Ok(leave) => info!(
                employee_id = leave.employee_id,
                days = %leave.days_requested,
                "Leave approved"
            ),
            Err(e) => warn!(error = %e, "Leave approval refused"),
        }
        result
    }

    #[instrument(skip(self))]
    pub async fn reject_leave(&self, leave_id: u64) -> Result<LeaveRequest, AppError> {
        self.store
            .settle_leave_request(leave_id, |leave, _| leave.reject())
            .await
    }
}

fn derive_record(
    policy: &LeavePolicy,
    employee_id: u64,
    school_year: SchoolYear,
    employment_type: EmploymentType,
    previous: Option<&LeaveCreditRecord>,
) -> (LeaveCreditRecord, ResetDetail) {
    let (prev_total, prev_carried, prev_used) = previous
        .map(|p| (p.total_credits, p.carried_over_credits, p.used_credits))
        .unwrap_or_default();
    let previous_remaining = previous
        .map(LeaveCreditRecord::remaining)
        .unwrap_or_default();

    let total_credits = policy.allocation(employment_type);
    let rollover = policy.rollover(previous_remaining);
    let now = Utc::now();

    let record = LeaveCreditRecord {
        employee_id,
        school_year,
        employment_type,
        total_credits,
        used_credits: Decimal::ZERO,
        carried_over_credits: rollover.carried_over,
        monetizable_credits: rollover.monetizable,
        created_at: now,
        updated_at: now,
    };

    let detail = ResetDetail {
        employee_id,
        employment_type,
        previous_total_credits: prev_total,
        previous_carried_over_credits: prev_carried,
        previous_used_credits: prev_used,
        previous_remaining,
        total_credits,
        carried_over_credits: rollover.carried_over,
        monetizable_credits: rollover.monetizable,
        forfeited_credits: rollover.forfeited,
    };

    (record, detail)
}
