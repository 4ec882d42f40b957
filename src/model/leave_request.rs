use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::school_year::SchoolYear;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveType {
    /// Unpaid leave is not drawn from the credit ledger.
    pub fn consumes_credits(&self) -> bool {
        matches!(self, LeaveType::Annual | LeaveType::Sick)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    pub days_requested: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// School year whose ledger row pays for this leave.
    pub fn school_year(&self) -> SchoolYear {
        SchoolYear::containing(self.start_date)
    }

    pub fn approve(&mut self) -> Result<(), AppError> {
        self.settle(LeaveStatus::Approved, "approve")
    }

    pub fn reject(&mut self) -> Result<(), AppError> {
        self.settle(LeaveStatus::Rejected, "reject")
    }

    fn settle(&mut self, to: LeaveStatus, action: &'static str) -> Result<(), AppError> {
        if self.status != LeaveStatus::Pending {
            return Err(AppError::invalid_transition("leave request", self.status, action));
        }
        self.status = to;
        Ok(())
    }
}

/// Validated input for a new leave request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: Decimal,
}

impl NewLeaveRequest {
    pub fn new(
        employee_id: u64,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, AppError> {
        if start_date > end_date {
            return Err(AppError::validation("start_date cannot be after end_date"));
        }

        // inclusive of both ends
        let days_requested = Decimal::from((end_date - start_date).num_days() + 1);

        Ok(Self {
            employee_id,
            leave_type,
            start_date,
            end_date,
            days_requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_days_inclusively() {
        let leave = NewLeaveRequest::new(1, LeaveType::Annual, date(2026, 1, 5), date(2026, 1, 7)).unwrap();
        assert_eq!(leave.days_requested, dec!(3));

        let single = NewLeaveRequest::new(1, LeaveType::Sick, date(2026, 1, 5), date(2026, 1, 5)).unwrap();
        assert_eq!(single.days_requested, dec!(1));
    }

    #[test]
    fn reversed_dates_are_invalid() {
        let err = NewLeaveRequest::new(1, LeaveType::Annual, date(2026, 1, 7), date(2026, 1, 5)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn only_pending_requests_settle() {
        let mut leave = LeaveRequest {
            id: 3,
            employee_id: 1,
            leave_type: LeaveType::Annual,
            start_date: date(2026, 1, 5),
            end_date: date(2026, 1, 6),
            status: LeaveStatus::Pending,
            days_requested: dec!(2),
            created_at: None,
        };
        leave.approve().unwrap();
        assert_eq!(leave.status, LeaveStatus::Approved);

        let err = leave.reject().unwrap_err();
        assert_eq!(err.to_string(), "cannot reject leave request in 'approved' state");
    }
}
