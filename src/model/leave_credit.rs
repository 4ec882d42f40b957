use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::employment::EmploymentType;
use crate::model::school_year::SchoolYear;

/// One employee's leave balance for one school year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveCreditRecord {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2025-2026", value_type = String)]
    pub school_year: SchoolYear,
    #[schema(example = "permanent", value_type = String)]
    pub employment_type: EmploymentType,
    #[schema(example = 15.0)]
    pub total_credits: Decimal,
    #[schema(example = 2.0)]
    pub used_credits: Decimal,
    #[schema(example = 5.0)]
    pub carried_over_credits: Decimal,
    /// Excess beyond the carryover cap, reported to payroll. Never usable.
    #[schema(example = 3.0)]
    pub monetizable_credits: Decimal,
    #[schema(example = "2025-06-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2025-06-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveCreditRecord {
    /// Days the employee may consume this year.
    pub fn available(&self) -> Decimal {
        self.total_credits + self.carried_over_credits
    }

    pub fn remaining(&self) -> Decimal {
        self.available() - self.used_credits
    }

    /// Consume `days` of leave. The record is left untouched on error.
    pub fn debit(&mut self, days: Decimal, now: DateTime<Utc>) -> Result<(), AppError> {
        if days <= Decimal::ZERO {
            return Err(AppError::validation(format!(
                "leave debit must be a positive number of days, got {days}"
            )));
        }

        if self.used_credits + days > self.available() {
            return Err(AppError::InsufficientCredits {
                requested: days,
                available: self.remaining(),
            });
        }

        self.used_credits += days;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(total: Decimal, carried: Decimal, used: Decimal) -> LeaveCreditRecord {
        let now = Utc::now();
        LeaveCreditRecord {
            employee_id: 7,
            school_year: SchoolYear::starting(2025),
            employment_type: EmploymentType::Permanent,
            total_credits: total,
            used_credits: used,
            carried_over_credits: carried,
            monetizable_credits: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn debit_up_to_the_full_balance() {
        let mut r = record(dec!(15), dec!(5), dec!(0));
        r.debit(dec!(12.5), Utc::now()).unwrap();
        r.debit(dec!(7.5), Utc::now()).unwrap();
        assert_eq!(r.used_credits, dec!(20));
        assert_eq!(r.remaining(), Decimal::ZERO);
    }

    #[test]
    fn fractional_balances_stay_exact() {
        // 0.1 + 0.2 style sums must not leave a sliver of credit behind
        let mut r = record(dec!(0.3), dec!(0), dec!(0));
        r.debit(dec!(0.1), Utc::now()).unwrap();
        r.debit(dec!(0.2), Utc::now()).unwrap();
        assert_eq!(r.remaining(), Decimal::ZERO);
        assert!(r.debit(dec!(0.1), Utc::now()).is_err());
    }

    #[test]
    fn overdraw_is_rejected_without_mutation() {
        let mut r = record(dec!(10), dec!(0), dec!(8));
        let before = r.clone();
        match r.debit(dec!(3), Utc::now()) {
            Err(AppError::InsufficientCredits { requested, available }) => {
                assert_eq!(requested, dec!(3));
                assert_eq!(available, dec!(2));
            }
            other => panic!("expected insufficient credits, got {other:?}"),
        }
        assert_eq!(r, before);
    }

    #[test]
    fn non_positive_days_are_invalid() {
        let mut r = record(dec!(10), dec!(0), dec!(0));
        assert!(matches!(r.debit(dec!(0), Utc::now()), Err(AppError::Validation(_))));
        assert!(matches!(r.debit(dec!(-1), Utc::now()), Err(AppError::Validation(_))));
    }
}
