use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::model::employment::EmploymentType;

/// Days of unused credit that may roll into the next school year.
pub const CARRYOVER_CAP: Decimal = dec!(5);

/// Yearly allocation and rollover rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeavePolicy {
    pub carryover_cap: Decimal,
    /// `None` flags the whole excess as monetizable.
    pub monetization_cap: Option<Decimal>,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            carryover_cap: CARRYOVER_CAP,
            monetization_cap: None,
        }
    }
}

/// How a previous year's remainder is split up at reset time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rollover {
    pub carried_over: Decimal,
    pub monetizable: Decimal,
    pub forfeited: Decimal,
}

impl LeavePolicy {
    pub fn with_monetization_cap(cap: Option<Decimal>) -> Self {
        Self {
            monetization_cap: cap,
            ..Self::default()
        }
    }

    /// Credits granted at the start of every school year.
    pub fn allocation(&self, employment_type: EmploymentType) -> Decimal {
        match employment_type {
            EmploymentType::Permanent => dec!(15),
            EmploymentType::Contractual => dec!(10),
            EmploymentType::JobOrder => dec!(5),
            EmploymentType::PartTime => dec!(7),
        }
    }

    pub fn rollover(&self, remaining: Decimal) -> Rollover {
        let remaining = remaining.max(Decimal::ZERO);
        let carried_over = remaining.min(self.carryover_cap);
        let excess = remaining - carried_over;
        let monetizable = match self.monetization_cap {
            Some(cap) => excess.min(cap.max(Decimal::ZERO)),
            None => excess,
        };

        Rollover {
            carried_over,
            monetizable,
            forfeited: excess - monetizable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_table() {
        let policy = LeavePolicy::default();
        assert_eq!(policy.allocation(EmploymentType::Permanent), dec!(15));
        assert_eq!(policy.allocation(EmploymentType::Contractual), dec!(10));
        assert_eq!(policy.allocation(EmploymentType::JobOrder), dec!(5));
        assert_eq!(policy.allocation(EmploymentType::PartTime), dec!(7));
    }

    #[test]
    fn carryover_is_capped_and_excess_monetized() {
        let policy = LeavePolicy::default();
        for tenths in 0..=300 {
            let r = Decimal::new(tenths, 1);
            let split = policy.rollover(r);
            assert_eq!(split.carried_over, r.min(dec!(5)), "remaining {r}");
            assert_eq!(split.monetizable, (r - dec!(5)).max(Decimal::ZERO), "remaining {r}");
            assert_eq!(split.carried_over + split.monetizable, r, "remaining {r}");
            assert_eq!(split.forfeited, Decimal::ZERO);
        }
    }

    #[test]
    fn eight_days_left_splits_five_and_three() {
        let split = LeavePolicy::default().rollover(dec!(8));
        assert_eq!(
            split,
            Rollover {
                carried_over: dec!(5),
                monetizable: dec!(3),
                forfeited: dec!(0)
            }
        );
    }

    #[test]
    fn monetization_cap_forfeits_the_rest() {
        let split = LeavePolicy::with_monetization_cap(Some(dec!(2))).rollover(dec!(12));
        assert_eq!(split.carried_over, dec!(5));
        assert_eq!(split.monetizable, dec!(2));
        assert_eq!(split.forfeited, dec!(5));
    }

    #[test]
    fn negative_remainder_is_treated_as_zero() {
        let split = LeavePolicy::default().rollover(dec!(-3));
        assert_eq!(split.carried_over, Decimal::ZERO);
        assert_eq!(split.monetizable, Decimal::ZERO);
        assert_eq!(split.forfeited, Decimal::ZERO);
    }
}
