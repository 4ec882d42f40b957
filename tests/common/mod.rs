#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use hr_portal::error::AppError;
use hr_portal::ledger::{LeaveLedger, LeavePolicy};
use hr_portal::model::config_request::{ConfigurationRequest, RequestDetails};
use hr_portal::model::employment::EmploymentType;
use hr_portal::model::leave_credit::LeaveCreditRecord;
use hr_portal::model::school_year::SchoolYear;
use hr_portal::store::MemoryStore;
use hr_portal::workflow::{Notifier, SideEffects};
use rust_decimal::Decimal;

pub fn year(start: i32) -> SchoolYear {
    SchoolYear::starting(start)
}

pub fn ledger_with(store: &Arc<MemoryStore>) -> LeaveLedger<MemoryStore> {
    LeaveLedger::new(store.clone(), LeavePolicy::default())
}

/// A stored record with the given balance figures.
pub fn credit_record(
    employee_id: u64,
    school_year: SchoolYear,
    employment_type: EmploymentType,
    total: Decimal,
    carried: Decimal,
    used: Decimal,
) -> LeaveCreditRecord {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    LeaveCreditRecord {
        employee_id,
        school_year,
        employment_type,
        total_credits: total,
        used_credits: used,
        carried_over_credits: carried,
        monetizable_credits: Decimal::ZERO,
        created_at: at,
        updated_at: at,
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(u64, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<u64> {
        self.sent().into_iter().map(|(user_id, _)| user_id).collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: u64, message: &str) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::SideEffectFailed("notification channel down".into()));
        }
        self.sent.lock().unwrap().push((user_id, message.to_string()));
        Ok(())
    }
}

/// Side effects that record what they were asked to do, fail on demand, and
/// run leave configuration against an in-memory ledger when one is attached.
#[derive(Default)]
pub struct ScriptedEffects {
    applied: Mutex<Vec<u64>>,
    fail: AtomicBool,
    yielding: AtomicBool,
    ledger: Option<Arc<LeaveLedger<MemoryStore>>>,
}

impl ScriptedEffects {
    pub fn with_ledger(ledger: Arc<LeaveLedger<MemoryStore>>) -> Self {
        Self {
            ledger: Some(ledger),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Suspend once inside every effect, letting concurrent callers interleave.
    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<u64> {
        self.applied.lock().unwrap().clone()
    }
}

impl SideEffects for ScriptedEffects {
    async fn apply(&self, request: &ConfigurationRequest) -> Result<(), AppError> {
        if self.yielding.load(Ordering::SeqCst) {
            actix_web::rt::task::yield_now().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::not_found(format!(
                "employee {}",
                request.target_employee_id.unwrap_or_default()
            )));
        }
        if let (RequestDetails::LeaveConfiguration { school_year }, Some(ledger)) =
            (&request.details, &self.ledger)
        {
            ledger.reset_credits_for_school_year(*school_year).await?;
        }
        self.applied.lock().unwrap().push(request.id);
        Ok(())
    }
}
