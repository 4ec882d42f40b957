//! Executors for the change an approved configuration request stands for.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::notify::{DbNotifier, Notifier};
use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::ledger::{LeaveLedger, SkipReason};
use crate::model::config_request::{ConfigurationRequest, ProfilePatch, RequestDetails};
use crate::model::employment::EmploymentType;
use crate::store::MySqlStore;
use crate::utils::db_utils::{build_update_sql, execute_update, profile_columns};

/// How long a temporary password issued by a reset stays usable. The
/// notification carrying it is persisted, so its lifetime is kept short.
const TEMPORARY_PASSWORD_TTL_HOURS: i64 = 24;

const TEMPORARY_PASSWORD_LEN: usize = 12;

fn temporary_password() -> String {
    Uuid::new_v4()
        .to_simple()
        .to_string()
        .chars()
        .take(TEMPORARY_PASSWORD_LEN)
        .collect()
}

fn reset_notice(temporary: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        "Your password was reset by MIS. Temporary password: {temporary}. \
         It expires at {} UTC and must be changed at your next login.",
        expires_at.format("%Y-%m-%d %H:%M")
    )
}

/// Applies the side effect of an approved request. Must be safe to run again
/// for the same request, since approval is retried after a failed effect.
pub trait SideEffects {
    async fn apply(&self, request: &ConfigurationRequest) -> Result<(), AppError>;
}

pub struct DbSideEffects {
    pool: MySqlPool,
    ledger: Arc<LeaveLedger<MySqlStore>>,
    notifier: Arc<DbNotifier>,
}

impl DbSideEffects {
    pub fn new(
        pool: MySqlPool,
        ledger: Arc<LeaveLedger<MySqlStore>>,
        notifier: Arc<DbNotifier>,
    ) -> Self {
        Self {
            pool,
            ledger,
            notifier,
        }
    }

    async fn patch_profile(&self, employee_id: u64, patch: &ProfilePatch) -> Result<(), AppError> {
        let update = build_update_sql("employees", profile_columns(patch), "id", employee_id)?;
        let affected = execute_update(&self.pool, update).await?;
        // MySQL reports 0 for a row whose values did not change, so only a
        // missing row is an error.
        if affected == 0 && !self.employee_exists(employee_id).await? {
            return Err(AppError::not_found(format!("employee {employee_id}")));
        }
        Ok(())
    }

    async fn adjust_contract(
        &self,
        employee_id: u64,
        employment_type: EmploymentType,
        effective_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<(), AppError> {
        if !self.employee_exists(employee_id).await? {
            return Err(AppError::not_found(format!("employee {employee_id}")));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'ended', end_date = COALESCE(end_date, ?)
            WHERE employee_id = ? AND status = 'active'
            "#,
        )
        .bind(effective_date)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO contracts (employee_id, employment_type, start_date, end_date, status)
            VALUES (?, ?, ?, ?, 'active')
            "#,
        )
        .bind(employee_id)
        .bind(employment_type.as_ref())
        .bind(effective_date)
        .bind(end_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reset_password(&self, employee_id: u64) -> Result<(), AppError> {
        let user_id: Option<u64> =
            sqlx::query_scalar("SELECT id FROM users WHERE employee_id = ? LIMIT 1")
                .bind(employee_id)
                .fetch_optional(&self.pool)
                .await?;
        let user_id = user_id
            .ok_or_else(|| AppError::not_found(format!("user account of employee {employee_id}")))?;

        let temporary = temporary_password();
        let hashed = hash_password(&temporary)
            .map_err(|e| AppError::SideEffectFailed(format!("password hashing failed: {e}")))?;
        let now = Utc::now();
        let expires_at = now + Duration::hours(TEMPORARY_PASSWORD_TTL_HOURS);

        sqlx::query(
            r#"
            UPDATE users
            SET password = ?, must_change_password = TRUE, password_expires_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(hashed)
        .bind(expires_at)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        // Without delivery the new credential is unusable, so this one is not
        // best-effort.
        self.notifier
            .notify(user_id, &reset_notice(&temporary, expires_at))
            .await
    }

    async fn employee_exists(&self, employee_id: u64) -> Result<bool, AppError> {
        let found: Option<u64> = sqlx::query_scalar("SELECT id FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

fn target(request: &ConfigurationRequest) -> Result<u64, AppError> {
    request.target_employee_id.ok_or_else(|| {
        AppError::validation(format!("{} requires a target employee", request.request_type))
    })
}

impl SideEffects for DbSideEffects {
    async fn apply(&self, request: &ConfigurationRequest) -> Result<(), AppError> {
        match &request.details {
            RequestDetails::ProfileChange(patch) => {
                self.patch_profile(target(request)?, patch).await
            }
            RequestDetails::ContractAdjustment {
                employment_type,
                effective_date,
                end_date,
            } => {
                self.adjust_contract(target(request)?, *employment_type, *effective_date, *end_date)
                    .await
            }
            RequestDetails::LeaveConfiguration { school_year } => {
                let summary = self.ledger.reset_credits_for_school_year(*school_year).await?;
                let failed = summary
                    .skipped
                    .iter()
                    .filter(|s| matches!(s.reason, SkipReason::Failed(_)))
                    .count();
                if failed > 0 {
                    warn!(
                        request_id = request.id,
                        failed, "Leave reset finished with per-employee failures"
                    );
                }
                info!(
                    request_id = request.id,
                    processed = summary.employees_processed,
                    "Leave configuration applied"
                );
                Ok(())
            }
            RequestDetails::ResetPassword => self.reset_password(target(request)?).await,
            RequestDetails::SystemUpdate { component, summary } => {
                info!(
                    request_id = request.id,
                    component = %component,
                    summary = %summary,
                    "System update acknowledged"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn temporary_passwords_are_fresh_hex_strings() {
        let first = temporary_password();
        let second = temporary_password();
        assert_eq!(first.len(), TEMPORARY_PASSWORD_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn reset_notice_states_the_expiry() {
        let expires_at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap();
        let notice = reset_notice("a1b2c3d4e5f6", expires_at);
        assert!(notice.contains("a1b2c3d4e5f6"));
        assert!(notice.contains("expires at 2026-03-02 08:30 UTC"));
    }
}
