use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::Ledger;
use crate::auth::auth::AuthUser;
use crate::ledger::ResetSummary;
use crate::model::employment::EmploymentType;
use crate::model::leave_credit::LeaveCreditRecord;
use crate::model::school_year::SchoolYear;

#[derive(Deserialize, ToSchema)]
pub struct ResetCredits {
    /// Defaults to the school year containing today.
    #[schema(example = "2025-2026", value_type = Option<String>)]
    pub school_year: Option<SchoolYear>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveCreditResponse {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2025-2026", value_type = String)]
    pub school_year: SchoolYear,
    #[schema(example = "permanent")]
    pub employment_type: EmploymentType,
    #[schema(example = 15.0)]
    pub total_credits: Decimal,
    #[schema(example = 2.0)]
    pub used_credits: Decimal,
    #[schema(example = 5.0)]
    pub carried_over_credits: Decimal,
    #[schema(example = 3.0)]
    pub monetizable_credits: Decimal,
    /// total + carried over - used
    #[schema(example = 18.0)]
    pub remaining_credits: Decimal,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<LeaveCreditRecord> for LeaveCreditResponse {
    fn from(record: LeaveCreditRecord) -> Self {
        Self {
            remaining_credits: record.remaining(),
            employee_id: record.employee_id,
            school_year: record.school_year,
            employment_type: record.employment_type,
            total_credits: record.total_credits,
            used_credits: record.used_credits,
            carried_over_credits: record.carried_over_credits,
            monetizable_credits: record.monetizable_credits,
            updated_at: record.updated_at,
        }
    }
}

/// Allocate the school year's leave credits to every active employee.
///
/// Employees that already hold a record for the year are reported under
/// `skipped` as `already_allocated`, so the call can safely be repeated.
#[utoipa::path(
    post,
    path = "/api/leave-credits/reset",
    request_body(content = ResetCredits, content_type = "application/json"),
    responses(
        (status = 200, description = "Reset summary with per-employee audit", body = ResetSummary),
        (status = 400, description = "Malformed school year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 429, description = "Too many reset runs")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Credits"
)]
pub async fn reset_credits(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    payload: web::Json<ResetCredits>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let school_year = payload
        .school_year
        .unwrap_or_else(|| SchoolYear::containing(Utc::now().date_naive()));
    info!(user_id = auth.user_id, %school_year, "Leave credit reset requested");

    let summary = ledger.reset_credits_for_school_year(school_year).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/leave-credits/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee whose ledger to list")
    ),
    responses(
        (status = 200, description = "Credit records, newest school year first", body = Vec<LeaveCreditResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Credits"
)]
pub async fn credit_history(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_staff(employee_id)?;

    let records: Vec<LeaveCreditResponse> = ledger
        .history(employee_id)
        .await?
        .into_iter()
        .map(LeaveCreditResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/leave-credits/{employee_id}/{school_year}",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        ("school_year" = String, Path, description = "School year, e.g. 2025-2026")
    ),
    responses(
        (status = 200, description = "Balance for the school year", body = LeaveCreditResponse),
        (status = 400, description = "Malformed school year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No record for that school year")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Credits"
)]
pub async fn credit_balance(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    path: web::Path<(u64, String)>,
) -> actix_web::Result<impl Responder> {
    let (employee_id, school_year) = path.into_inner();
    auth.require_self_or_staff(employee_id)?;

    let school_year: SchoolYear = school_year.parse()?;
    let record = ledger.balance(employee_id, school_year).await?;
    Ok(HttpResponse::Ok().json(LeaveCreditResponse::from(record)))
}
