use std::ops::AsyncFnOnce;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlConnection, MySqlPool};
use tracing::{debug, warn};

use super::{
    Allocation, EmployeeDirectory, LeaveRequestFilter, LedgerStore, Page, RequestFilter,
    RequestStore, credit_not_found,
};
use crate::error::AppError;
use crate::model::config_request::{ConfigurationRequest, NewConfigurationRequest, RequestDetails};
use crate::model::employment::EmploymentType;
use crate::model::leave_credit::LeaveCreditRecord;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::school_year::SchoolYear;

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn decode_error(e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Database(sqlx::Error::Decode(Box::new(e)))
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(DUPLICATE_KEY))
}

/* =========================
Row mappings
========================= */

#[derive(FromRow)]
struct CreditRow {
    employee_id: u64,
    school_year: String,
    employment_type: String,
    total_credits: Decimal,
    used_credits: Decimal,
    carried_over_credits: Decimal,
    monetizable_credits: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CreditRow> for LeaveCreditRecord {
    type Error = AppError;

    fn try_from(row: CreditRow) -> Result<Self, Self::Error> {
        Ok(LeaveCreditRecord {
            employee_id: row.employee_id,
            school_year: row.school_year.parse()?,
            employment_type: row.employment_type.parse().map_err(decode_error)?,
            total_credits: row.total_credits,
            used_credits: row.used_credits,
            carried_over_credits: row.carried_over_credits,
            monetizable_credits: row.monetizable_credits,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CREDIT_COLUMNS: &str = r#"
    employee_id, school_year, employment_type, total_credits, used_credits,
    carried_over_credits, monetizable_credits, created_at, updated_at
"#;

const LEAVE_COLUMNS: &str =
    "id, employee_id, leave_type, start_date, end_date, status, days_requested, created_at";

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    days_requested: Decimal,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: row.leave_type.parse().map_err(decode_error)?,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status.parse().map_err(decode_error)?,
            days_requested: row.days_requested,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    requester_id: u64,
    target_employee_id: Option<u64>,
    request_data: String,
    title: String,
    description: String,
    priority: String,
    status: String,
    assigned_to: Option<u64>,
    reviewed_by: Option<u64>,
    review_notes: Option<String>,
    rejection_reason: Option<String>,
    completion_note: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for ConfigurationRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let details: RequestDetails = serde_json::from_str(&row.request_data).map_err(decode_error)?;

        Ok(ConfigurationRequest {
            id: row.id,
            requester_id: row.requester_id,
            target_employee_id: row.target_employee_id,
            request_type: details.request_type(),
            details,
            title: row.title,
            description: row.description,
            priority: row.priority.parse().map_err(decode_error)?,
            status: row.status.parse().map_err(decode_error)?,
            assigned_to: row.assigned_to,
            reviewed_by: row.reviewed_by,
            review_notes: row.review_notes,
            rejection_reason: row.rejection_reason,
            completion_note: row.completion_note,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const REQUEST_COLUMNS: &str = r#"
    id, requester_id, target_employee_id, request_data, title, description, priority,
    status, assigned_to, reviewed_by, review_notes, rejection_reason, completion_note,
    completed_at, created_at, updated_at
"#;

/* =========================
Locked reads / writes shared by the transactions below
========================= */

async fn lock_credit_row(
    conn: &mut MySqlConnection,
    employee_id: u64,
    school_year: SchoolYear,
) -> Result<Option<LeaveCreditRecord>, AppError> {
    let sql = format!(
        "SELECT {CREDIT_COLUMNS} FROM leave_credits WHERE employee_id = ? AND school_year = ? FOR UPDATE"
    );

    sqlx::query_as::<_, CreditRow>(&sql)
        .bind(employee_id)
        .bind(school_year.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .map(LeaveCreditRecord::try_from)
        .transpose()
}

async fn write_credit_usage(
    conn: &mut MySqlConnection,
    record: &LeaveCreditRecord,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE leave_credits
        SET used_credits = ?, updated_at = ?
        WHERE employee_id = ? AND school_year = ?
        "#,
    )
    .bind(record.used_credits)
    .bind(record.updated_at)
    .bind(record.employee_id)
    .bind(record.school_year.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn lock_request_row(
    conn: &mut MySqlConnection,
    request_id: u64,
) -> Result<ConfigurationRequest, AppError> {
    let sql =
        format!("SELECT {REQUEST_COLUMNS} FROM configuration_requests WHERE id = ? FOR UPDATE");

    sqlx::query_as::<_, RequestRow>(&sql)
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("configuration request {request_id}")))?
        .try_into()
}

async fn write_request_state(
    conn: &mut MySqlConnection,
    request: &ConfigurationRequest,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE configuration_requests
        SET status = ?, assigned_to = ?, reviewed_by = ?, review_notes = ?,
            rejection_reason = ?, completion_note = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(request.status.as_ref())
    .bind(request.assigned_to)
    .bind(request.reviewed_by)
    .bind(&request.review_notes)
    .bind(&request.rejection_reason)
    .bind(&request.completion_note)
    .bind(request.completed_at)
    .bind(request.updated_at)
    .bind(request.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl EmployeeDirectory for MySqlStore {
    async fn active_employee_ids(&self) -> Result<Vec<u64>, AppError> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn active_employment_type(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmploymentType>, AppError> {
        let raw = sqlx::query_scalar::<_, String>(
            r#"
            SELECT employment_type
            FROM contracts
            WHERE employee_id = ? AND status = 'active'
            ORDER BY start_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.and_then(|value| match value.parse() {
            Ok(kind) => Some(kind),
            Err(_) => {
                warn!(employee_id, employment_type = %value, "Unknown employment type on contract");
                None
            }
        }))
    }
}

impl LedgerStore for MySqlStore {
    async fn find_credit_record(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
    ) -> Result<Option<LeaveCreditRecord>, AppError> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM leave_credits WHERE employee_id = ? AND school_year = ?"
        );

        sqlx::query_as::<_, CreditRow>(&sql)
            .bind(employee_id)
            .bind(school_year.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveCreditRecord::try_from)
            .transpose()
    }

    async fn credit_history(&self, employee_id: u64) -> Result<Vec<LeaveCreditRecord>, AppError> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM leave_credits WHERE employee_id = ? ORDER BY school_year DESC"
        );

        sqlx::query_as::<_, CreditRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveCreditRecord::try_from)
            .collect()
    }

    async fn allocate_credit_record<F>(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
        derive: F,
    ) -> Result<Allocation, AppError>
    where
        F: FnOnce(Option<&LeaveCreditRecord>) -> LeaveCreditRecord,
    {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = lock_credit_row(&mut tx, employee_id, school_year).await? {
            return Ok(Allocation::AlreadyAllocated(existing));
        }

        // holding the previous row keeps debits against it out until we commit
        let previous = lock_credit_row(&mut tx, employee_id, school_year.previous()).await?;
        let record = derive(previous.as_ref());

        let inserted = sqlx::query(
            r#"
            INSERT INTO leave_credits
                (employee_id, school_year, employment_type, total_credits, used_credits,
                 carried_over_credits, monetizable_credits, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.school_year.to_string())
        .bind(record.employment_type.as_ref())
        .bind(record.total_credits)
        .bind(record.used_credits)
        .bind(record.carried_over_credits)
        .bind(record.monetizable_credits)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(Allocation::Created(record))
            }
            Err(e) if is_duplicate_key(&e) => {
                // a concurrent reset won the race for this row
                tx.rollback().await?;
                debug!(employee_id, %school_year, "Credit row created concurrently");
                let existing = self
                    .find_credit_record(employee_id, school_year)
                    .await?
                    .ok_or_else(|| credit_not_found(employee_id, school_year))?;
                Ok(Allocation::AlreadyAllocated(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_credit_record<F>(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
        apply: F,
    ) -> Result<LeaveCreditRecord, AppError>
    where
        F: FnOnce(&mut LeaveCreditRecord) -> Result<(), AppError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut record = lock_credit_row(&mut tx, employee_id, school_year)
            .await?
            .ok_or_else(|| credit_not_found(employee_id, school_year))?;

        // an error here drops `tx`, which rolls back and releases the lock
        apply(&mut record)?;

        write_credit_usage(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn insert_leave_request(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, AppError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, start_date, end_date, leave_type, status, days_requested, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.leave_type.as_ref())
        .bind(LeaveStatus::Pending.as_ref())
        .bind(leave.days_requested)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(LeaveRequest {
            id: result.last_insert_id(),
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            status: LeaveStatus::Pending,
            days_requested: leave.days_requested,
            created_at: Some(created_at),
        })
    }

    async fn find_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, AppError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");

        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(leave_id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn settle_leave_request<F>(
        &self,
        leave_id: u64,
        settle: F,
    ) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut LeaveCreditRecord>) -> Result<(), AppError>,
    {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");

        let mut leave: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(leave_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("leave request {leave_id}")))?
            .try_into()?;

        let mut credit = lock_credit_row(&mut tx, leave.employee_id, leave.school_year()).await?;
        let used_before = credit.as_ref().map(|r| r.used_credits);

        settle(&mut leave, credit.as_mut())?;

        if let Some(record) = credit.as_ref() {
            if Some(record.used_credits) != used_before {
                write_credit_usage(&mut tx, record).await?;
            }
        }

        sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ?")
            .bind(leave.status.as_ref())
            .bind(leave.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(leave)
    }

    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> Result<Page<LeaveRequest>, AppError> {
        let filter = filter.clone().normalized();

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref().to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }

        let data = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }
}

impl RequestStore for MySqlStore {
    async fn insert_request(
        &self,
        request: NewConfigurationRequest,
    ) -> Result<ConfigurationRequest, AppError> {
        let now = Utc::now();
        let request_data = serde_json::to_string(&request.details).map_err(decode_error)?;
        let request_type = request.details.request_type();

        let result = sqlx::query(
            r#"
            INSERT INTO configuration_requests
                (requester_id, target_employee_id, request_type, request_data, title, description,
                 priority, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(request.requester_id)
        .bind(request.target_employee_id)
        .bind(request_type.as_ref())
        .bind(&request_data)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.priority.as_ref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ConfigurationRequest::from_new(result.last_insert_id(), request, now))
    }

    async fn find_request(&self, request_id: u64) -> Result<Option<ConfigurationRequest>, AppError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM configuration_requests WHERE id = ?");

        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .map(ConfigurationRequest::try_from)
            .transpose()
    }

    async fn update_request<F>(
        &self,
        request_id: u64,
        apply: F,
    ) -> Result<ConfigurationRequest, AppError>
    where
        F: FnOnce(&mut ConfigurationRequest) -> Result<(), AppError>,
    {
        self.update_request_with(request_id, apply, async |_: &ConfigurationRequest| Ok(()))
            .await
    }

    async fn update_request_with<F, E>(
        &self,
        request_id: u64,
        apply: F,
        effect: E,
    ) -> Result<ConfigurationRequest, AppError>
    where
        F: FnOnce(&mut ConfigurationRequest) -> Result<(), AppError>,
        E: AsyncFnOnce(&ConfigurationRequest) -> Result<(), AppError>,
    {
        let mut tx = self.pool.begin().await?;
        let mut request = lock_request_row(&mut tx, request_id).await?;

        apply(&mut request)?;
        // the row lock is held until commit, so a concurrent approve or reject
        // blocks here instead of interleaving with the effect
        effect(&request).await?;

        write_request_state(&mut tx, &request).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<ConfigurationRequest>, AppError> {
        let filter = filter.clone().normalized();

        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref().to_string()));
        }
        if let Some(request_type) = filter.request_type {
            where_sql.push_str(" AND request_type = ?");
            args.push(FilterValue::Str(request_type.as_ref().to_string()));
        }
        if let Some(assigned_to) = filter.assigned_to {
            where_sql.push_str(" AND assigned_to = ?");
            args.push(FilterValue::U64(assigned_to));
        }
        if let Some(requester_id) = filter.requester_id {
            where_sql.push_str(" AND requester_id = ?");
            args.push(FilterValue::U64(requester_id));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM configuration_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM configuration_requests{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, RequestRow>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }

        let data = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ConfigurationRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total,
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}
