//! In-process store guarded by a single mutex. Each call holds the lock for its
//! whole read-validate-write, which gives the same atomicity the MySQL store gets
//! from row locks. Request transitions additionally serialize on an async lock
//! that stays held across approval side effects.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::AsyncFnOnce;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::lock::Mutex as AsyncMutex;

use super::{
    Allocation, EmployeeDirectory, LeaveRequestFilter, LedgerStore, Page, RequestFilter,
    RequestStore, credit_not_found,
};
use crate::error::AppError;
use crate::model::config_request::{ConfigurationRequest, NewConfigurationRequest};
use crate::model::employment::EmploymentType;
use crate::model::leave_credit::LeaveCreditRecord;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::school_year::SchoolYear;

#[derive(Debug, Default)]
struct State {
    /// employee id -> (active, employment type of latest active contract)
    employees: BTreeMap<u64, (bool, Option<EmploymentType>)>,
    credits: HashMap<(u64, SchoolYear), LeaveCreditRecord>,
    leaves: BTreeMap<u64, LeaveRequest>,
    requests: BTreeMap<u64, ConfigurationRequest>,
    /// employees whose credit row cannot be written
    failing_allocations: HashSet<u64>,
    next_leave_id: u64,
    next_request_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    request_lock: AsyncMutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an active employee with the given contract type.
    pub fn add_employee(&self, employee_id: u64, employment_type: Option<EmploymentType>) {
        self.lock()
            .employees
            .insert(employee_id, (true, employment_type));
    }

    pub fn deactivate_employee(&self, employee_id: u64) {
        if let Some(entry) = self.lock().employees.get_mut(&employee_id) {
            entry.0 = false;
        }
    }

    /// Seed or overwrite a credit row directly.
    pub fn put_credit_record(&self, record: LeaveCreditRecord) {
        self.lock()
            .credits
            .insert((record.employee_id, record.school_year), record);
    }

    /// Make every later allocation for `employee_id` fail as if the database
    /// were unreachable.
    pub fn fail_allocation_for(&self, employee_id: u64) {
        self.lock().failing_allocations.insert(employee_id);
    }

    pub fn credit_record_count(&self) -> usize {
        self.lock().credits.len()
    }

    fn stored_request(&self, request_id: u64) -> Result<ConfigurationRequest, AppError> {
        self.lock()
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("configuration request {request_id}")))
    }
}

impl EmployeeDirectory for MemoryStore {
    async fn active_employee_ids(&self) -> Result<Vec<u64>, AppError> {
        Ok(self
            .lock()
            .employees
            .iter()
            .filter(|(_, (active, _))| *active)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn active_employment_type(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmploymentType>, AppError> {
        Ok(self
            .lock()
            .employees
            .get(&employee_id)
            .and_then(|(_, kind)| *kind))
    }
}

impl LedgerStore for MemoryStore {
    async fn find_credit_record(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
    ) -> Result<Option<LeaveCreditRecord>, AppError> {
        Ok(self.lock().credits.get(&(employee_id, school_year)).cloned())
    }

    async fn credit_history(&self, employee_id: u64) -> Result<Vec<LeaveCreditRecord>, AppError> {
        let mut records: Vec<_> = self
            .lock()
            .credits
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.school_year.cmp(&a.school_year));
        Ok(records)
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
        let mut state = self.lock();

        if state.failing_allocations.contains(&employee_id) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        if let Some(existing) = state.credits.get(&(employee_id, school_year)) {
            return Ok(Allocation::AlreadyAllocated(existing.clone()));
        }

        let record = derive(state.credits.get(&(employee_id, school_year.previous())));
        state
            .credits
            .insert((employee_id, school_year), record.clone());
        Ok(Allocation::Created(record))
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
        let mut state = self.lock();
        let stored = state
            .credits
            .get_mut(&(employee_id, school_year))
            .ok_or_else(|| credit_not_found(employee_id, school_year))?;

        let mut record = stored.clone();
        apply(&mut record)?;
        *stored = record.clone();
        Ok(record)
    }

    async fn insert_leave_request(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, AppError> {
        let mut state = self.lock();
        state.next_leave_id += 1;

        let request = LeaveRequest {
            id: state.next_leave_id,
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            status: LeaveStatus::Pending,
            days_requested: leave.days_requested,
            created_at: Some(Utc::now()),
        };
        state.leaves.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, AppError> {
        Ok(self.lock().leaves.get(&leave_id).cloned())
    }

    async fn settle_leave_request<F>(
        &self,
        leave_id: u64,
        settle: F,
    ) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut LeaveCreditRecord>) -> Result<(), AppError>,
    {
        let mut state = self.lock();
        let mut leave = state
            .leaves
            .get(&leave_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("leave request {leave_id}")))?;

        let key = (leave.employee_id, leave.school_year());
        let mut credit = state.credits.get(&key).cloned();

        settle(&mut leave, credit.as_mut())?;

        if let Some(record) = credit {
            state.credits.insert(key, record);
        }
        state.leaves.insert(leave_id, leave.clone());
        Ok(leave)
    }

    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> Result<Page<LeaveRequest>, AppError> {
        let filter = filter.clone().normalized();
        let state = self.lock();

        let matching: Vec<_> = state
            .leaves
            .values()
            .rev()
            .filter(|l| filter.matches(l))
            .collect();

        let data = matching
            .iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .map(|l| (*l).clone())
            .collect();

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total: matching.len() as i64,
        })
    }
}

impl RequestStore for MemoryStore {
    async fn insert_request(
        &self,
        request: NewConfigurationRequest,
    ) -> Result<ConfigurationRequest, AppError> {
        let mut state = self.lock();
        state.next_request_id += 1;

        let created = ConfigurationRequest::from_new(state.next_request_id, request, Utc::now());
        state.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_request(&self, request_id: u64) -> Result<Option<ConfigurationRequest>, AppError> {
        Ok(self.lock().requests.get(&request_id).cloned())
    }

    async fn update_request<F>(
        &self,
        request_id: u64,
        apply: F,
    ) -> Result<ConfigurationRequest, AppError>
    where
        F: FnOnce(&mut ConfigurationRequest) -> Result<(), AppError>,
    {
        let _transition = self.request_lock.lock().await;

        let mut request = self.stored_request(request_id)?;
        apply(&mut request)?;
        self.lock().requests.insert(request_id, request.clone());
        Ok(request)
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
        let _transition = self.request_lock.lock().await;

        let mut request = self.stored_request(request_id)?;
        apply(&mut request)?;
        // the state mutex is released here so the effect may use the store
        effect(&request).await?;
        self.lock().requests.insert(request_id, request.clone());
        Ok(request)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<ConfigurationRequest>, AppError> {
        let filter = filter.clone().normalized();
        let state = self.lock();

        // ids grow with creation time, so reverse id order is newest first
        let matching: Vec<_> = state
            .requests
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .collect();

        let data = matching
            .iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .map(|r| (*r).clone())
            .collect();

        Ok(Page {
            data,
            page: filter.page,
            per_page: filter.per_page,
            total: matching.len() as i64,
        })
    }
}
