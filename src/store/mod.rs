//! Persistence seams for the ledger and the request workflow.
//!
//! Every `update_*` / `settle_*` method is an atomic read-validate-write: the
//! implementation locks the row, hands it to the closure, and writes it back only
//! if the closure returns `Ok`. A closure error leaves the row untouched.

pub mod memory;
pub mod mysql;

use std::ops::AsyncFnOnce;

use serde::Serialize;

use crate::error::AppError;
use crate::model::config_request::{
    ConfigurationRequest, NewConfigurationRequest, RequestStatus, RequestType,
};
use crate::model::employment::EmploymentType;
use crate::model::leave_credit::LeaveCreditRecord;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::school_year::SchoolYear;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Result of an allocate-if-absent write.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Created(LeaveCreditRecord),
    /// The row already existed and was left as is.
    AlreadyAllocated(LeaveCreditRecord),
}

pub(crate) fn credit_not_found(employee_id: u64, school_year: SchoolYear) -> AppError {
    AppError::not_found(format!(
        "leave credit record for employee {employee_id} in {school_year}"
    ))
}

/// Employee/contract directory consulted by the yearly reset.
pub trait EmployeeDirectory {
    async fn active_employee_ids(&self) -> Result<Vec<u64>, AppError>;

    /// Employment type of the latest active contract, if any.
    async fn active_employment_type(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmploymentType>, AppError>;
}

pub trait LedgerStore {
    async fn find_credit_record(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
    ) -> Result<Option<LeaveCreditRecord>, AppError>;

    /// All records of one employee, newest school year first.
    async fn credit_history(&self, employee_id: u64) -> Result<Vec<LeaveCreditRecord>, AppError>;

    /// Create the `(employee_id, school_year)` row unless it exists. `derive`
    /// receives the previous school year's row, locked for the duration.
    async fn allocate_credit_record<F>(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
        derive: F,
    ) -> Result<Allocation, AppError>
    where
        F: FnOnce(Option<&LeaveCreditRecord>) -> LeaveCreditRecord;

    async fn update_credit_record<F>(
        &self,
        employee_id: u64,
        school_year: SchoolYear,
        apply: F,
    ) -> Result<LeaveCreditRecord, AppError>
    where
        F: FnOnce(&mut LeaveCreditRecord) -> Result<(), AppError>;

    async fn insert_leave_request(&self, leave: NewLeaveRequest) -> Result<LeaveRequest, AppError>;

    async fn find_leave_request(&self, leave_id: u64) -> Result<Option<LeaveRequest>, AppError>;

    /// Lock a leave request together with the credit row of its school year
    /// (if one exists) and persist both after `settle` succeeds.
    async fn settle_leave_request<F>(
        &self,
        leave_id: u64,
        settle: F,
    ) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut LeaveCreditRecord>) -> Result<(), AppError>;

    /// Newest first.
    async fn list_leave_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> Result<Page<LeaveRequest>, AppError>;
}

/// Page is 1-based; page size is kept within 1..=100 and defaults to 10.
fn normalize_paging(page: u32, per_page: u32) -> (u32, u32) {
    let per_page = if per_page == 0 { 10 } else { per_page.min(100) };
    (page.max(1), per_page)
}

fn paging_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page)
}

#[derive(Debug, Clone, Default)]
pub struct LeaveRequestFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl LeaveRequestFilter {
    pub fn normalized(mut self) -> Self {
        (self.page, self.per_page) = normalize_paging(self.page, self.per_page);
        self
    }

    pub fn offset(&self) -> u64 {
        paging_offset(self.page, self.per_page)
    }

    pub fn matches(&self, leave: &LeaveRequest) -> bool {
        self.employee_id.is_none_or(|e| e == leave.employee_id)
            && self.status.is_none_or(|s| s == leave.status)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub assigned_to: Option<u64>,
    pub requester_id: Option<u64>,
    pub page: u32,
    pub per_page: u32,
}

impl RequestFilter {
    pub fn normalized(mut self) -> Self {
        (self.page, self.per_page) = normalize_paging(self.page, self.per_page);
        self
    }

    pub fn offset(&self) -> u64 {
        paging_offset(self.page, self.per_page)
    }

    pub fn matches(&self, request: &ConfigurationRequest) -> bool {
        self.status.is_none_or(|s| s == request.status)
            && self.request_type.is_none_or(|t| t == request.request_type)
            && self.assigned_to.is_none_or(|a| Some(a) == request.assigned_to)
            && self.requester_id.is_none_or(|r| r == request.requester_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

pub trait RequestStore {
    async fn insert_request(
        &self,
        request: NewConfigurationRequest,
    ) -> Result<ConfigurationRequest, AppError>;

    async fn find_request(&self, request_id: u64) -> Result<Option<ConfigurationRequest>, AppError>;

    async fn update_request<F>(
        &self,
        request_id: u64,
        apply: F,
    ) -> Result<ConfigurationRequest, AppError>
    where
        F: FnOnce(&mut ConfigurationRequest) -> Result<(), AppError>;

    /// Like `update_request`, with `effect` run on the updated request before
    /// the write. The row stays locked across the effect, so competing
    /// transitions wait for it and an effect error discards the change.
    async fn update_request_with<F, E>(
        &self,
        request_id: u64,
        apply: F,
        effect: E,
    ) -> Result<ConfigurationRequest, AppError>
    where
        F: FnOnce(&mut ConfigurationRequest) -> Result<(), AppError>,
        E: AsyncFnOnce(&ConfigurationRequest) -> Result<(), AppError>;

    /// Newest first.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<ConfigurationRequest>, AppError>;
}
