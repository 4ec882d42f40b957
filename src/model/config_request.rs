use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::employment::EmploymentType;
use crate::model::school_year::SchoolYear;

const ENTITY: &str = "configuration request";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    ProfileChange,
    ContractAdjustment,
    LeaveConfiguration,
    ResetPassword,
    SystemUpdate,
}

impl RequestType {
    /// Types that act on a single employee and must name one.
    pub fn requires_target_employee(&self) -> bool {
        matches!(
            self,
            RequestType::ProfileChange | RequestType::ContractAdjustment | RequestType::ResetPassword
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting MIS triage.
    Pending,
    /// Claimed by a specific MIS user.
    Assigned,
    InProgress,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RequestAction {
    Assign,
    Start,
    Approve,
    Reject,
    Complete,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }

    /// The full transition table. Anything not listed is an `InvalidTransition`.
    pub fn apply(self, action: RequestAction) -> Result<RequestStatus, AppError> {
        use RequestAction::*;
        use RequestStatus::*;

        match (self, action) {
            (Pending, Assign) => Ok(Assigned),
            (Assigned, Start) => Ok(InProgress),
            (Pending | Assigned | InProgress, Approve) => Ok(Approved),
            (Pending | Assigned | InProgress, Reject) => Ok(Rejected),
            (Approved, Complete) => Ok(Completed),
            (from, action) => Err(AppError::invalid_transition(ENTITY, from, action.into())),
        }
    }
}

/// Fields of an employee profile an HR user may ask MIS to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title_id: Option<u64>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self == &ProfilePatch::default()
    }
}

/// Typed payload of a configuration request, one shape per request type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request_type", content = "request_data", rename_all = "snake_case")]
pub enum RequestDetails {
    ProfileChange(ProfilePatch),
    ContractAdjustment {
        employment_type: EmploymentType,
        effective_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    LeaveConfiguration {
        school_year: SchoolYear,
    },
    ResetPassword,
    SystemUpdate {
        component: String,
        #[serde(default)]
        summary: String,
    },
}

impl RequestDetails {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestDetails::ProfileChange(_) => RequestType::ProfileChange,
            RequestDetails::ContractAdjustment { .. } => RequestType::ContractAdjustment,
            RequestDetails::LeaveConfiguration { .. } => RequestType::LeaveConfiguration,
            RequestDetails::ResetPassword => RequestType::ResetPassword,
            RequestDetails::SystemUpdate { .. } => RequestType::SystemUpdate,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        match self {
            RequestDetails::ProfileChange(patch) if patch.is_empty() => Err(AppError::validation(
                "profile_change requires at least one field to change",
            )),
            RequestDetails::ContractAdjustment {
                effective_date,
                end_date: Some(end),
                ..
            } if end < effective_date => Err(AppError::validation(
                "contract end_date cannot precede effective_date",
            )),
            RequestDetails::SystemUpdate { component, .. } if component.trim().is_empty() => {
                Err(AppError::validation("system_update requires a component"))
            }
            _ => Ok(()),
        }
    }
}

/// Input of `createRequest`, validated before it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConfigurationRequest {
    pub requester_id: u64,
    pub target_employee_id: Option<u64>,
    pub details: RequestDetails,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl NewConfigurationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let request_type = self.details.request_type();

        if request_type.requires_target_employee() && self.target_employee_id.is_none() {
            return Err(AppError::validation(format!(
                "{request_type} requests require a target employee"
            )));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }

        self.details.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfigurationRequest {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 12)]
    pub requester_id: u64,
    #[schema(example = 1000, nullable = true)]
    pub target_employee_id: Option<u64>,
    #[schema(example = "profile_change", value_type = String)]
    pub request_type: RequestType,
    #[schema(value_type = Object)]
    pub details: RequestDetails,
    pub title: String,
    pub description: String,
    #[schema(example = "high", value_type = String)]
    pub priority: Priority,
    #[schema(example = "pending", value_type = String)]
    pub status: RequestStatus,
    #[schema(nullable = true)]
    pub assigned_to: Option<u64>,
    #[schema(nullable = true)]
    pub reviewed_by: Option<u64>,
    #[schema(nullable = true)]
    pub review_notes: Option<String>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
    #[schema(nullable = true)]
    pub completion_note: Option<String>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl ConfigurationRequest {
    pub fn from_new(id: u64, new: NewConfigurationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            requester_id: new.requester_id,
            target_employee_id: new.target_employee_id,
            request_type: new.details.request_type(),
            details: new.details,
            title: new.title,
            description: new.description,
            priority: new.priority,
            status: RequestStatus::Pending,
            assigned_to: None,
            reviewed_by: None,
            review_notes: None,
            rejection_reason: None,
            completion_note: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to the state `action` leads to, or fail naming the current state.
    pub fn transition(&mut self, action: RequestAction, now: DateTime<Utc>) -> Result<(), AppError> {
        self.status = self.status.apply(action)?;
        self.updated_at = now;
        Ok(())
    }
}
