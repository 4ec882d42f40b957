use crate::api::config_request::{
    ApproveRequest, AssignRequest, CompleteRequest, CreateRequest, RejectRequest,
    RequestListResponse,
};
use crate::api::leave_credit::{LeaveCreditResponse, ResetCredits};
use crate::api::leave_request::{
    CreateLeave, LeaveFilter, LeaveListResponse, LeaveResponse,
};
use crate::ledger::{ResetDetail, ResetSummary, SkippedEmployee};
use crate::model::config_request::{
    ConfigurationRequest, Priority, ProfilePatch, RequestStatus, RequestType,
};
use crate::model::employment::EmploymentType;
use crate::model::leave_request::{LeaveStatus, LeaveType};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Portal API",
        version = "1.0.0",
        description = r#"
## HR Portal: Leave Credits & Configuration Requests

### Leave Credits
- Yearly allocation per employment type with a 5-day carryover cap
- Excess over the cap is reported as monetizable
- Approving a leave request debits the balance of its school year

### Configuration Requests
- HR raises profile, contract, leave configuration, password and system requests
- MIS assigns, starts, approves (applying the change), rejects, and completes them

### Security
All endpoints require a **JWT Bearer** access token.
"#,
    ),
    paths(
        crate::api::leave_credit::reset_credits,
        crate::api::leave_credit::credit_history,
        crate::api::leave_credit::credit_balance,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::config_request::create_request,
        crate::api::config_request::list_requests,
        crate::api::config_request::get_request,
        crate::api::config_request::assign_request,
        crate::api::config_request::start_request,
        crate::api::config_request::approve_request,
        crate::api::config_request::reject_request,
        crate::api::config_request::complete_request
    ),
    components(
        schemas(
            ResetCredits,
            ResetSummary,
            ResetDetail,
            SkippedEmployee,
            LeaveCreditResponse,
            EmploymentType,
            CreateLeave,
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse,
            LeaveType,
            LeaveStatus,
            CreateRequest,
            AssignRequest,
            ApproveRequest,
            RejectRequest,
            CompleteRequest,
            RequestListResponse,
            ConfigurationRequest,
            ProfilePatch,
            RequestType,
            RequestStatus,
            Priority
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Leave Credits", description = "Leave credit ledger APIs"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "Configuration Requests", description = "HR to MIS configuration request APIs"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/leave-credits/reset",
            "/api/leave-credits/{employee_id}/{school_year}",
            "/api/leave/{leave_id}/approve",
            "/api/requests",
            "/api/requests/{request_id}/complete",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
