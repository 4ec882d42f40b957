use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use super::Workflow;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::config_request::{
    ConfigurationRequest, NewConfigurationRequest, Priority, RequestDetails, RequestStatus,
    RequestType,
};
use crate::store::RequestFilter;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "request_type": "profile_change",
    "request_data": { "email": "ana.cruz@school.edu" },
    "target_employee_id": 1000,
    "title": "Update email address",
    "description": "Employee moved to the new domain",
    "priority": "medium"
}))]
pub struct CreateRequest {
    pub request_type: RequestType,
    /// Payload whose shape depends on `request_type`
    #[serde(default)]
    #[schema(value_type = Object)]
    pub request_data: Value,
    pub target_employee_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignRequest {
    /// MIS user to assign; the caller when omitted
    pub assigned_to: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveRequest {
    pub review_notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectRequest {
    #[schema(example = "Duplicate of request #12")]
    pub rejection_reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteRequest {
    pub completion_note: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct RequestQuery {
    /// Filter by status
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<RequestStatus>,
    /// Filter by request type
    #[param(value_type = Option<String>, example = "profile_change")]
    pub request_type: Option<RequestType>,
    /// Filter by assigned MIS user
    pub assigned_to: Option<u64>,
    /// Filter by requesting HR user
    pub requester_id: Option<u64>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

impl From<RequestQuery> for RequestFilter {
    fn from(query: RequestQuery) -> Self {
        RequestFilter {
            status: query.status,
            request_type: query.request_type,
            assigned_to: query.assigned_to,
            requester_id: query.requester_id,
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(10),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<ConfigurationRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Decode the type-specific payload into its typed shape.
fn request_details(request_type: RequestType, data: Value) -> Result<RequestDetails, AppError> {
    serde_json::from_value(json!({ "request_type": request_type, "request_data": data }))
        .map_err(|e| AppError::validation(format!("invalid request_data for {request_type}: {e}")))
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(content = CreateRequest, content_type = "application/json"),
    responses(
        (status = 201, description = "Request created in pending", body = ConfigurationRequest),
        (status = 400, description = "Missing target employee, blank title or invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn create_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    payload: web::Json<CreateRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.into_inner();

    let request = NewConfigurationRequest {
        requester_id: auth.user_id,
        target_employee_id: payload.target_employee_id,
        details: request_details(payload.request_type, payload.request_data)?,
        title: payload.title,
        description: payload.description,
        priority: payload.priority.unwrap_or(Priority::Medium),
    };

    let created = workflow.create_request(request).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Paginated requests, newest first", body = RequestListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<RequestQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let page = workflow.list_requests(query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(RequestListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/requests/{request_id}",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    responses(
        (status = 200, description = "Request found", body = ConfigurationRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn get_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let request = workflow.get_request(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/assign",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    request_body(content = AssignRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Request assigned", body = ConfigurationRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn assign_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
    payload: web::Json<AssignRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_mis_or_admin()?;

    let assigned_to = payload.assigned_to.unwrap_or(auth.user_id);
    let request = workflow
        .assign_request(path.into_inner(), assigned_to)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/start",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    responses(
        (status = 200, description = "Work started", body = ConfigurationRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not assigned"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn start_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_mis_or_admin()?;

    let request = workflow.start_request(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Applies the requested change, then marks the request approved.
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/approve",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    request_body(content = ApproveRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Change applied and request approved", body = ConfigurationRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already settled"),
        (status = 502, description = "The change could not be applied; request unchanged", body = Object, example = json!({
            "message": "side effect failed: employee 1000 not found",
            "kind": "side_effect_failed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn approve_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
    payload: web::Json<ApproveRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_mis_or_admin()?;

    let request = workflow
        .approve_request(path.into_inner(), auth.user_id, payload.into_inner().review_notes)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/reject",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    request_body(content = RejectRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Request rejected", body = ConfigurationRequest),
        (status = 400, description = "Blank rejection reason"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already settled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
    payload: web::Json<RejectRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_mis_or_admin()?;

    let request = workflow
        .reject_request(path.into_inner(), auth.user_id, &payload.rejection_reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/complete",
    params(("request_id" = u64, Path, description = "Configuration request id")),
    request_body(content = CompleteRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Request completed", body = ConfigurationRequest),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not approved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Configuration Requests"
)]
pub async fn complete_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<u64>,
    payload: web::Json<CompleteRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_mis_or_admin()?;

    let request = workflow
        .complete_request(path.into_inner(), payload.into_inner().completion_note)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}
