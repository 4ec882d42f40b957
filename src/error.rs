use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use rust_decimal::Decimal;
use serde_json::json;

/// Errors surfaced by the leave ledger and the request workflow.
///
/// Every variant except `Database` is a local, recoverable condition that the
/// caller is expected to report back to the user.
#[derive(Debug, Display)]
pub enum AppError {
    /// Malformed or missing input.
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "cannot {} {} in '{}' state", action, entity, from)]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    #[display(
        fmt = "insufficient leave credits: requested {} day(s), {} available",
        requested,
        available
    )]
    InsufficientCredits {
        requested: Decimal,
        available: Decimal,
    },

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    /// A request-type specific executor failed while approving a request.
    #[display(fmt = "side effect failed: {}", _0)]
    SideEffectFailed(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        action: &'static str,
    ) -> Self {
        AppError::InvalidTransition {
            entity,
            from: from.to_string(),
            action,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::InsufficientCredits { .. } => "insufficient_credits",
            AppError::NotFound(_) => "not_found",
            AppError::SideEffectFailed(_) => "side_effect_failed",
            AppError::Database(_) => "internal_error",
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } | AppError::InsufficientCredits { .. } => {
                StatusCode::CONFLICT
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SideEffectFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            tracing::error!(error = %e, "Database operation failed");
            return HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error",
                "kind": self.kind()
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string(),
            "kind": self.kind()
        }))
    }
}
