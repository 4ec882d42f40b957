use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorUnauthorized},
};
use futures::future::{Ready, ready};

use crate::model::role::Role;

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    fn require(&self, allowed: &[Role], message: &'static str) -> actix_web::Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ErrorForbidden(message))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        self.require(&[Role::Admin, Role::Hr], "HR/Admin only")
    }

    pub fn require_mis_or_admin(&self) -> actix_web::Result<()> {
        self.require(&[Role::Admin, Role::Mis], "MIS/Admin only")
    }

    /// HR, MIS or Admin.
    pub fn require_staff(&self) -> actix_web::Result<()> {
        self.require(&[Role::Admin, Role::Hr, Role::Mis], "HR/MIS/Admin only")
    }

    /// Staff may read any employee's records; employees only their own.
    pub fn require_self_or_staff(&self, employee_id: u64) -> actix_web::Result<()> {
        if self.role == Role::Employee && self.employee_id == Some(employee_id) {
            return Ok(());
        }
        self.require_staff()
    }

    pub fn require_employee_profile(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn role_guards() {
        assert!(user(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Mis, None).require_hr_or_admin().is_err());
        assert!(user(Role::Mis, None).require_mis_or_admin().is_ok());
        assert!(user(Role::Hr, None).require_mis_or_admin().is_err());
        assert!(user(Role::Employee, Some(3)).require_staff().is_err());
        assert!(user(Role::Admin, None).require_staff().is_ok());
    }

    #[test]
    fn employees_only_see_their_own_records() {
        let employee = user(Role::Employee, Some(3));
        assert!(employee.require_self_or_staff(3).is_ok());
        assert!(employee.require_self_or_staff(4).is_err());
        assert!(user(Role::Hr, Some(9)).require_self_or_staff(4).is_ok());
    }
}
