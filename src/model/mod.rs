pub mod config_request;
pub mod employment;
pub mod leave_credit;
pub mod leave_request;
pub mod role;
pub mod school_year;
