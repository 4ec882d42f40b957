//! Leave credit ledger: yearly allocation with carryover/monetization and
//! debits on leave approval.

pub mod policy;
pub mod service;

pub use policy::{CARRYOVER_CAP, LeavePolicy, Rollover};
pub use service::{LeaveLedger, ResetDetail, ResetSummary, SkipReason, SkippedEmployee};
