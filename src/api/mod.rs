pub mod config_request;
pub mod leave_credit;
pub mod leave_request;

use crate::ledger::LeaveLedger;
use crate::store::MySqlStore;
use crate::workflow::{DbNotifier, DbSideEffects, RequestWorkflow};

/// Ledger as wired in the running server.
pub type Ledger = LeaveLedger<MySqlStore>;

/// Request workflow as wired in the running server.
pub type Workflow = RequestWorkflow<MySqlStore, DbSideEffects, DbNotifier>;
