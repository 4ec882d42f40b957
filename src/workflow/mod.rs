//! Configuration requests raised by HR and carried out by MIS.

pub mod effects;
pub mod notify;
pub mod service;

pub use effects::{DbSideEffects, SideEffects};
pub use notify::{DbNotifier, Notifier};
pub use service::RequestWorkflow;
