//! Caller-visible run log.
//!
//! The orchestrator narrates a run as a list of [`LogEntry`] values that is
//! returned with the response. Entries are attributed to one of three
//! pipeline roles:
//!
//! - `nexus`: request level (genesis, parameters, fatal errors)
//! - `relay`: round scheduling
//! - `sentinel`: fragments and consensus assembly
//!
//! The log is for display only; nothing downstream reads it back.
//! Operator diagnostics go through `tracing` instead.

pub mod log;

pub use log::{LogEntry, LogKind, LogRole, RunLog};
