// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`backend`] provides the `JobBackend` trait the engine drives, together
//!   with job handles, statuses and backend errors.
//! - [`local`] is the production backend, running each rule's command as a
//!   local process.
//! - [`job_runner`] runs one job process and collects its outputs.
//! - [`job_table`] is the shared bookkeeping between the local backend and
//!   its job runners.

pub mod backend;
pub mod job_runner;
pub mod job_table;
pub mod local;

pub use backend::{
    BackendError, BackendFuture, FinishedJob, JobBackend, JobHandle, JobStatus, PollResult,
};
pub use local::LocalBackend;
