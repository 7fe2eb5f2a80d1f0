//! Orchestration layer between the HTTP handlers and the
//! repositories: the submission workflow engine and the audit chain
//! service.

pub mod audit;
pub mod workflow;
