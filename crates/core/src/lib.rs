//! Pure domain logic for the trial submission workflow and the
//! tamper-evident audit trail. This crate has no internal dependencies
//! so it can be used by the repository layer, the API, and any future
//! CLI tooling alike.

pub mod audit;
pub mod error;
pub mod hashing;
pub mod patient;
pub mod roles;
pub mod types;
pub mod workflow;
