//! Entity models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the operations that touch the table

pub mod audit;
pub mod investigator;
pub mod organization;
pub mod review;
pub mod submission;
pub mod trial;
pub mod user;
