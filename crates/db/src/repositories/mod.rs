//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-step mutations run in
//! a single transaction inside the repository; callers never see a
//! partially applied state.

pub mod audit_repo;
pub mod investigator_repo;
pub mod organization_repo;
pub mod review_repo;
pub mod submission_repo;
pub mod trial_repo;
pub mod user_repo;

pub use audit_repo::AuditRepo;
pub use investigator_repo::InvestigatorRepo;
pub use organization_repo::OrganizationRepo;
pub use review_repo::ReviewRepo;
pub use submission_repo::{DecisionError, SubmissionRepo};
pub use trial_repo::TrialRepo;
pub use user_repo::UserRepo;
