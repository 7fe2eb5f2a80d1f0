//! HTTP surface and workflow orchestration for the trial submission
//! review platform.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;
