//! Shared response envelope.
//!
//! Every API payload is wrapped in `{ "data": ... }`. Using
//! [`DataResponse`] instead of ad-hoc `json!` keeps the envelope
//! consistent and type-checked.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
