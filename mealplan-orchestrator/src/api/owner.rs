//! Owner extraction
//!
//! Every endpoint is scoped to the caller named in the `x-owner-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::api::error::ApiError;

pub const OWNER_HEADER: &str = "x-owner-id";

/// Owner of the jobs and plans a request may touch
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub Uuid);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", OWNER_HEADER)))?;

        value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Owner)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {} header", OWNER_HEADER)))
    }
}
