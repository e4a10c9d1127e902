//! Request extractors for the acting user and idempotency key.
//!
//! Identity is established upstream; this service trusts the `X-Actor-Id`
//! header it is given.

use axum::{extract::FromRequestParts, http::request::Parts};
use kudi_core::idempotency::IdempotencyKey;
use kudi_shared::AppError;
use kudi_shared::types::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the acting user.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// The acting user.
///
/// ```ignore
/// async fn handler(Actor(user_id): Actor) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::Unauthorized("X-Actor-Id header is required".into()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("X-Actor-Id header is not valid text".into()))?;

        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::Unauthorized("X-Actor-Id must be a UUID".into()))?;
        Ok(Self(UserId::from_uuid(id)))
    }
}

/// The validated `Idempotency-Key` header of a money-moving request.
#[derive(Debug, Clone)]
pub struct IdempotencyHeader(pub IdempotencyKey);

impl<S> FromRequestParts<S> for IdempotencyHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDEMPOTENCY_HEADER)
            .map(|value| {
                value.to_str().map_err(|_| {
                    AppError::Validation("Idempotency-Key must be visible ASCII".into())
                })
            })
            .transpose()?;

        let key = IdempotencyKey::parse(raw).map_err(AppError::from)?;
        Ok(Self(key))
    }
}
