//! Authenticated actor from headers set by the upstream auth layer.

use crate::auth::{Actor, Role};
use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

pub const ACTOR_UUID_HEADER: &str = "X-Actor-UUID";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Rejects with 401 when either header is missing or malformed.
#[derive(Clone, Copy, Debug)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (uuid, role) = match (header(parts, ACTOR_UUID_HEADER), header(parts, ACTOR_ROLE_HEADER)) {
            (Some(uuid), Some(role)) => (uuid, role),
            _ => return Err(AppError::Unauthenticated("auth.error.actorMissing")),
        };
        let uuid = Uuid::parse_str(uuid).map_err(|_| AppError::Unauthenticated("auth.error.actorInvalid"))?;
        let role: Role = role.parse()?;
        Ok(CurrentActor(Actor::new(uuid, role)))
    }
}
