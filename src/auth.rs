//! Authenticated actor and role ordering.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role. Variants are ordered from least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer = 1,
    Developer = 2,
    Admin = 3,
    Owner = 4,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Developer => "developer",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "developer" => Ok(Role::Developer),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(AppError::Unauthenticated("auth.error.actorInvalid")),
        }
    }
}

/// The user on whose behalf an operation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub uuid: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(uuid: Uuid, role: Role) -> Self {
        Actor { uuid, role }
    }

    pub fn is_developer_or_more(&self) -> bool {
        self.role >= Role::Developer
    }
}
