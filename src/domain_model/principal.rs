use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered so that a higher role implies every lower one:
/// MASTER satisfies ADMIN checks, ADMIN satisfies MEMBER checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Member,
    Admin,
    Master,
}

impl Role {
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
            Role::Master => "MASTER",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            "MASTER" => Ok(Role::Master),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// The identity established for a single request. Never persisted and never
/// stored in process-wide state; it travels through the pipeline by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}
