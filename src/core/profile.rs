use clap::ValueEnum;
use serde::Serialize;
use sqlx::prelude::FromRow;

/// A dashboard user. Profiles are provisioned outside the import pipeline.
#[derive(PartialEq, Eq, Debug, FromRow, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,

    /// Stored role, `None` while the account is pending approval
    pub role: Option<String>,
}

impl Profile {
    pub fn role(&self) -> Role {
        Role::from_db(self.role.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Admin,
    Judge,
    Pending,
}

impl Role {
    pub fn as_db(&self) -> Option<&'static str> {
        match self {
            Role::Admin => Some("admin"),
            Role::Judge => Some("judge"),
            Role::Pending => None,
        }
    }

    /// Only the exact stored strings map to a role, anything else is pending.
    pub fn from_db(role: Option<&str>) -> Role {
        match role {
            Some("admin") => Role::Admin,
            Some("judge") => Role::Judge,
            _ => Role::Pending,
        }
    }
}
