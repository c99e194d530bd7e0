use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// A person who can be linked to one or more submissions
#[derive(PartialEq, Eq, Debug, FromRow, Clone, Serialize, Deserialize, Default)]
pub struct Participant {
    /// Unique participant ID
    pub id: i64,

    /// Lower-cased email, the participant's identity
    pub email: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,
}

/// A participant as produced by an import batch, before it has an ID.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct NewParticipant {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Normalize an email into the participant identity key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("   "), "");
    }
}
