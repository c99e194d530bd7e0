use serde::Serialize;
use sqlx::prelude::FromRow;

/// Team membership, one row of `submission_participants`
#[derive(PartialEq, Eq, Hash, Debug, FromRow, Clone, Copy, Serialize)]
pub struct Link {
    pub participant_id: i64,
    pub submission_id: i64,
}
