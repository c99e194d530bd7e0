use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// The baseline prize track every submission belongs to.
pub const GENERAL_PRIZE: &str = "GENERAL";

/// One hackathon project entry, identified by its DevPost URL
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,

    /// Display number handed out by the submissions sequence
    pub number: i64,

    pub devpost_url: String,
    pub title: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub video_url: Option<String>,

    /// Ordered prize set, always starting with [`GENERAL_PRIZE`]
    pub prizes: Vec<String>,
}

#[derive(FromRow)]
pub(crate) struct SubmissionRow {
    id: i64,
    number: i64,
    devpost_url: String,
    title: Option<String>,
    repo_url: Option<String>,
    demo_url: Option<String>,
    video_url: Option<String>,
    prizes: Json<Vec<String>>,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            number: row.number,
            devpost_url: row.devpost_url,
            title: row.title,
            repo_url: row.repo_url,
            demo_url: row.demo_url,
            video_url: row.video_url,
            prizes: row.prizes.0,
        }
    }
}

/// A submission as produced by an import batch, before it has an ID or number.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewSubmission {
    pub devpost_url: String,
    pub title: String,
    pub repo_url: String,
    pub demo_url: String,
    pub video_url: String,
    pub prizes: Vec<String>,
}

impl NewSubmission {
    pub fn new(devpost_url: &str) -> Self {
        NewSubmission {
            devpost_url: devpost_url.to_owned(),
            title: String::new(),
            repo_url: String::new(),
            demo_url: String::new(),
            video_url: String::new(),
            prizes: vec![GENERAL_PRIZE.to_owned()],
        }
    }
}

/// Append `prize` unless it is empty or already present. Comparison is case-sensitive.
pub fn push_prize(prizes: &mut Vec<String>, prize: &str) {
    if !prize.is_empty() && !prizes.iter().any(|p| p == prize) {
        prizes.push(prize.to_owned());
    }
}

/// Merge a stored prize list with an incoming one.
///
/// The result starts with [`GENERAL_PRIZE`], keeps the stored order, then
/// appends incoming prizes that were not seen yet.
pub fn merge_prizes(stored: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged = vec![GENERAL_PRIZE.to_owned()];
    for prize in stored.iter().chain(incoming) {
        push_prize(&mut merged, prize);
    }
    merged
}
