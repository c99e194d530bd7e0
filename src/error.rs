use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use warp::http::StatusCode;

/// Maximum number of CSV diagnostics reported back to the caller.
pub const MAX_PARSE_DIAGNOSTICS: usize = 5;

/// The persistence step an import was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Participants,
    Submissions,
    IdLookup,
    Links,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPhase::Participants => write!(f, "import participants"),
            ImportPhase::Submissions => write!(f, "import submissions"),
            ImportPhase::IdLookup => write!(f, "look up imported ids"),
            ImportPhase::Links => write!(f, "link participants to submissions"),
        }
    }
}

/// A single structural problem found while reading the CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    /// 1-based line the record started on, when the reader knows it
    pub row: Option<u64>,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing authorization")]
    AuthenticationMissing,

    #[error("Unauthorized")]
    AuthenticationInvalid,

    #[error("{0}")]
    AuthorizationDenied(&'static str),

    #[error("No CSV file provided")]
    MissingFile,

    #[error("Malformed request: {0}")]
    RequestMalformed(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// `diagnostics` holds at most [`MAX_PARSE_DIAGNOSTICS`] entries, `total` is the real count.
    #[error("CSV parsing errors")]
    Parse {
        diagnostics: Vec<ParseDiagnostic>,
        total: usize,
    },

    #[error("Failed to {phase}")]
    Persistence {
        phase: ImportPhase,
        source: sqlx::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Import task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn persistence(phase: ImportPhase) -> impl FnOnce(sqlx::Error) -> Error {
        move |source| Error::Persistence { phase, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::AuthenticationMissing | Error::AuthenticationInvalid => StatusCode::UNAUTHORIZED,
            Error::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            Error::MissingFile | Error::RequestMalformed(_) | Error::Parse { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Persistence { .. } | Error::Storage(_) | Error::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Diagnostic payload for the `details` field of an error response.
    pub fn details(&self) -> Option<Value> {
        match self {
            Error::Parse { diagnostics, .. } => Some(json!(diagnostics)),
            Error::Persistence { source, .. } => Some(json!(source.to_string())),
            Error::Storage(err) => Some(json!(err.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::AuthenticationMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::AuthenticationInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::AuthorizationDenied("Only admins can import data").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Error::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);

        let err = Error::Persistence {
            phase: ImportPhase::Links,
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to link participants to submissions");
        assert!(err.details().is_some());
    }

    #[test]
    fn test_parse_details() {
        let err = Error::Parse {
            diagnostics: vec![ParseDiagnostic {
                row: Some(3),
                message: "invalid utf-8".to_string(),
            }],
            total: 1,
        };
        assert_eq!(
            err.details(),
            Some(json!([{ "row": 3, "message": "invalid utf-8" }]))
        );
        assert!(Error::MissingFile.details().is_none());
    }
}
