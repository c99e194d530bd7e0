//! DevPost CSV import: parse, classify, deduplicate, persist.

use serde::Serialize;

use crate::{core::db::ProjectDb, error::Error};

use self::{batch::ImportBatch, layout::DevpostRow};

pub mod batch;
pub mod classify;
pub mod layout;
pub mod parse;
pub mod persist;

/// Result of a successful import, as returned to the dashboard
#[derive(Serialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success: bool,
    pub participants: usize,
    pub submissions: usize,
    pub links: usize,
    pub skipped_drafts: usize,
}

/// Parse an export into a deduplicated batch without touching storage.
pub fn build_batch(bytes: &[u8]) -> Result<ImportBatch, Error> {
    let records = parse::read_records(bytes)?;
    Ok(ImportBatch::from_rows(
        records.iter().map(DevpostRow::from_record),
    ))
}

/// Parse on the blocking pool, then persist. Exports can be several megabytes.
pub async fn run_import(
    db: &ProjectDb,
    bytes: impl Into<Vec<u8>>,
) -> Result<ImportSummary, Error> {
    let bytes = bytes.into();
    log::info!("Importing {} byte CSV", bytes.len());

    let batch = tokio::task::spawn_blocking(move || build_batch(&bytes)).await??;
    log::debug!(
        "Batch holds {} participants, {} submissions, {} skipped drafts",
        batch.participants().len(),
        batch.submissions().len(),
        batch.skipped_drafts()
    );

    let counts = persist::persist_batch(db, &batch).await.map_err(|e| {
        log::error!("Import failed: {}", e);
        e
    })?;

    let summary = ImportSummary {
        success: true,
        participants: counts.participants,
        submissions: counts.submissions,
        links: counts.links,
        skipped_drafts: batch.skipped_drafts(),
    };
    log::info!("Import complete: {:?}", summary);
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::layout::col;

    const HEADER: &str = "Opt-In Prize,Project Title,Submission Url,Project Status,\
Judging Status,Highest Step Completed,Project Created At,About The Project,\
Try It Out Links,Video Demo Link,Opt-In Prizes,Submitter First Name,\
Submitter Last Name,Submitter Email,Notes,Deploy Link,Git Link,\
Team Colleges/Universities,Additional Team Member Count,\
Team Member 1 First Name,Team Member 1 Last Name,Team Member 1 Email";

    /// Builds one export record by column index.
    pub struct RowBuilder {
        fields: Vec<String>,
    }

    impl RowBuilder {
        pub fn new() -> Self {
            RowBuilder {
                fields: vec![String::new(); col::TEAM_MEMBERS_START],
            }
        }

        pub fn submitted(url: &str, title: &str) -> Self {
            RowBuilder::new()
                .set(col::SUBMISSION_URL, url)
                .set(col::PROJECT_TITLE, title)
                .set(col::PROJECT_STATUS, "Submitted (Gallery/Visible)")
        }

        pub fn set(mut self, idx: usize, value: &str) -> Self {
            if self.fields.len() <= idx {
                self.fields.resize(idx + 1, String::new());
            }
            self.fields[idx] = value.to_owned();
            self
        }

        pub fn submitter(self, first: &str, last: &str, email: &str) -> Self {
            self.set(col::SUBMITTER_FIRST_NAME, first)
                .set(col::SUBMITTER_LAST_NAME, last)
                .set(col::SUBMITTER_EMAIL, email)
        }

        /// Declare a member count and append the given triples after the fixed columns.
        pub fn members(mut self, count: &str, members: &[(&str, &str, &str)]) -> Self {
            self = self.set(col::ADDITIONAL_TEAM_MEMBER_COUNT, count);
            self.fields.truncate(col::TEAM_MEMBERS_START);
            for (first, last, email) in members {
                self.fields.push(first.to_string());
                self.fields.push(last.to_string());
                self.fields.push(email.to_string());
            }
            self
        }

        pub fn fields(&self) -> Vec<String> {
            self.fields.clone()
        }

        pub fn line(&self) -> String {
            self.fields
                .iter()
                .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    /// A full export: header plus the given rows.
    pub fn export(rows: &[RowBuilder]) -> String {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(&row.line());
        }
        csv.push('\n');
        csv
    }
}
