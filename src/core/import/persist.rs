use std::collections::HashMap;

use crate::{
    core::{db::ProjectDb, link::Link},
    error::{Error, ImportPhase},
};

use super::batch::ImportBatch;

/// Rows written by each phase of an import
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct PersistCounts {
    pub participants: usize,
    pub submissions: usize,
    pub links: usize,
}

/// Write a batch in four phases: participants, submissions, id lookup, links.
///
/// Each phase commits on its own. A failure stops the import and reports the
/// phase, earlier phases stay written.
pub async fn persist_batch(db: &ProjectDb, batch: &ImportBatch) -> Result<PersistCounts, Error> {
    let participants = db
        .upsert_participants(batch.participants())
        .await
        .map_err(Error::persistence(ImportPhase::Participants))?;
    log::debug!("Upserted {} participants", participants);

    let submissions = db
        .upsert_submissions(batch.submissions())
        .await
        .map_err(Error::persistence(ImportPhase::Submissions))?;
    log::debug!("Upserted {} submissions", submissions);

    let participant_ids = db
        .get_participant_ids()
        .await
        .map_err(Error::persistence(ImportPhase::IdLookup))?;
    let submission_ids = db
        .get_submission_ids()
        .await
        .map_err(Error::persistence(ImportPhase::IdLookup))?;

    let junction = build_junction_rows(batch, &participant_ids, &submission_ids);
    let links = db
        .upsert_links(&junction)
        .await
        .map_err(Error::persistence(ImportPhase::Links))?;
    log::debug!("Upserted {} links", links);

    Ok(PersistCounts {
        participants,
        submissions,
        links,
    })
}

/// Resolve the batch's links to IDs, dropping any pair where either side is unknown.
pub fn build_junction_rows(
    batch: &ImportBatch,
    participant_ids: &HashMap<String, i64>,
    submission_ids: &HashMap<String, i64>,
) -> Vec<Link> {
    let mut rows = Vec::new();
    for (url, emails) in batch.links() {
        let Some(&submission_id) = submission_ids.get(url) else {
            log::warn!("No stored submission for {}, skipping its links", url);
            continue;
        };

        for email in emails {
            match participant_ids.get(email) {
                Some(&participant_id) => rows.push(Link {
                    participant_id,
                    submission_id,
                }),
                None => log::warn!("No stored participant for {}, skipping link", email),
            }
        }
    }
    rows
}
