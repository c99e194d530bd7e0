use std::collections::HashMap;

use crate::core::{
    participant::{normalize_email, NewParticipant},
    submission::{push_prize, NewSubmission},
};

use super::{
    classify::{classify, RowClass},
    layout::{DevpostRow, TeamMember},
};

/// Everything one import will write, deduplicated by natural key.
///
/// Submissions and participants keep first-seen order so new submissions are
/// numbered in file order.
#[derive(Debug, Default)]
pub struct ImportBatch {
    participants: Vec<NewParticipant>,
    participant_index: HashMap<String, usize>,

    submissions: Vec<NewSubmission>,
    submission_index: HashMap<String, usize>,

    /// Participant emails per submission, indexed like `submissions`
    links: Vec<Vec<String>>,

    skipped_drafts: usize,
}

impl ImportBatch {
    pub fn from_rows(rows: impl IntoIterator<Item = DevpostRow>) -> Self {
        let mut batch = ImportBatch::default();
        for row in rows {
            batch.add_row(row);
        }
        batch
    }

    pub fn add_row(&mut self, row: DevpostRow) {
        match classify(&row) {
            RowClass::Ignored => return,
            RowClass::Draft => {
                self.skipped_drafts += 1;
                return;
            }
            RowClass::Eligible => {}
        }

        let index = self.add_submission(&row);

        for member in std::iter::once(&row.submitter).chain(&row.team_members) {
            if let Some(email) = self.add_participant(member) {
                let links = &mut self.links[index];
                if !links.contains(&email) {
                    links.push(email);
                }
            }
        }
    }

    /// Seed or merge the row's submission, returning its index.
    fn add_submission(&mut self, row: &DevpostRow) -> usize {
        if let Some(&index) = self.submission_index.get(&row.submission_url) {
            // Later rows only contribute prizes, their optional fields may be blank.
            push_prize(&mut self.submissions[index].prizes, &row.prize);
            return index;
        }

        let mut submission = NewSubmission::new(&row.submission_url);
        submission.title = row.title.clone();
        submission.repo_url = row.git_url.clone();
        submission.demo_url = row.deploy_url.clone();
        submission.video_url = row.video_url.clone();
        push_prize(&mut submission.prizes, &row.prize);

        let index = self.submissions.len();
        self.submissions.push(submission);
        self.links.push(Vec::new());
        self.submission_index.insert(row.submission_url.clone(), index);
        index
    }

    /// Record a participant unless the email is blank. The first-seen name wins.
    fn add_participant(&mut self, member: &TeamMember) -> Option<String> {
        let email = normalize_email(&member.email);
        if email.is_empty() {
            return None;
        }

        if !self.participant_index.contains_key(&email) {
            self.participant_index
                .insert(email.clone(), self.participants.len());
            self.participants.push(NewParticipant {
                email: email.clone(),
                first_name: member.first_name.clone(),
                last_name: member.last_name.clone(),
            });
        }
        Some(email)
    }

    pub fn participants(&self) -> &[NewParticipant] {
        &self.participants
    }

    pub fn submissions(&self) -> &[NewSubmission] {
        &self.submissions
    }

    /// Each submission URL with the emails linked to it.
    pub fn links(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.submissions
            .iter()
            .zip(&self.links)
            .map(|(submission, emails)| (submission.devpost_url.as_str(), emails.as_slice()))
    }

    pub fn skipped_drafts(&self) -> usize {
        self.skipped_drafts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(first: &str, last: &str, email: &str) -> TeamMember {
        TeamMember {
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: email.to_owned(),
        }
    }

    fn row(url: &str, prize: &str, submitter: TeamMember) -> DevpostRow {
        DevpostRow {
            prize: prize.to_owned(),
            title: "Proj".to_owned(),
            submission_url: url.to_owned(),
            status: "Submitted".to_owned(),
            submitter,
            ..Default::default()
        }
    }

    #[test]
    fn test_prizes_merge_in_first_seen_order() {
        let batch = ImportBatch::from_rows(vec![
            row("U1", "", member("A", "A", "a@x.com")),
            row("U1", "BEST_DESIGN", member("A", "A", "a@x.com")),
            row("U1", "AI", member("A", "A", "a@x.com")),
            row("U1", "BEST_DESIGN", member("A", "A", "a@x.com")),
            row("U1", "GENERAL", member("A", "A", "a@x.com")),
        ]);

        assert_eq!(batch.submissions().len(), 1);
        assert_eq!(
            batch.submissions()[0].prizes,
            vec!["GENERAL", "BEST_DESIGN", "AI"]
        );
    }

    #[test]
    fn test_first_row_fields_are_kept() {
        let mut first = row("U1", "A", member("", "", ""));
        first.git_url = "https://git.example/proj".to_owned();
        first.video_url = "https://video.example/proj".to_owned();
        let mut second = row("U1", "B", member("", "", ""));
        second.title = "Renamed".to_owned();

        let batch = ImportBatch::from_rows(vec![first, second]);
        let submission = &batch.submissions()[0];
        assert_eq!(submission.title, "Proj");
        assert_eq!(submission.repo_url, "https://git.example/proj");
        assert_eq!(submission.video_url, "https://video.example/proj");
        assert_eq!(submission.prizes, vec!["GENERAL", "A", "B"]);
    }

    #[test]
    fn test_first_seen_name_wins() {
        let batch = ImportBatch::from_rows(vec![
            row("U1", "", member("Jo", "Lee", "a@x.com")),
            row("U2", "", member("Joanna", "Lee2", "A@X.com ")),
        ]);

        assert_eq!(
            batch.participants(),
            &[NewParticipant {
                email: "a@x.com".to_owned(),
                first_name: "Jo".to_owned(),
                last_name: "Lee".to_owned(),
            }]
        );
    }

    #[test]
    fn test_links_dedup_submitter_and_member() {
        let mut first = row("U1", "", member("Al", "Ice", "alice@x.com"));
        first.team_members = vec![member("Bob", "B", "bob@x.com")];
        let mut second = row("U1", "", member("Bob", "B", "bob@x.com"));
        second.team_members = vec![member("Al", "Ice", "ALICE@x.com")];

        let batch = ImportBatch::from_rows(vec![first, second]);
        let links: Vec<(&str, &[String])> = batch.links().collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, "U1");
        assert_eq!(links[0].1, &["alice@x.com".to_owned(), "bob@x.com".to_owned()]);
    }

    #[test]
    fn test_blank_member_email_is_skipped() {
        let mut r = row("U1", "", member("Al", "Ice", ""));
        r.team_members = vec![member("No", "Email", "  "), member("Bob", "B", "bob@x.com")];

        let batch = ImportBatch::from_rows(vec![r]);
        assert_eq!(batch.participants().len(), 1);
        assert_eq!(batch.participants()[0].email, "bob@x.com");

        let links: Vec<(&str, &[String])> = batch.links().collect();
        assert_eq!(links[0].1, &["bob@x.com".to_owned()]);
    }

    #[test]
    fn test_drafts_and_ignored_rows() {
        let mut draft = row("U2", "", member("D", "D", "d@x.com"));
        draft.status = "Draft".to_owned();
        let mut untitled = row("U3", "", member("U", "U", "u@x.com"));
        untitled.title = "Untitled".to_owned();
        untitled.status = "Draft".to_owned();
        let blank = row("", "", member("B", "B", "b@x.com"));

        let batch = ImportBatch::from_rows(vec![
            row("U1", "", member("A", "A", "a@x.com")),
            draft,
            untitled,
            blank,
        ]);

        assert_eq!(batch.skipped_drafts(), 1);
        assert_eq!(batch.submissions().len(), 1);
        assert_eq!(batch.participants().len(), 1);
        assert_eq!(batch.participants()[0].email, "a@x.com");
    }

    #[test]
    fn test_submission_urls_are_case_sensitive() {
        let batch = ImportBatch::from_rows(vec![
            row("https://devpost.com/software/Proj", "", member("", "", "")),
            row("https://devpost.com/software/proj", "", member("", "", "")),
        ]);

        assert_eq!(batch.submissions().len(), 2);
        assert!(batch.links().all(|(_, emails)| emails.is_empty()));
    }
}
