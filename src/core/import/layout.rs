//! Column layout of the DevPost project export.
//!
//! Everything that knows about column positions lives here, so a new export
//! format only needs a new [`DevpostRow::from_record`].

use csv::StringRecord;

pub mod col {
    pub const OPT_IN_PRIZE: usize = 0;
    pub const PROJECT_TITLE: usize = 1;
    pub const SUBMISSION_URL: usize = 2;
    pub const PROJECT_STATUS: usize = 3;
    // 4: judging status, 5: highest step completed, 6: created at,
    // 7: about the project, 8: "try it out" links
    pub const VIDEO_DEMO_LINK: usize = 9;
    // 10: built with
    pub const SUBMITTER_FIRST_NAME: usize = 11;
    pub const SUBMITTER_LAST_NAME: usize = 12;
    pub const SUBMITTER_EMAIL: usize = 13;
    // 14: notes
    pub const DEPLOY_LINK: usize = 15;
    pub const GIT_LINK: usize = 16;
    // 17: team colleges/universities
    pub const ADDITIONAL_TEAM_MEMBER_COUNT: usize = 18;
    /// First of the repeating (first name, last name, email) member triples
    pub const TEAM_MEMBERS_START: usize = 19;
}

#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct TeamMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// One export record with every field trimmed and missing fields empty.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct DevpostRow {
    pub prize: String,
    pub title: String,
    pub submission_url: String,
    pub status: String,
    pub video_url: String,
    pub submitter: TeamMember,
    pub deploy_url: String,
    pub git_url: String,
    /// Members read according to the declared count, complete triples only
    pub team_members: Vec<TeamMember>,
}

impl DevpostRow {
    pub fn from_record(record: &StringRecord) -> Self {
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_owned();
        let member = |base: usize| TeamMember {
            first_name: field(base),
            last_name: field(base + 1),
            email: field(base + 2),
        };

        let count =
            parse_member_count(record.get(col::ADDITIONAL_TEAM_MEMBER_COUNT).unwrap_or(""));
        let team_members = (0..count)
            .map(|i| col::TEAM_MEMBERS_START + i * 3)
            .take_while(|base| base + 2 < record.len())
            .map(member)
            .collect();

        DevpostRow {
            prize: field(col::OPT_IN_PRIZE),
            title: field(col::PROJECT_TITLE),
            submission_url: field(col::SUBMISSION_URL),
            status: field(col::PROJECT_STATUS),
            video_url: field(col::VIDEO_DEMO_LINK),
            submitter: member(col::SUBMITTER_FIRST_NAME),
            deploy_url: field(col::DEPLOY_LINK),
            git_url: field(col::GIT_LINK),
            team_members,
        }
    }
}

/// Lenient count parse: leading whitespace, optional `+`, then leading digits.
/// Anything else (empty, negative, non-numeric) reads as zero.
pub fn parse_member_count(value: &str) -> usize {
    let value = value.trim_start();
    let value = value.strip_prefix('+').unwrap_or(value);
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(usize::MAX)
    }
}
