use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{
    link::Link,
    submission::{Submission, GENERAL_PRIZE},
};

/// Aggregate view of one prize track
#[derive(PartialEq, Eq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub name: String,

    /// Number of submissions holding this prize
    pub project_count: usize,

    /// Distinct participants linked to those submissions
    pub participant_count: usize,
}

/// Group submissions by prize. GENERAL sorts first, the rest by name.
pub fn summarize_challenges(submissions: &[Submission], links: &[Link]) -> Vec<Challenge> {
    let mut members: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        members
            .entry(link.submission_id)
            .or_default()
            .push(link.participant_id);
    }

    let mut challenges: HashMap<&str, (usize, HashSet<i64>)> = HashMap::new();
    for submission in submissions {
        for prize in &submission.prizes {
            let entry = challenges.entry(prize.as_str()).or_default();
            entry.0 += 1;
            if let Some(ids) = members.get(&submission.id) {
                entry.1.extend(ids);
            }
        }
    }

    let mut challenges: Vec<Challenge> = challenges
        .into_iter()
        .map(|(name, (project_count, participants))| Challenge {
            name: name.to_owned(),
            project_count,
            participant_count: participants.len(),
        })
        .collect();

    challenges.sort_by(|a, b| {
        (a.name != GENERAL_PRIZE)
            .cmp(&(b.name != GENERAL_PRIZE))
            .then_with(|| a.name.cmp(&b.name))
    });
    challenges
}
