use std::{collections::HashMap, path::Path};

use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use sqlx::{migrate::MigrateDatabase, sqlite::Sqlite, types::Json, SqlitePool, Transaction};

use super::{
    link::Link,
    participant::{NewParticipant, Participant},
    profile::{Profile, Role},
    submission::{merge_prizes, NewSubmission, Submission, SubmissionRow},
};

/// Name of the sequence handing out submission display numbers
const SUBMISSION_SEQUENCE: &str = "submissions";

const TOKEN_LENGTH: usize = 48;

/// Rows removed by [`ProjectDb::clear_import_data`]
#[derive(Serialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct ClearedCounts {
    pub links: u64,
    pub submissions: u64,
    pub participants: u64,
}

#[derive(Serialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct TableCounts {
    pub participants: i64,
    pub submissions: i64,
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub struct ProjectDb {
    db: SqlitePool,
}

impl ProjectDb {
    /// Open (or create) the database file and make sure the schema exists.
    pub async fn load(file: &Path) -> anyhow::Result<Self> {
        let url = format!("sqlite://{}", file.display());
        if !Sqlite::database_exists(&url).await? {
            log::info!("Creating database {}", file.display());
            Sqlite::create_database(&url).await?;
        }

        let db = SqlitePool::connect(&url).await?;
        let project_db = ProjectDb { db };
        project_db.init_schema().await?;
        Ok(project_db)
    }

    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        // Every connection to :memory: is its own database, so keep exactly one alive.
        let db = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let project_db = ProjectDb { db };
        project_db.init_schema().await?;
        Ok(project_db)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "create table if not exists profiles(
                        id integer primary key autoincrement,
                        email text not null unique collate nocase,
                        role text
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "create table if not exists access_tokens(
                        token text primary key not null,
                        profile_id integer not null,
                        foreign key(profile_id) references profiles(id) on delete cascade
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "create table if not exists participants(
                        id integer primary key autoincrement,
                        email text not null unique collate nocase,
                        first_name text,
                        last_name text
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "create table if not exists submissions(
                        id integer primary key autoincrement,
                        number integer not null unique,
                        devpost_url text not null unique,
                        title text,
                        repo_url text,
                        demo_url text,
                        video_url text,
                        prizes text not null
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "create table if not exists submission_participants(
                        participant_id integer not null,
                        submission_id integer not null,
                        primary key(participant_id, submission_id),
                        foreign key(participant_id) references participants(id) on delete cascade,
                        foreign key(submission_id) references submissions(id) on delete cascade
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "create table if not exists sequences(
                        name text primary key not null,
                        value integer not null
                    );",
        )
        .execute(&self.db)
        .await?;

        sqlx::query("insert or ignore into sequences(name, value) values(?, 0)")
            .bind(SUBMISSION_SEQUENCE)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn get_profile_by_token(&self, token: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as(
            "select p.id, p.email, p.role
                from profiles p
                inner join access_tokens t on t.profile_id = p.id
                where t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
    }

    /// Create a profile or change the role of an existing one.
    pub async fn upsert_profile(&self, email: &str, role: Role) -> Result<Profile, sqlx::Error> {
        sqlx::query_as(
            "insert into profiles(email, role) values(?, ?)
                on conflict(email) do update set role = excluded.role
                returning id, email, role",
        )
        .bind(email)
        .bind(role.as_db())
        .fetch_one(&self.db)
        .await
    }

    /// Mint a new bearer token for a profile.
    pub async fn issue_token(&self, profile_id: i64) -> Result<String, sqlx::Error> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        sqlx::query("insert into access_tokens(token, profile_id) values(?, ?)")
            .bind(&token)
            .bind(profile_id)
            .execute(&self.db)
            .await?;

        Ok(token)
    }

    /// Upsert participants by email. Names are overwritten with the batch values.
    pub async fn upsert_participants(
        &self,
        participants: &[NewParticipant],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for participant in participants {
            sqlx::query(
                "insert into participants(email, first_name, last_name) values(?, ?, ?)
                    on conflict(email) do update set
                        first_name = excluded.first_name,
                        last_name = excluded.last_name",
            )
            .bind(&participant.email)
            .bind(non_empty(&participant.first_name))
            .bind(non_empty(&participant.last_name))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(participants.len())
    }

    /// Upsert submissions by devpost_url.
    ///
    /// Existing rows keep their number, merge prizes, and only take non-empty
    /// incoming fields. New rows draw their number from the submissions sequence.
    pub async fn upsert_submissions(
        &self,
        submissions: &[NewSubmission],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for submission in submissions {
            let existing: Option<(i64, Json<Vec<String>>)> =
                sqlx::query_as("select id, prizes from submissions where devpost_url = ?")
                    .bind(&submission.devpost_url)
                    .fetch_optional(&mut *tx)
                    .await?;

            match existing {
                Some((id, Json(stored))) => {
                    let prizes = merge_prizes(&stored, &submission.prizes);
                    sqlx::query(
                        "update submissions set
                            title = coalesce(?, title),
                            repo_url = coalesce(?, repo_url),
                            demo_url = coalesce(?, demo_url),
                            video_url = coalesce(?, video_url),
                            prizes = ?
                        where id = ?",
                    )
                    .bind(non_empty(&submission.title))
                    .bind(non_empty(&submission.repo_url))
                    .bind(non_empty(&submission.demo_url))
                    .bind(non_empty(&submission.video_url))
                    .bind(Json(&prizes))
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    let number = next_sequence_value(&mut tx, SUBMISSION_SEQUENCE).await?;
                    let prizes = merge_prizes(&[], &submission.prizes);
                    log::debug!(
                        "Assigning number {} to submission {}",
                        number,
                        submission.devpost_url
                    );
                    sqlx::query(
                        "insert into submissions(
                            number, devpost_url, title, repo_url,
                            demo_url, video_url, prizes
                        ) values(?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(number)
                    .bind(&submission.devpost_url)
                    .bind(non_empty(&submission.title))
                    .bind(non_empty(&submission.repo_url))
                    .bind(non_empty(&submission.demo_url))
                    .bind(non_empty(&submission.video_url))
                    .bind(Json(&prizes))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;

        Ok(submissions.len())
    }

    /// Map of lower-cased participant email to ID.
    pub async fn get_participant_ids(&self) -> Result<HashMap<String, i64>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as("select email, id from participants")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(email, id)| (email.to_lowercase(), id))
            .collect())
    }

    /// Map of devpost_url to submission ID.
    pub async fn get_submission_ids(&self) -> Result<HashMap<String, i64>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as("select devpost_url, id from submissions")
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Insert junction rows, ignoring pairs that already exist.
    pub async fn upsert_links(&self, links: &[Link]) -> Result<usize, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for link in links {
            sqlx::query(
                "insert into submission_participants(participant_id, submission_id) values(?, ?)
                    on conflict(participant_id, submission_id) do nothing",
            )
            .bind(link.participant_id)
            .bind(link.submission_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(links.len())
    }

    /// Rewind the submission number sequence so the next submission gets number 1.
    pub async fn reset_submission_sequence(&self) -> Result<(), sqlx::Error> {
        sqlx::query("update sequences set value = 0 where name = ?")
            .bind(SUBMISSION_SEQUENCE)
            .execute(&self.db)
            .await
            .map(|_| ())
    }

    /// Delete every imported row, then reset the submission sequence.
    pub async fn clear_import_data(&self) -> Result<ClearedCounts, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let links = sqlx::query("delete from submission_participants")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let submissions = sqlx::query("delete from submissions")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let participants = sqlx::query("delete from participants")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        self.reset_submission_sequence().await?;

        Ok(ClearedCounts {
            links,
            submissions,
            participants,
        })
    }

    pub async fn get_counts(&self) -> Result<TableCounts, sqlx::Error> {
        let participants: i64 = sqlx::query_scalar("select count(*) from participants")
            .fetch_one(&self.db)
            .await?;
        let submissions: i64 = sqlx::query_scalar("select count(*) from submissions")
            .fetch_one(&self.db)
            .await?;

        Ok(TableCounts {
            participants,
            submissions,
        })
    }

    pub async fn get_participants(&self) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as("select * from participants order by id")
            .fetch_all(&self.db)
            .await
    }

    pub async fn get_submissions(&self) -> Result<Vec<Submission>, sqlx::Error> {
        let rows: Vec<SubmissionRow> = sqlx::query_as("select * from submissions order by number")
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Submission::from).collect())
    }

    pub async fn get_links(&self) -> Result<Vec<Link>, sqlx::Error> {
        sqlx::query_as(
            "select participant_id, submission_id from submission_participants
                order by submission_id, participant_id",
        )
        .fetch_all(&self.db)
        .await
    }
}

async fn next_sequence_value(
    tx: &mut Transaction<'_, Sqlite>,
    sequence: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("update sequences set value = value + 1 where name = ? returning value")
        .bind(sequence)
        .fetch_one(&mut **tx)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::submission::GENERAL_PRIZE;

    fn new_submission(url: &str, title: &str, prizes: &[&str]) -> NewSubmission {
        let mut submission = NewSubmission::new(url);
        submission.title = title.to_owned();
        submission.prizes = prizes.iter().map(|p| p.to_string()).collect();
        submission
    }

    fn new_participant(email: &str, first: &str, last: &str) -> NewParticipant {
        NewParticipant {
            email: email.to_owned(),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_participant_upsert() {
        let db = ProjectDb::in_memory().await.unwrap();

        db.upsert_participants(&[new_participant("a@x.com", "Jo", "")])
            .await
            .unwrap();
        db.upsert_participants(&[
            new_participant("a@x.com", "Joanna", "Lee"),
            new_participant("b@x.com", "Bo", "Kim"),
        ])
        .await
        .unwrap();

        let participants = db.get_participants().await.unwrap();
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].email, "a@x.com");
        assert_eq!(participants[0].first_name.as_deref(), Some("Joanna"));
        assert_eq!(participants[0].last_name.as_deref(), Some("Lee"));
    }

    #[tokio::test]
    async fn test_empty_names_are_null() {
        let db = ProjectDb::in_memory().await.unwrap();
        db.upsert_participants(&[new_participant("a@x.com", "", "")])
            .await
            .unwrap();

        let participants = db.get_participants().await.unwrap();
        assert_eq!(participants[0].first_name, None);
        assert_eq!(participants[0].last_name, None);
    }

    #[tokio::test]
    async fn test_submission_merge() {
        let db = ProjectDb::in_memory().await.unwrap();

        let mut first = new_submission("U1", "Proj", &[GENERAL_PRIZE, "A"]);
        first.repo_url = "https://git.example/proj".to_owned();
        db.upsert_submissions(&[first]).await.unwrap();

        db.upsert_submissions(&[new_submission("U1", "", &[GENERAL_PRIZE, "B", "A"])])
            .await
            .unwrap();

        let submissions = db.get_submissions().await.unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].number, 1);
        assert_eq!(submissions[0].title.as_deref(), Some("Proj"));
        assert_eq!(
            submissions[0].repo_url.as_deref(),
            Some("https://git.example/proj")
        );
        assert_eq!(submissions[0].prizes, vec!["GENERAL", "A", "B"]);
    }

    #[tokio::test]
    async fn test_sequence_is_monotonic() {
        let db = ProjectDb::in_memory().await.unwrap();

        db.upsert_submissions(&[
            new_submission("U1", "One", &[GENERAL_PRIZE]),
            new_submission("U2", "Two", &[GENERAL_PRIZE]),
        ])
        .await
        .unwrap();

        sqlx::query("delete from submissions where devpost_url = 'U2'")
            .execute(&db.db)
            .await
            .unwrap();

        db.upsert_submissions(&[new_submission("U2", "Two", &[GENERAL_PRIZE])])
            .await
            .unwrap();

        let numbers: Vec<(String, i64)> = db
            .get_submissions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.devpost_url, s.number))
            .collect();
        assert_eq!(numbers, vec![("U1".to_owned(), 1), ("U2".to_owned(), 3)]);
    }

    #[tokio::test]
    async fn test_clear_resets_sequence() {
        let db = ProjectDb::in_memory().await.unwrap();

        db.upsert_participants(&[new_participant("a@x.com", "A", "B")])
            .await
            .unwrap();
        db.upsert_submissions(&[
            new_submission("U1", "One", &[GENERAL_PRIZE]),
            new_submission("U2", "Two", &[GENERAL_PRIZE]),
        ])
        .await
        .unwrap();
        let ids = db.get_participant_ids().await.unwrap();
        let subs = db.get_submission_ids().await.unwrap();
        db.upsert_links(&[Link {
            participant_id: ids["a@x.com"],
            submission_id: subs["U1"],
        }])
        .await
        .unwrap();

        let cleared = db.clear_import_data().await.unwrap();
        assert_eq!(
            cleared,
            ClearedCounts {
                links: 1,
                submissions: 2,
                participants: 1
            }
        );
        assert_eq!(
            db.get_counts().await.unwrap(),
            TableCounts {
                participants: 0,
                submissions: 0
            }
        );

        db.upsert_submissions(&[new_submission("U9", "Nine", &[GENERAL_PRIZE])])
            .await
            .unwrap();
        assert_eq!(db.get_submissions().await.unwrap()[0].number, 1);
    }

    #[tokio::test]
    async fn test_links_are_unique() {
        let db = ProjectDb::in_memory().await.unwrap();

        db.upsert_participants(&[new_participant("a@x.com", "A", "B")])
            .await
            .unwrap();
        db.upsert_submissions(&[new_submission("U1", "One", &[GENERAL_PRIZE])])
            .await
            .unwrap();

        let link = Link {
            participant_id: db.get_participant_ids().await.unwrap()["a@x.com"],
            submission_id: db.get_submission_ids().await.unwrap()["U1"],
        };
        assert_eq!(db.upsert_links(&[link, link]).await.unwrap(), 2);
        assert_eq!(db.upsert_links(&[link]).await.unwrap(), 1);
        assert_eq!(db.get_links().await.unwrap(), vec![link]);
    }

    #[tokio::test]
    async fn test_participant_ids_are_case_insensitive() {
        let db = ProjectDb::in_memory().await.unwrap();

        sqlx::query("insert into participants(email) values('Mixed@Case.com')")
            .execute(&db.db)
            .await
            .unwrap();

        let ids = db.get_participant_ids().await.unwrap();
        assert!(ids.contains_key("mixed@case.com"));

        // The unique index is nocase, so a lower-cased import merges instead of duplicating.
        db.upsert_participants(&[new_participant("mixed@case.com", "M", "C")])
            .await
            .unwrap();
        assert_eq!(db.get_participants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_tokens() {
        let db = ProjectDb::in_memory().await.unwrap();

        let profile = db.upsert_profile("admin@x.com", Role::Judge).await.unwrap();
        let token = db.issue_token(profile.id).await.unwrap();
        assert_eq!(token.len(), TOKEN_LENGTH);

        let found = db.get_profile_by_token(&token).await.unwrap().unwrap();
        assert_eq!(found.role(), Role::Judge);

        db.upsert_profile("admin@x.com", Role::Admin).await.unwrap();
        let found = db.get_profile_by_token(&token).await.unwrap().unwrap();
        assert_eq!(found.id, profile.id);
        assert_eq!(found.role(), Role::Admin);

        assert!(db.get_profile_by_token("nope").await.unwrap().is_none());
    }
}
