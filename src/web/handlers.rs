use std::{convert::Infallible, sync::Arc};

use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use warp::{
    http::StatusCode,
    multipart::{FormData, Part},
    reply::{Json, WithStatus},
    Buf,
};

use crate::{
    core::{
        challenge::summarize_challenges,
        db::ProjectDb,
        import::run_import,
        profile::Profile,
    },
    error::Error,
};

/// Name of the multipart field holding the export
const FILE_FIELD: &str = "file";

/// Json body of every failed request
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn error_reply(err: &Error) -> WithStatus<Json> {
    let status = err.status();
    if status.is_server_error() {
        log::error!("{}", err);
    } else {
        log::warn!("{}", err);
    }

    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: err.to_string(),
            details: err.details(),
        }),
        status,
    )
}

pub fn to_http_output<T: Serialize>(
    result: Result<T, Error>,
) -> Result<WithStatus<Json>, Infallible> {
    match result {
        Ok(data) => Ok(warp::reply::with_status(
            warp::reply::json(&data),
            StatusCode::OK,
        )),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn read_part(part: Part) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    let mut stream = Box::pin(part.stream());
    while let Some(mut chunk) = stream
        .try_next()
        .await
        .map_err(|e| Error::RequestMalformed(e.to_string()))?
    {
        while chunk.has_remaining() {
            let slice = chunk.chunk();
            let len = slice.len();
            bytes.extend_from_slice(slice);
            chunk.advance(len);
        }
    }
    Ok(bytes)
}

/// Find the uploaded `file` field. Plain text fields of that name do not count.
async fn read_csv_upload(form: FormData) -> Result<Vec<u8>, Error> {
    let mut form = Box::pin(form);
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| Error::RequestMalformed(e.to_string()))?
    {
        if part.name() == FILE_FIELD && part.filename().is_some() {
            return read_part(part).await;
        }
    }
    Err(Error::MissingFile)
}

pub async fn import_csv(
    profile: Profile,
    form: FormData,
    db: Arc<ProjectDb>,
) -> Result<WithStatus<Json>, Infallible> {
    log::info!("Import requested by {}", profile.email);
    let result = match read_csv_upload(form).await {
        Ok(bytes) => run_import(&db, bytes).await,
        Err(e) => Err(e),
    };
    to_http_output(result)
}

pub async fn clear_data(
    profile: Profile,
    db: Arc<ProjectDb>,
) -> Result<WithStatus<Json>, Infallible> {
    log::warn!("Clearing all imported data at the request of {}", profile.email);
    to_http_output(db.clear_import_data().await.map_err(Error::from))
}

pub async fn get_counts(_: Profile, db: Arc<ProjectDb>) -> Result<WithStatus<Json>, Infallible> {
    to_http_output(db.get_counts().await.map_err(Error::from))
}

pub async fn get_participants(
    _: Profile,
    db: Arc<ProjectDb>,
) -> Result<WithStatus<Json>, Infallible> {
    to_http_output(db.get_participants().await.map_err(Error::from))
}

pub async fn get_submissions(
    _: Profile,
    db: Arc<ProjectDb>,
) -> Result<WithStatus<Json>, Infallible> {
    to_http_output(db.get_submissions().await.map_err(Error::from))
}

pub async fn get_challenges(
    _: Profile,
    db: Arc<ProjectDb>,
) -> Result<WithStatus<Json>, Infallible> {
    let challenges = async {
        let submissions = db.get_submissions().await?;
        let links = db.get_links().await?;
        Ok::<_, Error>(summarize_challenges(&submissions, &links))
    };
    to_http_output(challenges.await)
}
