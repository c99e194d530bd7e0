use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::core::{
    auth::{authorize, Access},
    db::ProjectDb,
    profile::Profile,
    settings::Settings,
};

use super::{
    handlers::{
        clear_data, get_challenges, get_counts, get_participants, get_submissions, import_csv,
    },
    ApiRejection,
};

pub fn with_db(
    db: Arc<ProjectDb>,
) -> impl Filter<Extract = (Arc<ProjectDb>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

/// Authorize the request before anything else about it is read.
pub fn with_access(
    db: Arc<ProjectDb>,
    access: Access,
) -> impl Filter<Extract = (Profile,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_db(db))
        .and_then(move |header: Option<String>, db: Arc<ProjectDb>| async move {
            authorize(&db, header.as_deref(), access)
                .await
                .map_err(|e| warp::reject::custom(ApiRejection(e)))
        })
}

fn read_filters(
    db: Arc<ProjectDb>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let counts = warp::path!("counts")
        .and(warp::get())
        .and(with_access(db.clone(), Access::Reader))
        .and(with_db(db.clone()))
        .and_then(get_counts);

    let challenges = warp::path!("challenges")
        .and(warp::get())
        .and(with_access(db.clone(), Access::Reader))
        .and(with_db(db.clone()))
        .and_then(get_challenges);

    let participants = warp::path!("participants")
        .and(warp::get())
        .and(with_access(db.clone(), Access::Reader))
        .and(with_db(db.clone()))
        .and_then(get_participants);

    let submissions = warp::path!("submissions")
        .and(warp::get())
        .and(with_access(db.clone(), Access::Reader))
        .and(with_db(db))
        .and_then(get_submissions);

    counts.or(challenges).or(participants).or(submissions)
}

pub fn api_filters(
    db: Arc<ProjectDb>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let import = warp::path!("import")
        .and(warp::post())
        .and(with_access(db.clone(), Access::Import))
        .and(warp::multipart::form().max_length(settings.max_upload_bytes()))
        .and(with_db(db.clone()))
        .and_then(import_csv);

    let clear = warp::path!("clear")
        .and(warp::post())
        .and(with_access(db.clone(), Access::Clear))
        .and(with_db(db.clone()))
        .and_then(clear_data);

    import.or(clear).or(read_filters(db))
}
