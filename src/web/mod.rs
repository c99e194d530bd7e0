use std::{convert::Infallible, sync::Arc};

use filters::api_filters;
use handlers::{error_reply, ErrorBody};
use warp::{
    http::{Method, StatusCode},
    reject::Rejection,
    reply::{Json, WithStatus},
    Filter,
};

use crate::{
    core::{db::ProjectDb, settings::Settings},
    error::Error,
};

pub mod filters;
pub mod handlers;

/// Carries a pipeline error through warp's rejection chain
#[derive(Debug)]
pub struct ApiRejection(pub Error);

impl warp::reject::Reject for ApiRejection {}

async fn handle_rejection(err: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let error = if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        return Ok(error_reply(e));
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Error::MethodNotAllowed
    } else if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        Error::RequestMalformed(e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        Error::RequestMalformed(e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        Error::RequestMalformed(e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        Error::RequestMalformed(e.to_string())
    } else if err.is_not_found() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&ErrorBody {
                error: "Not found".to_string(),
                details: None,
            }),
            StatusCode::NOT_FOUND,
        ));
    } else {
        log::error!("Unhandled Rejection: {:?}", err);
        return Ok(warp::reply::with_status(
            warp::reply::json(&ErrorBody {
                error: "Internal server error".to_string(),
                details: Some(format!("{:?}", err).into()),
            }),
            StatusCode::INTERNAL_SERVER_ERROR,
        ));
    };

    Ok(error_reply(&error))
}

/// All endpoints with rejections turned into json error bodies.
pub fn routes(
    db: Arc<ProjectDb>,
    settings: Arc<Settings>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    api_filters(db, settings).recover(handle_rejection)
}

pub async fn run_http_server(db: Arc<ProjectDb>, settings: Arc<Settings>) -> anyhow::Result<()> {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["authorization", "x-client-info", "apikey", "content-type"])
        .allow_methods(&[Method::GET, Method::POST, Method::OPTIONS]);

    let address = (settings.bind_address(), settings.web_port());
    log::info!("Listening on {}:{}", address.0, address.1);

    warp::serve(routes(db, settings).with(cors))
        .run(address)
        .await;

    Ok(())
}
