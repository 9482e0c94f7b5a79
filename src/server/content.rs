use super::SharedState;
use axum::body::{Body, Bytes};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http;
use axum::response::Response;
use elpx_gateway::error::ErrorKind;
use elpx_gateway::not_found;

fn respond(response: http::Response<Bytes>) -> Response {
    response.map(Body::from)
}

/// `GET /content/{hash}`: the artifact's `index.html`.
pub async fn root(State(state): State<SharedState>, hash: Result<Path<String>, PathRejection>) -> Response {
    match hash {
        Ok(Path(hash)) => respond(state.gateway.serve(&hash, None).await),
        Err(_) => respond(not_found(ErrorKind::InvalidIdentifier.reason())),
    }
}

/// `GET /content/{hash}/{*path}`.
pub async fn file(State(state): State<SharedState>, params: Result<Path<(String, String)>, PathRejection>) -> Response {
    match params {
        Ok(Path((hash, path))) => respond(state.gateway.serve(&hash, Some(&path)).await),
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable content path");
            respond(not_found(ErrorKind::InvalidPath.reason()))
        },
    }
}
