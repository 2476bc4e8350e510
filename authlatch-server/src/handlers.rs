//! HTTP request handlers

use crate::api::{ClaimRequest, MessageResponse};
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_claim, record_query, LatencyTimer};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, warn};

/// Handle `POST /auth`
///
/// A body sent without a JSON content type is treated as an empty claim, so it
/// fails the same way as `{}`.
pub async fn claim(
    State(state): State<AppState>,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let timer = LatencyTimer::new("claim");

    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => ClaimRequest::default(),
        Err(rejection) => {
            warn!("Rejected claim body: {}", rejection.body_text());
            record_claim("invalid_json");
            return Err(ApiError::from(rejection));
        }
    };

    let result = req.name().and_then(|name| state.holder.claim(name));
    timer.record();

    match result {
        Ok(()) => {
            record_claim("accepted");
            Ok(Json(MessageResponse::authorized()))
        }
        Err(e) => {
            warn!("Claim rejected: {}", e);
            record_claim("rejected");
            Err(e.into())
        }
    }
}

/// Handle `GET /auth`
pub async fn query(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    let timer = LatencyTimer::new("query");
    let result = state.holder.require();
    timer.record();

    match result {
        Ok(name) => {
            if state.debug {
                debug!(claimant = %name, "Query: authorized");
            }
            record_query("authorized");
            Ok(Json(MessageResponse::authorized()))
        }
        Err(e) => {
            debug!("Query: not authorized");
            record_query("unauthorized");
            Err(e.into())
        }
    }
}
