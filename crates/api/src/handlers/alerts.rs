use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use engine::{admit, Admission, Notification};
use tracing::{error, info};

use super::ApiError;
use crate::AppState;

pub const AUTH_HEADER: &str = "cf-webhook-auth";

/// `POST /alert`
///
/// The body is parsed only after the shared secret checks out.
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let authorized = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == &*state.webhook_secret);
    if !authorized {
        error!("unauthorized webhook call");
        return Err(ApiError::Unauthorized);
    }

    let notification: Notification = serde_json::from_slice(&body).map_err(|e| {
        error!("malformed notification: {e}");
        ApiError::BadRequest("bad request".into())
    })?;

    match admit(&notification, &state.routing, Utc::now())? {
        Admission::ConnectivityTest => Ok((StatusCode::OK, "ok").into_response()),
        Admission::Accepted { event, routing_key } => {
            let run_id = state.workflow.submit(event, routing_key).await?;
            info!(%run_id, "notification accepted");
            Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "run_id": run_id }))).into_response())
        }
    }
}
