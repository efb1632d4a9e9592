use axum::{
    extract::{Path, State},
    Extension, Json,
};
use igscrape_core::ProfileRecord;
use igscrape_scraper::fetch_profile_with_retry;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// `GET /profile/{username}`: the normalized record, or the classified
/// error status with `{"error": message}`.
///
/// If the client disconnects, axum drops this future, which cancels the
/// fetch at its jitter delay or before the upstream request is sent.
pub(super) async fn get_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> Result<Json<ProfileRecord>, ApiError> {
    fetch_profile_with_retry(&state.client, &username, state.retry)
        .await
        .map(Json)
        .map_err(|err| {
            tracing::info!(
                request_id = %req_id.0,
                username = %username,
                kind = %err.kind(),
                status = err.suggested_status_code(),
                "profile request failed"
            );
            ApiError::from_classified(&err)
        })
}
