use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, error, instrument};

use crate::{
    auth::extractors::AuthSession,
    designs::repo_types::DesignRecord,
    error::ApiError,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/api/get-designs", get(get_designs))
}

/// Designs owned by the caller, matched on the session email.
#[instrument(skip(state, session))]
pub async fn get_designs(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<DesignRecord>>, ApiError> {
    let email = session.user.email;
    if email.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let designs = state.designs.list_by_owner(&email).await.map_err(|e| {
        error!(error = %e, "error fetching designs");
        ApiError::Internal
    })?;

    debug!(count = designs.len(), "designs listed");
    Ok(Json(designs))
}
