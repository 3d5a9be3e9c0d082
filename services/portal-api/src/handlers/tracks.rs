//! Activity log handlers. Read-only: the chain is written as a side effect
//! of the actions it describes.

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use abportal_database::ChainVerification;
use abportal_models::{Caller, TrackEntry};
use abportal_utils::{PortalError, PortalResult};

use super::{clamp_limit, require_admin, require_staff_scope};
use crate::AppState;

// Default verification window when the caller names no range.
const DEFAULT_VERIFY_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct ListTracksQuery {
    pub entity_kind: Option<String>,
    pub entity_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyChainQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// List activity visible to the caller
///
/// GET /api/v1/tracks
pub async fn list_tracks(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListTracksQuery>,
) -> PortalResult<Json<Vec<TrackEntry>>> {
    let scope = require_staff_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let entries = state
        .repos
        .tracks
        .find_scoped(
            &scope,
            query.entity_kind.as_deref(),
            query.entity_id.as_deref(),
            limit,
        )
        .await?;
    Ok(Json(entries))
}

/// Verify the hash chain over a date range (admin only)
///
/// GET /api/v1/tracks/verify
pub async fn verify_track_chain(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<VerifyChainQuery>,
) -> PortalResult<Json<ChainVerification>> {
    require_admin(&caller)?;

    let to = query.to.unwrap_or_else(Utc::now);
    let from = query.from.unwrap_or_else(|| to - Duration::days(DEFAULT_VERIFY_DAYS));
    if from > to {
        return Err(PortalError::validation("from", "Range start is after its end"));
    }

    let verification = state.repos.tracks.verify_chain(from, to).await?;
    Ok(Json(verification))
}
