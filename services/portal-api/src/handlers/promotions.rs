//! Promotion handlers. Admins publish; agents see what is live for their
//! country.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{Caller, Promotion, TrackAction, TrackEntry};
use abportal_utils::{validate_model, PortalError, PortalResult};

use super::{clamp_limit, record_track, require_admin, require_catalog_scope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPromotionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromotionRequest {
    pub title: String,
    pub body: String,
    pub banner_url: Option<String>,
    pub country: Option<String>,
    pub institution: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePromotionRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub banner_url: Option<String>,
    pub country: Option<String>,
    pub institution: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

/// List promotions: everything for admins, the live slice for agents
///
/// GET /api/v1/promotions
pub async fn list_promotions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListPromotionsQuery>,
) -> PortalResult<Json<Vec<Promotion>>> {
    let scope = require_catalog_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);

    let promotions = if caller.is_admin() {
        state.repos.promotions.find_all(limit).await?
    } else {
        state
            .repos
            .promotions
            .find_live(&scope, Utc::now(), limit)
            .await?
    };
    Ok(Json(promotions))
}

/// Publish a promotion (admin only)
///
/// POST /api/v1/promotions
pub async fn create_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreatePromotionRequest>,
) -> PortalResult<Json<Promotion>> {
    require_admin(&caller)?;

    let mut promotion = Promotion::new(payload.title, payload.body, caller.email.clone());
    promotion.banner_url = payload.banner_url;
    promotion.country = payload.country;
    promotion.institution = payload.institution;
    if let Some(valid_from) = payload.valid_from {
        promotion.valid_from = valid_from;
    }
    promotion.valid_until = payload.valid_until;
    if let Some(active) = payload.active {
        promotion.active = active;
    }
    validate_model(&promotion)?;

    let created = state.repos.promotions.create(&promotion).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "promotion",
            &created.id,
            None,
            format!("published promotion {}", created.title),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a promotion
///
/// GET /api/v1/promotions/:id
pub async fn get_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Promotion>> {
    let scope = require_catalog_scope(&caller)?;
    let promotion = load_promotion(&state, &id).await?;

    if !caller.is_admin()
        && !(promotion.is_live(Utc::now()) && scope.permits(promotion.country.as_deref()))
    {
        return Err(PortalError::not_found(format!("Promotion {}", id)));
    }
    Ok(Json(promotion))
}

/// Update a promotion (admin only)
///
/// PUT /api/v1/promotions/:id
pub async fn update_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePromotionRequest>,
) -> PortalResult<Json<Promotion>> {
    require_admin(&caller)?;
    let mut promotion = load_promotion(&state, &id).await?;

    if let Some(title) = payload.title {
        promotion.title = title;
    }
    if let Some(body) = payload.body {
        promotion.body = body;
    }
    if let Some(banner_url) = payload.banner_url {
        promotion.banner_url = Some(banner_url);
    }
    if let Some(country) = payload.country {
        promotion.country = Some(country);
    }
    if let Some(institution) = payload.institution {
        promotion.institution = Some(institution);
    }
    if let Some(valid_from) = payload.valid_from {
        promotion.valid_from = valid_from;
    }
    if let Some(valid_until) = payload.valid_until {
        promotion.valid_until = Some(valid_until);
    }
    if let Some(active) = payload.active {
        promotion.active = active;
    }
    promotion.touch();
    validate_model(&promotion)?;

    let updated = state.repos.promotions.update(&promotion).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "promotion",
            &updated.id,
            None,
            format!("updated promotion {}", updated.title),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Delete a promotion (admin only)
///
/// DELETE /api/v1/promotions/:id
pub async fn delete_promotion(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let promotion = load_promotion(&state, &id).await?;

    if !state.repos.promotions.delete(&id).await? {
        return Err(PortalError::not_found(format!("Promotion {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "promotion",
            &id,
            None,
            format!("deleted promotion {}", promotion.title),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

async fn load_promotion(state: &AppState, id: &str) -> PortalResult<Promotion> {
    state
        .repos
        .promotions
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Promotion {}", id)))
}
