//! Quotation handlers.
//!
//! A quotation is always raised against a lead the caller can reach; the
//! student identity and ownership fields are copied off the lead, never
//! taken from the request.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{
    Caller, FeeLines, Quotation, QuotationStatus, TrackAction, TrackEntry,
};
use abportal_utils::{validate_model, PortalError, PortalResult};

use super::leads::load_scoped_lead;
use super::{clamp_limit, record_track, require_staff_scope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuotationsQuery {
    pub status: Option<QuotationStatus>,
    pub lead_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuotationRequest {
    pub lead_id: String,
    pub institution: String,
    pub course_name: String,
    pub currency: String,
    #[serde(default)]
    pub fees: Option<FeeLines>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuotationRequest {
    pub institution: Option<String>,
    pub course_name: Option<String>,
    pub currency: Option<String>,
    pub fees: Option<FeeLines>,
    pub discount: Option<f64>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: Option<QuotationStatus>,
}

/// List quotations visible to the caller
///
/// GET /api/v1/quotations
pub async fn list_quotations(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuotationsQuery>,
) -> PortalResult<Json<Vec<Quotation>>> {
    let scope = require_staff_scope(&caller)?;

    // Per-lead listing loads the lead's quotations and re-applies the scope.
    if let Some(lead_id) = query.lead_id {
        let quotations = state
            .repos
            .quotations
            .find_by_lead(&lead_id)
            .await?
            .into_iter()
            .filter(|q| scope.permits(&q.agency, q.sub_agent.as_deref(), None))
            .filter(|q| query.status.map_or(true, |s| q.status == s))
            .collect();
        return Ok(Json(quotations));
    }

    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let quotations = state
        .repos
        .quotations
        .find_scoped(&scope, query.status, limit)
        .await?;
    Ok(Json(quotations))
}

/// Create a quotation from a lead
///
/// POST /api/v1/quotations
pub async fn create_quotation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateQuotationRequest>,
) -> PortalResult<Json<Quotation>> {
    let lead = load_scoped_lead(&state, &caller, &payload.lead_id).await?;

    let mut quotation = Quotation::new(
        lead.id.clone(),
        lead.student_name.clone(),
        lead.student_email.clone(),
        lead.agency.clone(),
        payload.institution,
        payload.course_name,
        payload.currency,
    );
    quotation.sub_agent = lead.sub_agent.clone();
    if let Some(fees) = payload.fees {
        quotation.fees = fees;
    }
    if let Some(discount) = payload.discount {
        quotation.discount = discount;
    }
    quotation.valid_until = payload.valid_until;
    quotation.recompute_total();
    validate_model(&quotation)?;

    let created = state.repos.quotations.create(&quotation).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "quotation",
            &created.id,
            Some(&created.agency),
            format!(
                "created quotation {} for {}",
                created.quote_number, created.student_email
            ),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a quotation
///
/// GET /api/v1/quotations/:id
pub async fn get_quotation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Quotation>> {
    let quotation = load_scoped_quotation(&state, &caller, &id).await?;
    Ok(Json(quotation))
}

/// Update a quotation
///
/// PUT /api/v1/quotations/:id
pub async fn update_quotation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> PortalResult<Json<Quotation>> {
    let mut quotation = load_scoped_quotation(&state, &caller, &id).await?;

    if let Some(institution) = payload.institution {
        quotation.institution = institution;
    }
    if let Some(course_name) = payload.course_name {
        quotation.course_name = course_name;
    }
    if let Some(currency) = payload.currency {
        quotation.currency = currency.to_uppercase();
    }
    if let Some(fees) = payload.fees {
        quotation.fees = fees;
    }
    if let Some(discount) = payload.discount {
        quotation.discount = discount;
    }
    if let Some(valid_until) = payload.valid_until {
        quotation.valid_until = Some(valid_until);
    }
    let status_change = payload.status.filter(|s| *s != quotation.status);
    if let Some(status) = status_change {
        quotation.set_status(status);
    }
    quotation.recompute_total();
    validate_model(&quotation)?;

    let updated = state.repos.quotations.update(&quotation).await?;
    let action = if status_change.is_some() {
        TrackAction::StatusChanged
    } else {
        TrackAction::Updated
    };
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            action,
            "quotation",
            &updated.id,
            Some(&updated.agency),
            format!(
                "quotation {} now {}",
                updated.quote_number,
                updated.status.as_str()
            ),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Mark a quotation sent and email it to the student
///
/// POST /api/v1/quotations/:id/send
pub async fn send_quotation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Quotation>> {
    let mut quotation = load_scoped_quotation(&state, &caller, &id).await?;

    if quotation.is_expired(Utc::now()) {
        return Err(PortalError::validation(
            "valid_until",
            "Cannot send an expired quotation",
        ));
    }

    quotation.set_status(QuotationStatus::Sent);
    let updated = state.repos.quotations.update(&quotation).await?;

    state
        .mailer
        .send(
            &updated.student_email,
            &updated.student_name,
            "quotation_sent",
            json!({
                "student_name": updated.student_name,
                "quote_number": updated.quote_number,
                "institution": updated.institution,
                "course_name": updated.course_name,
                "total": format!("{:.2}", updated.total),
                "currency": updated.currency,
                "valid_until": updated.valid_until.map(|d| d.format("%Y-%m-%d").to_string()),
            }),
        )
        .await;

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::EmailSent,
            "quotation",
            &updated.id,
            Some(&updated.agency),
            format!(
                "sent quotation {} to {}",
                updated.quote_number, updated.student_email
            ),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Delete a quotation
///
/// DELETE /api/v1/quotations/:id
pub async fn delete_quotation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    let quotation = load_scoped_quotation(&state, &caller, &id).await?;

    if !state.repos.quotations.delete(&id).await? {
        return Err(PortalError::not_found(format!("Quotation {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "quotation",
            &id,
            Some(&quotation.agency),
            format!("deleted quotation {}", quotation.quote_number),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

pub(crate) async fn load_scoped_quotation(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> PortalResult<Quotation> {
    let scope = require_staff_scope(caller)?;
    let quotation = state
        .repos
        .quotations
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Quotation {}", id)))?;
    if !scope.permits(&quotation.agency, quotation.sub_agent.as_deref(), None) {
        return Err(PortalError::not_found(format!("Quotation {}", id)));
    }
    Ok(quotation)
}
