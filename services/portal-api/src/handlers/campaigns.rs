//! Campaign form handlers.
//!
//! Forms are built by staff and published under a slug. The public pair of
//! endpoints serves the form definition and takes submissions with only the
//! portal key; everything else runs under the actor scope. A submission can
//! later be converted into a lead by whoever owns the form's records.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use abportal_models::{
    slugify, CampaignField, CampaignForm, CampaignSubmission, Caller, Lead, TrackAction,
    TrackEntry,
};
use abportal_utils::{validate_model, ErrorResponse, PortalError, PortalResult};

use super::leads::{notify_agency_of_lead, resolve_owning_agency};
use super::{clamp_limit, record_track, require_staff_scope};
use crate::AppState;

// Submission keys probed when converting into a lead. First match wins.
const NAME_KEYS: &[&str] = &["name", "student_name", "full_name"];
const EMAIL_KEYS: &[&str] = &["email", "student_email", "email_address"];
const PHONE_KEYS: &[&str] = &["phone", "student_phone", "mobile"];
const COUNTRY_KEYS: &[&str] = &["destination_country", "destination", "country"];
const LEVEL_KEYS: &[&str] = &["study_level", "level"];
const COURSE_KEYS: &[&str] = &["course_interest", "course", "program"];
const INTAKE_KEYS: &[&str] = &["intake", "intake_month"];

#[derive(Debug, Deserialize)]
pub struct ListFormsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub active: Option<bool>,
    #[serde(default)]
    pub fields: Vec<CampaignField>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub active: Option<bool>,
    pub fields: Option<Vec<CampaignField>>,
}

#[derive(Debug, Deserialize)]
pub struct PublicSubmissionRequest {
    #[serde(default)]
    pub values: HashMap<String, String>,
    pub agency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertSubmissionRequest {
    pub agency: Option<String>,
    pub sub_agent: Option<String>,
}

/// The slice of a form a public embed needs.
#[derive(Debug, Serialize)]
pub struct PublicFormResponse {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub fields: Vec<CampaignField>,
}

/// List campaign forms visible to the caller
///
/// GET /api/v1/campaigns
pub async fn list_campaign_forms(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListFormsQuery>,
) -> PortalResult<Json<Vec<CampaignForm>>> {
    let scope = require_staff_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let forms = state.repos.campaigns.find_forms_scoped(&scope, limit).await?;
    Ok(Json(forms))
}

/// Create a campaign form
///
/// POST /api/v1/campaigns
pub async fn create_campaign_form(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateFormRequest>,
) -> PortalResult<Json<CampaignForm>> {
    require_staff_scope(&caller)?;
    check_field_keys(&payload.fields)?;

    let mut form = CampaignForm::new(payload.title, caller.email.clone());
    if let Some(slug) = payload.slug.filter(|s| !s.trim().is_empty()) {
        form.slug = slugify(&slug);
    }
    if form.slug.is_empty() {
        return Err(PortalError::validation(
            "slug",
            "Form title yields an empty slug",
        ));
    }
    form.description = payload.description;
    form.country = payload.country;
    if let Some(active) = payload.active {
        form.active = active;
    }
    form.fields = payload.fields;
    validate_model(&form)?;

    if state
        .repos
        .campaigns
        .find_form_by_slug(&form.slug)
        .await?
        .is_some()
    {
        return Err(PortalError::conflict(format!(
            "A form already uses slug '{}'",
            form.slug
        )));
    }

    let created = state.repos.campaigns.create_form(&form).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "campaign_form",
            &created.id,
            Some(&created.created_by),
            format!("created campaign form {} ({})", created.title, created.slug),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a campaign form
///
/// GET /api/v1/campaigns/:id
pub async fn get_campaign_form(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<CampaignForm>> {
    let form = load_scoped_form(&state, &caller, &id).await?;
    Ok(Json(form))
}

/// Update a campaign form
///
/// PUT /api/v1/campaigns/:id
pub async fn update_campaign_form(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFormRequest>,
) -> PortalResult<Json<CampaignForm>> {
    let mut form = load_scoped_form(&state, &caller, &id).await?;

    // The slug is the published address of the form; it never moves.
    if let Some(title) = payload.title {
        form.title = title;
    }
    if let Some(description) = payload.description {
        form.description = Some(description);
    }
    if let Some(country) = payload.country {
        form.country = Some(country);
    }
    if let Some(active) = payload.active {
        form.active = active;
    }
    if let Some(fields) = payload.fields {
        check_field_keys(&fields)?;
        form.fields = fields;
    }
    form.touch();
    validate_model(&form)?;

    let updated = state.repos.campaigns.update_form(&form).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "campaign_form",
            &updated.id,
            Some(&updated.created_by),
            format!("updated campaign form {}", updated.slug),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Delete a campaign form
///
/// DELETE /api/v1/campaigns/:id
pub async fn delete_campaign_form(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    let form = load_scoped_form(&state, &caller, &id).await?;

    if !state.repos.campaigns.delete_form(&id).await? {
        return Err(PortalError::not_found(format!("Campaign form {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "campaign_form",
            &id,
            Some(&form.created_by),
            format!("deleted campaign form {}", form.slug),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

/// List submissions for a form
///
/// GET /api/v1/campaigns/:id/submissions
pub async fn list_campaign_submissions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Query(query): Query<ListFormsQuery>,
) -> PortalResult<Json<Vec<CampaignSubmission>>> {
    let form = load_scoped_form(&state, &caller, &id).await?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let submissions = state
        .repos
        .campaigns
        .find_submissions_for_form(&form.id, limit)
        .await?;
    Ok(Json(submissions))
}

/// Serve a published form definition (portal key only)
///
/// GET /api/v1/campaigns/public/:slug
pub async fn fetch_public_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> PortalResult<Json<PublicFormResponse>> {
    let form = state
        .repos
        .campaigns
        .find_active_form_by_slug(&slug)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Campaign form {}", slug)))?;

    Ok(Json(PublicFormResponse {
        title: form.title,
        slug: form.slug,
        description: form.description,
        fields: form.fields,
    }))
}

/// Take a public submission (portal key only)
///
/// POST /api/v1/campaigns/public/:slug
pub async fn submit_public_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<PublicSubmissionRequest>,
) -> PortalResult<Response> {
    let form = state
        .repos
        .campaigns
        .find_active_form_by_slug(&slug)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Campaign form {}", slug)))?;

    let problems = form.validate_submission(&payload.values);
    if !problems.is_empty() {
        let body = ErrorResponse {
            error: "VALIDATION_ERROR".to_string(),
            code: "VALIDATION_ERROR".to_string(),
            message: "Submission failed form validation".to_string(),
            details: Some(json!({ "problems": problems })),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let submission = CampaignSubmission::new(&form, payload.values, payload.agency);
    let created = state.repos.campaigns.create_submission(&submission).await?;

    record_track(
        &state,
        TrackEntry::new(
            "public",
            TrackAction::Submitted,
            "campaign_submission",
            &created.id,
            created.agency.as_deref(),
            format!("submission against form {}", form.slug),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Convert a submission into a lead
///
/// POST /api/v1/campaigns/submissions/:id/convert
pub async fn convert_campaign_submission(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<ConvertSubmissionRequest>,
) -> PortalResult<Json<Lead>> {
    require_staff_scope(&caller)?;
    let mut submission = state
        .repos
        .campaigns
        .find_submission_by_id(&id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Submission {}", id)))?;

    if let Some(lead_id) = &submission.converted_lead_id {
        return Err(PortalError::conflict(format!(
            "Submission already converted to lead {}",
            lead_id
        )));
    }

    // The converting caller must be able to own the resulting lead.
    let requested = payload.agency.or_else(|| submission.agency.clone());
    let agency = resolve_owning_agency(&caller, requested.as_deref())?;

    let student_name = first_value(&submission.values, NAME_KEYS)
        .ok_or_else(|| PortalError::validation("values", "Submission has no student name"))?;
    let student_email = first_value(&submission.values, EMAIL_KEYS)
        .ok_or_else(|| PortalError::validation("values", "Submission has no student email"))?;

    let mut lead = Lead::new(student_name, student_email, agency);
    lead.student_phone = first_value(&submission.values, PHONE_KEYS);
    lead.destination_country = first_value(&submission.values, COUNTRY_KEYS);
    lead.study_level = first_value(&submission.values, LEVEL_KEYS);
    lead.course_interest = first_value(&submission.values, COURSE_KEYS);
    lead.intake = first_value(&submission.values, INTAKE_KEYS);
    lead.source = Some(format!("campaign:{}", submission.form_slug));
    if let Some(sub_agent) = payload.sub_agent.as_deref() {
        lead.assign_sub_agent(Some(sub_agent));
    }
    validate_model(&lead)?;

    let created = state.repos.leads.create(&lead).await?;
    submission.mark_converted(created.id.clone());
    state.repos.campaigns.update_submission(&submission).await?;

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Converted,
            "campaign_submission",
            &submission.id,
            Some(&created.agency),
            format!(
                "converted submission on {} into lead for {}",
                submission.form_slug, created.student_email
            ),
        ),
    )
    .await;

    if created.agency != caller.email {
        notify_agency_of_lead(&state, &created).await;
    }

    Ok(Json(created))
}

/// Duplicate field keys would make the values map ambiguous.
fn check_field_keys(fields: &[CampaignField]) -> PortalResult<()> {
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if field.key.trim().is_empty() {
            return Err(PortalError::validation("fields", "Field key cannot be empty"));
        }
        if !seen.insert(field.key.as_str()) {
            return Err(PortalError::validation(
                "fields",
                format!("Duplicate field key '{}'", field.key),
            ));
        }
    }
    Ok(())
}

fn first_value(values: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| values.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

async fn load_scoped_form(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> PortalResult<CampaignForm> {
    let scope = require_staff_scope(caller)?;
    let form = state
        .repos
        .campaigns
        .find_form_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Campaign form {}", id)))?;
    if !scope.permits(&form.created_by, None, form.country.as_deref()) {
        return Err(PortalError::not_found(format!("Campaign form {}", id)));
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_takes_first_nonempty_match() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "  ".to_string());
        values.insert("full_name".to_string(), "Asha Rao".to_string());
        values.insert("email".to_string(), "asha@student.example".to_string());

        assert_eq!(first_value(&values, NAME_KEYS), Some("Asha Rao".to_string()));
        assert_eq!(
            first_value(&values, EMAIL_KEYS),
            Some("asha@student.example".to_string())
        );
        assert_eq!(first_value(&values, INTAKE_KEYS), None);
    }

    #[test]
    fn duplicate_field_keys_are_rejected() {
        let fields = vec![
            CampaignField {
                key: "email".to_string(),
                label: "Email".to_string(),
                field_type: abportal_models::FieldType::Text,
                required: true,
                options: Vec::new(),
            },
            CampaignField {
                key: "email".to_string(),
                label: "Email again".to_string(),
                field_type: abportal_models::FieldType::Text,
                required: false,
                options: Vec::new(),
            },
        ];
        assert!(check_field_keys(&fields).is_err());
        assert!(check_field_keys(&fields[..1]).is_ok());
    }
}
