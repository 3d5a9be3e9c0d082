//! Lead pipeline handlers.
//!
//! Lists are scope-filtered per caller, creation resolves the owning agency
//! from the caller (admins must name one), and the import endpoint accepts
//! the same agency sheets the legacy portal did: xlsx or csv, with aliased
//! headers and per-row skip reasons.

use std::collections::HashSet;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use abportal_models::{normalize_email, Caller, Lead, LeadStatus, TrackAction, TrackEntry};
use abportal_utils::{
    leads_to_csv, validate_model, LeadSheetParser, PortalError, PortalResult, SheetFormat,
    SkippedRow,
};

use super::{clamp_limit, record_track, require_staff_scope};
use crate::AppState;

// Exports walk the whole visible slice rather than a page.
const EXPORT_LIMIT: i64 = 50_000;

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub status: Option<LeadStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub destination_country: Option<String>,
    pub study_level: Option<String>,
    pub course_interest: Option<String>,
    pub intake: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    /// Owning agency email. Required for admins, ignored defaulting for
    /// agents, who always own what they create.
    pub agency: Option<String>,
    pub sub_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub student_phone: Option<String>,
    pub destination_country: Option<String>,
    pub study_level: Option<String>,
    pub course_interest: Option<String>,
    pub intake: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    /// Empty string clears the assignment.
    pub sub_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeLeadStatusRequest {
    pub status: LeadStatus,
    pub note: Option<String>,
}

/// What an import run did with each row of the sheet.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

/// List leads visible to the caller
///
/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListLeadsQuery>,
) -> PortalResult<Json<Vec<Lead>>> {
    let scope = require_staff_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let leads = state
        .repos
        .leads
        .find_scoped(&scope, query.status, limit)
        .await?;
    Ok(Json(leads))
}

/// Create a new lead
///
/// POST /api/v1/leads
pub async fn create_lead(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateLeadRequest>,
) -> PortalResult<Json<Lead>> {
    require_staff_scope(&caller)?;
    let agency = resolve_owning_agency(&caller, payload.agency.as_deref())?;

    let mut lead = Lead::new(payload.student_name, payload.student_email, agency);
    lead.student_phone = payload.student_phone;
    lead.destination_country = payload.destination_country;
    lead.study_level = payload.study_level;
    lead.course_interest = payload.course_interest;
    lead.intake = payload.intake;
    lead.source = payload.source;
    lead.notes = payload.notes;
    if let Some(sub_agent) = payload.sub_agent.as_deref() {
        lead.assign_sub_agent(Some(sub_agent));
    }
    validate_model(&lead)?;

    let created = state.repos.leads.create(&lead).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "lead",
            &created.id,
            Some(&created.agency),
            format!("created lead for {}", created.student_email),
        ),
    )
    .await;

    // Agencies hear about leads entered on their behalf.
    if caller.is_admin() && created.agency != caller.email {
        notify_agency_of_lead(&state, &created).await;
    }

    Ok(Json(created))
}

/// Get a lead
///
/// GET /api/v1/leads/:id
pub async fn get_lead(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Lead>> {
    let lead = load_scoped_lead(&state, &caller, &id).await?;
    Ok(Json(lead))
}

/// Update a lead
///
/// PUT /api/v1/leads/:id
pub async fn update_lead(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLeadRequest>,
) -> PortalResult<Json<Lead>> {
    let mut lead = load_scoped_lead(&state, &caller, &id).await?;

    if let Some(student_name) = payload.student_name {
        lead.student_name = student_name;
    }
    if let Some(student_email) = payload.student_email {
        lead.student_email = normalize_email(&student_email);
    }
    if let Some(student_phone) = payload.student_phone {
        lead.student_phone = Some(student_phone);
    }
    if let Some(destination_country) = payload.destination_country {
        lead.destination_country = Some(destination_country);
    }
    if let Some(study_level) = payload.study_level {
        lead.study_level = Some(study_level);
    }
    if let Some(course_interest) = payload.course_interest {
        lead.course_interest = Some(course_interest);
    }
    if let Some(intake) = payload.intake {
        lead.intake = Some(intake);
    }
    if let Some(source) = payload.source {
        lead.source = Some(source);
    }
    if let Some(notes) = payload.notes {
        lead.notes = Some(notes);
    }
    if let Some(sub_agent) = payload.sub_agent {
        if sub_agent.trim().is_empty() {
            lead.assign_sub_agent(None);
        } else {
            lead.assign_sub_agent(Some(&sub_agent));
        }
    }
    lead.touch();
    validate_model(&lead)?;

    let updated = state.repos.leads.update(&lead).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "lead",
            &updated.id,
            Some(&updated.agency),
            format!("updated lead for {}", updated.student_email),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Move a lead along the pipeline
///
/// POST /api/v1/leads/:id/status
pub async fn change_lead_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<ChangeLeadStatusRequest>,
) -> PortalResult<Json<Lead>> {
    let mut lead = load_scoped_lead(&state, &caller, &id).await?;

    let previous = lead.status;
    lead.set_status(payload.status);
    if let Some(note) = payload.note {
        lead.notes = Some(match lead.notes.take() {
            Some(existing) => format!("{}\n{}", existing, note),
            None => note,
        });
    }

    let updated = state.repos.leads.update(&lead).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::StatusChanged,
            "lead",
            &updated.id,
            Some(&updated.agency),
            format!(
                "lead status {} -> {}",
                previous.as_str(),
                updated.status.as_str()
            ),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Delete a lead
///
/// DELETE /api/v1/leads/:id
pub async fn delete_lead(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    let lead = load_scoped_lead(&state, &caller, &id).await?;

    if !state.repos.leads.delete(&id).await? {
        return Err(PortalError::not_found(format!("Lead {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "lead",
            &id,
            Some(&lead.agency),
            format!("deleted lead for {}", lead.student_email),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

/// Import a lead sheet (xlsx or csv)
///
/// POST /api/v1/leads/import
pub async fn import_leads(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    mut multipart: Multipart,
) -> PortalResult<Json<ImportSummary>> {
    require_staff_scope(&caller)?;

    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut agency_field: Option<String> = None;
    let mut sub_agent_field: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::validation("file", format!("Failed to read upload: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    PortalError::validation("file", format!("Failed to read file data: {}", e))
                })?;
                data = Some(bytes.to_vec());
            }
            Some("agency") => {
                agency_field = Some(field.text().await.map_err(|e| {
                    PortalError::validation("agency", format!("Failed to read field: {}", e))
                })?);
            }
            Some("sub_agent") => {
                sub_agent_field = Some(field.text().await.map_err(|e| {
                    PortalError::validation("sub_agent", format!("Failed to read field: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| PortalError::validation("file", "No file provided"))?;
    let file_name = file_name.unwrap_or_else(|| "upload.csv".to_string());
    let format = SheetFormat::detect(&file_name, content_type.as_deref()).ok_or_else(|| {
        PortalError::validation("file", "Unsupported sheet format, expected .xlsx or .csv")
    })?;

    let agency = resolve_owning_agency(&caller, agency_field.as_deref())?;
    let sub_agent = sub_agent_field.filter(|s| !s.trim().is_empty());

    let mut parsed =
        LeadSheetParser::parse_bytes(&data, format).map_err(|e| PortalError::import(e.to_string()))?;

    // Rows that duplicate an existing lead of the same agency are skipped,
    // not overwritten.
    let existing: HashSet<String> = state
        .repos
        .leads
        .emails_for_agency(&agency)
        .await?
        .into_iter()
        .collect();
    let mut fresh = Vec::with_capacity(parsed.rows.len());
    for row in std::mem::take(&mut parsed.rows) {
        if existing.contains(&row.student_email) {
            parsed.skipped.push(SkippedRow {
                row_number: row.row_number,
                reason: format!("lead already exists for {}", row.student_email),
            });
        } else {
            fresh.push(row);
        }
    }
    parsed.rows = fresh;
    parsed.skipped.sort_by_key(|s| s.row_number);

    let total_rows = parsed.total_rows;
    let skipped = parsed.skipped.clone();
    let leads = parsed.into_leads(&agency, sub_agent.as_deref());
    let imported = if leads.is_empty() {
        0
    } else {
        state.repos.leads.create_many(&leads).await?
    };

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Imported,
            "lead",
            &agency,
            Some(&agency),
            format!("imported {} leads from {}", imported, file_name),
        ),
    )
    .await;

    Ok(Json(ImportSummary {
        total_rows,
        imported,
        skipped,
    }))
}

/// Export visible leads as CSV
///
/// GET /api/v1/leads/export
pub async fn export_leads(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListLeadsQuery>,
) -> PortalResult<impl IntoResponse> {
    let scope = require_staff_scope(&caller)?;
    let leads = state
        .repos
        .leads
        .find_scoped(&scope, query.status, EXPORT_LIMIT)
        .await?;
    let csv = leads_to_csv(&leads)?;

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Exported,
            "lead",
            &caller.email,
            None,
            format!("exported {} leads", leads.len()),
        ),
    )
    .await;

    let filename = format!(
        "attachment; filename=\"leads-{}.csv\"",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}

/// Resolves which agency owns a record being created. Admins must name the
/// agency; agents and sub-agents own what they enter.
pub(crate) fn resolve_owning_agency(
    caller: &Caller,
    requested: Option<&str>,
) -> PortalResult<String> {
    match requested {
        Some(agency) if !agency.trim().is_empty() => {
            let agency = normalize_email(agency);
            if !caller.is_admin() && !caller.can_modify(&agency, None) {
                return Err(PortalError::authorization(
                    "Cannot create records for another agency",
                ));
            }
            Ok(agency)
        }
        _ if caller.is_admin() => Err(PortalError::validation(
            "agency",
            "Admins must name the owning agency",
        )),
        _ => Ok(caller.email.clone()),
    }
}

pub(crate) async fn load_scoped_lead(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> PortalResult<Lead> {
    let scope = require_staff_scope(caller)?;
    let lead = state
        .repos
        .leads
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Lead {}", id)))?;
    // Out-of-scope records read as absent.
    if !scope.permits(
        &lead.agency,
        lead.sub_agent.as_deref(),
        lead.destination_country.as_deref(),
    ) {
        return Err(PortalError::not_found(format!("Lead {}", id)));
    }
    Ok(lead)
}

pub(crate) async fn notify_agency_of_lead(state: &AppState, lead: &Lead) {
    let profile = match state.repos.profiles.find_by_email(&lead.agency).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return,
        Err(e) => {
            tracing::error!("Failed to look up agency {}: {}", lead.agency, e);
            return;
        }
    };
    state
        .mailer
        .send(
            &profile.email,
            &profile.name,
            "new_lead",
            json!({
                "agency_name": profile.name,
                "student_name": lead.student_name,
                "student_email": lead.student_email,
                "destination_country": lead.destination_country,
                "course_interest": lead.course_interest,
            }),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use abportal_models::{Profile, Role};

    fn agent_caller() -> Caller {
        Caller::from_profile(&Profile::new(
            "Head Agent".to_string(),
            "head@agency.example".to_string(),
            Role::Agent,
        ))
    }

    fn admin_caller() -> Caller {
        Caller::from_profile(&Profile::new(
            "Portal Admin".to_string(),
            "admin@portal.example".to_string(),
            Role::Admin,
        ))
    }

    #[test]
    fn agents_own_what_they_create() {
        let agency = resolve_owning_agency(&agent_caller(), None).unwrap();
        assert_eq!(agency, "head@agency.example");
    }

    #[test]
    fn agents_cannot_create_for_other_agencies() {
        let err = resolve_owning_agency(&agent_caller(), Some("other@agency.example"));
        assert!(err.is_err());
    }

    #[test]
    fn admins_must_name_the_agency() {
        assert!(resolve_owning_agency(&admin_caller(), None).is_err());
        let agency =
            resolve_owning_agency(&admin_caller(), Some(" Head@Agency.example ")).unwrap();
        assert_eq!(agency, "head@agency.example");
    }
}
