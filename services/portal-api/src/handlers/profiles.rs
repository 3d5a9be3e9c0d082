//! Profile management.
//!
//! Listing, creation and deletion are admin operations. A profile may read
//! and edit itself, but role, status and the sub-agent list only move under
//! an admin's hand.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{
    normalize_email, Caller, Profile, ProfileStatus, Role, TrackAction, TrackEntry,
};
use abportal_utils::{validate_model, PortalError, PortalResult};

use super::{clamp_limit, record_track, require_admin};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProfilesQuery {
    pub role: Option<Role>,
    pub status: Option<ProfileStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub agency_name: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub sub_agents: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub agency_name: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub role: Option<Role>,
    pub status: Option<ProfileStatus>,
    pub sub_agents: Option<Vec<String>>,
}

/// List profiles
///
/// GET /api/v1/profiles
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListProfilesQuery>,
) -> PortalResult<Json<Vec<Profile>>> {
    require_admin(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let profiles = state
        .repos
        .profiles
        .find_all(query.role, query.status, limit)
        .await?;
    Ok(Json(profiles))
}

/// Create a new profile (starts pending until activated)
///
/// POST /api/v1/profiles
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateProfileRequest>,
) -> PortalResult<Json<Profile>> {
    require_admin(&caller)?;

    let mut profile = Profile::new(payload.name, payload.email, payload.role);
    profile.agency_name = payload.agency_name;
    profile.country = payload.country;
    profile.phone = payload.phone;
    profile.whatsapp = payload.whatsapp;
    for sub_agent in &payload.sub_agents {
        profile.add_sub_agent(sub_agent);
    }
    validate_model(&profile)?;
    if !profile.has_valid_contact_numbers() {
        return Err(PortalError::validation("phone", "Invalid phone number format"));
    }

    if state
        .repos
        .profiles
        .find_by_email(&profile.email)
        .await?
        .is_some()
    {
        return Err(PortalError::conflict(format!(
            "Profile already exists for {}",
            profile.email
        )));
    }

    let created = state.repos.profiles.create(&profile).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "profile",
            &created.id,
            None,
            format!("created {} profile {}", created.role.as_str(), created.email),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a profile (self or admin)
///
/// GET /api/v1/profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Profile>> {
    let profile = load_profile(&state, &id).await?;
    if !caller.is_admin() && profile.email != caller.email {
        return Err(PortalError::authorization("Cannot view another profile"));
    }
    Ok(Json(profile))
}

/// Update a profile (self or admin; role/status/sub-agents admin only)
///
/// PUT /api/v1/profiles/:id
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> PortalResult<Json<Profile>> {
    let mut profile = load_profile(&state, &id).await?;
    if !caller.is_admin() && profile.email != caller.email {
        return Err(PortalError::authorization("Cannot edit another profile"));
    }

    if let Some(name) = payload.name {
        profile.name = name;
    }
    if let Some(agency_name) = payload.agency_name {
        profile.agency_name = Some(agency_name);
    }
    if let Some(country) = payload.country {
        profile.country = Some(country);
    }
    if let Some(phone) = payload.phone {
        profile.phone = Some(phone);
    }
    if let Some(whatsapp) = payload.whatsapp {
        profile.whatsapp = Some(whatsapp);
    }
    if let Some(role) = payload.role {
        require_admin(&caller)?;
        profile.role = role;
    }
    if let Some(status) = payload.status {
        require_admin(&caller)?;
        profile.status = status;
    }
    if let Some(sub_agents) = payload.sub_agents {
        require_admin(&caller)?;
        profile.sub_agents.clear();
        for sub_agent in &sub_agents {
            profile.add_sub_agent(sub_agent);
        }
    }
    profile.touch();
    validate_model(&profile)?;
    if !profile.has_valid_contact_numbers() {
        return Err(PortalError::validation("phone", "Invalid phone number format"));
    }

    let updated = state.repos.profiles.update(&profile).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "profile",
            &updated.id,
            None,
            format!("updated profile {}", updated.email),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Delete a profile
///
/// DELETE /api/v1/profiles/:id
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let profile = load_profile(&state, &id).await?;

    if !state.repos.profiles.delete(&id).await? {
        return Err(PortalError::not_found(format!("Profile {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "profile",
            &id,
            None,
            format!("deleted profile {}", profile.email),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

/// Activate a pending or suspended profile
///
/// POST /api/v1/profiles/:id/activate
pub async fn activate_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Profile>> {
    require_admin(&caller)?;
    let mut profile = load_profile(&state, &id).await?;

    let was_active = profile.is_active();
    profile.status = ProfileStatus::Active;
    profile.touch();
    let updated = state.repos.profiles.update(&profile).await?;

    if !was_active {
        state
            .mailer
            .send(
                &updated.email,
                &updated.name,
                "profile_activated",
                json!({
                    "name": updated.name,
                    "email": updated.email,
                    "role": updated.role.as_str(),
                }),
            )
            .await;
        record_track(
            &state,
            TrackEntry::new(
                &caller.email,
                TrackAction::StatusChanged,
                "profile",
                &updated.id,
                None,
                format!("activated profile {}", updated.email),
            ),
        )
        .await;
    }

    Ok(Json(updated))
}

/// Suspend a profile
///
/// POST /api/v1/profiles/:id/suspend
pub async fn suspend_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Profile>> {
    require_admin(&caller)?;
    let mut profile = load_profile(&state, &id).await?;

    if normalize_email(&profile.email) == caller.email {
        return Err(PortalError::validation(
            "id",
            "Cannot suspend your own profile",
        ));
    }

    profile.status = ProfileStatus::Suspended;
    profile.touch();
    let updated = state.repos.profiles.update(&profile).await?;

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::StatusChanged,
            "profile",
            &updated.id,
            None,
            format!("suspended profile {}", updated.email),
        ),
    )
    .await;

    Ok(Json(updated))
}

async fn load_profile(state: &AppState, id: &str) -> PortalResult<Profile> {
    state
        .repos
        .profiles
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Profile {}", id)))
}
