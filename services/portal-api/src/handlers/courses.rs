//! Course catalog handlers. Admin-maintained; agents browse the active
//! slice for their country.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{Caller, Course, TrackAction, TrackEntry};
use abportal_utils::{validate_model, PortalError, PortalResult};

use super::{clamp_limit, record_track, require_admin, require_catalog_scope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub level: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub institution: String,
    pub level: String,
    pub tuition_fee: f64,
    pub currency: String,
    pub country: Option<String>,
    pub duration: Option<String>,
    #[serde(default)]
    pub intakes: Vec<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub institution: Option<String>,
    pub level: Option<String>,
    pub tuition_fee: Option<f64>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub duration: Option<String>,
    pub intakes: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// List courses
///
/// GET /api/v1/courses
pub async fn list_courses(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListCoursesQuery>,
) -> PortalResult<Json<Vec<Course>>> {
    let scope = require_catalog_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let courses = state
        .repos
        .courses
        .find_scoped(&scope, !caller.is_admin(), query.level.as_deref(), limit)
        .await?;
    Ok(Json(courses))
}

/// Add a course (admin only)
///
/// POST /api/v1/courses
pub async fn create_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateCourseRequest>,
) -> PortalResult<Json<Course>> {
    require_admin(&caller)?;

    let mut course = Course::new(
        payload.title,
        payload.institution,
        payload.level,
        payload.tuition_fee,
        payload.currency,
    );
    course.country = payload.country;
    course.duration = payload.duration;
    course.intakes = payload.intakes;
    if let Some(active) = payload.active {
        course.active = active;
    }
    validate_model(&course)?;

    let created = state.repos.courses.create(&course).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "course",
            &created.id,
            None,
            format!("added course {} at {}", created.title, created.institution),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a course
///
/// GET /api/v1/courses/:id
pub async fn get_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Course>> {
    let scope = require_catalog_scope(&caller)?;
    let course = load_course(&state, &id).await?;

    if !caller.is_admin() && !(course.active && scope.permits(course.country.as_deref())) {
        return Err(PortalError::not_found(format!("Course {}", id)));
    }
    Ok(Json(course))
}

/// Update a course (admin only)
///
/// PUT /api/v1/courses/:id
pub async fn update_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCourseRequest>,
) -> PortalResult<Json<Course>> {
    require_admin(&caller)?;
    let mut course = load_course(&state, &id).await?;

    if let Some(title) = payload.title {
        course.title = title;
    }
    if let Some(institution) = payload.institution {
        course.institution = institution;
    }
    if let Some(level) = payload.level {
        course.level = level;
    }
    if let Some(tuition_fee) = payload.tuition_fee {
        course.tuition_fee = tuition_fee;
    }
    if let Some(currency) = payload.currency {
        course.currency = currency.to_uppercase();
    }
    if let Some(country) = payload.country {
        course.country = Some(country);
    }
    if let Some(duration) = payload.duration {
        course.duration = Some(duration);
    }
    if let Some(intakes) = payload.intakes {
        course.intakes = intakes;
    }
    if let Some(active) = payload.active {
        course.active = active;
    }
    course.touch();
    validate_model(&course)?;

    let updated = state.repos.courses.update(&course).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "course",
            &updated.id,
            None,
            format!("updated course {}", updated.title),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Remove a course (admin only)
///
/// DELETE /api/v1/courses/:id
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let course = load_course(&state, &id).await?;

    if !state.repos.courses.delete(&id).await? {
        return Err(PortalError::not_found(format!("Course {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "course",
            &id,
            None,
            format!("removed course {}", course.title),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

async fn load_course(state: &AppState, id: &str) -> PortalResult<Course> {
    state
        .repos
        .courses
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Course {}", id)))
}
