//! Resource library handlers.
//!
//! Documents go through the storage service, playlists pull their metadata
//! from the playlist API on creation and on explicit refresh. A failed
//! metadata fetch never fails the request; the resource just stays bare.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{Caller, Resource, ResourceBody, TrackAction, TrackEntry};
use abportal_utils::{validate_file_type, validate_model, PortalError, PortalResult};

use super::{clamp_limit, record_track, require_admin, require_catalog_scope};
use crate::AppState;

const DOCUMENT_FILE_TYPES: &[&str] = &["pdf", "doc", "docx", "ppt", "pptx", "png", "jpg", "jpeg"];

#[derive(Debug, Deserialize)]
pub struct ListResourcesQuery {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub category: String,
    pub country: Option<String>,
    pub body: ResourceBody,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub body: Option<ResourceBody>,
}

/// List resources
///
/// GET /api/v1/resources
pub async fn list_resources(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListResourcesQuery>,
) -> PortalResult<Json<Vec<Resource>>> {
    let scope = require_catalog_scope(&caller)?;
    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let resources = state
        .repos
        .resources
        .find_scoped(&scope, query.category.as_deref(), query.kind.as_deref(), limit)
        .await?;
    Ok(Json(resources))
}

/// Add a resource (admin only)
///
/// POST /api/v1/resources
pub async fn create_resource(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateResourceRequest>,
) -> PortalResult<Json<Resource>> {
    require_admin(&caller)?;

    let mut resource = Resource::new(
        payload.title,
        payload.category,
        caller.email.clone(),
        payload.body,
    );
    resource.country = payload.country;
    validate_model(&resource)?;

    sync_playlist_metadata(&state, &mut resource).await;

    let created = state.repos.resources.create(&resource).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "resource",
            &created.id,
            None,
            format!("added {} resource {}", created.body.kind(), created.title),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Upload a document resource (admin only)
///
/// POST /api/v1/resources/upload
pub async fn upload_resource_file(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    mut multipart: Multipart,
) -> PortalResult<Json<Resource>> {
    require_admin(&caller)?;

    let mut title: Option<String> = None;
    let mut category: Option<String> = None;
    let mut country: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

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
            Some("title") => {
                title = Some(field.text().await.map_err(|e| {
                    PortalError::validation("title", format!("Failed to read field: {}", e))
                })?);
            }
            Some("category") => {
                category = Some(field.text().await.map_err(|e| {
                    PortalError::validation("category", format!("Failed to read field: {}", e))
                })?);
            }
            Some("country") => {
                country = Some(field.text().await.map_err(|e| {
                    PortalError::validation("country", format!("Failed to read field: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| PortalError::validation("file", "No file provided"))?;
    let file_name = file_name.unwrap_or_else(|| "document.pdf".to_string());
    validate_file_type(&file_name, DOCUMENT_FILE_TYPES)?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| file_name.clone());
    let category = category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "general".to_string());
    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let stored = state.storage.upload(&file_name, &content_type, data).await?;

    let mut resource = Resource::new(
        title,
        category,
        caller.email.clone(),
        ResourceBody::Document {
            file_key: stored.key,
            file_url: stored.url,
        },
    );
    resource.country = country.filter(|c| !c.trim().is_empty());
    validate_model(&resource)?;

    let created = state.repos.resources.create(&resource).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "resource",
            &created.id,
            None,
            format!("uploaded document {}", created.title),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a resource
///
/// GET /api/v1/resources/:id
pub async fn get_resource(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Resource>> {
    let scope = require_catalog_scope(&caller)?;
    let resource = load_resource(&state, &id).await?;

    if !caller.is_admin() && !scope.permits(resource.country.as_deref()) {
        return Err(PortalError::not_found(format!("Resource {}", id)));
    }
    Ok(Json(resource))
}

/// Update a resource (admin only)
///
/// PUT /api/v1/resources/:id
pub async fn update_resource(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateResourceRequest>,
) -> PortalResult<Json<Resource>> {
    require_admin(&caller)?;
    let mut resource = load_resource(&state, &id).await?;

    if let Some(title) = payload.title {
        resource.title = title;
    }
    if let Some(category) = payload.category {
        resource.category = category;
    }
    if let Some(country) = payload.country {
        resource.country = Some(country);
    }
    if let Some(body) = payload.body {
        resource.body = body;
        sync_playlist_metadata(&state, &mut resource).await;
    }
    resource.touch();
    validate_model(&resource)?;

    let updated = state.repos.resources.update(&resource).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "resource",
            &updated.id,
            None,
            format!("updated resource {}", updated.title),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Refresh playlist metadata (admin only)
///
/// POST /api/v1/resources/:id/sync
pub async fn sync_resource_playlist(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let mut resource = load_resource(&state, &id).await?;

    if !matches!(resource.body, ResourceBody::Playlist { .. }) {
        return Err(PortalError::validation(
            "body",
            "Only playlist resources can be synced",
        ));
    }

    let synced = sync_playlist_metadata(&state, &mut resource).await;
    let resource = if synced {
        let updated = state.repos.resources.update(&resource).await?;
        record_track(
            &state,
            TrackEntry::new(
                &caller.email,
                TrackAction::Synced,
                "resource",
                &updated.id,
                None,
                format!("synced playlist metadata for {}", updated.title),
            ),
        )
        .await;
        updated
    } else {
        resource
    };

    Ok(Json(json!({"resource": resource, "synced": synced})))
}

/// Remove a resource (admin only)
///
/// DELETE /api/v1/resources/:id
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let resource = load_resource(&state, &id).await?;

    if !state.repos.resources.delete(&id).await? {
        return Err(PortalError::not_found(format!("Resource {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "resource",
            &id,
            None,
            format!("removed resource {}", resource.title),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

/// Pulls playlist metadata onto a playlist resource. Returns whether fresh
/// metadata was applied.
async fn sync_playlist_metadata(state: &AppState, resource: &mut Resource) -> bool {
    let ResourceBody::Playlist { playlist_id, .. } = &resource.body else {
        return false;
    };
    match state.playlist.fetch_metadata(playlist_id).await {
        Some(meta) => {
            resource.sync_playlist(meta.title, meta.item_count, meta.thumbnail_url);
            true
        }
        None => false,
    }
}

async fn load_resource(state: &AppState, id: &str) -> PortalResult<Resource> {
    state
        .repos
        .resources
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Resource {}", id)))
}
