use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use abportal_models::Caller;
use abportal_utils::PortalError;

use crate::AppState;

pub const PORTAL_KEY_HEADER: &str = "x-portal-key";
pub const ACTOR_HEADER: &str = "x-actor-email";

/// Shared-key check applied to every /api/v1 route.
pub async fn portal_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let presented = headers
        .get(PORTAL_KEY_HEADER)
        .and_then(|header| header.to_str().ok());

    match presented {
        Some(key) if !state.config.portal.api_key.is_empty() && key == state.config.portal.api_key => {
            Ok(next.run(request).await)
        }
        Some(_) => Err(PortalError::authentication("Invalid portal key")),
        None => Err(PortalError::authentication(format!(
            "Missing {} header",
            PORTAL_KEY_HEADER
        ))),
    }
}

/// Resolves the acting profile from the actor header and attaches a
/// [`Caller`] to the request extensions. Suspended and pending profiles
/// are rejected before any handler runs.
pub async fn actor_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let actor_email = headers
        .get(ACTOR_HEADER)
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            PortalError::authentication(format!("Missing {} header", ACTOR_HEADER))
        })?;

    let profile = state
        .repos
        .profiles
        .find_by_email(actor_email)
        .await
        .map_err(|e| PortalError::database(e.to_string()))?
        .ok_or_else(|| PortalError::authentication("Unknown actor"))?;

    if !profile.is_active() {
        return Err(PortalError::authorization("Profile is not active"));
    }

    request.extensions_mut().insert(Caller::from_profile(&profile));
    Ok(next.run(request).await)
}
