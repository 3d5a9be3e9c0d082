pub mod campaigns;
pub mod courses;
pub mod dashboard;
pub mod health;
pub mod leads;
pub mod payments;
pub mod profiles;
pub mod promotions;
pub mod quotations;
pub mod resources;
pub mod tracks;

pub use campaigns::*;
pub use courses::*;
pub use dashboard::*;
pub use health::*;
pub use leads::*;
pub use payments::*;
pub use profiles::*;
pub use promotions::*;
pub use quotations::*;
pub use resources::*;
pub use tracks::*;

use abportal_models::{AccessScope, Caller, CatalogScope, TrackEntry};
use abportal_utils::{PortalError, PortalResult};

use crate::AppState;

/// Caps a requested page size to the configured ceiling.
pub(crate) fn clamp_limit(requested: Option<i64>, max: i64) -> i64 {
    requested.filter(|n| *n > 0).map_or(max, |n| n.min(max))
}

pub(crate) fn require_admin(caller: &Caller) -> PortalResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(PortalError::authorization("Admin role required"))
    }
}

/// Scope for owned records; students are refused outright.
pub(crate) fn require_staff_scope(caller: &Caller) -> PortalResult<AccessScope> {
    let scope = caller.scope();
    if scope.is_denied() {
        return Err(PortalError::authorization(
            "Student profiles cannot access this resource",
        ));
    }
    Ok(scope)
}

/// Scope for catalog records; students are refused outright.
pub(crate) fn require_catalog_scope(caller: &Caller) -> PortalResult<CatalogScope> {
    caller.catalog_scope().ok_or_else(|| {
        PortalError::authorization("Student profiles cannot access this resource")
    })
}

/// Activity logging never blocks the action it describes.
pub(crate) async fn record_track(state: &AppState, entry: TrackEntry) {
    if let Err(e) = state.repos.tracks.record(entry).await {
        tracing::error!("Failed to record track entry: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abportal_models::{Profile, Role};

    fn caller_with_role(role: Role) -> Caller {
        Caller::from_profile(&Profile::new(
            "Test User".to_string(),
            "test@example.com".to_string(),
            role,
        ))
    }

    #[test]
    fn clamp_limit_respects_ceiling() {
        assert_eq!(clamp_limit(None, 100), 100);
        assert_eq!(clamp_limit(Some(0), 100), 100);
        assert_eq!(clamp_limit(Some(-5), 100), 100);
        assert_eq!(clamp_limit(Some(20), 100), 20);
        assert_eq!(clamp_limit(Some(500), 100), 100);
    }

    #[test]
    fn students_are_refused_scoped_access() {
        let student = caller_with_role(Role::Student);
        assert!(require_staff_scope(&student).is_err());
        assert!(require_catalog_scope(&student).is_err());

        let agent = caller_with_role(Role::Agent);
        assert!(require_staff_scope(&agent).is_ok());
        assert!(require_catalog_scope(&agent).is_ok());
    }

    #[test]
    fn admin_check_rejects_agents() {
        let agent = caller_with_role(Role::Agent);
        assert!(require_admin(&agent).is_err());
        let admin = caller_with_role(Role::Admin);
        assert!(require_admin(&admin).is_ok());
    }
}
