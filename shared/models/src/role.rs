//! Portal roles.

use serde::{Deserialize, Serialize};

/// Who a profile acts as inside the portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agent,
    SubAgent,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::SubAgent => "sub_agent",
            Role::Student => "student",
        }
    }

    /// Roles that work inside the partner portal. Students have their own
    /// area and are turned away from partner endpoints.
    pub fn is_portal_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Agent | Role::SubAgent)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Agent
    }
}
