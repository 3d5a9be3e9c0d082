//! Portal account profiles.
//!
//! A profile is the portal's identity record: admins, agents, sub-agents and
//! students all live in the same collection, keyed by email. Agents carry a
//! list of sub-agent emails; that list is what widens their visibility over
//! agency records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::datetime::bson_datetime;
use crate::Role;

/// Normalizes an email for storage and comparison. Ownership fields are
/// denormalized email strings, so every write path must agree on the form.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A portal account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub role: Role,
    #[validate(length(max = 255))]
    pub agency_name: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[validate(custom = "validate_email_list")]
    pub sub_agents: Vec<String>,
    pub status: ProfileStatus,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Account lifecycle. New registrations start pending until an admin
/// activates them; suspended accounts keep their records but lose access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Pending,
    Active,
    Suspended,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "pending",
            ProfileStatus::Active => "active",
            ProfileStatus::Suspended => "suspended",
        }
    }
}

impl Profile {
    pub fn new(name: String, email: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(&email),
            name,
            role,
            agency_name: None,
            country: None,
            phone: None,
            whatsapp: None,
            sub_agents: Vec::new(),
            status: ProfileStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }

    /// Checks the phone and whatsapp formats if present. None is valid.
    pub fn has_valid_contact_numbers(&self) -> bool {
        let phone_regex = regex::Regex::new(r"^\+?[\d\s\-\(\)]{7,20}$").unwrap();
        [&self.phone, &self.whatsapp]
            .into_iter()
            .flatten()
            .all(|number| phone_regex.is_match(number))
    }

    /// Registers a sub-agent email under this profile. Duplicates and the
    /// profile's own email are ignored.
    pub fn add_sub_agent(&mut self, email: &str) {
        let normalized = normalize_email(email);
        if normalized == self.email || self.sub_agents.contains(&normalized) {
            return;
        }
        self.sub_agents.push(normalized);
        self.touch();
    }

    pub fn remove_sub_agent(&mut self, email: &str) {
        let normalized = normalize_email(email);
        self.sub_agents.retain(|s| s != &normalized);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_email_list(emails: &[String]) -> Result<(), ValidationError> {
    for email in emails {
        if !validator::validate_email(email) {
            return Err(ValidationError::new("invalid_email"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_normalizes_email_and_starts_pending() {
        let profile = Profile::new(
            "Head Agent".to_string(),
            "  Head@Agency.Example ".to_string(),
            Role::Agent,
        );

        assert_eq!(profile.email, "head@agency.example");
        assert_eq!(profile.status, ProfileStatus::Pending);
        assert!(!profile.is_active());
    }

    #[test]
    fn sub_agents_are_normalized_and_deduplicated() {
        let mut profile = Profile::new(
            "Head Agent".to_string(),
            "head@agency.example".to_string(),
            Role::Agent,
        );

        profile.add_sub_agent("Junior@Agency.example");
        profile.add_sub_agent("junior@agency.example");
        // own email never lands on the list
        profile.add_sub_agent("head@agency.example");

        assert_eq!(profile.sub_agents, vec!["junior@agency.example".to_string()]);

        profile.remove_sub_agent("JUNIOR@agency.example");
        assert!(profile.sub_agents.is_empty());
    }

    #[test]
    fn touch_only_moves_updated_at() {
        let mut profile = Profile::new(
            "Head Agent".to_string(),
            "head@agency.example".to_string(),
            Role::Agent,
        );
        let created = profile.created_at;
        let before = profile.updated_at;

        profile.touch();

        assert_eq!(profile.created_at, created);
        assert!(profile.updated_at >= before);
    }

    #[test]
    fn invalid_email_fails_validation() {
        let profile = Profile::new(
            "Head Agent".to_string(),
            "not-an-email".to_string(),
            Role::Agent,
        );
        assert!(profile.validate().is_err());
    }

    #[test]
    fn contact_number_check_accepts_absent_numbers() {
        let mut profile = Profile::new(
            "Head Agent".to_string(),
            "head@agency.example".to_string(),
            Role::Agent,
        );
        assert!(profile.has_valid_contact_numbers());

        profile.phone = Some("+91 98765 43210".to_string());
        profile.whatsapp = Some("(020) 1234-5678".to_string());
        assert!(profile.has_valid_contact_numbers());

        profile.whatsapp = Some("call me maybe".to_string());
        assert!(!profile.has_valid_contact_numbers());
    }
}
