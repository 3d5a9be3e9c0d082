//! Lead records: prospective students recruited by an agency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::bson_datetime;
use crate::normalize_email;

/// A prospective student record, owned by the agency that entered it.
/// `agency` and `sub_agent` are denormalized profile emails; scope filters
/// match on them directly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 255, message = "Student name must be between 1 and 255 characters"))]
    pub student_name: String,
    #[validate(email(message = "Student email must be a valid email address"))]
    pub student_email: String,
    pub student_phone: Option<String>,
    pub destination_country: Option<String>,
    pub study_level: Option<String>,
    pub course_interest: Option<String>,
    pub intake: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub agency: String,
    pub sub_agent: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Pipeline position of a lead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Closed,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Closed => "closed",
        }
    }

    /// Converted and closed leads leave the working pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Closed)
    }
}

impl Lead {
    pub fn new(student_name: String, student_email: String, agency: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_name,
            student_email: normalize_email(&student_email),
            student_phone: None,
            destination_country: None,
            study_level: None,
            course_interest: None,
            intake: None,
            source: None,
            status: LeadStatus::New,
            agency: normalize_email(&agency),
            sub_agent: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: LeadStatus) {
        self.status = status;
        self.touch();
    }

    pub fn assign_sub_agent(&mut self, email: Option<&str>) {
        self.sub_agent = email.map(normalize_email);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lead_starts_at_pipeline_head() {
        let lead = Lead::new(
            "Asha Rao".to_string(),
            "Asha@Student.Example".to_string(),
            "Head@Agency.example".to_string(),
        );

        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.student_email, "asha@student.example");
        assert_eq!(lead.agency, "head@agency.example");
        assert!(!lead.status.is_terminal());
    }

    #[test]
    fn converted_and_closed_are_terminal() {
        assert!(LeadStatus::Converted.is_terminal());
        assert!(LeadStatus::Closed.is_terminal());
        assert!(!LeadStatus::Qualified.is_terminal());
    }

    #[test]
    fn status_change_touches_updated_at() {
        let mut lead = Lead::new(
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
        );
        let created = lead.created_at;

        lead.set_status(LeadStatus::Contacted);

        assert_eq!(lead.status, LeadStatus::Contacted);
        assert_eq!(lead.created_at, created);
        assert!(lead.updated_at >= created);
    }

    #[test]
    fn sub_agent_assignment_normalizes() {
        let mut lead = Lead::new(
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
        );

        lead.assign_sub_agent(Some(" Junior@Agency.Example "));
        assert_eq!(lead.sub_agent.as_deref(), Some("junior@agency.example"));

        lead.assign_sub_agent(None);
        assert!(lead.sub_agent.is_none());
    }
}
