//! # AB Partner Portal Domain Models
//!
//! Core domain models for the AB Partner Portal CRM. All models are flat
//! MongoDB documents: string UUIDs in `_id`, BSON datetimes for the
//! `created_at`/`updated_at` pair, and denormalized email strings for the
//! ownership references (`agency`, `sub_agent`, `created_by`).
//!
//! ## Key Models
//!
//! - **Profile**: a portal account (admin, agent, sub-agent or student)
//! - **Lead**: a prospective student record owned by an agency
//! - **Quotation**: a priced offer generated from a lead
//! - **Payment**: a receipt recorded against a quotation
//! - **Promotion** / **Course** / **Resource**: admin-published catalog
//! - **CampaignForm** / **CampaignSubmission**: the public form builder
//! - **TrackEntry**: one hash-chained activity log entry
//!
//! ## Access scoping
//!
//! [`Caller`] and [`AccessScope`] carry the portal's one recurring rule:
//! admins see everything (or their country), agents see their agency chain,
//! students are refused. Repositories translate a scope into the matching
//! MongoDB filter; [`AccessScope::permits`] is the pure reference form.

pub mod campaign;
pub mod course;
pub mod datetime;
pub mod lead;
pub mod payment;
pub mod profile;
pub mod promotion;
pub mod quotation;
pub mod resource;
pub mod role;
pub mod scope;
pub mod track;

pub use campaign::{
    CampaignField, CampaignForm, CampaignSubmission, FieldProblem, FieldType, slugify,
};
pub use course::Course;
pub use lead::{Lead, LeadStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use profile::{normalize_email, Profile, ProfileStatus};
pub use promotion::Promotion;
pub use quotation::{FeeLines, Quotation, QuotationStatus};
pub use resource::{Resource, ResourceBody};
pub use role::Role;
pub use scope::{AccessScope, Caller, CatalogScope};
pub use track::{TrackAction, TrackEntry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_creation() {
        let profile = Profile::new(
            "Head Agent".to_string(),
            "head@agency.example".to_string(),
            Role::Agent,
        );
        assert!(!profile.id.is_empty());
        assert_eq!(profile.status, ProfileStatus::Pending);
        assert_eq!(profile.role, Role::Agent);
    }

    #[test]
    fn test_track_entry_creation() {
        let entry = TrackEntry::new(
            "admin@portal.example",
            TrackAction::Created,
            "promotion",
            "promo-1",
            None,
            "published promotion",
        );

        assert!(!entry.hash.is_empty());
        assert!(entry.verify_integrity());
    }

    #[test]
    fn test_lead_to_quotation_carries_ownership() {
        let lead = Lead::new(
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
        );
        let quotation = Quotation::new(
            lead.id.clone(),
            lead.student_name.clone(),
            lead.student_email.clone(),
            lead.agency.clone(),
            "Unseen University".to_string(),
            "BSc Thaumatology".to_string(),
            "AUD".to_string(),
        );

        assert_eq!(quotation.lead_id, lead.id);
        assert_eq!(quotation.agency, lead.agency);
        assert_eq!(quotation.status, QuotationStatus::Draft);
    }

    #[test]
    fn test_document_ids_are_uuid_strings() {
        let lead = Lead::new(
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
        );
        assert!(uuid::Uuid::parse_str(&lead.id).is_ok());
    }

    #[test]
    fn test_model_round_trips_through_bson() {
        let mut payment = Payment::new(
            "quote-1".to_string(),
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
            5_000.0,
            "AUD".to_string(),
            PaymentMethod::Card,
        );
        payment.confirm();

        let doc = mongodb::bson::to_document(&payment).unwrap();
        assert!(doc.contains_key("_id"));
        let back: Payment = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(back.id, payment.id);
        assert_eq!(back.status, PaymentStatus::Confirmed);
        assert!(back.paid_at.is_some());
    }
}
