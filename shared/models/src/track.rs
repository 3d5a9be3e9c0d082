//! Track: the portal's append-only activity log.
//!
//! Every mutating action drops one entry. Entries are hash-chained: each
//! entry's hash covers its own content plus the previous entry's hash, so
//! rewriting history breaks the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::datetime::bson_datetime;
use crate::normalize_email;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackEntry {
    #[serde(rename = "_id")]
    pub id: String,
    /// Email of the profile that performed the action.
    pub actor: String,
    pub action: TrackAction,
    pub entity_kind: String,
    pub entity_id: String,
    /// Agency the touched record belongs to, when it has one.
    pub agency: Option<String>,
    pub description: String,
    pub hash: String,
    pub previous_hash: Option<String>,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Converted,
    Imported,
    Exported,
    EmailSent,
    Synced,
    Submitted,
}

impl TrackEntry {
    pub fn new(
        actor: &str,
        action: TrackAction,
        entity_kind: &str,
        entity_id: &str,
        agency: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        let created_at = Utc::now();
        let mut entry = Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor: normalize_email(actor),
            action,
            entity_kind: entity_kind.to_string(),
            entity_id: entity_id.to_string(),
            agency: agency.map(normalize_email),
            description: description.into(),
            hash: String::new(),
            previous_hash: None,
            created_at,
        };
        entry.hash = entry.calculate_hash();
        entry
    }

    /// Links this entry onto the chain tail and recomputes its hash. The
    /// repository calls this right before insert, under the latest entry.
    pub fn link(&mut self, previous_hash: Option<String>) {
        self.previous_hash = previous_hash;
        self.hash = self.calculate_hash();
    }

    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.created_at.to_rfc3339().as_bytes());
        hasher.update(self.actor.as_bytes());
        hasher.update(serde_json::to_string(&self.action).unwrap_or_default().as_bytes());
        hasher.update(self.entity_kind.as_bytes());
        hasher.update(self.entity_id.as_bytes());
        hasher.update(self.description.as_bytes());
        if let Some(prev) = &self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn verify_integrity(&self) -> bool {
        self.calculate_hash() == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> TrackEntry {
        TrackEntry::new(
            "Head@Agency.example",
            TrackAction::Created,
            "lead",
            "lead-1",
            Some("head@agency.example"),
            "created lead for Asha Rao",
        )
    }

    #[test]
    fn fresh_entry_verifies() {
        let e = entry();
        assert!(!e.hash.is_empty());
        assert!(e.verify_integrity());
        assert_eq!(e.actor, "head@agency.example");
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut e = entry();
        e.description = "created lead for someone else".to_string();
        assert!(!e.verify_integrity());
    }

    #[test]
    fn linking_changes_hash_and_still_verifies() {
        let first = entry();
        let mut second = entry();
        let unlinked_hash = second.hash.clone();

        second.link(Some(first.hash.clone()));

        assert_ne!(second.hash, unlinked_hash);
        assert_eq!(second.previous_hash.as_deref(), Some(first.hash.as_str()));
        assert!(second.verify_integrity());
    }
}
