//! Track Repository
//!
//! Append-only activity log with hash chain verification. Entries are linked
//! at insert time and never updated or deleted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{AccessScope, TrackEntry};

use crate::scope::{and_all, owned_filter, OwnedFields};
use crate::MongoDatabase;

// Agency scopes reach entries on their agency's records, or entries the
// caller performed personally.
const FIELDS: OwnedFields = OwnedFields {
    agency: "agency",
    sub_agent: Some("actor"),
    country: None,
};

pub struct TrackRepository {
    collection: Collection<TrackEntry>,
}

impl TrackRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("tracks"),
        }
    }

    /// Append an entry to the chain: link it under the current tail, then
    /// insert. Concurrent appends can race the tail read; verification
    /// reports any fork rather than this method preventing one.
    pub async fn record(&self, mut entry: TrackEntry) -> Result<TrackEntry> {
        let tail = self.latest().await?;
        entry.link(tail.map(|t| t.hash));

        self.collection
            .insert_one(&entry, None)
            .await
            .context("Failed to append track entry")?;
        Ok(entry)
    }

    /// The newest entry, if the chain has any.
    pub async fn latest(&self) -> Result<Option<TrackEntry>> {
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1, "_id": -1})
            .limit(1)
            .build();
        let mut cursor = self
            .collection
            .find(None, options)
            .await
            .context("Failed to fetch chain tail")?;
        cursor
            .try_next()
            .await
            .context("Failed to read chain tail")
    }

    /// Entries visible to the given scope, newest first, optionally narrowed
    /// to one entity.
    pub async fn find_scoped(
        &self,
        scope: &AccessScope,
        entity_kind: Option<&str>,
        entity_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TrackEntry>> {
        let Some(scope_filter) = owned_filter(scope, FIELDS) else {
            return Ok(Vec::new());
        };
        let mut filters = vec![scope_filter];
        if let Some(kind) = entity_kind {
            filters.push(doc! {"entity_kind": kind});
        }
        if let Some(id) = entity_id {
            filters.push(doc! {"entity_id": id});
        }

        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(and_all(filters), options)
            .await
            .context("Failed to query track entries")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read track entries")
    }

    /// Verify hash chain integrity for a date range. Checks each entry's own
    /// hash and its link to the preceding entry.
    pub async fn verify_chain(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ChainVerification> {
        let filter = doc! {
            "created_at": {
                "$gte": mongodb::bson::DateTime::from_chrono(from),
                "$lte": mongodb::bson::DateTime::from_chrono(to),
            }
        };
        let options = FindOptions::builder()
            .sort(doc! {"created_at": 1, "_id": 1})
            .build();
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .context("Failed to fetch track entries for verification")?;
        let entries: Vec<TrackEntry> = cursor
            .try_collect()
            .await
            .context("Failed to read track entries for verification")?;

        let mut broken_links = Vec::new();
        let mut previous_hash: Option<String> = None;

        for entry in &entries {
            let linked = match (&previous_hash, &entry.previous_hash) {
                // The first entry in the range links to whatever came before
                // it; only its own hash is checked.
                (None, _) => true,
                (Some(prev), Some(stored)) => prev == stored,
                (Some(_), None) => false,
            };
            if !linked || !entry.verify_integrity() {
                broken_links.push(entry.id.clone());
            }
            previous_hash = Some(entry.hash.clone());
        }

        Ok(ChainVerification {
            is_valid: broken_links.is_empty(),
            entries_verified: entries.len(),
            broken_links,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub entries_verified: usize,
    pub broken_links: Vec<String>,
}
