//! Lead Repository
//!
//! CRUD operations for lead records, filtered through the caller's scope.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{AccessScope, Lead, LeadStatus};

use crate::scope::{and_all, owned_filter, OwnedFields};
use crate::MongoDatabase;

const FIELDS: OwnedFields = OwnedFields {
    agency: "agency",
    sub_agent: Some("sub_agent"),
    country: Some("destination_country"),
};

pub struct LeadRepository {
    collection: Collection<Lead>,
}

impl LeadRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("leads"),
        }
    }

    /// Find lead by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Lead>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch lead by ID")
    }

    /// Find leads visible to the given scope, newest first.
    pub async fn find_scoped(
        &self,
        scope: &AccessScope,
        status: Option<LeadStatus>,
        limit: i64,
    ) -> Result<Vec<Lead>> {
        let Some(scope_filter) = owned_filter(scope, FIELDS) else {
            return Ok(Vec::new());
        };
        let mut filters = vec![scope_filter];
        if let Some(status) = status {
            filters.push(doc! {"status": status.as_str()});
        }

        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(and_all(filters), options)
            .await
            .context("Failed to query leads")?;
        cursor.try_collect().await.context("Failed to read leads")
    }

    /// Create new lead
    pub async fn create(&self, lead: &Lead) -> Result<Lead> {
        self.collection
            .insert_one(lead, None)
            .await
            .context("Failed to create lead")?;
        Ok(lead.clone())
    }

    /// Insert a batch of imported leads, returning how many landed.
    pub async fn create_many(&self, leads: &[Lead]) -> Result<usize> {
        if leads.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .insert_many(leads, None)
            .await
            .context("Failed to insert imported leads")?;
        Ok(result.inserted_ids.len())
    }

    /// Update existing lead
    pub async fn update(&self, lead: &Lead) -> Result<Lead> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &lead.id}, lead, None)
            .await
            .context("Failed to update lead")?;
        if result.matched_count == 0 {
            anyhow::bail!("lead {} not found", lead.id);
        }
        Ok(lead.clone())
    }

    /// Delete lead by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete lead")?;
        Ok(result.deleted_count > 0)
    }

    /// Count leads in scope, optionally pinned to one status.
    pub async fn count_scoped(
        &self,
        scope: &AccessScope,
        status: Option<LeadStatus>,
    ) -> Result<u64> {
        let Some(scope_filter) = owned_filter(scope, FIELDS) else {
            return Ok(0);
        };
        let mut filters = vec![scope_filter];
        if let Some(status) = status {
            filters.push(doc! {"status": status.as_str()});
        }
        self.collection
            .count_documents(and_all(filters), None)
            .await
            .context("Failed to count leads")
    }

    /// Student emails already recorded for an agency. The importer uses this
    /// to skip rows that would duplicate existing leads.
    pub async fn emails_for_agency(&self, agency: &str) -> Result<Vec<String>> {
        let values = self
            .collection
            .distinct("student_email", doc! {"agency": agency}, None)
            .await
            .context("Failed to list existing lead emails")?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}
