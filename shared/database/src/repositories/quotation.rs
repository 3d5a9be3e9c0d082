//! Quotation Repository
//!
//! CRUD operations for quotations.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{AccessScope, Quotation, QuotationStatus};

use crate::scope::{and_all, owned_filter, OwnedFields};
use crate::MongoDatabase;

const FIELDS: OwnedFields = OwnedFields {
    agency: "agency",
    sub_agent: Some("sub_agent"),
    country: None,
};

pub struct QuotationRepository {
    collection: Collection<Quotation>,
}

impl QuotationRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("quotations"),
        }
    }

    /// Find quotation by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Quotation>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch quotation by ID")
    }

    /// Find quotations visible to the given scope, newest first.
    pub async fn find_scoped(
        &self,
        scope: &AccessScope,
        status: Option<QuotationStatus>,
        limit: i64,
    ) -> Result<Vec<Quotation>> {
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
            .context("Failed to query quotations")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read quotations")
    }

    /// All quotations raised against a lead, oldest first.
    pub async fn find_by_lead(&self, lead_id: &str) -> Result<Vec<Quotation>> {
        let options = FindOptions::builder().sort(doc! {"created_at": 1}).build();
        let cursor = self
            .collection
            .find(doc! {"lead_id": lead_id}, options)
            .await
            .context("Failed to query quotations by lead")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read quotations by lead")
    }

    /// Create new quotation
    pub async fn create(&self, quotation: &Quotation) -> Result<Quotation> {
        self.collection
            .insert_one(quotation, None)
            .await
            .context("Failed to create quotation")?;
        Ok(quotation.clone())
    }

    /// Update existing quotation
    pub async fn update(&self, quotation: &Quotation) -> Result<Quotation> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &quotation.id}, quotation, None)
            .await
            .context("Failed to update quotation")?;
        if result.matched_count == 0 {
            anyhow::bail!("quotation {} not found", quotation.id);
        }
        Ok(quotation.clone())
    }

    /// Delete quotation by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete quotation")?;
        Ok(result.deleted_count > 0)
    }

    /// Count quotations in scope, optionally pinned to one status.
    pub async fn count_scoped(
        &self,
        scope: &AccessScope,
        status: Option<QuotationStatus>,
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
            .context("Failed to count quotations")
    }
}
