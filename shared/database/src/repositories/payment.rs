//! Payment Repository
//!
//! CRUD operations for payment receipts.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{AccessScope, Payment, PaymentStatus};

use crate::scope::{and_all, owned_filter, OwnedFields};
use crate::MongoDatabase;

const FIELDS: OwnedFields = OwnedFields {
    agency: "agency",
    sub_agent: Some("sub_agent"),
    country: None,
};

pub struct PaymentRepository {
    collection: Collection<Payment>,
}

impl PaymentRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("payments"),
        }
    }

    /// Find payment by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Payment>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch payment by ID")
    }

    /// Find payments visible to the given scope, newest first.
    pub async fn find_scoped(
        &self,
        scope: &AccessScope,
        status: Option<PaymentStatus>,
        limit: i64,
    ) -> Result<Vec<Payment>> {
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
            .context("Failed to query payments")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read payments")
    }

    /// All payments recorded against a quotation, oldest first.
    pub async fn find_by_quotation(&self, quotation_id: &str) -> Result<Vec<Payment>> {
        let options = FindOptions::builder().sort(doc! {"created_at": 1}).build();
        let cursor = self
            .collection
            .find(doc! {"quotation_id": quotation_id}, options)
            .await
            .context("Failed to query payments by quotation")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read payments by quotation")
    }

    /// Create new payment
    pub async fn create(&self, payment: &Payment) -> Result<Payment> {
        self.collection
            .insert_one(payment, None)
            .await
            .context("Failed to create payment")?;
        Ok(payment.clone())
    }

    /// Update existing payment
    pub async fn update(&self, payment: &Payment) -> Result<Payment> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &payment.id}, payment, None)
            .await
            .context("Failed to update payment")?;
        if result.matched_count == 0 {
            anyhow::bail!("payment {} not found", payment.id);
        }
        Ok(payment.clone())
    }

    /// Delete payment by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete payment")?;
        Ok(result.deleted_count > 0)
    }

    /// Count payments in scope, optionally pinned to one status.
    pub async fn count_scoped(
        &self,
        scope: &AccessScope,
        status: Option<PaymentStatus>,
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
            .context("Failed to count payments")
    }
}
