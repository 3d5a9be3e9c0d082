//! Promotion Repository
//!
//! Catalog reads for agents plus admin CRUD.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{CatalogScope, Promotion};

use crate::scope::{and_all, catalog_filter};
use crate::MongoDatabase;

pub struct PromotionRepository {
    collection: Collection<Promotion>,
}

impl PromotionRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("promotions"),
        }
    }

    /// Find promotion by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Promotion>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch promotion by ID")
    }

    /// Promotions currently live for the caller's catalog scope: active flag
    /// set and `now` inside the validity window.
    pub async fn find_live(
        &self,
        scope: &CatalogScope,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Promotion>> {
        let now = mongodb::bson::DateTime::from_chrono(now);
        let window = doc! {
            "active": true,
            "valid_from": {"$lte": now},
            "$or": [{"valid_until": Bson::Null}, {"valid_until": {"$gte": now}}],
        };
        let filter = and_all(vec![catalog_filter(scope, "country"), window]);

        let options = FindOptions::builder()
            .sort(doc! {"valid_from": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .context("Failed to query live promotions")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read promotions")
    }

    /// Every promotion, live or not. Admin listing.
    pub async fn find_all(&self, limit: i64) -> Result<Vec<Promotion>> {
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(None, options)
            .await
            .context("Failed to query promotions")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read promotions")
    }

    /// Create new promotion
    pub async fn create(&self, promotion: &Promotion) -> Result<Promotion> {
        self.collection
            .insert_one(promotion, None)
            .await
            .context("Failed to create promotion")?;
        Ok(promotion.clone())
    }

    /// Update existing promotion
    pub async fn update(&self, promotion: &Promotion) -> Result<Promotion> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &promotion.id}, promotion, None)
            .await
            .context("Failed to update promotion")?;
        if result.matched_count == 0 {
            anyhow::bail!("promotion {} not found", promotion.id);
        }
        Ok(promotion.clone())
    }

    /// Delete promotion by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete promotion")?;
        Ok(result.deleted_count > 0)
    }

    /// Count live promotions for the caller's scope.
    pub async fn count_live(&self, scope: &CatalogScope, now: DateTime<Utc>) -> Result<u64> {
        let now = mongodb::bson::DateTime::from_chrono(now);
        let window = doc! {
            "active": true,
            "valid_from": {"$lte": now},
            "$or": [{"valid_until": Bson::Null}, {"valid_until": {"$gte": now}}],
        };
        let filter = and_all(vec![catalog_filter(scope, "country"), window]);
        self.collection
            .count_documents(filter, None)
            .await
            .context("Failed to count live promotions")
    }
}
