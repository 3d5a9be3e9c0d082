//! Resource Repository
//!
//! Catalog reads for agents plus admin CRUD over shared resources.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{CatalogScope, Resource};

use crate::scope::{and_all, catalog_filter};
use crate::MongoDatabase;

pub struct ResourceRepository {
    collection: Collection<Resource>,
}

impl ResourceRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("resources"),
        }
    }

    /// Find resource by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Resource>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch resource by ID")
    }

    /// Resources visible to the caller's catalog scope, optionally narrowed
    /// to one category or body kind.
    pub async fn find_scoped(
        &self,
        scope: &CatalogScope,
        category: Option<&str>,
        kind: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Resource>> {
        let mut filters = vec![catalog_filter(scope, "country")];
        if let Some(category) = category {
            filters.push(doc! {"category": category});
        }
        if let Some(kind) = kind {
            filters.push(doc! {"body.kind": kind});
        }

        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(and_all(filters), options)
            .await
            .context("Failed to query resources")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read resources")
    }

    /// Create new resource
    pub async fn create(&self, resource: &Resource) -> Result<Resource> {
        self.collection
            .insert_one(resource, None)
            .await
            .context("Failed to create resource")?;
        Ok(resource.clone())
    }

    /// Update existing resource
    pub async fn update(&self, resource: &Resource) -> Result<Resource> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &resource.id}, resource, None)
            .await
            .context("Failed to update resource")?;
        if result.matched_count == 0 {
            anyhow::bail!("resource {} not found", resource.id);
        }
        Ok(resource.clone())
    }

    /// Delete resource by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete resource")?;
        Ok(result.deleted_count > 0)
    }
}
