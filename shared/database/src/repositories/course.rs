//! Course Repository
//!
//! Catalog reads for agents plus admin CRUD.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{CatalogScope, Course};

use crate::scope::{and_all, catalog_filter};
use crate::MongoDatabase;

pub struct CourseRepository {
    collection: Collection<Course>,
}

impl CourseRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("courses"),
        }
    }

    /// Find course by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Course>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch course by ID")
    }

    /// Courses visible to the caller's catalog scope. `active_only` hides
    /// retired entries for agent listings; admins pass `false`.
    pub async fn find_scoped(
        &self,
        scope: &CatalogScope,
        active_only: bool,
        level: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Course>> {
        let mut filters = vec![catalog_filter(scope, "country")];
        if active_only {
            filters.push(doc! {"active": true});
        }
        if let Some(level) = level {
            filters.push(doc! {"level": level});
        }

        let options = FindOptions::builder()
            .sort(doc! {"title": 1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(and_all(filters), options)
            .await
            .context("Failed to query courses")?;
        cursor.try_collect().await.context("Failed to read courses")
    }

    /// Create new course
    pub async fn create(&self, course: &Course) -> Result<Course> {
        self.collection
            .insert_one(course, None)
            .await
            .context("Failed to create course")?;
        Ok(course.clone())
    }

    /// Update existing course
    pub async fn update(&self, course: &Course) -> Result<Course> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &course.id}, course, None)
            .await
            .context("Failed to update course")?;
        if result.matched_count == 0 {
            anyhow::bail!("course {} not found", course.id);
        }
        Ok(course.clone())
    }

    /// Delete course by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete course")?;
        Ok(result.deleted_count > 0)
    }
}
