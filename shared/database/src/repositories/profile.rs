//! Profile Repository
//!
//! CRUD operations for portal account profiles. Profiles are the identity
//! records behind the actor header; lookups are always by normalized email.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{normalize_email, Profile, ProfileStatus, Role};

use crate::MongoDatabase;

pub struct ProfileRepository {
    collection: Collection<Profile>,
}

impl ProfileRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            collection: database.collection("profiles"),
        }
    }

    /// Find profile by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        self.collection
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch profile by ID")
    }

    /// Find profile by email. The stored email is normalized, so the lookup
    /// normalizes too.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        self.collection
            .find_one(doc! {"email": normalize_email(email)}, None)
            .await
            .context("Failed to fetch profile by email")
    }

    /// List profiles, optionally filtered by role and status.
    pub async fn find_all(
        &self,
        role: Option<Role>,
        status: Option<ProfileStatus>,
        limit: i64,
    ) -> Result<Vec<Profile>> {
        let mut filter = Document::new();
        if let Some(role) = role {
            filter.insert("role", role.as_str());
        }
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .context("Failed to query profiles")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read profiles")
    }

    /// Create new profile
    pub async fn create(&self, profile: &Profile) -> Result<Profile> {
        self.collection
            .insert_one(profile, None)
            .await
            .context("Failed to create profile")?;
        Ok(profile.clone())
    }

    /// Update existing profile
    pub async fn update(&self, profile: &Profile) -> Result<Profile> {
        let result = self
            .collection
            .replace_one(doc! {"_id": &profile.id}, profile, None)
            .await
            .context("Failed to update profile")?;
        if result.matched_count == 0 {
            anyhow::bail!("profile {} not found", profile.id);
        }
        Ok(profile.clone())
    }

    /// Delete profile by ID
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete profile")?;
        Ok(result.deleted_count > 0)
    }

    /// Count profiles, optionally pinned to one status.
    pub async fn count(&self, status: Option<ProfileStatus>) -> Result<u64> {
        let mut filter = Document::new();
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.collection
            .count_documents(filter, None)
            .await
            .context("Failed to count profiles")
    }
}
