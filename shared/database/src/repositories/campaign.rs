//! Campaign Repository
//!
//! Forms and their public submissions live in separate collections but are
//! always handled together, so one repository fronts both.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::Collection;

use abportal_models::{AccessScope, CampaignForm, CampaignSubmission};

use crate::scope::{owned_filter, OwnedFields};
use crate::MongoDatabase;

const FORM_FIELDS: OwnedFields = OwnedFields {
    agency: "created_by",
    sub_agent: None,
    country: Some("country"),
};

pub struct CampaignRepository {
    forms: Collection<CampaignForm>,
    submissions: Collection<CampaignSubmission>,
}

impl CampaignRepository {
    pub fn new(database: &MongoDatabase) -> Self {
        Self {
            forms: database.collection("campaign_forms"),
            submissions: database.collection("campaign_submissions"),
        }
    }

    /// Find form by ID
    pub async fn find_form_by_id(&self, id: &str) -> Result<Option<CampaignForm>> {
        self.forms
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch campaign form by ID")
    }

    /// Find form by slug, regardless of its active flag.
    pub async fn find_form_by_slug(&self, slug: &str) -> Result<Option<CampaignForm>> {
        self.forms
            .find_one(doc! {"slug": slug}, None)
            .await
            .context("Failed to fetch campaign form by slug")
    }

    /// The public fetch: only active forms are served to the open internet.
    pub async fn find_active_form_by_slug(&self, slug: &str) -> Result<Option<CampaignForm>> {
        self.forms
            .find_one(doc! {"slug": slug, "active": true}, None)
            .await
            .context("Failed to fetch active campaign form")
    }

    /// Forms visible to the given scope, newest first.
    pub async fn find_forms_scoped(
        &self,
        scope: &AccessScope,
        limit: i64,
    ) -> Result<Vec<CampaignForm>> {
        let Some(filter) = owned_filter(scope, FORM_FIELDS) else {
            return Ok(Vec::new());
        };
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .forms
            .find(filter, options)
            .await
            .context("Failed to query campaign forms")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read campaign forms")
    }

    /// Create new form
    pub async fn create_form(&self, form: &CampaignForm) -> Result<CampaignForm> {
        self.forms
            .insert_one(form, None)
            .await
            .context("Failed to create campaign form")?;
        Ok(form.clone())
    }

    /// Update existing form
    pub async fn update_form(&self, form: &CampaignForm) -> Result<CampaignForm> {
        let result = self
            .forms
            .replace_one(doc! {"_id": &form.id}, form, None)
            .await
            .context("Failed to update campaign form")?;
        if result.matched_count == 0 {
            anyhow::bail!("campaign form {} not found", form.id);
        }
        Ok(form.clone())
    }

    /// Delete form by ID
    pub async fn delete_form(&self, id: &str) -> Result<bool> {
        let result = self
            .forms
            .delete_one(doc! {"_id": id}, None)
            .await
            .context("Failed to delete campaign form")?;
        Ok(result.deleted_count > 0)
    }

    /// Find submission by ID
    pub async fn find_submission_by_id(&self, id: &str) -> Result<Option<CampaignSubmission>> {
        self.submissions
            .find_one(doc! {"_id": id}, None)
            .await
            .context("Failed to fetch campaign submission by ID")
    }

    /// Submissions posted against a form, newest first.
    pub async fn find_submissions_for_form(
        &self,
        form_id: &str,
        limit: i64,
    ) -> Result<Vec<CampaignSubmission>> {
        let options = FindOptions::builder()
            .sort(doc! {"created_at": -1})
            .limit(limit)
            .build();
        let cursor = self
            .submissions
            .find(doc! {"form_id": form_id}, options)
            .await
            .context("Failed to query campaign submissions")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read campaign submissions")
    }

    /// Create new submission
    pub async fn create_submission(
        &self,
        submission: &CampaignSubmission,
    ) -> Result<CampaignSubmission> {
        self.submissions
            .insert_one(submission, None)
            .await
            .context("Failed to create campaign submission")?;
        Ok(submission.clone())
    }

    /// Update existing submission, used to stamp the converted lead.
    pub async fn update_submission(
        &self,
        submission: &CampaignSubmission,
    ) -> Result<CampaignSubmission> {
        let result = self
            .submissions
            .replace_one(doc! {"_id": &submission.id}, submission, None)
            .await
            .context("Failed to update campaign submission")?;
        if result.matched_count == 0 {
            anyhow::bail!("campaign submission {} not found", submission.id);
        }
        Ok(submission.clone())
    }

    /// Count submissions against a form.
    pub async fn count_submissions(&self, form_id: &str) -> Result<u64> {
        self.submissions
            .count_documents(doc! {"form_id": form_id}, None)
            .await
            .context("Failed to count campaign submissions")
    }
}
