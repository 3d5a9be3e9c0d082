//! Repository module for database CRUD operations
//!
//! Provides typed MongoDB repositories for all portal entities.

pub mod campaign;
pub mod course;
pub mod lead;
pub mod payment;
pub mod profile;
pub mod promotion;
pub mod quotation;
pub mod resource;
pub mod track;

pub use campaign::CampaignRepository;
pub use course::CourseRepository;
pub use lead::LeadRepository;
pub use payment::PaymentRepository;
pub use profile::ProfileRepository;
pub use promotion::PromotionRepository;
pub use quotation::QuotationRepository;
pub use resource::ResourceRepository;
pub use track::{ChainVerification, TrackRepository};

use anyhow::{Context, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use crate::MongoDatabase;

/// Creates the indexes the portal relies on. Safe to run on every startup;
/// MongoDB treats existing identical indexes as a no-op.
pub async fn ensure_indexes(database: &MongoDatabase) -> Result<()> {
    let unique = |keys: Document| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };
    let plain = |keys: Document| IndexModel::builder().keys(keys).build();

    database
        .collection::<Document>("profiles")
        .create_index(unique(doc! {"email": 1}), None)
        .await
        .context("Failed to create profile email index")?;

    database
        .collection::<Document>("campaign_forms")
        .create_index(unique(doc! {"slug": 1}), None)
        .await
        .context("Failed to create campaign form slug index")?;

    database
        .collection::<Document>("leads")
        .create_index(plain(doc! {"agency": 1, "created_at": -1}), None)
        .await
        .context("Failed to create lead agency index")?;

    database
        .collection::<Document>("tracks")
        .create_index(plain(doc! {"created_at": 1}), None)
        .await
        .context("Failed to create track chain index")?;

    tracing::info!("Database indexes ensured");
    Ok(())
}
