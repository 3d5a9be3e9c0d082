pub mod mongodb;
pub mod repositories;
pub mod scope;

pub use crate::mongodb::{
    create_mongo_client, get_database, health_check as mongo_health_check, MongoClient,
    MongoDatabase,
};
pub use repositories::*;
pub use scope::{and_all, catalog_filter, owned_filter, OwnedFields};

use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub mongodb_url: String,
    pub database_name: String,
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mongodb_url: "mongodb://localhost:27017".to_string(),
            database_name: "abportal".to_string(),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

pub async fn initialize_database(config: &DatabaseConfig) -> Result<MongoDatabase> {
    let client = create_mongo_client(&config.mongodb_url, config.connection_timeout).await?;
    Ok(get_database(&client, &config.database_name))
}
