//! Admin-published promotions shown to agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::{bson_datetime, bson_datetime_opt};
use crate::normalize_email;

/// A published offer. Country-scoped promotions only surface to callers of
/// that country; untagged ones surface everywhere.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Promotion {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    pub banner_url: Option<String>,
    pub country: Option<String>,
    pub institution: Option<String>,
    #[serde(with = "bson_datetime")]
    pub valid_from: DateTime<Utc>,
    #[serde(with = "bson_datetime_opt")]
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_by: String,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    pub fn new(title: String, body: String, created_by: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            body,
            banner_url: None,
            country: None,
            institution: None,
            valid_from: now,
            valid_until: None,
            active: true,
            created_by: normalize_email(&created_by),
            created_at: now,
            updated_at: now,
        }
    }

    /// Active flag and validity window both gate visibility.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from <= now
            && self.valid_until.map_or(true, |until| until >= now)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn live_requires_active_flag_and_open_window() {
        let mut promo = Promotion::new(
            "Early bird".to_string(),
            "20% off application fees".to_string(),
            "admin@portal.example".to_string(),
        );
        let now = Utc::now();
        assert!(promo.is_live(now));

        promo.active = false;
        assert!(!promo.is_live(now));

        promo.active = true;
        promo.valid_until = Some(now - Duration::days(1));
        assert!(!promo.is_live(now));

        promo.valid_until = None;
        promo.valid_from = now + Duration::days(1);
        assert!(!promo.is_live(now));
    }
}
