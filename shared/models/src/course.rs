//! Course catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::bson_datetime;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub institution: String,
    pub country: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub level: String,
    pub duration: Option<String>,
    #[validate(range(min = 0.0))]
    pub tuition_fee: f64,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub intakes: Vec<String>,
    pub active: bool,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(
        title: String,
        institution: String,
        level: String,
        tuition_fee: f64,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            institution,
            country: None,
            level,
            duration: None,
            tuition_fee,
            currency: currency.to_uppercase(),
            intakes: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_course_is_active_with_uppercased_currency() {
        let course = Course::new(
            "BSc Thaumatology".to_string(),
            "Unseen University".to_string(),
            "Undergraduate".to_string(),
            24_000.0,
            "aud".to_string(),
        );

        assert!(course.active);
        assert_eq!(course.currency, "AUD");
        assert!(course.intakes.is_empty());
        assert!(course.validate().is_ok());
    }
}
