//! Campaign form builder: forms, field definitions and public submissions.
//!
//! Forms are published under a slug and posted to without authentication, so
//! every submission is validated against the form's field definitions before
//! it is stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::bson_datetime;
use crate::normalize_email;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CampaignForm {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: String,
    pub description: Option<String>,
    pub country: Option<String>,
    pub active: bool,
    pub created_by: String,
    pub fields: Vec<CampaignField>,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// One field definition on a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignField {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Allowed values for `select` fields; unused otherwise.
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Checkbox,
}

/// One public post against a form. Values are kept as submitted strings,
/// validated against the form definition at intake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignSubmission {
    #[serde(rename = "_id")]
    pub id: String,
    pub form_id: String,
    pub form_slug: String,
    pub values: HashMap<String, String>,
    /// Optional agency attribution passed along with the post.
    pub agency: Option<String>,
    /// Set once the submission has been turned into a lead.
    pub converted_lead_id: Option<String>,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CampaignForm {
    pub fn new(title: String, created_by: String) -> Self {
        let now = Utc::now();
        let slug = slugify(&title);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            slug,
            description: None,
            country: None,
            active: true,
            created_by: normalize_email(&created_by),
            fields: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks a submitted values map against the field definitions. Returns
    /// every problem found, keyed by field, so form posts get one complete
    /// answer rather than a drip of single errors.
    pub fn validate_submission(&self, values: &HashMap<String, String>) -> Vec<FieldProblem> {
        let mut problems = Vec::new();

        for field in &self.fields {
            let value = values.get(&field.key).map(|v| v.trim()).filter(|v| !v.is_empty());

            let value = match value {
                Some(v) => v,
                None => {
                    if field.required {
                        problems.push(FieldProblem {
                            key: field.key.clone(),
                            message: "required field is missing".to_string(),
                        });
                    }
                    continue;
                }
            };

            match field.field_type {
                FieldType::Text => {}
                FieldType::Number => {
                    if value.parse::<f64>().is_err() {
                        problems.push(FieldProblem {
                            key: field.key.clone(),
                            message: format!("'{}' is not a number", value),
                        });
                    }
                }
                FieldType::Date => {
                    if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                        problems.push(FieldProblem {
                            key: field.key.clone(),
                            message: format!("'{}' is not a date (expected YYYY-MM-DD)", value),
                        });
                    }
                }
                FieldType::Select => {
                    if !field.options.iter().any(|o| o == value) {
                        problems.push(FieldProblem {
                            key: field.key.clone(),
                            message: format!("'{}' is not one of the allowed options", value),
                        });
                    }
                }
                FieldType::Checkbox => {
                    if !matches!(value.to_lowercase().as_str(), "true" | "false") {
                        problems.push(FieldProblem {
                            key: field.key.clone(),
                            message: format!("'{}' is not true/false", value),
                        });
                    }
                }
            }
        }

        // Unknown keys are dropped silently rather than rejected; public
        // forms get posted to by stale embeds.
        problems
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A single validation failure on a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldProblem {
    pub key: String,
    pub message: String,
}

impl CampaignSubmission {
    pub fn new(form: &CampaignForm, values: HashMap<String, String>, agency: Option<String>) -> Self {
        let now = Utc::now();
        // Keep only keys the form defines.
        let known: HashMap<String, String> = values
            .into_iter()
            .filter(|(k, _)| form.fields.iter().any(|f| &f.key == k))
            .collect();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            form_slug: form.slug.clone(),
            values: known,
            agency: agency.map(|a| normalize_email(&a)),
            converted_lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_converted(&mut self, lead_id: String) {
        self.converted_lead_id = Some(lead_id);
        self.updated_at = Utc::now();
    }
}

/// Lowercase, alphanumeric, hyphen-separated slug of a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> CampaignForm {
        let mut form = CampaignForm::new(
            "Study in Australia 2026".to_string(),
            "admin@portal.example".to_string(),
        );
        form.fields = vec![
            CampaignField {
                key: "name".to_string(),
                label: "Full name".to_string(),
                field_type: FieldType::Text,
                required: true,
                options: Vec::new(),
            },
            CampaignField {
                key: "budget".to_string(),
                label: "Budget".to_string(),
                field_type: FieldType::Number,
                required: false,
                options: Vec::new(),
            },
            CampaignField {
                key: "intake".to_string(),
                label: "Intake".to_string(),
                field_type: FieldType::Select,
                required: true,
                options: vec!["Feb".to_string(), "Jul".to_string()],
            },
            CampaignField {
                key: "start".to_string(),
                label: "Preferred start".to_string(),
                field_type: FieldType::Date,
                required: false,
                options: Vec::new(),
            },
            CampaignField {
                key: "consent".to_string(),
                label: "Marketing consent".to_string(),
                field_type: FieldType::Checkbox,
                required: false,
                options: Vec::new(),
            },
        ];
        form
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn slug_derives_from_title() {
        assert_eq!(form().slug, "study-in-australia-2026");
        assert_eq!(slugify("  Hello,  World! "), "hello-world");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn valid_submission_passes() {
        let problems = form().validate_submission(&values(&[
            ("name", "Asha Rao"),
            ("budget", "25000.50"),
            ("intake", "Feb"),
            ("start", "2026-02-15"),
            ("consent", "TRUE"),
        ]));
        assert!(problems.is_empty(), "unexpected problems: {:?}", problems);
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let problems = form().validate_submission(&values(&[("budget", "100")]));
        let keys: Vec<&str> = problems.iter().map(|p| p.key.as_str()).collect();
        assert!(keys.contains(&"name"));
        assert!(keys.contains(&"intake"));
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let problems =
            form().validate_submission(&values(&[("name", "   "), ("intake", "Feb")]));
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].key, "name");
    }

    #[test]
    fn select_value_must_be_an_option() {
        let problems =
            form().validate_submission(&values(&[("name", "Asha"), ("intake", "Dec")]));
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].key, "intake");
    }

    #[test]
    fn number_and_date_must_parse() {
        let problems = form().validate_submission(&values(&[
            ("name", "Asha"),
            ("intake", "Feb"),
            ("budget", "lots"),
            ("start", "15/02/2026"),
        ]));
        let keys: Vec<&str> = problems.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["budget", "start"]);
    }

    #[test]
    fn submission_drops_unknown_keys() {
        let f = form();
        let submission = CampaignSubmission::new(
            &f,
            values(&[("name", "Asha"), ("intake", "Feb"), ("injected", "x")]),
            Some("Head@Agency.example".to_string()),
        );

        assert!(!submission.values.contains_key("injected"));
        assert_eq!(submission.agency.as_deref(), Some("head@agency.example"));
        assert_eq!(submission.form_slug, f.slug);
        assert!(submission.converted_lead_id.is_none());
    }
}
