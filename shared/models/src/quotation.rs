//! Quotations: priced offers generated from a lead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::{bson_datetime, bson_datetime_opt};
use crate::normalize_email;

/// A priced offer for a lead. The total is stored denormalized and kept in
/// sync by [`Quotation::recompute_total`] on every fee change.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Quotation {
    #[serde(rename = "_id")]
    pub id: String,
    pub quote_number: String,
    pub lead_id: String,
    #[validate(length(min = 1, max = 255))]
    pub student_name: String,
    #[validate(email)]
    pub student_email: String,
    pub agency: String,
    pub sub_agent: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub institution: String,
    #[validate(length(min = 1, max = 255))]
    pub course_name: String,
    #[validate]
    pub fees: FeeLines,
    #[validate(range(min = 0.0, message = "Discount cannot be negative"))]
    pub discount: f64,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub total: f64,
    #[serde(with = "bson_datetime_opt")]
    pub valid_until: Option<DateTime<Utc>>,
    pub status: QuotationStatus,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// The three fee lines every quotation carries.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct FeeLines {
    #[validate(range(min = 0.0))]
    pub tuition: f64,
    #[validate(range(min = 0.0))]
    pub materials: f64,
    #[validate(range(min = 0.0))]
    pub other: f64,
}

impl FeeLines {
    pub fn sum(&self) -> f64 {
        self.tuition + self.materials + self.other
    }
}

impl Default for FeeLines {
    fn default() -> Self {
        Self {
            tuition: 0.0,
            materials: 0.0,
            other: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    Expired,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Declined => "declined",
            QuotationStatus::Expired => "expired",
        }
    }
}

impl Quotation {
    pub fn new(
        lead_id: String,
        student_name: String,
        student_email: String,
        agency: String,
        institution: String,
        course_name: String,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            quote_number: next_document_number("Q"),
            lead_id,
            student_name,
            student_email: normalize_email(&student_email),
            agency: normalize_email(&agency),
            sub_agent: None,
            institution,
            course_name,
            fees: FeeLines::default(),
            discount: 0.0,
            currency: currency.to_uppercase(),
            total: 0.0,
            valid_until: None,
            status: QuotationStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total is fee lines minus discount, floored at zero.
    pub fn recompute_total(&mut self) {
        self.total = (self.fees.sum() - self.discount).max(0.0);
        self.touch();
    }

    pub fn set_status(&mut self, status: QuotationStatus) {
        self.status = status;
        self.touch();
    }

    /// A quotation past its validity date that was never resolved counts as
    /// expired regardless of the stored status.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            QuotationStatus::Accepted | QuotationStatus::Declined => false,
            QuotationStatus::Expired => true,
            _ => self.valid_until.map_or(false, |until| until < now),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Human-facing document numbers: prefix, date, short random tail.
pub(crate) fn next_document_number(prefix: &str) -> String {
    let tail = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().format("%Y%m%d"),
        &tail[..6].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn quotation() -> Quotation {
        Quotation::new(
            "lead-1".to_string(),
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
            "Unseen University".to_string(),
            "BSc Thaumatology".to_string(),
            "aud".to_string(),
        )
    }

    #[test]
    fn total_equals_fee_lines_minus_discount() {
        let mut q = quotation();
        q.fees = FeeLines {
            tuition: 20_000.0,
            materials: 1_500.0,
            other: 300.0,
        };
        q.discount = 1_800.0;
        q.recompute_total();

        assert_eq!(q.total, 20_000.0);
        assert_eq!(q.currency, "AUD");
    }

    #[test]
    fn total_never_goes_negative() {
        let mut q = quotation();
        q.fees.tuition = 100.0;
        q.discount = 500.0;
        q.recompute_total();

        assert_eq!(q.total, 0.0);
    }

    #[test]
    fn quote_numbers_carry_prefix_and_differ() {
        let a = quotation();
        let b = quotation();
        assert!(a.quote_number.starts_with("Q-"));
        assert_ne!(a.quote_number, b.quote_number);
    }

    #[test]
    fn validity_window_drives_expiry() {
        let now = Utc::now();
        let mut q = quotation();
        assert!(!q.is_expired(now));

        q.valid_until = Some(now - Duration::days(1));
        assert!(q.is_expired(now));

        // resolved quotations never flip to expired
        q.set_status(QuotationStatus::Accepted);
        assert!(!q.is_expired(now));
    }
}
