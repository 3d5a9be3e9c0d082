//! Payment receipts recorded against quotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::{bson_datetime, bson_datetime_opt};
use crate::normalize_email;
use crate::quotation::next_document_number;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub receipt_number: String,
    pub quotation_id: String,
    #[validate(length(min = 1, max = 255))]
    pub student_name: String,
    #[validate(email)]
    pub student_email: String,
    pub agency: String,
    pub sub_agent: Option<String>,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    /// Public URL of the uploaded payment receipt, when one was attached.
    pub proof_url: Option<String>,
    #[serde(with = "bson_datetime_opt")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl Payment {
    pub fn new(
        quotation_id: String,
        student_name: String,
        student_email: String,
        agency: String,
        amount: f64,
        currency: String,
        method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            receipt_number: next_document_number("R"),
            quotation_id,
            student_name,
            student_email: normalize_email(&student_email),
            agency: normalize_email(&agency),
            sub_agent: None,
            amount,
            currency: currency.to_uppercase(),
            method,
            reference: None,
            status: PaymentStatus::Pending,
            proof_url: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the payment confirmed and stamps `paid_at` if unset.
    pub fn confirm(&mut self) {
        self.status = PaymentStatus::Confirmed;
        if self.paid_at.is_none() {
            self.paid_at = Some(Utc::now());
        }
        self.touch();
    }

    pub fn set_status(&mut self, status: PaymentStatus) {
        if status == PaymentStatus::Confirmed {
            self.confirm();
        } else {
            self.status = status;
            self.touch();
        }
    }

    pub fn attach_proof(&mut self, url: String) {
        self.proof_url = Some(url);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        Payment::new(
            "quote-1".to_string(),
            "Asha Rao".to_string(),
            "asha@student.example".to_string(),
            "head@agency.example".to_string(),
            5_000.0,
            "aud".to_string(),
            PaymentMethod::BankTransfer,
        )
    }

    #[test]
    fn new_payment_is_pending_without_paid_at() {
        let p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.paid_at.is_none());
        assert!(p.receipt_number.starts_with("R-"));
        assert_eq!(p.currency, "AUD");
    }

    #[test]
    fn confirm_stamps_paid_at_once() {
        let mut p = payment();
        p.confirm();
        let first = p.paid_at.expect("paid_at set on confirm");

        p.confirm();
        assert_eq!(p.paid_at, Some(first));
    }

    #[test]
    fn set_status_to_confirmed_goes_through_confirm() {
        let mut p = payment();
        p.set_status(PaymentStatus::Confirmed);
        assert_eq!(p.status, PaymentStatus::Confirmed);
        assert!(p.paid_at.is_some());

        p.set_status(PaymentStatus::Refunded);
        assert_eq!(p.status, PaymentStatus::Refunded);
    }

    #[test]
    fn proof_attachment_keeps_url() {
        let mut p = payment();
        p.attach_proof("https://files.example/receipt.pdf".to_string());
        assert_eq!(
            p.proof_url.as_deref(),
            Some("https://files.example/receipt.pdf")
        );
    }
}
