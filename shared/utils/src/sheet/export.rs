//! CSV export for role-scoped lead and payment listings.

use abportal_models::{Lead, Payment};
use anyhow::{Context, Result};

const LEAD_HEADERS: &[&str] = &[
    "student_name",
    "student_email",
    "student_phone",
    "destination_country",
    "study_level",
    "course_interest",
    "intake",
    "status",
    "source",
    "agency",
    "sub_agent",
    "created_at",
];

const PAYMENT_HEADERS: &[&str] = &[
    "receipt_number",
    "quotation_id",
    "amount",
    "currency",
    "method",
    "status",
    "reference",
    "agency",
    "paid_at",
    "created_at",
];

/// Serialize leads to CSV bytes, one row per lead.
pub fn leads_to_csv(leads: &[Lead]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(LEAD_HEADERS)
        .context("failed to write lead CSV header")?;

    for lead in leads {
        writer
            .write_record(&[
                lead.student_name.as_str(),
                lead.student_email.as_str(),
                lead.student_phone.as_deref().unwrap_or(""),
                lead.destination_country.as_deref().unwrap_or(""),
                lead.study_level.as_deref().unwrap_or(""),
                lead.course_interest.as_deref().unwrap_or(""),
                lead.intake.as_deref().unwrap_or(""),
                lead.status.as_str(),
                lead.source.as_deref().unwrap_or(""),
                lead.agency.as_str(),
                lead.sub_agent.as_deref().unwrap_or(""),
                &lead.created_at.to_rfc3339(),
            ])
            .context("failed to write lead CSV row")?;
    }

    writer
        .into_inner()
        .context("failed to flush lead CSV buffer")
}

/// Serialize payments to CSV bytes, one row per payment.
pub fn payments_to_csv(payments: &[Payment]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(PAYMENT_HEADERS)
        .context("failed to write payment CSV header")?;

    for payment in payments {
        let amount = format!("{:.2}", payment.amount);
        let paid_at = payment
            .paid_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        writer
            .write_record(&[
                payment.receipt_number.as_str(),
                payment.quotation_id.as_str(),
                amount.as_str(),
                payment.currency.as_str(),
                payment.method.as_str(),
                payment.status.as_str(),
                payment.reference.as_deref().unwrap_or(""),
                payment.agency.as_str(),
                paid_at.as_str(),
                &payment.created_at.to_rfc3339(),
            ])
            .context("failed to write payment CSV row")?;
    }

    writer
        .into_inner()
        .context("failed to flush payment CSV buffer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use abportal_models::PaymentMethod;

    #[test]
    fn lead_export_includes_headers_and_rows() {
        let mut lead = Lead::new(
            "Asha Rao".to_string(),
            "asha@example.com".to_string(),
            "head@agency.example".to_string(),
        );
        lead.destination_country = Some("Australia".to_string());

        let bytes = leads_to_csv(&[lead]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), LEAD_HEADERS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("Asha Rao,asha@example.com"));
        assert!(row.contains("Australia"));
        assert!(row.contains("new"));
    }

    #[test]
    fn payment_export_formats_amount_to_two_places() {
        let payment = Payment::new(
            "quote-1".to_string(),
            "Asha Rao".to_string(),
            "asha@example.com".to_string(),
            "head@agency.example".to_string(),
            1234.5,
            "aud".to_string(),
            PaymentMethod::BankTransfer,
        );

        let bytes = payments_to_csv(&[payment]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("1234.50"));
        assert!(text.contains("bank_transfer"));
    }

    #[test]
    fn export_quotes_fields_containing_commas() {
        let lead = Lead::new(
            "Rao, Asha".to_string(),
            "asha@example.com".to_string(),
            "head@agency.example".to_string(),
        );

        let bytes = leads_to_csv(&[lead]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("\"Rao, Asha\""));
    }
}
