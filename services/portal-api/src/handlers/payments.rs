//! Payment handlers.
//!
//! Payments are recorded against a quotation by the owning agency, but the
//! money-facing transitions stay with admins: only they confirm, refund or
//! fail a payment, and only they may delete one. Pending payments are the
//! only editable ones.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use abportal_models::{Caller, Payment, PaymentMethod, PaymentStatus, TrackAction, TrackEntry};
use abportal_utils::{
    payments_to_csv, validate_file_type, validate_model, PortalError, PortalResult,
};

use super::quotations::load_scoped_quotation;
use super::{clamp_limit, record_track, require_admin, require_staff_scope};
use crate::AppState;

const EXPORT_LIMIT: i64 = 50_000;
const PROOF_FILE_TYPES: &[&str] = &["pdf", "png", "jpg", "jpeg"];

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub status: Option<PaymentStatus>,
    pub quotation_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub quotation_id: String,
    pub amount: f64,
    /// Defaults to the quotation's currency.
    pub currency: Option<String>,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub amount: Option<f64>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePaymentStatusRequest {
    pub status: PaymentStatus,
}

/// List payments visible to the caller
///
/// GET /api/v1/payments
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListPaymentsQuery>,
) -> PortalResult<Json<Vec<Payment>>> {
    let scope = require_staff_scope(&caller)?;

    if let Some(quotation_id) = query.quotation_id {
        let payments = state
            .repos
            .payments
            .find_by_quotation(&quotation_id)
            .await?
            .into_iter()
            .filter(|p| scope.permits(&p.agency, p.sub_agent.as_deref(), None))
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .collect();
        return Ok(Json(payments));
    }

    let limit = clamp_limit(query.limit, state.config.portal.max_list_size);
    let payments = state
        .repos
        .payments
        .find_scoped(&scope, query.status, limit)
        .await?;
    Ok(Json(payments))
}

/// Record a payment against a quotation
///
/// POST /api/v1/payments
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreatePaymentRequest>,
) -> PortalResult<Json<Payment>> {
    let quotation = load_scoped_quotation(&state, &caller, &payload.quotation_id).await?;

    let currency = payload.currency.unwrap_or_else(|| quotation.currency.clone());
    let mut payment = Payment::new(
        quotation.id.clone(),
        quotation.student_name.clone(),
        quotation.student_email.clone(),
        quotation.agency.clone(),
        payload.amount,
        currency,
        payload.method,
    );
    payment.sub_agent = quotation.sub_agent.clone();
    payment.reference = payload.reference;
    validate_model(&payment)?;

    let created = state.repos.payments.create(&payment).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Created,
            "payment",
            &created.id,
            Some(&created.agency),
            format!(
                "recorded payment {} of {:.2} {} for {}",
                created.receipt_number, created.amount, created.currency, created.student_email
            ),
        ),
    )
    .await;

    Ok(Json(created))
}

/// Get a payment
///
/// GET /api/v1/payments/:id
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Payment>> {
    let payment = load_scoped_payment(&state, &caller, &id).await?;
    Ok(Json(payment))
}

/// Update a pending payment
///
/// PUT /api/v1/payments/:id
pub async fn update_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> PortalResult<Json<Payment>> {
    let mut payment = load_scoped_payment(&state, &caller, &id).await?;

    // Once a payment leaves pending its figures are settled.
    if payment.status != PaymentStatus::Pending {
        return Err(PortalError::conflict(format!(
            "Payment {} is {}, only pending payments can be edited",
            payment.receipt_number,
            payment.status.as_str()
        )));
    }

    if let Some(amount) = payload.amount {
        payment.amount = amount;
    }
    if let Some(method) = payload.method {
        payment.method = method;
    }
    if let Some(reference) = payload.reference {
        payment.reference = Some(reference);
    }
    payment.touch();
    validate_model(&payment)?;

    let updated = state.repos.payments.update(&payment).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "payment",
            &updated.id,
            Some(&updated.agency),
            format!("updated payment {}", updated.receipt_number),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Confirm, refund or fail a payment (admin only)
///
/// POST /api/v1/payments/:id/status
pub async fn change_payment_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<ChangePaymentStatusRequest>,
) -> PortalResult<Json<Payment>> {
    require_admin(&caller)?;
    let mut payment = load_scoped_payment(&state, &caller, &id).await?;

    let previous = payment.status;
    payment.set_status(payload.status);
    let updated = state.repos.payments.update(&payment).await?;

    if previous != PaymentStatus::Confirmed && updated.status == PaymentStatus::Confirmed {
        state
            .mailer
            .send(
                &updated.student_email,
                &updated.student_name,
                "payment_confirmed",
                json!({
                    "student_name": updated.student_name,
                    "receipt_number": updated.receipt_number,
                    "amount": format!("{:.2}", updated.amount),
                    "currency": updated.currency,
                    "method": updated.method.as_str(),
                }),
            )
            .await;
    }

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::StatusChanged,
            "payment",
            &updated.id,
            Some(&updated.agency),
            format!(
                "payment {} status {} -> {}",
                updated.receipt_number,
                previous.as_str(),
                updated.status.as_str()
            ),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Attach an uploaded proof-of-payment file
///
/// POST /api/v1/payments/:id/proof
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> PortalResult<Json<Payment>> {
    let mut payment = load_scoped_payment(&state, &caller, &id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::validation("file", format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| PortalError::validation("file", "No file provided"))?;

    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "proof.pdf".to_string());
    validate_file_type(&file_name, PROOF_FILE_TYPES)?;
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let data = field
        .bytes()
        .await
        .map_err(|e| PortalError::validation("file", format!("Failed to read file data: {}", e)))?;

    let stored = state
        .storage
        .upload(&file_name, &content_type, data.to_vec())
        .await?;
    payment.attach_proof(stored.url);

    let updated = state.repos.payments.update(&payment).await?;
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Updated,
            "payment",
            &updated.id,
            Some(&updated.agency),
            format!("attached proof to payment {}", updated.receipt_number),
        ),
    )
    .await;

    Ok(Json(updated))
}

/// Export visible payments as CSV
///
/// GET /api/v1/payments/export
pub async fn export_payments(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListPaymentsQuery>,
) -> PortalResult<impl IntoResponse> {
    let scope = require_staff_scope(&caller)?;
    let payments = state
        .repos
        .payments
        .find_scoped(&scope, query.status, EXPORT_LIMIT)
        .await?;
    let csv = payments_to_csv(&payments)?;

    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Exported,
            "payment",
            &caller.email,
            None,
            format!("exported {} payments", payments.len()),
        ),
    )
    .await;

    let filename = format!(
        "attachment; filename=\"payments-{}.csv\"",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}

/// Delete a payment (admin only)
///
/// DELETE /api/v1/payments/:id
pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> PortalResult<Json<Value>> {
    require_admin(&caller)?;
    let payment = load_scoped_payment(&state, &caller, &id).await?;

    if !state.repos.payments.delete(&id).await? {
        return Err(PortalError::not_found(format!("Payment {}", id)));
    }
    record_track(
        &state,
        TrackEntry::new(
            &caller.email,
            TrackAction::Deleted,
            "payment",
            &id,
            Some(&payment.agency),
            format!("deleted payment {}", payment.receipt_number),
        ),
    )
    .await;

    Ok(Json(json!({"id": id, "deleted": true})))
}

async fn load_scoped_payment(state: &AppState, caller: &Caller, id: &str) -> PortalResult<Payment> {
    let scope = require_staff_scope(caller)?;
    let payment = state
        .repos
        .payments
        .find_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Payment {}", id)))?;
    if !scope.permits(&payment.agency, payment.sub_agent.as_deref(), None) {
        return Err(PortalError::not_found(format!("Payment {}", id)));
    }
    Ok(payment)
}
