//! Dashboard summary.
//!
//! One aggregate endpoint the portal home screen renders from. Every card is
//! computed independently; a failing sub-query logs and leaves its card
//! empty instead of taking the whole dashboard down.

use std::collections::BTreeMap;

use axum::{extract::State, response::Json, Extension};
use chrono::Utc;
use serde::Serialize;

use abportal_models::{AccessScope, Caller, LeadStatus, PaymentStatus, TrackEntry};
use abportal_utils::PortalResult;

use super::{require_catalog_scope, require_staff_scope};
use crate::AppState;

// Confirmed-payment totals fold over the full visible slice.
const TOTALS_LIMIT: i64 = 50_000;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub leads: LeadCard,
    pub quotations: QuotationCard,
    pub payments: PaymentCard,
    pub promotions_live: u64,
    pub recent_activity: Vec<TrackEntry>,
    pub last_updated: String,
}

#[derive(Debug, Default, Serialize)]
pub struct LeadCard {
    pub total: u64,
    pub by_status: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Default, Serialize)]
pub struct QuotationCard {
    pub total: u64,
    pub accepted: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct PaymentCard {
    pub confirmed_count: usize,
    /// Confirmed amounts summed per currency; currencies are never mixed.
    pub confirmed_totals: BTreeMap<String, f64>,
}

/// GET /api/v1/dashboard/summary
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> PortalResult<Json<DashboardSummary>> {
    let scope = require_staff_scope(&caller)?;
    let catalog_scope = require_catalog_scope(&caller)?;

    let leads = match lead_card(&state, &scope).await {
        Ok(card) => card,
        Err(e) => {
            tracing::error!("Dashboard lead card failed: {}", e);
            LeadCard::default()
        }
    };

    let quotations = match quotation_card(&state, &scope).await {
        Ok(card) => card,
        Err(e) => {
            tracing::error!("Dashboard quotation card failed: {}", e);
            QuotationCard::default()
        }
    };

    let payments = match payment_card(&state, &scope).await {
        Ok(card) => card,
        Err(e) => {
            tracing::error!("Dashboard payment card failed: {}", e);
            PaymentCard::default()
        }
    };

    let promotions_live = match state
        .repos
        .promotions
        .count_live(&catalog_scope, Utc::now())
        .await
    {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Dashboard promotion count failed: {}", e);
            0
        }
    };

    let recent_activity = match state
        .repos
        .tracks
        .find_scoped(&scope, None, None, state.config.portal.dashboard_activity_limit)
        .await
    {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Dashboard activity feed failed: {}", e);
            Vec::new()
        }
    };

    Ok(Json(DashboardSummary {
        leads,
        quotations,
        payments,
        promotions_live,
        recent_activity,
        last_updated: Utc::now().to_rfc3339(),
    }))
}

async fn lead_card(state: &AppState, scope: &AccessScope) -> anyhow::Result<LeadCard> {
    let mut card = LeadCard::default();
    for status in LeadStatus::ALL {
        let count = state.repos.leads.count_scoped(scope, Some(status)).await?;
        card.by_status.insert(status.as_str(), count);
        card.total += count;
    }
    Ok(card)
}

async fn quotation_card(state: &AppState, scope: &AccessScope) -> anyhow::Result<QuotationCard> {
    let total = state.repos.quotations.count_scoped(scope, None).await?;
    let accepted = state
        .repos
        .quotations
        .count_scoped(scope, Some(abportal_models::QuotationStatus::Accepted))
        .await?;
    Ok(QuotationCard { total, accepted })
}

async fn payment_card(state: &AppState, scope: &AccessScope) -> anyhow::Result<PaymentCard> {
    let confirmed = state
        .repos
        .payments
        .find_scoped(scope, Some(PaymentStatus::Confirmed), TOTALS_LIMIT)
        .await?;

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for payment in &confirmed {
        *totals.entry(payment.currency.clone()).or_insert(0.0) += payment.amount;
    }
    Ok(PaymentCard {
        confirmed_count: confirmed.len(),
        confirmed_totals: totals,
    })
}
