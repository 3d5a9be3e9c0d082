use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};
use crate::middleware::{actor_middleware, portal_key_middleware};

pub fn create_api_routes(state: AppState) -> Router<AppState> {
    // Campaign fetch/submit works with the portal key alone so embedded
    // forms can post without a portal profile.
    let public = Router::new().route(
        "/campaigns/public/:slug",
        get(fetch_public_form).post(submit_public_form),
    );

    let scoped = Router::new()
        // Profiles
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/profiles/:id/activate", post(activate_profile))
        .route("/profiles/:id/suspend", post(suspend_profile))
        // Leads
        .route("/leads", get(list_leads).post(create_lead))
        .route("/leads/import", post(import_leads))
        .route("/leads/export", get(export_leads))
        .route("/leads/:id", get(get_lead).put(update_lead).delete(delete_lead))
        .route("/leads/:id/status", post(change_lead_status))
        // Quotations
        .route("/quotations", get(list_quotations).post(create_quotation))
        .route(
            "/quotations/:id",
            get(get_quotation).put(update_quotation).delete(delete_quotation),
        )
        .route("/quotations/:id/send", post(send_quotation))
        // Payments
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/export", get(export_payments))
        .route(
            "/payments/:id",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route("/payments/:id/status", post(change_payment_status))
        .route("/payments/:id/proof", post(upload_payment_proof))
        // Promotions
        .route("/promotions", get(list_promotions).post(create_promotion))
        .route(
            "/promotions/:id",
            get(get_promotion).put(update_promotion).delete(delete_promotion),
        )
        // Courses
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:id", get(get_course).put(update_course).delete(delete_course))
        // Resources
        .route("/resources", get(list_resources).post(create_resource))
        .route("/resources/upload", post(upload_resource_file))
        .route(
            "/resources/:id",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/resources/:id/sync", post(sync_resource_playlist))
        // Campaign forms and submissions
        .route("/campaigns", get(list_campaign_forms).post(create_campaign_form))
        .route(
            "/campaigns/:id",
            get(get_campaign_form)
                .put(update_campaign_form)
                .delete(delete_campaign_form),
        )
        .route("/campaigns/:id/submissions", get(list_campaign_submissions))
        .route(
            "/campaigns/submissions/:id/convert",
            post(convert_campaign_submission),
        )
        // Activity log
        .route("/tracks", get(list_tracks))
        .route("/tracks/verify", get(verify_track_chain))
        // Dashboard
        .route("/dashboard/summary", get(dashboard_summary))
        .route("/health/detailed", get(detailed_health_check))
        .layer(from_fn_with_state(state.clone(), actor_middleware));

    public
        .merge(scoped)
        .layer(from_fn_with_state(state, portal_key_middleware))
}
