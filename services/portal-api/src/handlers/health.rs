use axum::{extract::State, response::Json};
use abportal_database::mongo_health_check;
use serde_json::{json, Value};

use crate::AppState;

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "service": "abportal-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    // Check MongoDB
    let mongo_status = match mongo_health_check(&state.mongo_client).await {
        Ok(_) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    health_status["checks"]["mongodb"] = mongo_status;

    // Outbound channels are reported, not probed: a flaky SMTP relay
    // should not flip the service unhealthy.
    health_status["checks"]["mailer"] = if state.mailer.is_enabled() {
        json!({"status": "healthy", "message": "SMTP transport configured"})
    } else {
        json!({"status": "disabled", "message": "Email sending disabled"})
    };

    let all_healthy = health_status["checks"]
        .as_object()
        .unwrap()
        .values()
        .all(|check| check["status"] != "unhealthy");

    if !all_healthy {
        health_status["status"] = json!("degraded");
    }

    Json(health_status)
}
