//! End-to-end tests driving a running portal instance over HTTP.
//!
//! All tests are ignored by default; they need a live server plus a seeded
//! admin profile. Point them at an instance with:
//!
//! ```text
//! PORTAL_BASE_URL=http://localhost:8080 \
//! PORTAL_API_KEY=development-key \
//! PORTAL_ADMIN_EMAIL=admin@abportal.test \
//! cargo test -p abportal-api -- --ignored
//! ```

use serde_json::{json, Value};

const PORTAL_KEY_HEADER: &str = "x-portal-key";
const ACTOR_HEADER: &str = "x-actor-email";

struct TestConfig {
    base_url: String,
    api_key: String,
    admin_email: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PORTAL_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_key: std::env::var("PORTAL_API_KEY")
                .unwrap_or_else(|_| "development-key".to_string()),
            admin_email: std::env::var("PORTAL_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@abportal.test".to_string()),
        }
    }
}

impl TestConfig {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[tokio::test]
#[ignore] // Requires a running portal
async fn health_endpoint_is_open() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let response = client
        .get(config.url("/health"))
        .send()
        .await
        .expect("portal unreachable");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore] // Requires a running portal
async fn api_rejects_missing_portal_key() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let response = client
        .get(config.url("/api/v1/leads"))
        .send()
        .await
        .expect("portal unreachable");

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires a running portal
async fn api_rejects_wrong_portal_key() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let response = client
        .get(config.url("/api/v1/leads"))
        .header(PORTAL_KEY_HEADER, "not-the-key")
        .send()
        .await
        .expect("portal unreachable");

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires a running portal
async fn api_rejects_unknown_actor() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let response = client
        .get(config.url("/api/v1/leads"))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .header(ACTOR_HEADER, "nobody@example.com")
        .send()
        .await
        .expect("portal unreachable");

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires a running portal
async fn public_campaign_fetch_needs_only_the_key() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    // No actor header on the public route; an unknown slug is a plain 404.
    let response = client
        .get(config.url("/api/v1/campaigns/public/no-such-form"))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .send()
        .await
        .expect("portal unreachable");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires a running portal and a seeded admin profile
async fn campaign_form_round_trip() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();
    let slug = format!("itest-{}", uuid::Uuid::new_v4().simple());

    // Admin publishes a form.
    let created: Value = client
        .post(config.url("/api/v1/campaigns"))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .header(ACTOR_HEADER, &config.admin_email)
        .json(&json!({
            "title": "Integration test intake",
            "slug": slug,
            "fields": [
                {"key": "name", "label": "Full name", "field_type": "text", "required": true},
                {"key": "email", "label": "Email", "field_type": "text", "required": true}
            ]
        }))
        .send()
        .await
        .expect("portal unreachable")
        .error_for_status()
        .expect("form creation failed")
        .json()
        .await
        .unwrap();
    assert_eq!(created["slug"], slug.as_str());

    // Anyone holding the portal key can read the published shape.
    let public: Value = client
        .get(config.url(&format!("/api/v1/campaigns/public/{}", slug)))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .send()
        .await
        .unwrap()
        .error_for_status()
        .expect("public fetch failed")
        .json()
        .await
        .unwrap();
    assert_eq!(public["fields"].as_array().unwrap().len(), 2);

    // A submission missing a required field is rejected with field problems.
    let rejected = client
        .post(config.url(&format!("/api/v1/campaigns/public/{}", slug)))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .json(&json!({"values": {"name": "Riya Shah"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
    let problems: Value = rejected.json().await.unwrap();
    assert_eq!(problems["code"], "VALIDATION_ERROR");

    // A complete submission lands and shows up for the owning staff.
    let submitted = client
        .post(config.url(&format!("/api/v1/campaigns/public/{}", slug)))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .json(&json!({"values": {"name": "Riya Shah", "email": "riya@example.com"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), reqwest::StatusCode::CREATED);

    let form_id = created["_id"].as_str().unwrap();
    let submissions: Value = client
        .get(config.url(&format!("/api/v1/campaigns/{}/submissions", form_id)))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .header(ACTOR_HEADER, &config.admin_email)
        .send()
        .await
        .unwrap()
        .error_for_status()
        .expect("submission list failed")
        .json()
        .await
        .unwrap();
    assert!(!submissions.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires a running portal and a seeded admin profile
async fn dashboard_summary_always_answers() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let body: Value = client
        .get(config.url("/api/v1/dashboard/summary"))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .header(ACTOR_HEADER, &config.admin_email)
        .send()
        .await
        .expect("portal unreachable")
        .error_for_status()
        .expect("dashboard failed")
        .json()
        .await
        .unwrap();

    assert!(body["leads"]["total"].is_u64());
    assert!(body["recent_activity"].is_array());
}

#[tokio::test]
#[ignore] // Requires a running portal and a seeded admin profile
async fn track_chain_verifies_clean() {
    let config = TestConfig::default();
    let client = reqwest::Client::new();

    let body: Value = client
        .get(config.url("/api/v1/tracks/verify"))
        .header(PORTAL_KEY_HEADER, &config.api_key)
        .header(ACTOR_HEADER, &config.admin_email)
        .send()
        .await
        .expect("portal unreachable")
        .error_for_status()
        .expect("verification failed")
        .json()
        .await
        .unwrap();

    assert_eq!(body["is_valid"], true);
    assert!(body["broken_links"].as_array().unwrap().is_empty());
}
