use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use beacon_api::{AppStateInner, router};
use beacon_db::Database;
use beacon_dispatch::DispatchConfig;
use beacon_geo::places::validate_point;
use beacon_geo::{Place, PlaceFinder, PlacesError};
use beacon_sms::{FailureReason, SmsError, SmsReceipt, SmsTransport};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

/// Fails for "B", succeeds for everyone else.
#[derive(Default)]
struct StubTransport {
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsTransport for StubTransport {
    async fn send(&self, recipient: &str, _text: &str) -> Result<SmsReceipt, SmsError> {
        self.attempts.lock().unwrap().push(recipient.to_string());
        if recipient == "B" {
            return Err(SmsError::new(FailureReason::InvalidNumber, "Invalid Numbers"));
        }
        Ok(SmsReceipt {
            provider_ref: Some("req-1".into()),
            detail: "SMS sent successfully.".into(),
        })
    }
}

struct StubPlaces {
    fail: bool,
}

#[async_trait]
impl PlaceFinder for StubPlaces {
    async fn find_nearby(&self, lat: f64, lng: f64, _radius_m: u32) -> Result<Vec<Place>, PlacesError> {
        validate_point(lat, lng)?;
        if self.fail {
            return Err(PlacesError::timeout("status 504"));
        }
        Ok(vec![Place {
            kind: "police".into(),
            name: "Central PS".into(),
            address: "MG Road".into(),
            lat,
            lng,
            distance_km: 0.0,
        }])
    }
}

struct TestApp {
    app: Router,
    transport: Arc<StubTransport>,
}

fn test_app(places_fail: bool) -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let transport = Arc::new(StubTransport::default());
    let state = AppStateInner::new(
        db,
        SECRET.to_string(),
        transport.clone(),
        Arc::new(StubPlaces { fail: places_fail }),
        DispatchConfig::default(),
    );
    TestApp {
        app: router(state),
        transport,
    }
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Returns (user_id, token).
async fn signup(app: &Router, email: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/api/signup",
        None,
        Some(json!({ "name": "Asha", "email": email, "phone": "9000000000", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["userId"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn signup_requires_every_field() {
    let t = test_app(false);
    let (status, body) = call(
        &t.app,
        "POST",
        "/api/signup",
        None,
        Some(json!({ "name": "Asha", "email": "a@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "All fields required" }));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let t = test_app(false);
    signup(&t.app, "a@example.com").await;
    let (status, body) = call(
        &t.app,
        "POST",
        "/api/signup",
        None,
        Some(json!({ "name": "B", "email": "A@example.com", "phone": "1", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already exists");
}

#[tokio::test]
async fn login_checks_password() {
    let t = test_app(false);
    let (user_id, _) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], user_id.as_str());
    assert_eq!(body["name"], "Asha");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let t = test_app(false);
    let (user_id, _) = signup(&t.app, "a@example.com").await;

    let (status, _) = call(&t.app, "GET", &format!("/api/contacts/{user_id}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&t.app, "GET", &format!("/api/contacts/{user_id}"), Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_cannot_touch_each_other() {
    let t = test_app(false);
    let (alice, _) = signup(&t.app, "a@example.com").await;
    let (_, bob_token) = signup(&t.app, "b@example.com").await;

    let (status, _) = call(&t.app, "GET", &format!("/api/contacts/{alice}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &t.app,
        "POST",
        "/api/sos",
        Some(&bob_token),
        Some(json!({ "userId": alice, "lat": 1.0, "lng": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(t.transport.attempts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn contacts_are_replaced_whole() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/contacts",
        Some(&token),
        Some(json!({ "userId": user_id, "contacts": ["A", "B", "A"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Contacts updated");

    call(
        &t.app,
        "POST",
        "/api/contacts",
        Some(&token),
        Some(json!({ "userId": user_id, "contacts": ["C"] })),
    )
    .await;

    let (status, body) = call(&t.app, "GET", &format!("/api/contacts/{user_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contacts"], json!(["C"]));
}

#[tokio::test]
async fn contacts_update_requires_payload() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(&t.app, "POST", "/api/contacts", Some(&token), Some(json!({ "userId": user_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing data");

    let (status, body) = call(&t.app, "GET", "/api/contacts/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid user ID");
}

#[tokio::test]
async fn sos_without_contacts_is_unprocessable() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/sos",
        Some(&token),
        Some(json!({ "userId": user_id, "lat": 12.9, "lng": 77.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "No emergency contacts set");

    let (_, history) = call(&t.app, "GET", &format!("/api/sos/history/{user_id}"), Some(&token), None).await;
    assert_eq!(history["history"], json!([]));
}

#[tokio::test]
async fn sos_missing_coordinates_is_rejected() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(&t.app, "POST", "/api/sos", Some(&token), Some(json!({ "userId": user_id, "lat": 1.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing data");
}

#[tokio::test]
async fn sos_partial_delivery_end_to_end() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;
    call(
        &t.app,
        "POST",
        "/api/contacts",
        Some(&token),
        Some(json!({ "userId": user_id, "contacts": ["A", "B"] })),
    )
    .await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/sos",
        Some(&token),
        Some(json!({ "userId": user_id, "lat": 0, "lng": 0, "triggeredBy": "volume" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["details"]["contactsTotal"], 2);
    assert_eq!(body["details"]["contactsNotified"], 1);
    assert_eq!(body["details"]["triggeredBy"], "volume");
    assert_eq!(body["details"]["location"], json!({ "lat": 0.0, "lng": 0.0 }));
    assert_eq!(body["smsResults"][1]["error"], "invalid number: Invalid Numbers");
    assert_eq!(*t.transport.attempts.lock().unwrap(), vec!["A", "B"]);

    // Editing contacts afterwards does not rewrite history.
    call(
        &t.app,
        "POST",
        "/api/contacts",
        Some(&token),
        Some(json!({ "userId": user_id, "contacts": ["Z"] })),
    )
    .await;

    let (status, history) = call(&t.app, "GET", &format!("/api/sos/history/{user_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let events = history["history"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["contactsNotified"], json!(["A", "B"]));
    assert_eq!(events[0]["outcomes"].as_array().unwrap().len(), 2);
    assert_eq!(events[0]["triggeredBy"], "volume");
}

#[tokio::test]
async fn history_is_latest_first() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;
    call(
        &t.app,
        "POST",
        "/api/contacts",
        Some(&token),
        Some(json!({ "userId": user_id, "contacts": ["A"] })),
    )
    .await;

    for trigger in ["button", "auto"] {
        call(
            &t.app,
            "POST",
            "/api/sos",
            Some(&token),
            Some(json!({ "userId": user_id, "lat": 1.0, "lng": 2.0, "triggeredBy": trigger })),
        )
        .await;
    }

    let (_, history) = call(&t.app, "GET", &format!("/api/sos/history/{user_id}"), Some(&token), None).await;
    let triggers: Vec<&str> = history["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["triggeredBy"].as_str().unwrap())
        .collect();
    assert_eq!(triggers, vec!["auto", "button"]);

    let (_, limited) = call(&t.app, "GET", &format!("/api/sos/history/{user_id}?limit=1"), Some(&token), None).await;
    assert_eq!(limited["history"].as_array().unwrap().len(), 1);
    assert_eq!(limited["history"][0]["triggeredBy"], "auto");
}

#[tokio::test]
async fn location_pings_are_recorded() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, _) = call(
        &t.app,
        "POST",
        "/api/location",
        Some(&token),
        Some(json!({ "userId": user_id, "lat": 12.9, "lng": 77.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&t.app, "GET", &format!("/api/location/{user_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locations"][0]["lat"], 12.9);
}

#[tokio::test]
async fn nearby_places_success_and_failure() {
    let t = test_app(false);
    let (status, body) = call(&t.app, "GET", "/api/nearby-places?lat=12.9&lng=77.6", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["places"][0]["type"], "police");
    assert_eq!(body["places"][0]["name"], "Central PS");

    let (status, body) = call(&t.app, "GET", "/api/nearby-places?lat=12.9", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing location data");

    let (status, body) = call(&t.app, "GET", "/api/nearby-places?lat=200&lng=77.6", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "latitude must be within [-90, 90]");

    let failing = test_app(true);
    let (status, body) = call(&failing.app, "GET", "/api/nearby-places?lat=12.9&lng=77.6", None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "success": false, "message": "Failed to fetch nearby places", "places": [] }));
}

#[tokio::test]
async fn health_is_public() {
    let t = test_app(false);
    let (status, body) = call(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn malformed_sos_body_is_a_json_bad_request() {
    let t = test_app(false);
    let (user_id, token) = signup(&t.app, "a@example.com").await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/sos",
        Some(&token),
        Some(json!({ "userId": user_id, "lat": "12.9", "lng": 77.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "Invalid request body" }));
    assert!(t.transport.attempts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_query_is_a_json_bad_request() {
    let t = test_app(false);
    let (status, body) = call(&t.app, "GET", "/api/nearby-places?lat=abc&lng=77.6", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "Invalid query parameters" }));

    let (user_id, token) = signup(&t.app, "a@example.com").await;
    let (status, body) = call(
        &t.app,
        "GET",
        &format!("/api/sos/history/{user_id}?limit=many"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid query parameters");
}

#[tokio::test]
async fn concurrent_signups_with_one_email_conflict_cleanly() {
    let t = test_app(false);
    let body = json!({ "name": "Asha", "email": "a@example.com", "phone": "1", "password": "correct horse" });

    let (first, second) = tokio::join!(
        call(&t.app, "POST", "/api/signup", None, Some(body.clone())),
        call(&t.app, "POST", "/api/signup", None, Some(body.clone())),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
}
