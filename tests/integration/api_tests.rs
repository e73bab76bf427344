//! API integration tests
//!
//! The router runs in-process on top of the in-memory store seeded from
//! `data/db.json`, with a manual clock so ride durations are exact.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use bike_rental_server::{
    config::AppConfig,
    create_router,
    repository::{MemoryStore, Repository},
    ride::ManualClock,
    services::Services,
    AppState,
};

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let seed = concat!(env!("CARGO_MANIFEST_DIR"), "/data/db.json");
        let store = assert_ok!(MemoryStore::from_seed_file(seed));
        let repository: Repository = Arc::new(store);
        let config = AppConfig::default();
        let clock = Arc::new(ManualClock::new(Local::now()));
        let services = Services::with_clock(repository, &config, clock.clone());
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };
        Self {
            router: create_router(state),
            clock,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str, client: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"username": username, "password": password, "client": client})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().expect("No token in response").to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_login_per_client() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "ana", "password": "ana123", "client": "mobile"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["username"], "ana");
    assert!(body["user"].get("password").is_none());

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "ana", "password": "wrong", "client": "mobile"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "admin", "password": "admin123", "client": "mobile"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.login("admin", "admin123", "admin").await;
}

#[tokio::test]
async fn test_requires_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/rides/current", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = app
        .send(Method::GET, "/rides/current", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_ride() {
    let app = TestApp::new();
    let ana = app.login("ana", "ana123", "mobile").await;
    let admin = app.login("admin", "admin123", "admin").await;

    let (status, view) = app.send(Method::POST, "/rides/select", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "selecting");
    let offered: Vec<i64> = view["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert!(offered.contains(&42));
    assert!(!offered.contains(&26733));

    let (status, view) = app
        .send(Method::POST, "/rides/start", Some(&ana), Some(json!({"bike_id": 42})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", view);
    assert_eq!(view["phase"], "active");
    assert_eq!(view["price_per_minute"], 10);

    let (_, bike) = app.send(Method::GET, "/bikes/42", Some(&admin), None).await;
    assert_eq!(bike["status"], "Iznajmljen");

    app.clock.advance(Duration::seconds(90));
    let (_, view) = app.send(Method::GET, "/rides/current", Some(&ana), None).await;
    assert_eq!(view["elapsed"], "01:30");
    assert_eq!(view["total_price"], 20);

    let (status, view) = app.send(Method::POST, "/rides/stop", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK, "{}", view);
    assert_eq!(view["phase"], "ending_photo");
    assert_eq!(view["summary"]["billed_minutes"], 2);
    assert_eq!(view["summary"]["total_price"], 20);
    assert_eq!(view["summary"]["bike_released"], true);

    let (_, bike) = app.send(Method::GET, "/bikes/42", Some(&admin), None).await;
    assert_eq!(bike["status"], "Dostupan");

    let (status, rentals) = app.send(Method::GET, "/rentals/mine", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    let recorded: Vec<&Value> = rentals
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["bikeId"] == 42)
        .collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["minuta"], 2);
    assert_eq!(recorded[0]["cena"], 20);
    assert_eq!(recorded[0]["cenaPoMinutu"], 10);
    assert_eq!(recorded[0]["korisnik"], "ana");

    let (status, _) = app
        .send(Method::POST, "/rides/photo", Some(&ana), Some(json!({"photo": null})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, view) = app.send(Method::GET, "/rides/current", Some(&ana), None).await;
    assert_eq!(view["phase"], "ending_photo");

    let (status, summary) = app
        .send(
            Method::POST,
            "/rides/photo",
            Some(&ana),
            Some(json!({"photo": "file:///parked.jpg"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["photo"], "file:///parked.jpg");

    let (status, view) = app
        .send(Method::POST, "/rides/acknowledge", Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "idle");
}

#[tokio::test]
async fn test_renamed_rider_keeps_history() {
    let app = TestApp::new();
    let token = app.login("ana", "ana123", "mobile").await;

    let (status, user) = app
        .send(
            Method::PUT,
            "/auth/profile",
            Some(&token),
            Some(json!({
                "username": "ana2",
                "ime": "Ana",
                "prezime": "Vraneš",
                "telefon": "0641234567",
                "email": "ana@example.com"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", user);
    assert_eq!(user["username"], "ana2");

    // ride with the token issued before the rename
    app.send(Method::POST, "/rides/select", Some(&token), None).await;
    let (status, _) = app
        .send(Method::POST, "/rides/start", Some(&token), Some(json!({"bike_id": 42})))
        .await;
    assert_eq!(status, StatusCode::OK);
    app.clock.advance(Duration::seconds(90));
    let (status, _) = app.send(Method::POST, "/rides/stop", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let renamed = app.login("ana2", "ana123", "mobile").await;
    let (status, rentals) = app.send(Method::GET, "/rentals/mine", Some(&renamed), None).await;
    assert_eq!(status, StatusCode::OK);
    let rentals = rentals.as_array().unwrap();
    assert_eq!(rentals.len(), 2);
    let ride = rentals.iter().find(|r| r["bikeId"] == 42).unwrap();
    assert_eq!(ride["korisnik"], "ana2");
    assert_eq!(ride["cena"], 20);
    assert!(rentals.iter().any(|r| r["bikeId"] == 23241));

    let (_, stale_view) = app.send(Method::GET, "/rentals/mine", Some(&token), None).await;
    assert_eq!(stale_view.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_double_stop_records_one_rental() {
    let app = TestApp::new();
    let ana = app.login("ana", "ana123", "mobile").await;
    let admin = app.login("admin", "admin123", "admin").await;

    app.send(Method::POST, "/rides/select", Some(&ana), None).await;
    app.send(Method::POST, "/rides/start", Some(&ana), Some(json!({"bike_id": 42})))
        .await;
    app.clock.advance(Duration::seconds(30));

    let (first, second) = tokio::join!(
        app.send(Method::POST, "/rides/stop", Some(&ana), None),
        app.send(Method::POST, "/rides/stop", Some(&ana), None),
    );
    let statuses = [first.0, second.0];
    assert!(statuses.contains(&StatusCode::OK));
    assert!(statuses.contains(&StatusCode::UNPROCESSABLE_ENTITY));

    let (_, rentals) = app.send(Method::GET, "/rentals", Some(&admin), None).await;
    let rides_on_42 = rentals
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["bikeId"] == 42)
        .count();
    assert_eq!(rides_on_42, 1);
}

#[tokio::test]
async fn test_ride_transitions_are_checked() {
    let app = TestApp::new();
    let ana = app.login("ana", "ana123", "mobile").await;

    let (status, body) = app.send(Method::POST, "/rides/stop", Some(&ana), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 22);

    app.send(Method::POST, "/rides/select", Some(&ana), None).await;
    let (status, body) = app
        .send(Method::POST, "/rides/start", Some(&ana), Some(json!({"bike_id": 26733})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 7);

    let (status, view) = app.send(Method::POST, "/rides/cancel", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "idle");
}

#[tokio::test]
async fn test_problem_report_and_triage() {
    let app = TestApp::new();
    let ana = app.login("ana", "ana123", "mobile").await;
    let admin = app.login("admin", "admin123", "admin").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/problems",
            Some(&ana),
            Some(json!({"bikeId": "0", "opis": "Guma je probušena"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, problem) = app
        .send(
            Method::POST,
            "/problems",
            Some(&ana),
            Some(json!({"bikeId": "12937", "opis": "Guma je probušena"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(problem["status"], "Novo");
    assert_eq!(problem["korisnik"], "ana");
    let id = problem["id"].as_i64().unwrap();

    let (status, _) = app.send(Method::GET, "/problems", Some(&ana), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = app
        .send(
            Method::PUT,
            &format!("/problems/{}/status", id),
            Some(&admin),
            Some(json!({"status": "Slanje bicikla na održavanje"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["cascade_applied"], true);

    let (_, bike) = app.send(Method::GET, "/bikes/12937", Some(&admin), None).await;
    assert_eq!(bike["status"], "Na održavanju");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/problems/{}/status", id),
            Some(&admin),
            Some(json!({"status": "Novo"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_map_pins() {
    let app = TestApp::new();
    let ana = app.login("ana", "ana123", "mobile").await;

    let (status, pins) = app.send(Method::GET, "/map/pins", Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    let pins = pins.as_array().unwrap();
    let ids: Vec<&str> = pins.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"b42"));
    assert!(ids.contains(&"p1"));
    assert!(!ids.contains(&"b26733"));
    assert!(!ids.contains(&"b11249"));

    let (_, pins) = app
        .send(
            Method::GET,
            "/map/pins?bikes=false&lat=44.8045&lon=20.4668",
            Some(&ana),
            None,
        )
        .await;
    let pins = pins.as_array().unwrap();
    assert!(pins.iter().all(|p| p["type"] == "parking"));
    assert_eq!(pins[0]["distanceMeters"], 0);
}

#[tokio::test]
async fn test_fleet_battery_rule() {
    let app = TestApp::new();
    let admin = app.login("admin", "admin123", "admin").await;

    let (status, bike) = app
        .send(
            Method::POST,
            "/bikes",
            Some(&admin),
            Some(json!({"tip": "Gradski", "cena": 8, "baterija": 70})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", bike);
    assert_eq!(bike["baterija"], 0);
    assert_eq!(bike["status"], "Dostupan");
    let id = bike["id"].as_i64().unwrap();
    assert!((10_000..=99_999).contains(&id));

    let (status, bike) = app
        .send(
            Method::PATCH,
            &format!("/bikes/{}", id),
            Some(&admin),
            Some(json!({"tip": "Električni"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bike["baterija"], 100);
}

#[tokio::test]
#[ignore] // Run against a live server with: cargo test -- --ignored
async fn test_live_server_health() {
    let response = reqwest::get("http://localhost:8080/api/v1/health")
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}
