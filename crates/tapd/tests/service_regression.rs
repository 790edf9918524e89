//! Service regression tests.
//!
//! Drives the full router the daemon serves with simulator-shaped payloads,
//! and runs the registration handshake against a local fake simulator.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::routing::post;
use serde_json::{Value, json};
use tap_core::config::ControllerConfig;
use tap_core::{Controller, RangeControlPolicy};
use tapgrid_api::build_router;
use tapgrid_register::{RegisterError, Registrar, RegistrationOutcome};
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Bands [220, 240], safety [222, 238], taps -2..=2 with 2% per step.
fn payload(task: Value, min: f64, max: f64, position: i32) -> Value {
    json!({
        "task": task,
        "matriculation_number": "123456",
        "upper_voltage_band": 240.0,
        "lower_voltage_band": 220.0,
        "upper_voltage_safety": 238.0,
        "lower_voltage_safety": 222.0,
        "min_step_position": -2,
        "max_step_position": 2,
        "nominal_voltage": 230.0,
        "current_tapchanger_position": position,
        "tapchanger_voltage_factors": {"-2": 0.96, "-1": 0.98, "0": 1.0, "1": 1.02, "2": 1.04},
        "current_rangecontrol_factor": 1.0,
        "min_street_voltage": min,
        "max_street_voltage": max
    })
}

async fn post_control(router: &Router, body: &Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/calculateControl/")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn default_router() -> Router {
    build_router(Arc::new(Controller::default()))
}

// ── Control scenarios ──────────────────────────────────────────

#[tokio::test]
async fn scenario_table() {
    let router = default_router();

    // (task, min, max, position, tap_action, spreading)
    let cases = [
        (json!("1"), 230.0, 230.0, 0, 2, false),
        (json!("1"), 230.0, 245.0, 0, 0, false),
        (json!("1"), 215.0, 230.0, 0, 1, false),
        (json!("1"), 215.0, 230.0, 2, 2, false),
        (json!("1"), 230.0, 245.0, -2, 2, false),
        (json!("2"), 230.0, 239.0, 0, 0, false),
        (json!("2"), 221.0, 230.0, 0, 1, false),
        (json!("3"), 215.0, 238.0, 0, 2, true),
        (json!(3), 215.0, 238.0, 0, 2, true),
        (json!("unknown"), 230.0, 239.0, 0, 2, false),
    ];

    for (task, min, max, position, action, spreading) in cases {
        let (status, body) = post_control(&router, &payload(task.clone(), min, max, position)).await;
        assert_eq!(status, StatusCode::OK, "task {task} min {min} max {max}");
        assert_eq!(body["tap_action"], action, "task {task} min {min} max {max}");
        assert_eq!(body["spreading_detected"], spreading, "task {task} min {min} max {max}");
        assert_eq!(body["range_control_factor"], 1.0, "task {task} min {min} max {max}");
    }
}

#[tokio::test]
async fn compensation_task_changes_factor() {
    let router = default_router();
    let (status, body) = post_control(&router, &payload(json!("4"), 215.0, 238.0, 0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tap_action"], 2);
    assert_eq!(body["spreading_detected"], true);
    assert_ne!(body["range_control_factor"], 1.0);
}

#[tokio::test]
async fn configured_range_rule_reaches_the_wire() {
    let controller = Controller::new(ControllerConfig {
        range_control: Some(RangeControlPolicy::Reset { value: 0.5 }),
        ..Default::default()
    });
    let router = build_router(Arc::new(controller));

    let (_, body) = post_control(&router, &payload(json!("1"), 230.0, 230.0, 0)).await;
    assert_eq!(body["range_control_factor"], 0.5);
}

#[tokio::test]
async fn invalid_snapshot_is_unprocessable() {
    let router = default_router();
    let (status, body) = post_control(&router, &payload(json!("1"), 240.0, 220.0, 0)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn heartbeat_reports_alive() {
    let router = default_router();
    let req = Request::builder()
        .uri("/heartbeat/")
        .body(Body::empty())
        .unwrap();

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"is_alive": true}));
}

// ── Registration ───────────────────────────────────────────────

/// Start a fake simulator whose registration endpoint answers `status`
/// and forwards each received body.
async fn fake_simulator(status: StatusCode) -> (String, mpsc::Receiver<Value>) {
    let (tx, rx) = mpsc::channel(4);
    let app = Router::new().route(
        "/api/register/task",
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body).await;
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/"), rx)
}

#[tokio::test]
async fn registration_announces_own_url() {
    let (simulator_url, mut rx) = fake_simulator(StatusCode::OK).await;

    let outcome = Registrar::new(simulator_url, "http://host.docker.internal:7777/")
        .with_timeout(Duration::from_secs(2))
        .register()
        .await
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Registered);

    let body = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body, json!({"studenttask_url": "http://host.docker.internal:7777/"}));
}

#[tokio::test]
async fn registration_rejection_is_not_retried() {
    let (simulator_url, mut rx) = fake_simulator(StatusCode::SERVICE_UNAVAILABLE).await;

    let outcome = Registrar::new(simulator_url, "http://localhost:7777/")
        .with_attempts(3)
        .with_backoff(Duration::from_millis(10))
        .register()
        .await
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Rejected { status: 503 });
    assert!(!outcome.is_registered());

    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn registration_times_out_on_silent_simulator() {
    // Accepts the connection but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let err = Registrar::new(format!("http://{addr}/"), "http://localhost:7777/")
        .with_attempts(1)
        .with_timeout(Duration::from_millis(200))
        .register()
        .await
        .unwrap_err();
    assert!(matches!(err, RegisterError::Timeout(_)));
}
