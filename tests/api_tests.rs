mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::mpsc;
use tower::ServiceExt;

use common::RecordingRenderer;
use signal_alert::api::router::create_router;
use signal_alert::execution::{run_control_loop, AlertDispatcher, ControlCommand, DispatcherConfig};
use signal_alert::ingestion::{FeedConfig, FeedSupervisor};
use signal_alert::services::AlertSettings;
use signal_alert::AppState;

struct TestApp {
    router: axum::Router,
    renderer: RecordingRenderer,
    commands: mpsc::Sender<ControlCommand>,
    _dir: tempfile::TempDir,
}

fn build_test_app(api_token: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let renderer = RecordingRenderer::new();
    let config = DispatcherConfig::default();
    let dispatcher = AlertDispatcher::new(config.clone(), AlertSettings::default(), renderer.clone());

    let (feed_tx, feed_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let supervisor = FeedSupervisor::new(FeedConfig::new("ws://127.0.0.1:1", "unused"), feed_tx);

    // Only one global recorder per process, so build a local one.
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    let state = AppState {
        commands: cmd_tx.clone(),
        connection: supervisor.subscribe(),
        status: dispatcher.subscribe(),
        thresholds: config,
        metrics_handle,
        api_token: api_token.map(str::to_owned),
    };

    tokio::spawn(run_control_loop(
        dispatcher,
        supervisor,
        feed_rx,
        cmd_rx,
        dir.path().join("settings.json"),
    ));

    TestApp {
        router: create_router(state),
        renderer,
        commands: cmd_tx,
        _dir: dir,
    }
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = build_test_app(None);

    let resp = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["connection"], "disconnected");
}

#[tokio::test]
async fn test_health_reports_stopped_control_loop() {
    let app = build_test_app(None);
    app.commands.send(ControlCommand::Shutdown).await.unwrap();
    let stopped = common::eventually(Duration::from_secs(2), || app.commands.is_closed());
    assert!(stopped.await);

    let resp = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_status_defaults() {
    let app = build_test_app(None);

    let resp = app.router.oneshot(get("/api/status")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["connection"], "disconnected");
    assert_eq!(json["alert_count"], 0);
    assert!(json["last_alert_at"].is_null());
    assert!(json["popup"].is_null());
    assert_eq!(json["min_payout"], 75);
    assert_eq!(json["min_popup_win_rate"], 55.0);
    assert_eq!(json["settings"]["sound"], "Siren");
}

#[tokio::test]
async fn test_test_signal_shows_in_status() {
    let app = build_test_app(None);

    let resp = app
        .router
        .clone()
        .oneshot(post("/api/test/signal"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    settle().await;

    let json = json_body(app.router.clone().oneshot(get("/api/status")).await.unwrap()).await;
    assert_eq!(json["alert_count"], 1);
    assert_eq!(json["popup"]["pair"], "EUR/USD");
    assert_eq!(json["popup"]["direction"], "BUY");
    assert_eq!(app.renderer.play_count(), 1);

    let resp = app
        .router
        .clone()
        .oneshot(post("/api/popup/dismiss"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    settle().await;

    let json = json_body(app.router.oneshot(get("/api/status")).await.unwrap()).await;
    assert!(json["popup"].is_null());
    assert_eq!(app.renderer.live_popups().len(), 0);
}

#[tokio::test]
async fn test_update_then_get_settings() {
    let app = build_test_app(None);

    let body = serde_json::json!({
        "sound": "Air Raid",
        "volume": 150,
        "repeat": 2,
        "show_popup": false,
        "popup_timeout": 4,
    });
    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/settings")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["success"], true);
    // Clamped on the way in.
    assert_eq!(json["data"]["volume"], 100);
    assert_eq!(json["data"]["popup_timeout"], 2);
    settle().await;

    let json = json_body(app.router.oneshot(get("/api/settings")).await.unwrap()).await;
    assert_eq!(json["sound"], "Air Raid");
    assert_eq!(json["volume"], 100);
    assert_eq!(json["repeat"], 2);
    assert_eq!(json["show_popup"], false);
}

#[tokio::test]
async fn test_update_settings_rejects_bad_json() {
    let app = build_test_app(None);

    let resp = app
        .router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/settings")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_token_required_on_control_routes() {
    let app = build_test_app(Some("s3cret"));

    let resp = app.router.clone().oneshot(get("/api/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Health stays public.
    let resp = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_test_app(None);

    let resp = app.router.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let _text = String::from_utf8(body.to_vec()).unwrap();
    // Local recorder is never installed globally, so the body may be empty.
}
