//! HTTP API.
//!
//! - `detector`: endpoints the browser-side detector calls
//! - `admin`: endpoints the operator console calls

pub mod admin;
pub mod detector;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use autoprint_core::PipelineBuilder;
    use autoprint_core::config::{LedgerConfig, PipelineConfig, PrinterConfig};
    use autoprint_core::processors::sinks::{LabelJob, LabelPrinter, SinkError};
    use autoprint_sdk::objects::admin::{
        ReprintResponse, ShowResponse, StatusResponse, WinRecordResponse,
    };
    use autoprint_sdk::objects::{
        AdmissionResponse, AdmissionStatus, SinkOutcome, WinEventPayload,
    };
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use serde::de::DeserializeOwned;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use crate::server::build_router;
    use crate::state::AppState;

    #[derive(Default)]
    struct CountingPrinter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LabelPrinter for CountingPrinter {
        async fn print(&self, _job: &LabelJob) -> Result<(), SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct TestApp {
        router: Router,
        printer: Arc<CountingPrinter>,
        _shutdown_tx: watch::Sender<bool>,
        _dir: tempfile::TempDir,
    }

    async fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            ledger: LedgerConfig {
                dir: dir.path().to_path_buf(),
                max_entries: 100,
            },
            printer: PrinterConfig {
                cooldown: Duration::ZERO,
                ..PrinterConfig::default()
            },
            ..PipelineConfig::default()
        };
        let printer = Arc::new(CountingPrinter::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (pipeline, _) = PipelineBuilder::new(config)
            .with_printer(printer.clone())
            .start(shutdown_rx)
            .await
            .unwrap();
        TestApp {
            router: build_router(AppState::new(pipeline)),
            printer,
            _shutdown_tx: shutdown_tx,
            _dir: dir,
        }
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    fn event_body(payload: WinEventPayload) -> Option<serde_json::Value> {
        Some(serde_json::to_value(payload).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_ping() {
        let app = test_app().await;
        let (status, _) = send(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app.router, Method::GET, "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
    }

    #[tokio::test]
    async fn test_event_without_show_is_dropped() {
        let app = test_app().await;
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/v1/detector/event",
            event_body(WinEventPayload::sale("alice", "Charizard Card", None)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: AdmissionResponse = parse(&body);
        assert_eq!(response.status, AdmissionStatus::NoActiveSession);
        assert_eq!(response.entry_id, None);
    }

    #[tokio::test]
    async fn test_blank_winner_is_unprocessable() {
        let app = test_app().await;
        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/v1/detector/event",
            event_body(WinEventPayload::sale("  ", "Charizard Card", None)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_show_lifecycle_and_history() {
        let app = test_app().await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/v1/admin/shows",
            Some(serde_json::json!({ "name": "ShowA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let show: ShowResponse = parse(&body);
        assert_eq!(show.show_id, "showa");
        assert_eq!(show.labels_file, "labels-showa.json");

        // A second show cannot start while ShowA runs.
        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/v1/admin/shows",
            Some(serde_json::json!({ "name": "ShowB" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        for _ in 0..2 {
            send(
                &app.router,
                Method::POST,
                "/api/v1/detector/event",
                event_body(WinEventPayload::sale(
                    "alice",
                    "Charizard Card",
                    Some("$12.50".into()),
                )),
            )
            .await;
        }

        let (_, body) = send(&app.router, Method::GET, "/api/v1/admin/wins", None).await;
        let wins: Vec<WinRecordResponse> = parse(&body);
        assert_eq!(wins.len(), 1);
        assert_eq!(wins[0].status, AdmissionStatus::Recorded);

        let (_, body) = send(
            &app.router,
            Method::GET,
            "/api/v1/admin/wins/search?q=CHARIZARD",
            None,
        )
        .await;
        let hits: Vec<WinRecordResponse> = parse(&body);
        assert_eq!(hits.len(), 1);

        let (status, _) = send(&app.router, Method::POST, "/api/v1/admin/shows/end", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app.router, Method::GET, "/api/v1/admin/status", None).await;
        let snapshot: StatusResponse = parse(&body);
        assert!(!snapshot.has_active_show);
        assert_eq!(snapshot.shows.len(), 1);

        let (status, _) =
            send(&app.router, Method::DELETE, "/api/v1/admin/shows/showa", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) =
            send(&app.router, Method::DELETE, "/api/v1/admin/shows/showa", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pause_is_persisted_in_status() {
        let app = test_app().await;
        let (status, _) =
            send(&app.router, Method::POST, "/api/v1/admin/printer/pause", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app.router, Method::GET, "/api/v1/admin/status", None).await;
        let snapshot: StatusResponse = parse(&body);
        assert!(!snapshot.printing);
        assert!(!snapshot.extension_active);

        send(&app.router, Method::POST, "/api/v1/detector/heartbeat", None).await;
        let (_, body) = send(&app.router, Method::GET, "/api/v1/admin/status", None).await;
        let snapshot: StatusResponse = parse(&body);
        assert!(snapshot.extension_active);
        assert!(snapshot.last_extension_heartbeat.is_some());
    }

    #[tokio::test]
    async fn test_manual_reprint_of_described_win() {
        let app = test_app().await;
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/v1/admin/wins/reprint",
            Some(serde_json::json!({ "name": "carol", "item": "Booster Box" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: ReprintResponse = parse(&body);
        assert_eq!(response.dispatch.printer, SinkOutcome::Delivered);
        assert_eq!(app.printer.calls.load(Ordering::SeqCst), 1);

        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/v1/admin/wins/reprint",
            Some(serde_json::json!({ "name": "carol" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patterns_are_trimmed() {
        let app = test_app().await;
        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/api/v1/admin/settings/exclusions",
            Some(serde_json::json!({ "patterns": [" shipping ", ""] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: serde_json::Value = parse(&body);
        assert_eq!(response["patterns"], serde_json::json!(["shipping"]));
    }
}
