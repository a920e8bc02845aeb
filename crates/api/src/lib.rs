//! `api` crate: HTTP surface of the relay.
//!
//! Exposes:
//!   GET  /           : liveness probe
//!   POST /alert      : health-check notification webhook
//!   GET  /runs/{id}  : status of one workflow run

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use engine::{AlertWorkflow, RoutingTable};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod handlers;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<AlertWorkflow>,
    pub routing: Arc<RoutingTable>,
    /// Expected value of the `cf-webhook-auth` header.
    pub webhook_secret: Arc<str>,
}

impl AppState {
    pub fn new(workflow: Arc<AlertWorkflow>, routing: RoutingTable, webhook_secret: impl Into<Arc<str>>) -> Self {
        Self {
            workflow,
            routing: Arc::new(routing),
            webhook_secret: webhook_secret.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::teapot))
        .route("/alert", post(handlers::alerts::receive))
        .route("/runs/:id", get(handlers::runs::get))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use engine::{
        AlertDispatcher, HealthSnapshotChecker, MemoryRunStore, RoutingKey, RunState, RunStore,
        WorkflowConfig,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use upstream::mock::MockIncidentSink;

    const SECRET: &str = "s3cret";

    fn app() -> (Router, Arc<MemoryRunStore>, Arc<MockIncidentSink>) {
        let store = Arc::new(MemoryRunStore::new());
        let sink = Arc::new(MockIncidentSink::accepting());
        let workflow = Arc::new(AlertWorkflow::new(
            HealthSnapshotChecker::disabled(),
            AlertDispatcher::new(sink.clone()),
            store.clone(),
            WorkflowConfig::default(),
        ));

        let mut routing = RoutingTable::new();
        routing.insert("scandal", RoutingKey::new("rk-scandal"));

        (router(AppState::new(workflow, routing, SECRET)), store, sink)
    }

    fn alert_request(secret: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            req = req.header("cf-webhook-auth", secret);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn status_notification(name: &str) -> Value {
        json!({
            "alert_type": "health_check_status_notification",
            "text": "status changed",
            "ts": 1691817413,
            "data": { "name": name, "status": "Unhealthy", "reason": "TCP connection failed" },
        })
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn root_is_a_teapot() {
        let (app, _, _) = app();
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(body_text(resp).await, "I'm a teapot.");
    }

    #[tokio::test]
    async fn missing_or_wrong_secret_is_unauthorized() {
        let (app, store, _) = app();

        let resp = app
            .clone()
            .oneshot(alert_request(None, status_notification("scandal-web")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(resp).await, "unauthorized");

        let resp = app
            .oneshot(alert_request(Some("nope"), status_notification("scandal-web")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(store.unfinished().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn connectivity_test_is_acknowledged() {
        let (app, _, sink) = app();
        let resp = app
            .oneshot(alert_request(Some(SECRET), json!({ "text": "Hello World! test", "alert_type": "" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "ok");
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn rejected_notifications_are_bad_requests() {
        let (app, _, _) = app();

        let wrong_type = json!({ "alert_type": "universal_ssl_event_type", "text": "" });
        let resp = app.clone().oneshot(alert_request(Some(SECRET), wrong_type)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "bad request");

        let no_data = json!({ "alert_type": "health_check_status_notification", "text": "" });
        let resp = app.clone().oneshot(alert_request(Some(SECRET), no_data)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .clone()
            .oneshot(alert_request(Some(SECRET), status_notification("ghost-web")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "service ghost not found");

        let req = Request::builder()
            .method("POST")
            .uri("/alert")
            .header("cf-webhook-auth", SECRET)
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accepted_notification_starts_a_run() {
        let (app, store, sink) = app();

        let resp = app
            .clone()
            .oneshot(alert_request(Some(SECRET), status_notification("scandal-web")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        let run_id: uuid::Uuid = body["run_id"].as_str().unwrap().parse().unwrap();

        for _ in 0..100 {
            if store.load(run_id).await.unwrap().state.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(store.load(run_id).await.unwrap().state, RunState::Completed);
        assert_eq!(sink.last().unwrap().dedup_key, "scandal");

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/runs/{run_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(view["state"], "completed");
        assert_eq!(view["dispatch_attempts"], 1);
        assert_eq!(view["event_action"], "trigger");
        assert!(view["summary"].as_str().unwrap().contains("scandal-web is Unhealthy"));
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let (app, _, _) = app();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/runs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
