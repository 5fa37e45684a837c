use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod registry;
pub mod systemd_client;

use registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::dashboard))
        .route("/health", get(http::handlers::health))
        .route("/services", post(http::handlers::add_service))
        .route("/services/{identity}", delete(http::handlers::delete_service))
        .route("/tasks", post(http::handlers::add_task))
        .route("/tasks/{identity}", delete(http::handlers::delete_task))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::errors::RegistryError;
    use crate::registry::model::{LiveDetail, LiveResource, ResourceKind, WatchEntry};
    use crate::registry::store::{JsonFileStore, WatchListStore};
    use crate::registry::Registry;
    use crate::systemd_client::LiveResourceProvider;

    use super::*;

    struct MockProvider;

    #[async_trait]
    impl LiveResourceProvider for MockProvider {
        async fn enumerate(&self, kind: ResourceKind) -> Result<Vec<LiveResource>, RegistryError> {
            Ok(match kind {
                ResourceKind::Service => vec![
                    LiveResource {
                        identity: "cups.service".to_string(),
                        display_name: "Printing Service".to_string(),
                        detail: LiveDetail::Service {
                            status: "active".to_string(),
                            startup_mode: "enabled".to_string(),
                            is_active: true,
                        },
                    },
                    LiveResource {
                        identity: "sshd.service".to_string(),
                        display_name: "OpenSSH server".to_string(),
                        detail: LiveDetail::Service {
                            status: "inactive".to_string(),
                            startup_mode: "disabled".to_string(),
                            is_active: false,
                        },
                    },
                ],
                ResourceKind::Task => vec![LiveResource {
                    identity: "backup.timer".to_string(),
                    display_name: "Nightly backup".to_string(),
                    detail: LiveDetail::Task {
                        enabled: true,
                        state: "waiting".to_string(),
                        last_run: None,
                        next_run: None,
                    },
                }],
            })
        }
    }

    async fn app_with_watch_list(entries: &[WatchEntry]) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(JsonFileStore::new(dir.path()));
        if !entries.is_empty() {
            store
                .save(ResourceKind::Service, entries)
                .await
                .expect("seed watch list");
        }

        let registry = Arc::new(Registry::new(Arc::new(MockProvider), store));
        (build_app(AppState::new(registry)), dir)
    }

    async fn app() -> (Router, tempfile::TempDir) {
        app_with_watch_list(&[]).await
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("valid json response")
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _dir) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(body, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn dashboard_reports_only_watched_live_resources() {
        let (app, _dir) = app_with_watch_list(&[WatchEntry {
            identity: "cups.service".to_string(),
            port: Some("631".to_string()),
            description: Some("print spooler".to_string()),
        }])
        .await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;

        assert_eq!(body_json["service_count"], 1);
        assert_eq!(body_json["services"][0]["identity"], "cups.service");
        assert_eq!(body_json["services"][0]["display_name"], "Printing Service");
        assert_eq!(body_json["services"][0]["port"], "631");
        assert_eq!(body_json["services"][0]["description"], "print spooler");
        assert_eq!(body_json["services"][0]["status"], "active");
        assert_eq!(body_json["task_count"], 0);
        assert!(body_json["generated_at_utc"].is_string());
    }

    #[tokio::test]
    async fn add_service_returns_merged_entry() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/services")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"Identity":"sshd.service","Port":"22"}"#,
                    ))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;

        assert_eq!(body_json["identity"], "sshd.service");
        assert_eq!(body_json["port"], "22");
        assert_eq!(body_json["description"], "/");
        assert_eq!(body_json["status"], "inactive");
        assert_eq!(body_json["is_active"], false);
    }

    #[tokio::test]
    async fn add_service_with_unknown_identity_is_not_found() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/services")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"Identity":"ghost.service"}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body_json = body_json(response).await;
        assert_eq!(body_json["code"], "resource_not_live");
    }

    #[tokio::test]
    async fn add_service_with_blank_identity_is_bad_request() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/services")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"Identity":"  "}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_json = body_json(response).await;
        assert_eq!(body_json["code"], "blank_identity");
    }

    #[tokio::test]
    async fn add_task_goes_to_the_task_watch_list() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/tasks")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"Identity":"backup.timer"}"#))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["identity"], "backup.timer");
        assert_eq!(body_json["enabled"], true);
        assert_eq!(body_json["state"], "waiting");
    }

    #[tokio::test]
    async fn delete_of_unwatched_service_succeeds() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/services/ghost.service")
                    .method("DELETE")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["status"], "removed");
        assert_eq!(body_json["identity"], "ghost.service");
    }

    #[tokio::test]
    async fn delete_removes_entry_from_dashboard() {
        let (app, _dir) = app_with_watch_list(&[WatchEntry::new("cups.service")]).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/services/cups.service")
                    .method("DELETE")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body_json = body_json(response).await;
        assert_eq!(body_json["service_count"], 0);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/units")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
