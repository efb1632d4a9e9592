mod profiles;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use igscrape_scraper::{ClassifiedError, ProfileClient, RetryPolicy};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{limit_in_flight, request_id, FetchLimiter, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ProfileClient>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// Error response: the classified status code with `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn from_classified(err: &ClassifiedError) -> Self {
        Self {
            status: status_for(err.suggested_status_code()),
            body: ErrorBody {
                error: err.message().to_owned(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Suggested codes are used as-is when they are error statuses. A mirrored
/// upstream status outside 4xx/5xx (e.g. an unfollowed 3xx) becomes 502.
fn status_for(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn profile_router(limiter: FetchLimiter) -> Router<AppState> {
    Router::new()
        .route("/profile/{username}", get(profiles::get_profile))
        .layer(axum::middleware::from_fn_with_state(limiter, limit_in_flight))
}

pub fn build_app(state: AppState, limiter: FetchLimiter) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(profile_router(limiter))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData { status: "ok" },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use igscrape_scraper::{ClientConfig, JitterRange, Session};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app(base_url: String) -> Router {
        test_app_with_limit(base_url, 4)
    }

    fn test_app_with_limit(base_url: String, max_in_flight: usize) -> Router {
        let client = ProfileClient::new(ClientConfig {
            base_url,
            timeout_secs: 5,
            jitter: JitterRange::NONE,
            session: Session::Anonymous,
        })
        .expect("client");
        build_app(
            AppState {
                client: Arc::new(client),
                retry: RetryPolicy::default(),
            },
            FetchLimiter::new(max_in_flight),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn status_for_passes_error_codes_through() {
        assert_eq!(status_for(404), StatusCode::NOT_FOUND);
        assert_eq!(status_for(429), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(503), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(418), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn status_for_maps_non_error_codes_to_bad_gateway() {
        assert_eq!(status_for(302), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(0), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_body_is_error_message_only() {
        let err = ApiError::from_classified(&ClassifiedError::parse("bad json"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "bad json"}));
    }

    #[tokio::test]
    async fn health_returns_ok_with_request_id() {
        let app = test_app("http://127.0.0.1:1".to_owned());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "req-42"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn profile_route_returns_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alice/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"alice","biography":"mail a.b+c@example.co.uk!","edge_followed_by":{"count":42}}}}]}};</script>"#,
            ))
            .mount(&server)
            .await;

        let (status, json) = get_json(test_app(server.uri()), "/profile/alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["follower_count"], 42);
        assert_eq!(json["following_count"], 0);
        assert_eq!(json["email"], "a.b+c@example.co.uk");
        assert_eq!(json["is_private"], false);
    }

    #[tokio::test]
    async fn profile_route_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ghost/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (status, json) = get_json(test_app(server.uri()), "/profile/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, serde_json::json!({"error": "Profile does not exist"}));
    }

    #[tokio::test]
    async fn profile_route_maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alice/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (status, json) = get_json(test_app(server.uri()), "/profile/alice").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(json["error"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn profile_route_maps_network_failure_to_503() {
        let (status, json) = get_json(test_app("http://127.0.0.1:1".to_owned()), "/profile/alice").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"]
            .as_str()
            .is_some_and(|m| m.starts_with("Connection error")));
    }

    #[tokio::test]
    async fn profile_fetches_queue_behind_the_in_flight_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"alice"}}}]}};</script>"#,
                    )
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let app = test_app_with_limit(server.uri(), 1);
        let started = std::time::Instant::now();
        let ((first, _), (second, _)) = tokio::join!(
            get_json(app.clone(), "/profile/alice"),
            get_json(app, "/profile/bob"),
        );
        let elapsed = started.elapsed();

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert!(
            elapsed >= std::time::Duration::from_millis(600),
            "second fetch should wait for the only permit, took {elapsed:?}"
        );
    }
}
