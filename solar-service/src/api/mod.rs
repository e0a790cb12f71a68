//! HTTP surface: routes, shared state and error mapping.

pub mod handlers;

use std::sync::Arc;

use axum::{
    http::{header::InvalidHeaderValue, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    backend::{BackendError, SolarBackend},
    shape::NullSafeJson,
};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn SolarBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn SolarBackend>) -> Self {
        Self { backend }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid value for '{name}': '{value}'")]
    InvalidParam { name: &'static str, value: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidParam { .. } => StatusCode::BAD_REQUEST,
            Self::Backend(e) => {
                tracing::error!(error = %e, "backend query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, NullSafeJson(body)).into_response()
    }
}

/// Allow `origin` with any method and header.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/solar/stats/", get(handlers::state_summaries))
        .route("/api/stats", get(handlers::nationwide_stats))
        .route("/api/state/:state", get(handlers::state_detail))
        .route("/api/solar/state/:state/", get(handlers::state_detail))
        .route("/api/installations", get(handlers::installations))
        .route("/api/solar/installations/", get(handlers::installations))
        .route("/api/states", get(handlers::states))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::MemoryBackend, dataset::InstallationTable};
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use solar_client::domain::Installation;
    use tower::ServiceExt;

    fn row(case_id: i64, state: &str, year: Option<i32>, cap: Option<f64>) -> Installation {
        let mut i = Installation::new(case_id);
        i.state = Some(state.to_string());
        i.county = Some(format!("{state} County"));
        i.year = year;
        i.capacity_ac = cap;
        i.tech_primary = Some("PV".to_string());
        i
    }

    fn app() -> Router {
        let table = InstallationTable::from_rows(vec![
            row(1, "CA", Some(2019), Some(10.0)),
            row(2, "CA", Some(2020), Some(5.0)),
            row(3, "NY", Some(2018), Some(3.0)),
        ]);
        let state = AppState::new(Arc::new(MemoryBackend::from_table(table)));
        router(state, cors_layer("http://localhost:5173").unwrap())
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn nationwide_stats_match_fixture() {
        let (status, body) = get_json("/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "total_installations": 3,
                "total_capacity_ac": 18.0,
                "average_size": 6.0,
                "states_count": 2,
                "year_range": [2018, 2020],
            })
        );
    }

    #[tokio::test]
    async fn state_summaries_are_sorted_by_code() {
        let (status, body) = get_json("/api/solar/stats/").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["state"], "CA");
        assert_eq!(rows[0]["installation_count"], 2);
        assert_eq!(rows[0]["total_capacity_ac"], 15.0);
        assert_eq!(rows[0]["avg_capacity"], 7.5);
        assert_eq!(rows[0]["latest_year"], 2020);
        assert_eq!(rows[1]["state"], "NY");
    }

    #[tokio::test]
    async fn state_detail_accepts_lowercase_code() {
        let (status, body) = get_json("/api/state/ca").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "CA");
        assert_eq!(body["stats"]["totalInstallations"], 2);
        assert_eq!(body["stats"]["totalCapacity"], 15.0);
        assert_eq!(body["stats"]["averageCapacity"], 7.5);
        assert_eq!(body["stats"]["totalCounties"], 1);
        assert_eq!(body["stats"]["yearRange"], json!([2019, 2020]));
        assert_eq!(body["yearly_progression"][0]["year"], 2019);
        assert_eq!(body["tech_distribution"][0]["count"], 2);
        assert_eq!(body["installations"][0]["case_id"], 2);
    }

    #[tokio::test]
    async fn django_style_state_route_is_served() {
        let (status, body) = get_json("/api/solar/state/NY/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["totalInstallations"], 1);
    }

    #[tokio::test]
    async fn unknown_state_returns_error_payload_with_ok_status() {
        let (status, body) = get_json("/api/state/XX").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "error": "No installations found for this state" }));
    }

    #[tokio::test]
    async fn installations_filter_and_paginate() {
        let (status, body) = get_json("/api/installations?state=ca&min_capacity=6&limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["installations"][0]["case_id"], 1);
        assert_eq!(body["installations"][0]["technology"], "PV");
    }

    #[tokio::test]
    async fn blank_params_are_ignored() {
        let (status, body) = get_json("/api/solar/installations/?state=&year=&offset=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["installations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_numeric_param_is_bad_request() {
        let (status, body) = get_json("/api/installations?year=recent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid value for 'year': 'recent'");

        let (status, _) = get_json("/api/installations?min_capacity=NaN").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn states_listing_wraps_codes() {
        let (status, body) = get_json("/api/states").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "states": [
                    { "code": "CA", "installations": 2, "totalCapacity": 15.0 },
                    { "code": "NY", "installations": 1, "totalCapacity": 3.0 },
                ]
            })
        );
    }

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["installations"], 3);
        assert!(body["fingerprint"].is_null());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/stats")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[test]
    fn invalid_origin_is_rejected() {
        assert!(cors_layer("bad\norigin").is_err());
    }
}
