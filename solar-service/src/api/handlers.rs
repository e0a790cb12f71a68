use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use solar_client::domain::{normalize_state_code, InstallationFilter, Page};

use super::{ApiError, AppState};
use crate::shape::NullSafeJson;

const STATE_NOT_FOUND: &str = "No installations found for this state";

fn count_request(endpoint: &'static str) {
    metrics::counter!("solar_http_requests_total", "endpoint" => endpoint).increment(1);
}

/// Raw query string for the installation listing. Kept as text so a blank
/// value can mean "no filter" and a bad number can be reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct InstallationParams {
    pub state: Option<String>,
    pub year: Option<String>,
    pub min_capacity: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

fn parse_param<T: FromStr>(name: &'static str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ApiError::InvalidParam {
            name,
            value: value.to_string(),
        }),
    }
}

impl InstallationParams {
    pub fn into_query(self) -> Result<(InstallationFilter, Page), ApiError> {
        let mut filter = InstallationFilter::default();
        if let Some(state) = self.state.as_deref() {
            filter = filter.with_state(state);
        }
        if let Some(year) = parse_param::<i32>("year", self.year.as_deref())? {
            filter = filter.with_year(year);
        }
        match parse_param::<f64>("min_capacity", self.min_capacity.as_deref())? {
            Some(min) if min.is_finite() => filter = filter.with_min_capacity(min),
            Some(_) => {
                return Err(ApiError::InvalidParam {
                    name: "min_capacity",
                    value: self.min_capacity.unwrap_or_default().trim().to_string(),
                })
            }
            None => {}
        }

        let page = Page::new(
            parse_param("limit", self.limit.as_deref())?,
            parse_param("offset", self.offset.as_deref())?,
        );
        Ok((filter, page))
    }
}

pub async fn state_summaries(State(app): State<AppState>) -> Result<Response, ApiError> {
    count_request("state_summaries");
    let rows = app.backend.state_summaries().await?;
    Ok(NullSafeJson(rows).into_response())
}

pub async fn nationwide_stats(State(app): State<AppState>) -> Result<Response, ApiError> {
    count_request("nationwide_stats");
    let stats = app.backend.nationwide_stats().await?;
    Ok(NullSafeJson(stats).into_response())
}

pub async fn state_detail(
    State(app): State<AppState>,
    Path(state): Path<String>,
) -> Result<Response, ApiError> {
    count_request("state_detail");
    let detail = match normalize_state_code(&state) {
        Some(code) => app.backend.state_detail(&code).await?,
        None => None,
    };

    Ok(match detail {
        Some(detail) => NullSafeJson(detail).into_response(),
        None => NullSafeJson(json!({ "error": STATE_NOT_FOUND })).into_response(),
    })
}

pub async fn installations(
    State(app): State<AppState>,
    Query(params): Query<InstallationParams>,
) -> Result<Response, ApiError> {
    count_request("installations");
    let (filter, page) = params.into_query()?;
    let result = app.backend.installations(&filter, page).await?;
    Ok(NullSafeJson(result).into_response())
}

pub async fn states(State(app): State<AppState>) -> Result<Response, ApiError> {
    count_request("states");
    let states = app.backend.states().await?;
    Ok(NullSafeJson(json!({ "states": states })).into_response())
}

pub async fn health(State(app): State<AppState>) -> Result<Response, ApiError> {
    count_request("health");
    let health = app.backend.health().await?;
    Ok(NullSafeJson(health).into_response())
}
