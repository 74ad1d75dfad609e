use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::core::config::ConfigError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Config(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Provider failures arrive as `anyhow` errors; a missing setting inside one
/// is still reported as a configuration problem.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config) => ApiError::Config(config),
            Err(other) => ApiError::Upstream(format!("{other:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A query parameter that is set and not blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A required query parameter, or a 400 naming it.
pub fn required<'a>(value: &'a Option<String>, name: &str) -> ApiResult<&'a str> {
    present(value).ok_or_else(|| ApiError::BadRequest(format!("Missing {name} parameter")))
}

/// Parses a query parameter, or a 400 naming it.
pub fn parse_param<T: std::str::FromStr>(value: &str, name: &str) -> ApiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name} parameter: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_config_error_survives_anyhow() {
        let err: anyhow::Error = ConfigError::Missing("AMAP_WEB_KEY").into();
        let api = ApiError::from(err);
        assert!(matches!(api, ApiError::Config(ConfigError::Missing("AMAP_WEB_KEY"))));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.to_string(), "Missing configuration: AMAP_WEB_KEY");
    }

    #[test]
    fn test_upstream_error_keeps_context() {
        let err = anyhow!("AMap API error: INVALID_USER_KEY").context("Restaurant search failed");
        let api = ApiError::from(err);
        assert_eq!(
            api.to_string(),
            "Restaurant search failed: AMap API error: INVALID_USER_KEY"
        );
    }

    #[test]
    fn test_required_and_parse() {
        assert_eq!(required(&Some(" 5 ".to_string()), "amount").unwrap(), "5");
        let err = required(&Some("".to_string()), "amount").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing amount parameter");

        assert_eq!(parse_param::<f64>("12.5", "amount").unwrap(), 12.5);
        let err = parse_param::<f64>("abc", "amount").unwrap_err();
        assert_eq!(err.to_string(), "Invalid amount parameter: abc");
    }
}
