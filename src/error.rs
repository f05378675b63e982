use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            102 => (StatusCode::NOT_FOUND, self.message.as_str()),
            103 => (StatusCode::UNPROCESSABLE_ENTITY, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: 102,
        message: "place not found".into(),
    }
}

pub fn unresolved_location_error() -> Error {
    Error {
        code: 103,
        message: "location could not be resolved".into(),
    }
}

pub fn env_var_error(err: env::VarError) -> Error {
    tracing::error!(%err, "environment variable error");

    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!(?err, "database error");

    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    tracing::error!(%err, "reqwest error");

    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn invalid_config_error(key: &str) -> Error {
    Error {
        code: 4,
        message: format!("invalid configuration value for {}", key),
    }
}

pub fn server_error<T: Display>(err: T) -> Error {
    tracing::error!(%err, "server error");

    Error {
        code: 5,
        message: "server error".into(),
    }
}

#[test]
fn client_errors_map_to_their_status() {
    assert_eq!(
        not_found_error().into_response().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        unresolved_location_error().into_response().status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[test]
fn internal_errors_hide_their_message() {
    let err = database_error("connection refused");

    assert_eq!(err.code, 2);
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
