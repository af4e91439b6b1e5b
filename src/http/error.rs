use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

pub type FieldDetails = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<FieldDetails>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<FieldDetails>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 400 carrying per-field messages.
    pub fn validation(details: FieldDetails) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

/// Collects field-level validation failures for a single request.
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: FieldDetails,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.details
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Requires a non-blank value and returns it trimmed.
    pub fn require(&mut self, field: &str, value: Option<&str>) -> String {
        match value.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => {
                self.add(field, "This field is required.");
                String::new()
            }
        }
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn into_error(self) -> AppError {
        AppError::validation(self.details)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.details))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_are_trimmed_or_reported() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.require("username", Some("  ada ")), "ada");
        assert!(errors.is_empty());

        errors.require("email", Some("   "));
        errors.require("password", None);
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details.len(), 2);
        assert!(details.contains_key("email"));
    }

    #[test]
    fn length_limit_counts_characters() {
        let mut errors = FieldErrors::new();
        errors.max_chars("first_name", "éééé", 4);
        assert!(errors.is_empty());
        errors.max_chars("first_name", "ééééé", 4);
        assert!(!errors.is_empty());
    }
}
