use std::collections::BTreeMap;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use validator::ValidationErrors;

use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::infra::uploads::UploadStorageError;

const REPORT_SOURCE: &str = "infra::http::api";
const SERVER_MESSAGE: &str = "Internal server error";

/// The `error` discriminator of a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    Validation,
    Model,
    Authorization,
    RateLimit,
    Database,
    Token,
    Upload,
    Server,
}

#[derive(Debug, Serialize)]
pub struct FailBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    category: ErrorCategory,
    message: String,
    errors: Option<BTreeMap<String, Vec<String>>>,
    retry_after: Option<u64>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(status: StatusCode, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            status,
            category,
            message: message.into(),
            errors: None,
            retry_after: None,
            report: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::Validation,
            message,
        )
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.clone()]);
        Self::validation(message).with_errors(errors)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCategory::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCategory::Model, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCategory::Authorization, message)
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCategory::Token, message)
    }

    pub fn upload(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, ErrorCategory::Upload, message)
    }

    pub fn server(source: &'static str, error: &dyn std::error::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::Server,
            SERVER_MESSAGE,
        )
        .with_report(ErrorReport::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            error,
        ))
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::RateLimit,
            "Too many requests, please try again later",
        );
        err.retry_after = Some(retry_after);
        err
    }

    pub fn with_errors(mut self, errors: BTreeMap<String, Vec<String>>) -> Self {
        self.errors = Some(errors);
        self
    }

    fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, failures) in errors.field_errors() {
            let messages = failures
                .iter()
                .map(|failure| match failure.message.as_ref() {
                    Some(message) => message.to_string(),
                    None => format!("The {field} field is invalid"),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }

        let message = fields
            .values()
            .flat_map(|messages| messages.first())
            .next()
            .cloned()
            .unwrap_or_else(|| "The given data was invalid".to_string());

        Self::validation(message).with_errors(fields)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation { field, message } => Self::field(field, message),
            AppError::BadRequest(message) => Self::bad_request(message),
            AppError::NotFound(message) => Self::not_found(message),
            AppError::Forbidden(message) => Self::forbidden(message),
            AppError::Unauthorized(message) => Self::token(message),
            AppError::Domain(DomainError::InvalidFlag { .. }) => Self::field("is_draft", err.to_string()),
            AppError::Pagination(ref inner) => Self::bad_request(inner.to_string()),
            AppError::Repo(ref repo) => repo_error(repo, &err),
            AppError::Upload(ref upload) => upload_error(upload, &err),
            AppError::Infra(_) | AppError::Unexpected(_) => Self::server(REPORT_SOURCE, &err),
        }
    }
}

fn repo_error(repo: &RepoError, err: &AppError) -> ApiError {
    match repo {
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::Duplicate { .. } => ApiError::validation("The value has already been taken"),
        _ => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::Database,
            SERVER_MESSAGE,
        )
        .with_report(ErrorReport::from_error(
            "infra::http::api::database",
            StatusCode::INTERNAL_SERVER_ERROR,
            err,
        )),
    }
}

fn upload_error(upload: &UploadStorageError, err: &AppError) -> ApiError {
    match upload {
        UploadStorageError::TooLarge { .. } => {
            ApiError::upload(StatusCode::PAYLOAD_TOO_LARGE, upload.to_string())
        }
        UploadStorageError::EmptyPayload | UploadStorageError::UnsupportedType => {
            ApiError::upload(StatusCode::BAD_REQUEST, upload.to_string())
        }
        UploadStorageError::InvalidPath => ApiError::not_found("Image not found"),
        UploadStorageError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            ApiError::not_found("Image not found")
        }
        UploadStorageError::Io(_) => ApiError::server("infra::http::api::uploads", err),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                REPORT_SOURCE,
                self.status,
                format!("{:?}: {}", self.category, self.message),
            )
        });

        let body = FailBody {
            status: "fail",
            message: self.message,
            error: Some(self.category),
            errors: self.errors,
        };
        let mut response = (self.status, Json(body)).into_response();

        if let Some(retry_after) = self.retry_after
            && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        report.attach(&mut response);
        response
    }
}
