use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessBody<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A `{"status": "success", ...}` response carrying either a message or data.
#[derive(Debug)]
pub struct Success<T> {
    status: StatusCode,
    body: SuccessBody<T>,
}

impl<T> Success<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: SuccessBody {
                status: "success",
                message: None,
                data: Some(data),
            },
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::data(data)
        }
    }
}

impl Success<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: SuccessBody {
                status: "success",
                message: Some(message.into()),
                data: None,
            },
        }
    }

    pub fn created_message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::message(message)
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
