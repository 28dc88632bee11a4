//! JSON envelope shared by every API route: `{ success, data?, message? }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Successful response with the given status code.
pub fn respond<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

/// Failed response carrying only a message.
pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        message: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

/// Malformed JSON bodies are reported through the envelope as `400 Bad Request`.
pub fn rejection(rejection: JsonRejection) -> Response {
    failure(
        StatusCode::BAD_REQUEST,
        format!("invalid request body: {}", rejection.body_text()),
    )
}
