use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use databyte_api_types::{ErrorBody, ErrorMessage};

use crate::application::error::ErrorReport;

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
}

/// JSON error response; the public body stays generic while the attached
/// [`ErrorReport`] carries the full diagnostic chain for the logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    report: ErrorReport,
}

impl ApiError {
    pub fn not_found(source: &'static str, message: &'static str, detail: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: codes::NOT_FOUND,
            message,
            report: ErrorReport::from_message(
                source,
                StatusCode::NOT_FOUND,
                format!("{}: {detail}", codes::NOT_FOUND),
            ),
        }
    }

    pub fn store_unavailable(
        source: &'static str,
        message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: codes::STORE_UNAVAILABLE,
            message,
            report: ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
