//! Error handling.

use axum::{
    extract::multipart::MultipartError,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Evaluation server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// A required file or form field was absent from the request
    #[error("missing required input {name}")]
    MissingInput { name: &'static str },

    /// The requested variable is absent from one of the datasets
    #[error("variable {variable} not present in {dataset} dataset")]
    UnsupportedVariable {
        variable: String,
        dataset: &'static str,
    },

    /// A required dimension is absent from one or both variables
    #[error("missing required dimensions (simulation: [{}], observation: [{}])",
            .simulation.join(", "), .observation.join(", "))]
    MissingDimensions {
        simulation: Vec<String>,
        observation: Vec<String>,
    },

    /// The selected variable has no resolvable coordinate vector for an axis
    #[error("variable {variable} has no {} coordinates", .missing.join("/"))]
    MissingCoordinates {
        variable: String,
        missing: Vec<&'static str>,
    },

    /// The coordinate intersection along an axis is empty
    #[error("no overlapping {axis} coordinates between simulation and observation")]
    EmptyIntersection { axis: &'static str },

    /// Unknown reduction mode requested
    #[error("unknown reduction mode {mode}")]
    UnknownMode { mode: String },

    /// The metrics form field is not a JSON list of metric names
    #[error("metrics field is not a valid JSON list of metric names")]
    MetricsJson(#[from] serde_json::Error),

    /// Error validating request parameters
    #[error("request data is not valid")]
    ParamsValidation(#[from] validator::ValidationErrors),

    /// Error reading the multipart request body
    #[error("failed to read multipart request body")]
    Multipart(#[from] MultipartError),

    /// Error decoding an uploaded NetCDF payload
    #[error("failed to decode NetCDF payload")]
    Decode(#[from] netcdf::Error),

    /// Error creating ndarray values from a shape
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ShapeError),

    /// Error rendering a plot artifact
    #[error("failed to render plot artifact")]
    Render(#[from] image::ImageError),

    /// Error spooling an uploaded payload to disk
    #[error("failed to spool uploaded payload")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for EvaluationError {
    /// Convert from an `EvaluationError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<EvaluationError> for ErrorResponse {
    /// Convert from an `EvaluationError` into an `ErrorResponse`.
    fn from(error: EvaluationError) -> Self {
        let response = match &error {
            // Bad request
            EvaluationError::MissingInput { .. }
            | EvaluationError::UnsupportedVariable { .. }
            | EvaluationError::MissingDimensions { .. }
            | EvaluationError::MissingCoordinates { .. }
            | EvaluationError::EmptyIntersection { .. }
            | EvaluationError::UnknownMode { .. }
            | EvaluationError::MetricsJson(_)
            | EvaluationError::ParamsValidation(_)
            | EvaluationError::Multipart(_)
            | EvaluationError::Decode(_) => Self::bad_request(&error),

            // Internal server error
            EvaluationError::ShapeInvalid(_)
            | EvaluationError::Render(_)
            | EvaluationError::Io(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
