use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::returns::pipeline::{PipelineError, StageError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Pipeline(e) => {
                tracing::error!("Pipeline error: {e}");
                let (status, code) = match &e.source {
                    // The model answered, but not in a usable shape.
                    StageError::Parse(_) => (StatusCode::BAD_GATEWAY, "MODEL_OUTPUT_ERROR"),
                    StageError::Generation(_) => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
                    StageError::Template(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "TEMPLATE_ERROR")
                    }
                };
                (status, code, e.source.to_string(), Some(e.stage.as_str()))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(stage) = stage {
            error["stage"] = json!(stage);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
