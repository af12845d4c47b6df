//! Axum route handlers for the Returns API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::returns::pipeline::CompletedRun;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessReturnRequest {
    pub email: String,
}

/// POST /api/v1/returns/process
///
/// Runs extraction → decision → reply for one customer email and returns the case
/// record together with the drafted reply. Any stage failure aborts the run.
pub async fn handle_process_return(
    State(state): State<AppState>,
    Json(request): Json<ProcessReturnRequest>,
) -> Result<Json<CompletedRun>, AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("email cannot be empty".to_string()));
    }

    let run = state.pipeline.run(&request.email).await?;
    Ok(Json(run))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::llm_client::scripted::ScriptedGenerator;
    use crate::returns::pipeline::{PipelineConfig, ReturnsPipeline};
    use crate::routes::build_router;
    use crate::state::AppState;

    fn app_with(generator: &Arc<ScriptedGenerator>) -> Router {
        let pipeline = ReturnsPipeline::new(generator.clone(), PipelineConfig::default()).unwrap();
        build_router(AppState {
            pipeline: Arc::new(pipeline),
        })
    }

    fn process_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/returns/process")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_process_returns_case_and_reply() {
        let generator = Arc::new(ScriptedGenerator::new([
            r##"{"email_name": "Ana Ruiz", "order_number": "#A-100", "purchase_date": "Unknown", "issue_summary": "Wrong model delivered."}"##,
            r#"{"accept_reason": "True", "accept_reason_detail": "Supply error: wrong model delivered."}"#,
            "Dear Ana Ruiz, your return has been accepted.",
        ]));

        let resp = app_with(&generator)
            .oneshot(process_request(serde_json::json!({
                "email": "Hi, you sent me the wrong model for order #A-100. Ana Ruiz"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["case"]["email_name"], "Ana Ruiz");
        assert_eq!(json["case"]["accept_reason"], "True");
        assert_eq!(json["reply"], "Dear Ana Ruiz, your return has been accepted.");
        assert!(json["run_id"].is_string());
    }

    #[tokio::test]
    async fn test_empty_email_is_rejected_without_generation() {
        let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()));

        let resp = app_with(&generator)
            .oneshot(process_request(serde_json::json!({ "email": "   " })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_model_output_reports_stage() {
        let generator = Arc::new(ScriptedGenerator::new([
            "I'm sorry, I can't help with that request.",
        ]));

        let resp = app_with(&generator)
            .oneshot(process_request(serde_json::json!({ "email": "My watch is broken." })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "MODEL_OUTPUT_ERROR");
        assert_eq!(json["error"]["stage"], "extraction");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_health_reports_model() {
        let generator = Arc::new(ScriptedGenerator::new(Vec::<String>::new()));

        let resp = app_with(&generator)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "scripted");
    }
}
