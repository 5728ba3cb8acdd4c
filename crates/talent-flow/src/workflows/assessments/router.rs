use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::answer::AnswerSet;
use super::gateway::{GatewayError, JobId, PersistenceGateway, ResponseId};
use super::question::Question;
use super::service::{AssessmentService, AssessmentServiceError};

/// Body of `PUT /assessments/:job_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAssessmentRequest {
    pub questions: Vec<Question>,
}

/// Body of `POST /assessments/:job_id/submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitAssessmentRequest {
    #[serde(default)]
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub message: String,
    pub submission_id: ResponseId,
}

/// Router exposing job lookup, assessment load/save, and response submission.
pub fn assessment_router<G>(service: Arc<AssessmentService<G>>) -> Router
where
    G: PersistenceGateway + 'static,
{
    Router::new()
        .route("/jobs/:job_id", get(job_handler::<G>))
        .route(
            "/assessments/:job_id",
            get(assessment_handler::<G>).put(save_handler::<G>),
        )
        .route("/assessments/:job_id/submit", post(submit_handler::<G>))
        .route("/assessments/:job_id/responses", get(responses_handler::<G>))
        .with_state(service)
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "message": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn job_handler<G>(
    State(service): State<Arc<AssessmentService<G>>>,
    Path(job_id): Path<u64>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.job(JobId(job_id)).await {
        Ok(Some(job)) => (StatusCode::OK, axum::Json(job)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(other) => {
            error!(job_id, error = %other, "job lookup failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching job")
        }
    }
}

pub(crate) async fn assessment_handler<G>(
    State(service): State<Arc<AssessmentService<G>>>,
    Path(job_id): Path<u64>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.assessment(JobId(job_id)).await {
        Ok(Some(assessment)) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(other) => {
            error!(job_id, error = %other, "assessment lookup failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching assessment")
        }
    }
}

pub(crate) async fn save_handler<G>(
    State(service): State<Arc<AssessmentService<G>>>,
    Path(job_id): Path<u64>,
    axum::Json(request): axum::Json<SaveAssessmentRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.save(JobId(job_id), request.questions).await {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(AssessmentServiceError::Validation(error)) => {
            message(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(AssessmentServiceError::Gateway(error @ GatewayError::NotFound(_))) => {
            message(StatusCode::NOT_FOUND, error.to_string())
        }
        Err(other) => {
            error!(job_id, error = %other, "assessment save failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error saving assessment")
        }
    }
}

pub(crate) async fn submit_handler<G>(
    State(service): State<Arc<AssessmentService<G>>>,
    Path(job_id): Path<u64>,
    axum::Json(request): axum::Json<SubmitAssessmentRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.submit(JobId(job_id), request.answers).await {
        Ok(submission_id) => {
            let receipt = SubmissionReceipt {
                message: "Assessment submitted successfully".to_string(),
                submission_id,
            };
            (StatusCode::OK, axum::Json(receipt)).into_response()
        }
        Err(AssessmentServiceError::Gateway(error @ GatewayError::NotFound(_))) => {
            message(StatusCode::NOT_FOUND, error.to_string())
        }
        Err(other) => {
            error!(job_id, error = %other, "assessment submission failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error submitting assessment")
        }
    }
}

pub(crate) async fn responses_handler<G>(
    State(service): State<Arc<AssessmentService<G>>>,
    Path(job_id): Path<u64>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.responses(JobId(job_id)).await {
        Ok(responses) => (StatusCode::OK, axum::Json(responses)).into_response(),
        Err(other) => {
            error!(job_id, error = %other, "response lookup failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching responses")
        }
    }
}
