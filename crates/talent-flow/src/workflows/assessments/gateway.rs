use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::AnswerSet;
use super::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub String);

impl AssessmentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub String);

impl ResponseId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Archived,
}

/// Job posting; read-only display context for build and take pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub slug: String,
    pub status: JobStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub order: u32,
}

/// The question list configured for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: AssessmentId,
    pub job_id: JobId,
    pub questions: Vec<Question>,
}

/// One stored submission. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub id: ResponseId,
    pub job_id: JobId,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
}

/// Durable storage for jobs, assessments and responses.
///
/// Lookups that find nothing return `Ok(None)`; `GatewayError::NotFound` is reserved for
/// writes that reference a job the store does not know.
pub trait PersistenceGateway: Send + Sync {
    fn job(&self, job_id: JobId) -> impl Future<Output = Result<Option<Job>, GatewayError>> + Send;

    fn assessment(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<Option<Assessment>, GatewayError>> + Send;

    /// Full overwrite of the job's question list; creates the assessment on first save.
    fn put_assessment(
        &self,
        job_id: JobId,
        questions: Vec<Question>,
    ) -> impl Future<Output = Result<Assessment, GatewayError>> + Send;

    fn add_response(
        &self,
        job_id: JobId,
        answers: AnswerSet,
        submitted_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ResponseId, GatewayError>> + Send;

    fn responses(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<Vec<AssessmentResponse>, GatewayError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}
