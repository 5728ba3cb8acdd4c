use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::answer::AnswerSet;
use super::gateway::{
    Assessment, AssessmentResponse, GatewayError, Job, JobId, PersistenceGateway, ResponseId,
};
use super::question::{Question, QuestionError, QuestionId};
use super::visibility::{check_dependencies, DependencyError, DependencyReport};

/// Facade over the persistence gateway shared by the HTTP router and the sessions.
pub struct AssessmentService<G> {
    gateway: Arc<G>,
}

impl<G> AssessmentService<G>
where
    G: PersistenceGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub async fn job(&self, job_id: JobId) -> Result<Option<Job>, AssessmentServiceError> {
        Ok(self.gateway.job(job_id).await?)
    }

    pub async fn assessment(
        &self,
        job_id: JobId,
    ) -> Result<Option<Assessment>, AssessmentServiceError> {
        Ok(self.gateway.assessment(job_id).await?)
    }

    /// Validate and store the whole question list, replacing whatever was saved before.
    ///
    /// Questions arriving without an id are given a fresh one.
    pub async fn save(
        &self,
        job_id: JobId,
        questions: Vec<Question>,
    ) -> Result<Assessment, AssessmentServiceError> {
        let questions: Vec<Question> = questions
            .into_iter()
            .map(|mut question| {
                if question.id.as_str().is_empty() {
                    question.id = QuestionId::generate();
                }
                question
            })
            .collect();

        let report = validate_questions(&questions)?;
        for dangling in &report.dangling {
            warn!(
                %job_id,
                question = %dangling.question,
                depends_on = %dangling.depends_on,
                "conditional rule references an unknown question; it will stay hidden"
            );
        }

        let stored = self.gateway.put_assessment(job_id, questions).await?;
        info!(%job_id, questions = stored.questions.len(), "assessment saved");
        Ok(stored)
    }

    /// Append a response stamped with the current time. Answers are stored as given.
    pub async fn submit(
        &self,
        job_id: JobId,
        answers: AnswerSet,
    ) -> Result<ResponseId, AssessmentServiceError> {
        let answered = answers.len();
        let response_id = self
            .gateway
            .add_response(job_id, answers, Utc::now())
            .await?;
        info!(%job_id, %response_id, answered, "assessment response stored");
        Ok(response_id)
    }

    pub async fn responses(
        &self,
        job_id: JobId,
    ) -> Result<Vec<AssessmentResponse>, AssessmentServiceError> {
        Ok(self.gateway.responses(job_id).await?)
    }
}

/// Save-time checks: per-question invariants, unique ids, and an acyclic dependency graph.
///
/// Dangling references pass and are returned in the report.
pub fn validate_questions(
    questions: &[Question],
) -> Result<DependencyReport, AssessmentValidationError> {
    let mut seen = HashSet::new();
    for question in questions {
        question.validate()?;
        if !seen.insert(&question.id) {
            return Err(AssessmentValidationError::DuplicateId {
                id: question.id.clone(),
            });
        }
    }

    let report = check_dependencies(questions);
    if let Some(error) = report.errors.first() {
        return Err(error.clone().into());
    }
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssessmentValidationError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("question id {id} is used more than once")]
    DuplicateId { id: QuestionId },
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Validation(#[from] AssessmentValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
