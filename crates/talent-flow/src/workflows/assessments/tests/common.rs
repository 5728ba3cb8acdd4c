use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::assessments::{
    AnswerSet, Assessment, AssessmentId, AssessmentResponse, AssessmentService, Condition,
    ConditionalRule, GatewayError, Job, JobId, JobStatus, Notification, NotificationSink,
    NotifyError, PersistenceGateway, Question, QuestionKind, ResponseId,
};

pub(super) const JOB: JobId = JobId(7);

pub(super) fn job() -> Job {
    Job {
        id: JOB,
        title: "Backend Engineer".to_string(),
        slug: "backend-engineer".to_string(),
        status: JobStatus::Active,
        tags: vec!["rust".to_string(), "remote".to_string()],
        order: 1,
    }
}

/// Q1 single-choice Remote/Onsite, Q2 short-text shown only for Remote.
pub(super) fn remote_follow_up() -> Vec<Question> {
    let work_mode = Question::new(
        "q1",
        "Preferred work mode",
        QuestionKind::SingleChoice {
            options: vec!["Remote".to_string(), "Onsite".to_string()],
        },
    )
    .expect("valid question")
    .required(true);

    let timezone = Question::new("q2", "Which timezone do you work in?", QuestionKind::ShortText)
        .expect("valid question")
        .with_max_length(40)
        .expect("valid max length")
        .with_conditional(ConditionalRule::new("q1", Condition::Equals, "Remote"));

    vec![work_mode, timezone]
}

pub(super) fn experience_question() -> Question {
    Question::new(
        "years",
        "Years of experience",
        QuestionKind::Numeric {
            min: Some(1.0),
            max: Some(10.0),
            step: Some(1.0),
        },
    )
    .expect("valid question")
}

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    assessments: HashMap<JobId, Assessment>,
    responses: Vec<AssessmentResponse>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryGateway {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryGateway {
    pub(super) fn with_job(job: Job) -> Self {
        let gateway = Self::default();
        gateway
            .tables
            .lock()
            .expect("gateway mutex poisoned")
            .jobs
            .insert(job.id, job);
        gateway
    }

    pub(super) fn stored_assessment(&self, job_id: JobId) -> Option<Assessment> {
        let tables = self.tables.lock().expect("gateway mutex poisoned");
        tables.assessments.get(&job_id).cloned()
    }

    pub(super) fn stored_responses(&self) -> Vec<AssessmentResponse> {
        self.tables
            .lock()
            .expect("gateway mutex poisoned")
            .responses
            .clone()
    }
}

impl PersistenceGateway for MemoryGateway {
    async fn job(&self, job_id: JobId) -> Result<Option<Job>, GatewayError> {
        let tables = self.tables.lock().expect("gateway mutex poisoned");
        Ok(tables.jobs.get(&job_id).cloned())
    }

    async fn assessment(&self, job_id: JobId) -> Result<Option<Assessment>, GatewayError> {
        let tables = self.tables.lock().expect("gateway mutex poisoned");
        Ok(tables.assessments.get(&job_id).cloned())
    }

    async fn put_assessment(
        &self,
        job_id: JobId,
        questions: Vec<Question>,
    ) -> Result<Assessment, GatewayError> {
        let mut tables = self.tables.lock().expect("gateway mutex poisoned");
        let id = tables
            .assessments
            .get(&job_id)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(AssessmentId::generate);
        let assessment = Assessment {
            id,
            job_id,
            questions,
        };
        tables.assessments.insert(job_id, assessment.clone());
        Ok(assessment)
    }

    async fn add_response(
        &self,
        job_id: JobId,
        answers: AnswerSet,
        submitted_at: DateTime<Utc>,
    ) -> Result<ResponseId, GatewayError> {
        let id = ResponseId::generate();
        self.tables
            .lock()
            .expect("gateway mutex poisoned")
            .responses
            .push(AssessmentResponse {
                id: id.clone(),
                job_id,
                answers,
                submitted_at,
            });
        Ok(id)
    }

    async fn responses(&self, job_id: JobId) -> Result<Vec<AssessmentResponse>, GatewayError> {
        let tables = self.tables.lock().expect("gateway mutex poisoned");
        Ok(tables
            .responses
            .iter()
            .filter(|response| response.job_id == job_id)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableGateway;

impl PersistenceGateway for UnavailableGateway {
    async fn job(&self, _job_id: JobId) -> Result<Option<Job>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn assessment(&self, _job_id: JobId) -> Result<Option<Assessment>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn put_assessment(
        &self,
        _job_id: JobId,
        _questions: Vec<Question>,
    ) -> Result<Assessment, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn add_response(
        &self,
        _job_id: JobId,
        _answers: AnswerSet,
        _submitted_at: DateTime<Utc>,
    ) -> Result<ResponseId, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    async fn responses(&self, _job_id: JobId) -> Result<Vec<AssessmentResponse>, GatewayError> {
        Err(GatewayError::Unavailable("database offline".to_string()))
    }
}

/// Reads succeed; writes fail. Lets a take session load and then fail to submit.
pub(super) struct ReadOnlyGateway {
    pub(super) inner: MemoryGateway,
}

impl PersistenceGateway for ReadOnlyGateway {
    async fn job(&self, job_id: JobId) -> Result<Option<Job>, GatewayError> {
        self.inner.job(job_id).await
    }

    async fn assessment(&self, job_id: JobId) -> Result<Option<Assessment>, GatewayError> {
        self.inner.assessment(job_id).await
    }

    async fn put_assessment(
        &self,
        _job_id: JobId,
        _questions: Vec<Question>,
    ) -> Result<Assessment, GatewayError> {
        Err(GatewayError::Unavailable("read only".to_string()))
    }

    async fn add_response(
        &self,
        _job_id: JobId,
        _answers: AnswerSet,
        _submitted_at: DateTime<Utc>,
    ) -> Result<ResponseId, GatewayError> {
        Err(GatewayError::Unavailable("read only".to_string()))
    }

    async fn responses(&self, job_id: JobId) -> Result<Vec<AssessmentResponse>, GatewayError> {
        self.inner.responses(job_id).await
    }
}

/// Holds writes until `release` is notified, signalling `entered` when one arrives.
pub(super) struct BlockingGateway {
    pub(super) inner: MemoryGateway,
    pub(super) entered: Arc<Notify>,
    pub(super) release: Arc<Notify>,
}

impl BlockingGateway {
    pub(super) fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

impl PersistenceGateway for BlockingGateway {
    async fn job(&self, job_id: JobId) -> Result<Option<Job>, GatewayError> {
        self.inner.job(job_id).await
    }

    async fn assessment(&self, job_id: JobId) -> Result<Option<Assessment>, GatewayError> {
        self.inner.assessment(job_id).await
    }

    async fn put_assessment(
        &self,
        job_id: JobId,
        questions: Vec<Question>,
    ) -> Result<Assessment, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.put_assessment(job_id, questions).await
    }

    async fn add_response(
        &self,
        job_id: JobId,
        answers: AnswerSet,
        submitted_at: DateTime<Utc>,
    ) -> Result<ResponseId, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.add_response(job_id, answers, submitted_at).await
    }

    async fn responses(&self, job_id: JobId) -> Result<Vec<AssessmentResponse>, GatewayError> {
        self.inner.responses(job_id).await
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn titles(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .iter()
            .map(|notification| notification.title.clone())
            .collect()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct ClosedNotifications;

impl NotificationSink for ClosedNotifications {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("toast area unmounted".to_string()))
    }
}

pub(super) fn build_service() -> (Arc<AssessmentService<MemoryGateway>>, MemoryGateway) {
    let gateway = MemoryGateway::with_job(job());
    let service = Arc::new(AssessmentService::new(Arc::new(gateway.clone())));
    (service, gateway)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
