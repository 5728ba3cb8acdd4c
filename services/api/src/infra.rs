use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use talent_flow::config::StorageConfig;
use talent_flow::error::AppError;
use talent_flow::workflows::assessments::{
    AnswerSet, Assessment, AssessmentId, AssessmentResponse, GatewayError, Job, JobId, JobStatus,
    Notification, NotificationLevel, NotificationSink, NotifyError, PersistenceGateway, Question,
    QuestionId, QuestionKind, ResponseId,
};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the local store keeps; also the on-disk snapshot format.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    jobs: Vec<Job>,
    #[serde(default)]
    assessments: Vec<Assessment>,
    #[serde(default)]
    responses: Vec<AssessmentResponse>,
}

/// Single-process store backing the service and the CLI commands.
///
/// Writes are serialized and applied to a draft copy; the tables only change once the
/// snapshot for that draft is on disk.
#[derive(Clone)]
pub(crate) struct LocalStore {
    tables: Arc<Mutex<Tables>>,
    writes: Arc<tokio::sync::Mutex<()>>,
    snapshot_path: Option<PathBuf>,
}

impl LocalStore {
    /// Loads the snapshot when one exists and seeds demo data into an empty store.
    pub(crate) fn open(config: &StorageConfig) -> Result<Self, AppError> {
        let mut tables = match &config.snapshot_path {
            Some(path) if path.exists() => {
                let raw = fs::read(path)?;
                let tables: Tables = serde_json::from_slice(&raw)?;
                info!(
                    path = %path.display(),
                    jobs = tables.jobs.len(),
                    assessments = tables.assessments.len(),
                    responses = tables.responses.len(),
                    "local store snapshot loaded"
                );
                tables
            }
            _ => Tables::default(),
        };

        if config.seed_jobs && tables.jobs.is_empty() {
            tables.jobs = seed_jobs();
            if tables.assessments.is_empty() {
                tables.assessments.push(seed_assessment(JobId(1)));
            }
            debug!(jobs = tables.jobs.len(), "seeded demo jobs");
        }

        if let Some(path) = &config.snapshot_path {
            fs::write(path, encode_snapshot(&tables)?)?;
        }

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            writes: Arc::new(tokio::sync::Mutex::new(())),
            snapshot_path: config.snapshot_path.clone(),
        })
    }

    /// Seeded store with no snapshot file.
    pub(crate) fn in_memory() -> Result<Self, AppError> {
        Self::open(&StorageConfig {
            snapshot_path: None,
            seed_jobs: true,
        })
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, tables: &Tables) -> Result<(), GatewayError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let bytes = encode_snapshot(tables)?;
        tokio::fs::write(path, bytes).await.map_err(|err| {
            let path = path.display();
            GatewayError::Unavailable(format!("snapshot write to {path} failed: {err}"))
        })
    }

    /// Applies `change` to a copy of the tables, persists the copy, then swaps it in.
    /// A failed change or write leaves the tables untouched.
    async fn commit<T, F>(&self, change: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&mut Tables) -> Result<T, GatewayError> + Send,
        T: Send,
    {
        let _writer = self.writes.lock().await;
        let mut draft = self.tables().clone();
        let outcome = change(&mut draft)?;
        self.persist(&draft).await?;
        *self.tables() = draft;
        Ok(outcome)
    }

    pub(crate) fn jobs(&self) -> Vec<Job> {
        let mut jobs = self.tables().jobs.clone();
        jobs.sort_by_key(|job| job.order);
        jobs
    }
}

impl PersistenceGateway for LocalStore {
    async fn job(&self, job_id: JobId) -> Result<Option<Job>, GatewayError> {
        let tables = self.tables();
        Ok(tables.jobs.iter().find(|job| job.id == job_id).cloned())
    }

    async fn assessment(&self, job_id: JobId) -> Result<Option<Assessment>, GatewayError> {
        let tables = self.tables();
        Ok(tables
            .assessments
            .iter()
            .find(|assessment| assessment.job_id == job_id)
            .cloned())
    }

    async fn put_assessment(
        &self,
        job_id: JobId,
        questions: Vec<Question>,
    ) -> Result<Assessment, GatewayError> {
        self.commit(move |tables| {
            if !tables.jobs.iter().any(|job| job.id == job_id) {
                return Err(GatewayError::NotFound(job_id));
            }

            let existing = tables
                .assessments
                .iter()
                .position(|assessment| assessment.job_id == job_id);
            let stored = match existing {
                Some(index) => {
                    tables.assessments[index].questions = questions;
                    tables.assessments[index].clone()
                }
                None => {
                    let assessment = Assessment {
                        id: AssessmentId::generate(),
                        job_id,
                        questions,
                    };
                    tables.assessments.push(assessment.clone());
                    assessment
                }
            };
            Ok(stored)
        })
        .await
    }

    async fn add_response(
        &self,
        job_id: JobId,
        answers: AnswerSet,
        submitted_at: DateTime<Utc>,
    ) -> Result<ResponseId, GatewayError> {
        self.commit(move |tables| {
            if !tables.jobs.iter().any(|job| job.id == job_id) {
                return Err(GatewayError::NotFound(job_id));
            }

            let id = ResponseId::generate();
            tables.responses.push(AssessmentResponse {
                id: id.clone(),
                job_id,
                answers,
                submitted_at,
            });
            Ok(id)
        })
        .await
    }

    async fn responses(&self, job_id: JobId) -> Result<Vec<AssessmentResponse>, GatewayError> {
        let tables = self.tables();
        Ok(tables
            .responses
            .iter()
            .filter(|response| response.job_id == job_id)
            .cloned()
            .collect())
    }
}

fn encode_snapshot(tables: &Tables) -> Result<Vec<u8>, GatewayError> {
    serde_json::to_vec_pretty(tables)
        .map_err(|err| GatewayError::Unavailable(format!("snapshot encoding failed: {err}")))
}

/// Notification channel that writes to the service log.
#[derive(Default, Clone)]
pub(crate) struct LogNotifier {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl LogNotifier {
    pub(crate) fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        match notification.level {
            NotificationLevel::Success => {
                info!(title = %notification.title, message = %notification.message, "notification")
            }
            NotificationLevel::Error => {
                warn!(title = %notification.title, message = %notification.message, "notification")
            }
        }
        self.delivered
            .lock()
            .map_err(|_| NotifyError::Unavailable("notification log poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

const SEED_JOBS: [(&str, JobStatus, &[&str]); 6] = [
    ("Senior Frontend Engineer", JobStatus::Active, &["Full-time", "Engineering"]),
    ("Backend Engineer", JobStatus::Active, &["Full-time", "Remote", "Engineering"]),
    ("Product Designer", JobStatus::Active, &["Contract", "Remote"]),
    ("DevOps Engineer", JobStatus::Active, &["Full-time", "Engineering"]),
    ("Growth Marketing Manager", JobStatus::Archived, &["Marketing"]),
    ("QA Analyst", JobStatus::Archived, &["Contract"]),
];

fn seed_jobs() -> Vec<Job> {
    SEED_JOBS
        .iter()
        .zip(1u64..)
        .map(|((title, status, tags), id)| Job {
            id: JobId(id),
            title: title.to_string(),
            slug: slugify(title),
            status: *status,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            order: (id - 1) as u32,
        })
        .collect()
}

pub(crate) fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn seed_question(prompt: &str, kind: QuestionKind) -> Question {
    Question {
        id: QuestionId::generate(),
        prompt: prompt.to_string(),
        required: false,
        max_length: None,
        conditional: None,
        kind,
    }
}

fn seed_assessment(job_id: JobId) -> Assessment {
    let strings = |values: &[&str]| -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    };

    let mut title = seed_question("What is your current job title?", QuestionKind::ShortText);
    title.required = true;
    title.max_length = Some(100);

    let mut project = seed_question(
        "Tell us about a challenging project you worked on and how you overcame the obstacles.",
        QuestionKind::LongText,
    );
    project.required = true;
    project.max_length = Some(1000);

    Assessment {
        id: AssessmentId::generate(),
        job_id,
        questions: vec![
            seed_question(
                "What is your preferred work environment?",
                QuestionKind::SingleChoice {
                    options: strings(&["Remote", "Hybrid", "On-site", "Flexible"]),
                },
            ),
            seed_question(
                "Which technologies are you familiar with? (Select all that apply)",
                QuestionKind::MultiChoice {
                    options: strings(&["React", "Node.js", "Python", "TypeScript", "Rust"]),
                },
            ),
            title,
            project,
            seed_question(
                "Rate your proficiency in the main technology stack (1-10)",
                QuestionKind::Numeric {
                    min: Some(1.0),
                    max: Some(10.0),
                    step: Some(1.0),
                },
            ),
            seed_question(
                "Please upload your resume",
                QuestionKind::FileUpload {
                    accepted_types: strings(&[".pdf", ".doc", ".docx"]),
                    max_size: Some(5.0),
                },
            ),
        ],
    }
}
