//! Build and take sessions: the owners of an in-progress question list or answer set.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::answer::{AnswerSet, AnswerValue};
use super::editor::{EditError, EditorEvent, EditorForm, QuestionEdit, QuestionEditor};
use super::gateway::{Assessment, Job, JobId, PersistenceGateway, ResponseId};
use super::notify::{Notification, NotificationSink};
use super::question::{Question, QuestionError, QuestionId, QuestionType};
use super::render::{
    render_form, InputError, InputEvent, InputOutcome, QuestionRenderer, RenderMode,
    RenderedQuestion,
};
use super::service::{AssessmentService, AssessmentServiceError};
use super::visibility::is_visible;

fn publish<N: NotificationSink>(notifier: &N, notification: Notification) {
    let title = notification.title.clone();
    if let Err(error) = notifier.notify(notification) {
        warn!(%error, %title, "notification was not delivered");
    }
}

/// Authoring session for one job's assessment.
///
/// Edits are applied in memory and only reach the gateway on an explicit [`save`].
///
/// [`save`]: BuildSession::save
pub struct BuildSession<G, N> {
    service: Arc<AssessmentService<G>>,
    notifier: Arc<N>,
    job_id: JobId,
    job: Option<Job>,
    questions: Vec<Question>,
    saving: AtomicBool,
}

impl<G, N> BuildSession<G, N>
where
    G: PersistenceGateway + 'static,
    N: NotificationSink + 'static,
{
    /// Loads job context and any saved assessment in parallel. A job without an
    /// assessment starts with an empty list.
    pub async fn open(
        service: Arc<AssessmentService<G>>,
        notifier: Arc<N>,
        job_id: JobId,
    ) -> Result<Self, SessionError> {
        let (job, assessment) = tokio::join!(service.job(job_id), service.assessment(job_id));
        let job = job?;
        let questions = assessment?
            .map(|assessment| assessment.questions)
            .unwrap_or_default();
        debug!(%job_id, questions = questions.len(), "build session opened");

        Ok(Self {
            service,
            notifier,
            job_id,
            job,
            questions,
            saving: AtomicBool::new(false),
        })
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Appends a question of `question_type` with its default fields.
    pub fn add_question(&mut self, question_type: QuestionType) -> &Question {
        let index = self.questions.len();
        self.questions.push(question_type.default_question());
        &self.questions[index]
    }

    /// Replaces the question with the same id. The variant may not change.
    pub fn replace_question(&mut self, question: Question) -> Result<(), SessionError> {
        question.validate()?;
        let slot = self
            .questions
            .iter_mut()
            .find(|existing| existing.id == question.id)
            .ok_or_else(|| SessionError::UnknownQuestion(question.id.clone()))?;

        if slot.question_type() != question.question_type() {
            return Err(SessionError::TypeChanged {
                id: question.id.clone(),
                from: slot.question_type(),
                to: question.question_type(),
            });
        }

        *slot = question;
        Ok(())
    }

    pub fn remove_question(&mut self, id: &QuestionId) -> Result<Question, SessionError> {
        let index = self
            .questions
            .iter()
            .position(|question| &question.id == id)
            .ok_or_else(|| SessionError::UnknownQuestion(id.clone()))?;
        Ok(self.questions.remove(index))
    }

    pub fn apply_editor_event(&mut self, event: EditorEvent) -> Result<(), SessionError> {
        match event {
            EditorEvent::Updated(question) => self.replace_question(question),
            EditorEvent::Deleted(id) => self.remove_question(&id).map(|_| ()),
        }
    }

    /// Runs `edit` through the question's editor and applies what it emits.
    pub fn edit_question(
        &mut self,
        id: &QuestionId,
        edit: QuestionEdit,
    ) -> Result<(), SessionError> {
        let mut events = Vec::new();
        {
            let question = self
                .questions
                .iter()
                .find(|question| &question.id == id)
                .ok_or_else(|| SessionError::UnknownQuestion(id.clone()))?;
            QuestionEditor::new(question, |event| events.push(event)).edit(edit)?;
        }

        for event in events {
            self.apply_editor_event(event)?;
        }
        Ok(())
    }

    /// Editor cards for every question, in list order.
    pub fn forms(&self) -> Vec<EditorForm> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| EditorForm::describe(question, index + 1))
            .collect()
    }

    /// Read-only rendering of the draft against sample answers.
    pub fn preview(&self, answers: &AnswerSet) -> Vec<RenderedQuestion> {
        render_form(&self.questions, answers, RenderMode::Preview)
    }

    /// Persists the whole list. Only one save may be outstanding.
    pub async fn save(&self) -> Result<Assessment, SessionError> {
        if self.saving.swap(true, Ordering::AcqRel) {
            return Err(SessionError::SaveInFlight);
        }

        let result = self
            .service
            .save(self.job_id, self.questions.clone())
            .await;
        self.saving.store(false, Ordering::Release);

        match result {
            Ok(assessment) => {
                publish(self.notifier.as_ref(), Notification::assessment_saved());
                Ok(assessment)
            }
            Err(error) => {
                warn!(job_id = %self.job_id, %error, "assessment save failed");
                publish(
                    self.notifier.as_ref(),
                    Notification::assessment_save_failed(error.to_string()),
                );
                Err(error.into())
            }
        }
    }
}

/// Take-mode lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakePhase {
    Loading,
    Ready,
    Submitting,
    Submitted,
    /// Behaves like `Ready`; the next edit returns to it.
    SubmitFailed,
}

impl TakePhase {
    pub const fn label(self) -> &'static str {
        match self {
            TakePhase::Loading => "loading",
            TakePhase::Ready => "ready",
            TakePhase::Submitting => "submitting",
            TakePhase::Submitted => "submitted",
            TakePhase::SubmitFailed => "submit-failed",
        }
    }

    pub const fn accepts_answers(self) -> bool {
        matches!(self, TakePhase::Ready | TakePhase::SubmitFailed)
    }
}

impl fmt::Display for TakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct TakeState {
    phase: TakePhase,
    job: Option<Job>,
    questions: Vec<Question>,
    answers: AnswerSet,
    submission: Option<ResponseId>,
}

impl TakeState {
    fn question(&self, id: &QuestionId) -> Result<&Question, SessionError> {
        self.questions
            .iter()
            .find(|question| &question.id == id)
            .ok_or_else(|| SessionError::UnknownQuestion(id.clone()))
    }

    fn ensure_accepts_answers(&self) -> Result<(), SessionError> {
        if self.phase.accepts_answers() {
            Ok(())
        } else {
            Err(SessionError::NotAcceptingAnswers { phase: self.phase })
        }
    }

    fn ensure_loading(&self) -> Result<(), SessionError> {
        match self.phase {
            TakePhase::Loading => Ok(()),
            phase => Err(SessionError::AlreadyLoaded { phase }),
        }
    }

    fn store_answers(&mut self, answers: AnswerSet) {
        self.answers = answers;
        if self.phase == TakePhase::SubmitFailed {
            self.phase = TakePhase::Ready;
        }
    }
}

/// Respondent session for one job's assessment.
///
/// State sits behind a mutex so the session can be shared; the lock is never held
/// across the gateway call.
pub struct TakeSession<G, N> {
    service: Arc<AssessmentService<G>>,
    notifier: Arc<N>,
    job_id: JobId,
    state: Mutex<TakeState>,
}

impl<G, N> TakeSession<G, N>
where
    G: PersistenceGateway + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(service: Arc<AssessmentService<G>>, notifier: Arc<N>, job_id: JobId) -> Self {
        Self {
            service,
            notifier,
            job_id,
            state: Mutex::new(TakeState {
                phase: TakePhase::Loading,
                job: None,
                questions: Vec::new(),
                answers: AnswerSet::new(),
                submission: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches job context and the assessment, then moves to `Ready`. A missing
    /// assessment leaves the session unconfigured rather than failing.
    ///
    /// Only a session still in `Loading` can be loaded.
    pub async fn load(&self) -> Result<(), SessionError> {
        self.state().ensure_loading()?;
        let (job, assessment) = tokio::join!(
            self.service.job(self.job_id),
            self.service.assessment(self.job_id)
        );
        let job = job?;
        let assessment = assessment?;

        let mut state = self.state();
        state.ensure_loading()?;
        state.job = job;
        state.questions = assessment
            .map(|assessment| assessment.questions)
            .unwrap_or_default();
        state.phase = TakePhase::Ready;
        debug!(job_id = %self.job_id, questions = state.questions.len(), "take session ready");
        Ok(())
    }

    pub fn phase(&self) -> TakePhase {
        self.state().phase
    }

    pub fn job(&self) -> Option<Job> {
        self.state().job.clone()
    }

    pub fn questions(&self) -> Vec<Question> {
        self.state().questions.clone()
    }

    pub fn answers(&self) -> AnswerSet {
        self.state().answers.clone()
    }

    pub fn submission(&self) -> Option<ResponseId> {
        self.state().submission.clone()
    }

    /// Loaded, but the job has no questions to answer.
    pub fn is_configured(&self) -> bool {
        !self.state().questions.is_empty()
    }

    /// Visible questions with live widgets while answers are accepted, read-only otherwise.
    pub fn render(&self) -> Vec<RenderedQuestion> {
        let state = self.state();
        let mode = if state.phase.accepts_answers() {
            RenderMode::Live
        } else {
            RenderMode::Preview
        };
        render_form(&state.questions, &state.answers, mode)
    }

    /// Routes widget input for `id` through its renderer.
    pub fn input(&self, id: &QuestionId, event: InputEvent) -> Result<(), SessionError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.ensure_accepts_answers()?;

        let mut updated: Option<AnswerSet> = None;
        let outcome = {
            let question = state.question(id)?;
            let mut on_change = |_: &QuestionId, answers: AnswerSet| updated = Some(answers);
            let mut renderer =
                QuestionRenderer::interactive(question, &state.answers, &mut on_change);
            renderer.dispatch(event)?
        };

        match (outcome, updated) {
            (InputOutcome::Applied, Some(answers)) => {
                state.store_answers(answers);
                Ok(())
            }
            _ => Err(SessionError::Hidden(id.clone())),
        }
    }

    /// Stores `value` for `id` as-is. Range and length limits stay advisory.
    pub fn record_answer(&self, id: &QuestionId, value: AnswerValue) -> Result<(), SessionError> {
        let mut state = self.state();
        state.ensure_accepts_answers()?;

        let question = state.question(id)?;
        if !is_visible(question, &state.answers) {
            return Err(SessionError::Hidden(id.clone()));
        }

        let answers = state.answers.with_answer(id.clone(), value);
        state.store_answers(answers);
        Ok(())
    }

    /// Hands the current answers to the gateway. A second call while one is in flight is
    /// rejected without touching storage.
    pub async fn submit(&self) -> Result<ResponseId, SessionError> {
        let answers = {
            let mut state = self.state();
            match state.phase {
                TakePhase::Submitting => return Err(SessionError::SubmitInFlight),
                TakePhase::Submitted => return Err(SessionError::AlreadySubmitted),
                TakePhase::Loading => return Err(SessionError::NotLoaded),
                TakePhase::Ready | TakePhase::SubmitFailed => {}
            }
            if state.questions.is_empty() {
                return Err(SessionError::NotConfigured(self.job_id));
            }
            state.phase = TakePhase::Submitting;
            state.answers.clone()
        };
        debug!(job_id = %self.job_id, "submitting assessment");

        let result = self.service.submit(self.job_id, answers).await;

        match result {
            Ok(response_id) => {
                {
                    let mut state = self.state();
                    state.phase = TakePhase::Submitted;
                    state.submission = Some(response_id.clone());
                }
                info!(job_id = %self.job_id, %response_id, "assessment submitted");
                publish(self.notifier.as_ref(), Notification::assessment_submitted());
                Ok(response_id)
            }
            Err(error) => {
                self.state().phase = TakePhase::SubmitFailed;
                warn!(job_id = %self.job_id, %error, "assessment submission failed");
                publish(
                    self.notifier.as_ref(),
                    Notification::submission_failed(error.to_string()),
                );
                Err(error.into())
            }
        }
    }
}

/// Error raised by build and take sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("assessment has not been loaded yet")]
    NotLoaded,
    #[error("assessment is already loaded ({phase})")]
    AlreadyLoaded { phase: TakePhase },
    #[error("no assessment is configured for job {0}")]
    NotConfigured(JobId),
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("assessment was already submitted")]
    AlreadySubmitted,
    #[error("a save is already in flight")]
    SaveInFlight,
    #[error("answers are not accepted while {phase}")]
    NotAcceptingAnswers { phase: TakePhase },
    #[error("question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),
    #[error("question {0} is hidden by its conditional rule")]
    Hidden(QuestionId),
    #[error("question {id} cannot change from {from} to {to}")]
    TypeChanged {
        id: QuestionId,
        from: QuestionType,
        to: QuestionType,
    },
    #[error(transparent)]
    Invalid(#[from] QuestionError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Service(#[from] AssessmentServiceError),
}
