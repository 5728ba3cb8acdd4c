//! Job assessments: the question schema, conditional visibility, builder and respondent
//! rendering, and the sessions that load, save and submit them.
//!
//! The same question list drives both the editor cards of the builder and the widgets a
//! candidate fills in; visibility is recomputed from the explicit answer set on every call.

pub mod answer;
pub mod editor;
pub mod gateway;
pub mod notify;
pub mod question;
pub mod render;
pub mod router;
pub mod service;
pub mod session;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use answer::{AnswerSet, AnswerValue, FileReference};
pub use editor::{apply_edit, EditError, EditorEvent, EditorForm, QuestionEdit, QuestionEditor};
pub use gateway::{
    Assessment, AssessmentId, AssessmentResponse, GatewayError, Job, JobId, JobStatus,
    PersistenceGateway, ResponseId,
};
pub use notify::{Notification, NotificationLevel, NotificationSink, NotifyError};
pub use question::{
    Condition, ConditionalRule, Question, QuestionError, QuestionId, QuestionKind, QuestionType,
};
pub use render::{
    render_form, InputError, InputEvent, InputOutcome, QuestionRenderer, RenderMode,
    RenderedQuestion, Widget,
};
pub use router::{
    assessment_router, SaveAssessmentRequest, SubmissionReceipt, SubmitAssessmentRequest,
};
pub use service::{
    validate_questions, AssessmentService, AssessmentServiceError, AssessmentValidationError,
};
pub use session::{BuildSession, SessionError, TakePhase, TakeSession};
pub use visibility::{check_dependencies, is_visible, DependencyError, DependencyReport};
