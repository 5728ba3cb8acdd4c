use std::sync::Arc;

use super::common::*;
use crate::workflows::assessments::render::Advisory;
use crate::workflows::assessments::{
    AnswerValue, AssessmentService, AssessmentServiceError, AssessmentValidationError,
    BuildSession, Condition, ConditionalRule, DependencyError, EditorEvent, InputEvent, JobId,
    PersistenceGateway, Question, QuestionEdit, QuestionId, QuestionKind, QuestionType,
    SessionError, TakePhase, TakeSession,
};

async fn open_builder(
    service: Arc<AssessmentService<MemoryGateway>>,
    notifications: &MemoryNotifications,
) -> BuildSession<MemoryGateway, MemoryNotifications> {
    BuildSession::open(service, Arc::new(notifications.clone()), JOB)
        .await
        .expect("session opens")
}

async fn ready_taker(
    questions: Vec<Question>,
) -> (
    TakeSession<MemoryGateway, MemoryNotifications>,
    MemoryGateway,
    MemoryNotifications,
) {
    let (service, gateway) = build_service();
    service.save(JOB, questions).await.expect("assessment saved");
    let notifications = MemoryNotifications::default();
    let session = TakeSession::new(service, Arc::new(notifications.clone()), JOB);
    session.load().await.expect("assessment loads");
    (session, gateway, notifications)
}

#[tokio::test]
async fn builder_appends_defaults_and_saves_the_whole_list() {
    let (service, gateway) = build_service();
    let notifications = MemoryNotifications::default();
    let mut session = open_builder(service, &notifications).await;

    assert_eq!(session.job().map(|job| job.slug.as_str()), Some("backend-engineer"));
    assert!(session.questions().is_empty());

    let choice_id = session.add_question(QuestionType::SingleChoice).id.clone();
    session.add_question(QuestionType::Numeric);
    session
        .edit_question(&choice_id, QuestionEdit::Prompt("Preferred work mode".to_string()))
        .expect("prompt edit");
    session
        .edit_question(&choice_id, QuestionEdit::AddOption)
        .expect("option added");

    let forms = session.forms();
    assert_eq!(forms[0].header, "1. single choice");
    assert_eq!(forms[1].header, "2. numeric");

    let stored = session.save().await.expect("save succeeds");
    assert_eq!(stored.questions, session.questions());
    assert_eq!(
        gateway.stored_assessment(JOB).map(|assessment| assessment.questions.len()),
        Some(2)
    );
    assert_eq!(notifications.titles(), vec!["Assessment saved successfully!"]);
}

#[tokio::test]
async fn saved_questions_reload_in_order() {
    let (service, _) = build_service();
    let mut questions = remote_follow_up();
    questions.push(experience_question());
    service.save(JOB, questions.clone()).await.expect("saved");

    let session = open_builder(service, &MemoryNotifications::default()).await;
    assert_eq!(session.questions(), questions.as_slice());
}

#[tokio::test]
async fn replace_keeps_the_variant_and_delete_goes_by_id() {
    let (service, _) = build_service();
    let mut session = open_builder(service, &MemoryNotifications::default()).await;
    let text_id = session.add_question(QuestionType::ShortText).id.clone();

    let mut swapped = QuestionType::LongText.default_question();
    swapped.id = text_id.clone();
    assert!(matches!(
        session.replace_question(swapped),
        Err(SessionError::TypeChanged {
            from: QuestionType::ShortText,
            to: QuestionType::LongText,
            ..
        })
    ));

    assert!(matches!(
        session.edit_question(&QuestionId::from("missing"), QuestionEdit::Required(true)),
        Err(SessionError::UnknownQuestion(_))
    ));
    assert!(matches!(
        session.edit_question(&text_id, QuestionEdit::AddOption),
        Err(SessionError::Edit(_))
    ));

    session
        .apply_editor_event(EditorEvent::Deleted(text_id))
        .expect("delete by id");
    assert!(session.questions().is_empty());
}

#[tokio::test]
async fn save_rejects_cyclic_dependencies_and_notifies() {
    let (service, gateway) = build_service();
    let notifications = MemoryNotifications::default();
    let mut session = open_builder(service, &notifications).await;

    let first = session.add_question(QuestionType::ShortText).id.clone();
    let second = session.add_question(QuestionType::ShortText).id.clone();
    session
        .edit_question(&first, QuestionEdit::DependsOn(second.clone()))
        .expect("rule on first");
    session
        .edit_question(&second, QuestionEdit::DependsOn(first.clone()))
        .expect("rule on second");

    let error = session.save().await.expect_err("cycle rejected");
    assert!(matches!(
        error,
        SessionError::Service(AssessmentServiceError::Validation(
            AssessmentValidationError::Dependency(DependencyError::Cycle { .. })
        ))
    ));
    assert!(gateway.stored_assessment(JOB).is_none());
    assert_eq!(notifications.titles(), vec!["Failed to save assessment."]);
}

#[tokio::test]
async fn save_failure_is_reported_and_later_saves_still_run() {
    let service = Arc::new(AssessmentService::new(Arc::new(UnavailableGateway)));
    let notifications = MemoryNotifications::default();
    let opened = BuildSession::open(service, Arc::new(notifications.clone()), JOB).await;
    assert!(matches!(opened, Err(SessionError::Service(_))));

    let gateway = MemoryGateway::with_job(job());
    let service = Arc::new(AssessmentService::new(Arc::new(ReadOnlyGateway {
        inner: gateway,
    })));
    let session = BuildSession::open(service, Arc::new(notifications.clone()), JOB)
        .await
        .expect("reads succeed");
    assert!(session.save().await.is_err());
    assert!(session.save().await.is_err());
    assert_eq!(
        notifications.titles(),
        vec!["Failed to save assessment.", "Failed to save assessment."]
    );
}

#[tokio::test]
async fn undeliverable_notifications_do_not_fail_a_save() {
    let (service, gateway) = build_service();
    let mut session = BuildSession::open(service, Arc::new(ClosedNotifications), JOB)
        .await
        .expect("opens");
    session.add_question(QuestionType::FileUpload);

    session.save().await.expect("save succeeds");
    assert!(gateway.stored_assessment(JOB).is_some());
}

#[tokio::test]
async fn only_one_save_is_outstanding() {
    let blocking = Arc::new(BlockingGateway::new(MemoryGateway::with_job(job())));
    let service = Arc::new(AssessmentService::new(blocking.clone()));
    let mut session = BuildSession::open(
        service,
        Arc::new(MemoryNotifications::default()),
        JOB,
    )
    .await
    .expect("opens");
    session.add_question(QuestionType::ShortText);
    let session = Arc::new(session);

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.save().await }
    });
    blocking.entered.notified().await;

    assert!(matches!(session.save().await, Err(SessionError::SaveInFlight)));

    blocking.release.notify_one();
    first.await.expect("task joins").expect("first save succeeds");
    assert!(blocking.inner.stored_assessment(JOB).is_some());
}

#[tokio::test]
async fn preview_is_read_only_and_numbers_visible_questions() {
    let (service, _) = build_service();
    service.save(JOB, remote_follow_up()).await.expect("saved");
    let session = open_builder(service, &MemoryNotifications::default()).await;

    let hidden = session.preview(&Default::default());
    assert_eq!(hidden.len(), 1);
    assert!(hidden[0].read_only);
    assert!(hidden[0].advisories.is_empty());

    let answers = [(QuestionId::from("q1"), AnswerValue::from("Remote"))]
        .into_iter()
        .collect();
    let shown = session.preview(&answers);
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1].label(), "2. Which timezone do you work in? (max 40 characters)");
}

#[tokio::test]
async fn take_session_follows_the_remote_scenario() {
    let (session, gateway, notifications) = ready_taker(remote_follow_up()).await;
    assert_eq!(session.phase(), TakePhase::Ready);
    assert_eq!(session.render().len(), 1);

    let follow_up = QuestionId::from("q2");
    assert!(matches!(
        session.input(
            &follow_up,
            InputEvent::Text {
                value: "UTC+1".to_string()
            }
        ),
        Err(SessionError::Hidden(_))
    ));

    session
        .input(
            &QuestionId::from("q1"),
            InputEvent::Select {
                option: "Remote".to_string(),
            },
        )
        .expect("select applies");
    assert_eq!(session.render().len(), 2);

    session
        .input(
            &follow_up,
            InputEvent::Text {
                value: "UTC+1".to_string(),
            },
        )
        .expect("text applies");

    session
        .input(
            &QuestionId::from("q1"),
            InputEvent::Select {
                option: "Onsite".to_string(),
            },
        )
        .expect("select applies");
    assert_eq!(session.render().len(), 1);

    let response_id = session.submit().await.expect("submitted");
    assert_eq!(session.phase(), TakePhase::Submitted);
    assert_eq!(session.submission(), Some(response_id));

    let stored = gateway.stored_responses();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].answers.get(&"q1".into()), Some(&AnswerValue::from("Onsite")));
    // Answers given before the question was hidden are still submitted.
    assert_eq!(stored[0].answers.get(&follow_up), Some(&AnswerValue::from("UTC+1")));
    assert_eq!(notifications.titles(), vec!["Assessment Submitted Successfully!"]);
}

#[tokio::test]
async fn out_of_range_numbers_are_stored_as_given() {
    let (session, gateway, _) = ready_taker(vec![experience_question()]).await;
    let years = QuestionId::from("years");

    session
        .record_answer(&years, AnswerValue::from(11))
        .expect("answer recorded");
    let rendered = session.render();
    assert_eq!(
        rendered[0].advisories,
        vec![Advisory::OutOfRange {
            value: 11.0,
            min: Some(1.0),
            max: Some(10.0)
        }]
    );

    session.submit().await.expect("submitted");
    let stored = gateway.stored_responses();
    assert_eq!(stored[0].answers.get(&years), Some(&AnswerValue::Number(11.0)));
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let blocking = Arc::new(BlockingGateway::new(MemoryGateway::with_job(job())));
    let service = Arc::new(AssessmentService::new(blocking.clone()));
    blocking
        .inner
        .put_assessment(JOB, remote_follow_up())
        .await
        .expect("seeded");

    let session = Arc::new(TakeSession::new(
        service,
        Arc::new(MemoryNotifications::default()),
        JOB,
    ));
    session.load().await.expect("loads");
    session
        .record_answer(&"q1".into(), AnswerValue::from("Remote"))
        .expect("answered");

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    blocking.entered.notified().await;

    assert_eq!(session.phase(), TakePhase::Submitting);
    assert!(matches!(session.submit().await, Err(SessionError::SubmitInFlight)));
    assert!(matches!(
        session.record_answer(&"q1".into(), AnswerValue::from("Onsite")),
        Err(SessionError::NotAcceptingAnswers {
            phase: TakePhase::Submitting
        })
    ));

    blocking.release.notify_one();
    first.await.expect("task joins").expect("first submit succeeds");

    assert_eq!(blocking.inner.stored_responses().len(), 1);
    assert!(matches!(session.submit().await, Err(SessionError::AlreadySubmitted)));
}

#[tokio::test]
async fn reloading_cannot_reopen_a_submission() {
    let blocking = Arc::new(BlockingGateway::new(MemoryGateway::with_job(job())));
    let service = Arc::new(AssessmentService::new(blocking.clone()));
    blocking
        .inner
        .put_assessment(JOB, remote_follow_up())
        .await
        .expect("seeded");

    let session = Arc::new(TakeSession::new(
        service,
        Arc::new(MemoryNotifications::default()),
        JOB,
    ));
    session.load().await.expect("loads");
    assert!(matches!(
        session.load().await,
        Err(SessionError::AlreadyLoaded {
            phase: TakePhase::Ready
        })
    ));

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit().await }
    });
    blocking.entered.notified().await;

    assert!(matches!(
        session.load().await,
        Err(SessionError::AlreadyLoaded {
            phase: TakePhase::Submitting
        })
    ));
    assert_eq!(session.phase(), TakePhase::Submitting);
    assert!(matches!(session.submit().await, Err(SessionError::SubmitInFlight)));

    blocking.release.notify_one();
    first.await.expect("task joins").expect("first submit succeeds");

    assert!(matches!(
        session.load().await,
        Err(SessionError::AlreadyLoaded {
            phase: TakePhase::Submitted
        })
    ));
    assert_eq!(session.phase(), TakePhase::Submitted);
    assert!(matches!(session.submit().await, Err(SessionError::AlreadySubmitted)));
    assert_eq!(blocking.inner.stored_responses().len(), 1);
}

#[tokio::test]
async fn failed_submit_allows_edits_and_retries() {
    let gateway = MemoryGateway::with_job(job());
    gateway
        .put_assessment(JOB, remote_follow_up())
        .await
        .expect("seeded");
    let service = Arc::new(AssessmentService::new(Arc::new(ReadOnlyGateway {
        inner: gateway,
    })));
    let notifications = MemoryNotifications::default();
    let session = TakeSession::new(service, Arc::new(notifications.clone()), JOB);
    session.load().await.expect("loads");

    assert!(matches!(session.submit().await, Err(SessionError::Service(_))));
    assert_eq!(session.phase(), TakePhase::SubmitFailed);
    assert_eq!(notifications.titles(), vec!["Submission Failed"]);

    session
        .record_answer(&"q1".into(), AnswerValue::from("Remote"))
        .expect("edits allowed after failure");
    assert_eq!(session.phase(), TakePhase::Ready);

    assert!(matches!(session.submit().await, Err(SessionError::Service(_))));
    assert_eq!(session.phase(), TakePhase::SubmitFailed);
}

#[tokio::test]
async fn unconfigured_job_loads_but_cannot_submit() {
    let (service, _) = build_service();
    let session = TakeSession::new(
        service,
        Arc::new(MemoryNotifications::default()),
        JobId(404),
    );

    assert!(matches!(session.submit().await, Err(SessionError::NotLoaded)));
    session.load().await.expect("missing assessment is not an error");
    assert!(session.job().is_none());
    assert!(!session.is_configured());
    assert!(session.render().is_empty());
    assert!(matches!(
        session.submit().await,
        Err(SessionError::NotConfigured(JobId(404)))
    ));
}

#[tokio::test]
async fn dangling_rules_save_and_stay_hidden() {
    let orphan = Question::new("orphan", "Only when q9 is set", QuestionKind::LongText)
        .expect("valid")
        .with_conditional(ConditionalRule::new("q9", Condition::NotEquals, ""));
    let (session, _, _) = ready_taker(vec![orphan]).await;

    assert!(session.is_configured());
    assert!(session.render().is_empty());
    assert!(matches!(
        session.record_answer(&"orphan".into(), AnswerValue::from("text")),
        Err(SessionError::Hidden(_))
    ));
}
