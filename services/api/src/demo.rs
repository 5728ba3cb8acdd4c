use crate::infra::{LocalStore, LogNotifier};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use talent_flow::error::AppError;
use talent_flow::workflows::assessments::{
    validate_questions, AnswerSet, AssessmentService, BuildSession, Condition, EditorForm,
    InputEvent, JobId, QuestionEdit, QuestionType, RenderedQuestion, SaveAssessmentRequest,
    TakeSession, Widget,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seeded job to build the assessment for.
    #[arg(long, default_value_t = 2)]
    pub(crate) job_id: u64,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Assessment JSON file shaped like `{"questions": [...]}`.
    pub(crate) file: PathBuf,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let job_id = JobId(args.job_id);
    let store = LocalStore::in_memory()?;
    let service = Arc::new(AssessmentService::new(Arc::new(store.clone())));
    let notifier = Arc::new(LogNotifier::default());

    println!("Assessment builder demo");
    let mut builder = BuildSession::open(service.clone(), notifier.clone(), job_id).await?;
    match builder.job() {
        Some(job) => println!("- Job {}: {} ({})", job.id, job.title, job.slug),
        None => println!("- Job {job_id} is not in the store; saving will fail"),
    }

    let mode = builder.add_question(QuestionType::SingleChoice).id.clone();
    for edit in [
        QuestionEdit::Prompt("Preferred work mode".to_string()),
        QuestionEdit::Required(true),
        QuestionEdit::EditOption {
            index: 0,
            value: "Remote".to_string(),
        },
        QuestionEdit::AddOption,
        QuestionEdit::EditOption {
            index: 1,
            value: "Onsite".to_string(),
        },
    ] {
        builder.edit_question(&mode, edit)?;
    }

    let timezone = builder.add_question(QuestionType::ShortText).id.clone();
    for edit in [
        QuestionEdit::Prompt("Which timezone do you work from?".to_string()),
        QuestionEdit::MaxLength(Some(40)),
        QuestionEdit::ToggleConditional(true),
        QuestionEdit::DependsOn(mode.clone()),
        QuestionEdit::Condition(Condition::Equals),
        QuestionEdit::RuleValue("Remote".into()),
    ] {
        builder.edit_question(&timezone, edit)?;
    }

    let years = builder.add_question(QuestionType::Numeric).id.clone();
    for edit in [
        QuestionEdit::Prompt("Years of experience".to_string()),
        QuestionEdit::Min(1.0),
        QuestionEdit::Max(10.0),
    ] {
        builder.edit_question(&years, edit)?;
    }

    println!("\nEditor cards");
    for form in builder.forms() {
        print_form(&form);
    }

    let assessment = builder.save().await?;
    println!(
        "\nSaved assessment {} with {} questions",
        assessment.id.0,
        assessment.questions.len()
    );

    println!("\nPreview with no answers");
    print_rendered(&builder.preview(&AnswerSet::new()));
    println!("\nPreview after answering Remote");
    let sample = AnswerSet::new().with_answer(mode.clone(), "Remote".into());
    print_rendered(&builder.preview(&sample));

    println!("\nCandidate session");
    let take = TakeSession::new(service.clone(), notifier.clone(), job_id);
    take.load().await?;
    println!("- phase: {}", take.phase());
    print_rendered(&take.render());

    take.input(
        &mode,
        InputEvent::Select {
            option: "Remote".to_string(),
        },
    )?;
    take.input(
        &timezone,
        InputEvent::Text {
            value: "UTC+01:00".to_string(),
        },
    )?;
    take.input(
        &years,
        InputEvent::Number {
            raw: "11".to_string(),
        },
    )?;
    println!("\nAfter answering");
    print_rendered(&take.render());

    let submission = take.submit().await?;
    println!("\nSubmitted response {submission} (phase: {})", take.phase());

    let responses = service.responses(job_id).await?;
    for response in &responses {
        println!(
            "- Stored response {} at {}: {}",
            response.id,
            response.submitted_at.to_rfc3339(),
            serde_json::to_string(&response.answers)?
        );
    }

    println!("\nNotifications");
    for notification in notifier.delivered() {
        println!(
            "- [{}] {}: {}",
            notification.level.label(),
            notification.title,
            notification.message
        );
    }

    Ok(())
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let raw = fs::read(&args.file)?;
    let request: SaveAssessmentRequest = serde_json::from_slice(&raw)?;
    println!(
        "Checking {} ({} questions)",
        args.file.display(),
        request.questions.len()
    );

    let report = validate_questions(&request.questions)?;
    if report.dangling.is_empty() {
        println!("- every conditional rule points at a question in the assessment");
    }
    for dangling in &report.dangling {
        println!(
            "- {} depends on unknown question {}; it will never be shown",
            dangling.question, dangling.depends_on
        );
    }
    println!("Assessment is valid");
    Ok(())
}

fn print_form(form: &EditorForm) {
    let required = if form.required { " (required)" } else { "" };
    println!("- {}: {}{required}", form.header, form.prompt);
    if let Some(rule) = &form.conditional {
        println!(
            "    shown when {} {} {}",
            rule.depends_on,
            rule.condition.label(),
            to_json(&rule.value)
        );
    }
}

fn print_rendered(questions: &[RenderedQuestion]) {
    if questions.is_empty() {
        println!("  (no visible questions)");
    }
    for question in questions {
        println!("  {}", question.label());
        match &question.widget {
            Widget::ExclusiveChoice { options } | Widget::ToggleGroup { options } => {
                let labels: Vec<String> = options
                    .iter()
                    .map(|option| {
                        let mark = if option.selected { "x" } else { " " };
                        format!("[{mark}] {}", option.label)
                    })
                    .collect();
                println!("    {}", labels.join("  "));
            }
            Widget::TextInput { value, .. } => {
                if !value.is_empty() {
                    println!("    value: {value}");
                }
            }
            Widget::NumberInput {
                value, range_hint, ..
            } => {
                if let Some(hint) = range_hint {
                    println!("    {hint}");
                }
                if let Some(value) = value {
                    println!("    value: {value}");
                }
            }
            Widget::FilePicker { hint, selected, .. } => {
                if let Some(hint) = hint {
                    println!("    {hint}");
                }
                if let Some(name) = selected {
                    println!("    selected: {name}");
                }
            }
        }
        if let Some(hint) = &question.max_length_hint {
            println!("    {hint}");
        }
        for advisory in &question.advisories {
            println!("    note: {}", to_json(advisory));
        }
    }
}

fn to_json(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
