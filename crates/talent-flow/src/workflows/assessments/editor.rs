//! Builder-side mutations. Every edit yields a complete replacement question that keeps the
//! original id and variant.

use serde::Serialize;

use super::answer::AnswerValue;
use super::question::{
    Condition, ConditionalRule, Question, QuestionError, QuestionId, QuestionKind, QuestionType,
};

/// A single field edit made in the editor card.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionEdit {
    Prompt(String),
    Required(bool),
    /// Text variants only.
    MaxLength(Option<u32>),
    AddOption,
    EditOption { index: usize, value: String },
    RemoveOption(usize),
    Min(f64),
    Max(f64),
    Step(f64),
    /// Comma-separated extensions as typed, e.g. `.pdf, .docx`.
    AcceptedTypes(String),
    MaxSize(f64),
    ToggleConditional(bool),
    DependsOn(QuestionId),
    Condition(Condition),
    RuleValue(AnswerValue),
}

impl QuestionEdit {
    pub const fn name(&self) -> &'static str {
        match self {
            QuestionEdit::Prompt(_) => "prompt",
            QuestionEdit::Required(_) => "required",
            QuestionEdit::MaxLength(_) => "max length",
            QuestionEdit::AddOption => "add option",
            QuestionEdit::EditOption { .. } => "edit option",
            QuestionEdit::RemoveOption(_) => "remove option",
            QuestionEdit::Min(_) => "minimum",
            QuestionEdit::Max(_) => "maximum",
            QuestionEdit::Step(_) => "step",
            QuestionEdit::AcceptedTypes(_) => "accepted types",
            QuestionEdit::MaxSize(_) => "max size",
            QuestionEdit::ToggleConditional(_) => "conditional toggle",
            QuestionEdit::DependsOn(_) => "depends on",
            QuestionEdit::Condition(_) => "condition",
            QuestionEdit::RuleValue(_) => "rule value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("{edit} does not apply to a {question_type} question")]
    NotApplicable {
        edit: &'static str,
        question_type: QuestionType,
    },
    #[error("question {question} has no option at index {index}")]
    OptionOutOfRange { question: QuestionId, index: usize },
    #[error(transparent)]
    Invalid(#[from] QuestionError),
}

/// Applies `edit` to a copy of `question` and validates the result.
pub fn apply_edit(question: &Question, edit: QuestionEdit) -> Result<Question, EditError> {
    let not_applicable = EditError::NotApplicable {
        edit: edit.name(),
        question_type: question.question_type(),
    };
    let mut next = question.clone();

    match edit {
        QuestionEdit::Prompt(prompt) => next.prompt = prompt,
        QuestionEdit::Required(required) => next.required = required,
        QuestionEdit::MaxLength(max_length) => {
            if !question.question_type().is_text() {
                return Err(not_applicable);
            }
            next.max_length = max_length;
        }
        QuestionEdit::AddOption => {
            let options = options_mut(&mut next.kind).ok_or(not_applicable)?;
            let label = format!("Option {}", options.len() + 1);
            options.push(label);
        }
        QuestionEdit::EditOption { index, value } => {
            let options = options_mut(&mut next.kind).ok_or(not_applicable)?;
            let slot = options
                .get_mut(index)
                .ok_or_else(|| EditError::OptionOutOfRange {
                    question: question.id.clone(),
                    index,
                })?;
            *slot = value;
        }
        QuestionEdit::RemoveOption(index) => {
            let options = options_mut(&mut next.kind).ok_or(not_applicable)?;
            if index >= options.len() {
                return Err(EditError::OptionOutOfRange {
                    question: question.id.clone(),
                    index,
                });
            }
            options.remove(index);
        }
        QuestionEdit::Min(value) => match &mut next.kind {
            QuestionKind::Numeric { min, .. } => *min = Some(value),
            _ => return Err(not_applicable),
        },
        QuestionEdit::Max(value) => match &mut next.kind {
            QuestionKind::Numeric { max, .. } => *max = Some(value),
            _ => return Err(not_applicable),
        },
        QuestionEdit::Step(value) => match &mut next.kind {
            QuestionKind::Numeric { step, .. } => *step = Some(value),
            _ => return Err(not_applicable),
        },
        QuestionEdit::AcceptedTypes(raw) => match &mut next.kind {
            QuestionKind::FileUpload { accepted_types, .. } => {
                *accepted_types = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|extension| !extension.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => return Err(not_applicable),
        },
        QuestionEdit::MaxSize(value) => match &mut next.kind {
            QuestionKind::FileUpload { max_size, .. } => *max_size = Some(value),
            _ => return Err(not_applicable),
        },
        QuestionEdit::ToggleConditional(enabled) => {
            next.conditional = if enabled {
                Some(next.conditional.take().unwrap_or_default())
            } else {
                None
            };
        }
        QuestionEdit::DependsOn(depends_on) => rule_mut(&mut next).depends_on = depends_on,
        QuestionEdit::Condition(condition) => rule_mut(&mut next).condition = condition,
        QuestionEdit::RuleValue(value) => rule_mut(&mut next).value = value,
    }

    next.validate()?;
    Ok(next)
}

fn options_mut(kind: &mut QuestionKind) -> Option<&mut Vec<String>> {
    match kind {
        QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
            Some(options)
        }
        _ => None,
    }
}

// Editing a rule field on an unconditional question starts from the blank rule.
fn rule_mut(question: &mut Question) -> &mut ConditionalRule {
    question.conditional.get_or_insert_with(ConditionalRule::default)
}

/// What the editor reports back to the session owning the question list.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Updated(Question),
    /// Deletion is signalled by id.
    Deleted(QuestionId),
}

/// Editor card bound to one question.
///
/// Edits are applied to the question the editor was built with; the host swaps in the
/// replacement and builds a fresh editor for the next edit.
pub struct QuestionEditor<'a, F>
where
    F: FnMut(EditorEvent),
{
    question: &'a Question,
    emit: F,
}

impl<'a, F> QuestionEditor<'a, F>
where
    F: FnMut(EditorEvent),
{
    pub fn new(question: &'a Question, emit: F) -> Self {
        Self { question, emit }
    }

    pub fn edit(&mut self, edit: QuestionEdit) -> Result<(), EditError> {
        let updated = apply_edit(self.question, edit)?;
        (self.emit)(EditorEvent::Updated(updated));
        Ok(())
    }

    pub fn delete(&mut self) {
        (self.emit)(EditorEvent::Deleted(self.question.id.clone()));
    }

    pub fn form(&self, position: usize) -> EditorForm {
        EditorForm::describe(self.question, position)
    }
}

/// Field layout of an editor card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorForm {
    pub id: QuestionId,
    /// e.g. `1. single choice`
    pub header: String,
    pub prompt: String,
    pub required: bool,
    pub section: EditorSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
}

/// Variant-specific part of the editor card, with the displayed defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "kebab-case")]
pub enum EditorSection {
    Options { options: Vec<String> },
    Text { max_length: Option<u32> },
    NumericRange { min: f64, max: f64, step: f64 },
    FileSettings { accepted_types: String, max_size: f64 },
}

impl EditorForm {
    pub fn describe(question: &Question, position: usize) -> Self {
        let section = match &question.kind {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                EditorSection::Options {
                    options: options.clone(),
                }
            }
            QuestionKind::ShortText | QuestionKind::LongText => EditorSection::Text {
                max_length: question.max_length,
            },
            QuestionKind::Numeric { min, max, step } => EditorSection::NumericRange {
                min: min.unwrap_or(0.0),
                max: max.unwrap_or(100.0),
                step: step.unwrap_or(1.0),
            },
            QuestionKind::FileUpload {
                accepted_types,
                max_size,
            } => EditorSection::FileSettings {
                accepted_types: accepted_types.join(", "),
                max_size: max_size.unwrap_or(5.0),
            },
        };

        Self {
            id: question.id.clone(),
            header: format!("{}. {}", position, question.question_type().label()),
            prompt: question.prompt.clone(),
            required: question.required,
            section,
            conditional: question.conditional.clone(),
        }
    }
}
