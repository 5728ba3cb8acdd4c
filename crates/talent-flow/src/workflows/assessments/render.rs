//! Maps questions and the current answers to widget descriptions, and widget input back
//! to updated answer sets.

use serde::{Deserialize, Serialize};

use super::answer::{AnswerSet, AnswerValue, FileReference};
use super::question::{Question, QuestionId, QuestionKind, QuestionType};
use super::visibility::is_visible;

/// Whether rendered widgets accept input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Builder preview: display only, no advisories.
    Preview,
    Live,
}

/// Display-ready description of one visible question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuestion {
    pub id: QuestionId,
    /// 1-based position among the visible questions.
    pub position: usize,
    pub prompt: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length_hint: Option<String>,
    pub read_only: bool,
    pub widget: Widget,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>,
}

impl RenderedQuestion {
    /// Prompt line as shown above the widget, e.g. `2. Years of experience *`.
    pub fn label(&self) -> String {
        let mut label = format!("{}. {}", self.position, self.prompt);
        if self.required {
            label.push_str(" *");
        }
        if let Some(hint) = &self.max_length_hint {
            label.push(' ');
            label.push_str(hint);
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub label: String,
    pub selected: bool,
}

/// Input widget matching the question variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "kebab-case")]
pub enum Widget {
    ExclusiveChoice {
        options: Vec<ChoiceOption>,
    },
    ToggleGroup {
        options: Vec<ChoiceOption>,
    },
    TextInput {
        value: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    NumberInput {
        value: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        range_hint: Option<String>,
    },
    FilePicker {
        accept: Vec<String>,
        accept_mime: Vec<String>,
        max_size_mb: Option<f64>,
        selected: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

/// Soft validation hint. Never blocks input or submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Advisory {
    RequiredUnanswered,
    TooLong {
        length: usize,
        max_length: u32,
    },
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    UnacceptedFileType {
        extension: Option<String>,
        accepted: Vec<String>,
    },
}

/// Raw input coming from a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "kebab-case")]
pub enum InputEvent {
    Select { option: String },
    Toggle { option: String, checked: bool },
    Text { value: String },
    /// Raw text of a number field. The leading numeric part is kept; no number becomes `0`.
    Number { raw: String },
    PickFile { file: FileReference },
}

impl InputEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            InputEvent::Select { .. } => "select",
            InputEvent::Toggle { .. } => "toggle",
            InputEvent::Text { .. } => "text",
            InputEvent::Number { .. } => "number",
            InputEvent::PickFile { .. } => "pick-file",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// The callback received an updated answer set.
    Applied,
    /// No callback was supplied; the widget is display-only.
    ReadOnly,
    /// The question is hidden by its conditional rule.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("{event} input does not apply to a {question_type} question")]
    Unsupported {
        question_type: QuestionType,
        event: &'static str,
    },
    #[error("option '{option}' is not offered by question {question}")]
    UnknownOption { question: QuestionId, option: String },
}

/// Callback receiving the id of the changed question and the replacement answer set.
pub type AnswerCallback<'a> = dyn FnMut(&QuestionId, AnswerSet) + 'a;

/// Renders one question against the full answer set.
pub struct QuestionRenderer<'a> {
    question: &'a Question,
    answers: &'a AnswerSet,
    on_change: Option<&'a mut AnswerCallback<'a>>,
}

impl<'a> QuestionRenderer<'a> {
    /// Display-only renderer, as used by the builder's live preview.
    pub fn preview(question: &'a Question, answers: &'a AnswerSet) -> Self {
        Self {
            question,
            answers,
            on_change: None,
        }
    }

    pub fn interactive(
        question: &'a Question,
        answers: &'a AnswerSet,
        on_change: &'a mut AnswerCallback<'a>,
    ) -> Self {
        Self {
            question,
            answers,
            on_change: Some(on_change),
        }
    }

    pub fn is_visible(&self) -> bool {
        is_visible(self.question, self.answers)
    }

    /// Builds the widget description, or `None` when the question is hidden.
    pub fn render(&self, position: usize) -> Option<RenderedQuestion> {
        if !self.is_visible() {
            return None;
        }
        let mode = if self.on_change.is_some() {
            RenderMode::Live
        } else {
            RenderMode::Preview
        };
        Some(build_view(self.question, self.answers, position, mode))
    }

    /// Turns widget input into a replacement answer set and hands it to the callback.
    pub fn dispatch(&mut self, event: InputEvent) -> Result<InputOutcome, InputError> {
        if !self.is_visible() {
            return Ok(InputOutcome::Hidden);
        }
        if self.on_change.is_none() {
            return Ok(InputOutcome::ReadOnly);
        }

        let value = next_value(self.question, self.answers.get(&self.question.id), event)?;
        let updated = self.answers.with_answer(self.question.id.clone(), value);
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&self.question.id, updated);
        }
        Ok(InputOutcome::Applied)
    }
}

/// Renders the visible questions in order, numbering only those that are shown.
pub fn render_form(
    questions: &[Question],
    answers: &AnswerSet,
    mode: RenderMode,
) -> Vec<RenderedQuestion> {
    questions
        .iter()
        .filter(|question| is_visible(question, answers))
        .enumerate()
        .map(|(index, question)| build_view(question, answers, index + 1, mode))
        .collect()
}

fn build_view(
    question: &Question,
    answers: &AnswerSet,
    position: usize,
    mode: RenderMode,
) -> RenderedQuestion {
    let answer = answers.get(&question.id);
    let advisories = match mode {
        RenderMode::Live => advisories(question, answer),
        RenderMode::Preview => Vec::new(),
    };

    RenderedQuestion {
        id: question.id.clone(),
        position,
        prompt: question.prompt.clone(),
        required: question.required,
        max_length_hint: question
            .text_max_length()
            .map(|max| format!("(max {max} characters)")),
        read_only: mode == RenderMode::Preview,
        widget: widget_for(question, answer),
        advisories,
    }
}

fn widget_for(question: &Question, answer: Option<&AnswerValue>) -> Widget {
    match &question.kind {
        QuestionKind::SingleChoice { options } => Widget::ExclusiveChoice {
            options: options
                .iter()
                .map(|option| ChoiceOption {
                    label: option.clone(),
                    selected: answer.and_then(AnswerValue::as_text) == Some(option.as_str()),
                })
                .collect(),
        },
        QuestionKind::MultiChoice { options } => {
            let selected = answer.and_then(AnswerValue::as_choices);
            Widget::ToggleGroup {
                options: options
                    .iter()
                    .map(|option| ChoiceOption {
                        label: option.clone(),
                        selected: selected.is_some_and(|set| set.contains(option)),
                    })
                    .collect(),
            }
        }
        QuestionKind::ShortText | QuestionKind::LongText => Widget::TextInput {
            value: answer.map(AnswerValue::coerce_string).unwrap_or_default(),
            multiline: question.question_type() == QuestionType::LongText,
            max_length: question.text_max_length(),
        },
        QuestionKind::Numeric { min, max, step } => Widget::NumberInput {
            value: answer.and_then(AnswerValue::as_number),
            min: *min,
            max: *max,
            step: *step,
            range_hint: range_hint(*min, *max, *step),
        },
        QuestionKind::FileUpload {
            accepted_types,
            max_size,
        } => Widget::FilePicker {
            accept: accepted_types.clone(),
            accept_mime: accepted_mime_types(accepted_types),
            max_size_mb: *max_size,
            selected: answer.and_then(AnswerValue::as_file).map(|file| file.name.clone()),
            hint: file_hint(accepted_types, *max_size),
        },
    }
}

fn format_number(value: f64) -> String {
    AnswerValue::Number(value).coerce_string()
}

fn range_hint(min: Option<f64>, max: Option<f64>, step: Option<f64>) -> Option<String> {
    if min.is_none() && max.is_none() {
        return None;
    }

    let min = min.map_or_else(|| "no min".to_string(), format_number);
    let max = max.map_or_else(|| "no max".to_string(), format_number);
    let mut hint = format!("Range: {min} to {max}");
    if let Some(step) = step.filter(|step| *step != 0.0) {
        hint.push_str(&format!(" (step: {})", format_number(step)));
    }
    Some(hint)
}

fn file_hint(accepted_types: &[String], max_size: Option<f64>) -> Option<String> {
    if accepted_types.is_empty() {
        return None;
    }

    let mut hint = format!("Accepted types: {}", accepted_types.join(", "));
    if let Some(max_size) = max_size.filter(|size| *size != 0.0) {
        hint.push_str(&format!(" (max {}MB)", format_number(max_size)));
    }
    Some(hint)
}

fn accepted_mime_types(accepted_types: &[String]) -> Vec<String> {
    let mut mimes: Vec<String> = Vec::new();
    for extension in accepted_types {
        let extension = extension.trim().trim_start_matches('.');
        if let Some(mime) = mime_guess::from_ext(extension).first_raw() {
            if !mimes.iter().any(|known| known == mime) {
                mimes.push(mime.to_string());
            }
        }
    }
    mimes
}

/// Soft hints for the current answer. Required and range rules are advisory only.
pub fn advisories(question: &Question, answer: Option<&AnswerValue>) -> Vec<Advisory> {
    let mut hints = Vec::new();

    let unanswered = match answer {
        None => true,
        Some(AnswerValue::Text(text)) => text.is_empty(),
        Some(AnswerValue::Choices(selected)) => selected.is_empty(),
        Some(_) => false,
    };
    if question.required && unanswered {
        hints.push(Advisory::RequiredUnanswered);
    }

    match (&question.kind, answer) {
        (QuestionKind::ShortText | QuestionKind::LongText, Some(AnswerValue::Text(text))) => {
            if let Some(max_length) = question.text_max_length() {
                let length = text.chars().count();
                if length > max_length as usize {
                    hints.push(Advisory::TooLong { length, max_length });
                }
            }
        }
        (QuestionKind::Numeric { min, max, .. }, Some(AnswerValue::Number(value))) => {
            let below = min.is_some_and(|min| *value < min);
            let above = max.is_some_and(|max| *value > max);
            if below || above {
                hints.push(Advisory::OutOfRange {
                    value: *value,
                    min: *min,
                    max: *max,
                });
            }
        }
        (QuestionKind::FileUpload { accepted_types, .. }, Some(AnswerValue::File(file)))
            if !accepted_types.is_empty() =>
        {
            let extension = file.extension();
            let accepted = extension.as_deref().is_some_and(|extension| {
                accepted_types
                    .iter()
                    .any(|accepted| accepted.trim().eq_ignore_ascii_case(extension))
            });
            if !accepted {
                hints.push(Advisory::UnacceptedFileType {
                    extension,
                    accepted: accepted_types.clone(),
                });
            }
        }
        _ => {}
    }

    hints
}

fn next_value(
    question: &Question,
    current: Option<&AnswerValue>,
    event: InputEvent,
) -> Result<AnswerValue, InputError> {
    let offered = |options: &[String], option: &str| -> Result<(), InputError> {
        if options.iter().any(|candidate| candidate == option) {
            Ok(())
        } else {
            Err(InputError::UnknownOption {
                question: question.id.clone(),
                option: option.to_string(),
            })
        }
    };

    match (&question.kind, event) {
        (QuestionKind::SingleChoice { options }, InputEvent::Select { option }) => {
            offered(options.as_slice(), option.as_str())?;
            Ok(AnswerValue::Text(option))
        }
        (QuestionKind::MultiChoice { options }, InputEvent::Toggle { option, checked }) => {
            offered(options.as_slice(), option.as_str())?;
            let mut selected = current
                .and_then(AnswerValue::as_choices)
                .cloned()
                .unwrap_or_default();
            if checked {
                selected.insert(option);
            } else {
                selected.remove(&option);
            }
            Ok(AnswerValue::Choices(selected))
        }
        (QuestionKind::ShortText | QuestionKind::LongText, InputEvent::Text { value }) => {
            Ok(AnswerValue::Text(value))
        }
        (QuestionKind::Numeric { .. }, InputEvent::Number { raw }) => {
            let value = leading_number(&raw)
                .filter(|value| value.is_finite())
                .unwrap_or(0.0);
            Ok(AnswerValue::Number(value))
        }
        (QuestionKind::FileUpload { .. }, InputEvent::PickFile { file }) => {
            Ok(AnswerValue::File(file))
        }
        (kind, event) => Err(InputError::Unsupported {
            question_type: kind.question_type(),
            event: event.name(),
        }),
    }
}

/// Longest numeric prefix of `raw` after leading whitespace, so `12abc` reads as 12.
fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut at: usize| {
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        at
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_end = int_end;
    let mut has_digits = int_end > end;
    if bytes.get(int_end) == Some(&b'.') {
        let frac_end = digits_from(int_end + 1);
        if has_digits || frac_end > int_end + 1 {
            mantissa_end = frac_end;
            has_digits = true;
        }
    }
    if !has_digits {
        return None;
    }

    end = mantissa_end;
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}
