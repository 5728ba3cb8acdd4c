use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::AnswerValue;

/// Identifier wrapper for questions, unique within a single assessment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    /// Fresh random identifier for a question appended in the builder.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data-less discriminant of [`QuestionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    ShortText,
    LongText,
    Numeric,
    FileUpload,
}

impl QuestionType {
    /// Builder palette order.
    pub const ALL: [QuestionType; 6] = [
        QuestionType::SingleChoice,
        QuestionType::MultiChoice,
        QuestionType::ShortText,
        QuestionType::LongText,
        QuestionType::Numeric,
        QuestionType::FileUpload,
    ];

    /// Wire tag used in the `type` field.
    pub const fn tag(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultiChoice => "multi-choice",
            QuestionType::ShortText => "short-text",
            QuestionType::LongText => "long-text",
            QuestionType::Numeric => "numeric",
            QuestionType::FileUpload => "file-upload",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single choice",
            QuestionType::MultiChoice => "multi choice",
            QuestionType::ShortText => "short text",
            QuestionType::LongText => "long text",
            QuestionType::Numeric => "numeric",
            QuestionType::FileUpload => "file upload",
        }
    }

    pub const fn is_text(self) -> bool {
        matches!(self, QuestionType::ShortText | QuestionType::LongText)
    }

    pub const fn is_choice(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }

    /// Builds the question the builder appends for this type, with a new id.
    pub fn default_question(self) -> Question {
        let (prompt, max_length) = match self {
            QuestionType::SingleChoice | QuestionType::MultiChoice => ("New Question", None),
            QuestionType::ShortText => ("New Question", Some(100)),
            QuestionType::LongText => ("New Question", Some(1000)),
            QuestionType::Numeric => ("New Numeric Question", None),
            QuestionType::FileUpload => ("Upload File", None),
        };

        Question {
            id: QuestionId::generate(),
            prompt: prompt.to_string(),
            required: false,
            max_length,
            conditional: None,
            kind: self.default_kind(),
        }
    }

    fn default_kind(self) -> QuestionKind {
        match self {
            QuestionType::SingleChoice => QuestionKind::SingleChoice {
                options: vec!["Option 1".to_string()],
            },
            QuestionType::MultiChoice => QuestionKind::MultiChoice {
                options: vec!["Option 1".to_string()],
            },
            QuestionType::ShortText => QuestionKind::ShortText,
            QuestionType::LongText => QuestionKind::LongText,
            QuestionType::Numeric => QuestionKind::Numeric {
                min: Some(0.0),
                max: Some(100.0),
                step: Some(1.0),
            },
            QuestionType::FileUpload => QuestionKind::FileUpload {
                accepted_types: vec![".pdf".to_string(), ".doc".to_string(), ".docx".to_string()],
                max_size: Some(5.0),
            },
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Comparison a conditional rule applies to the dependency's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Equals,
        Condition::NotEquals,
        Condition::Contains,
        Condition::GreaterThan,
        Condition::LessThan,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Condition::Equals => "Equals",
            Condition::NotEquals => "Not Equals",
            Condition::Contains => "Contains",
            Condition::GreaterThan => "Greater Than",
            Condition::LessThan => "Less Than",
        }
    }
}

/// Visibility predicate attached to a question, pointing at one other question's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub depends_on: QuestionId,
    pub condition: Condition,
    pub value: AnswerValue,
}

impl ConditionalRule {
    pub fn new(
        depends_on: impl Into<QuestionId>,
        condition: Condition,
        value: impl Into<AnswerValue>,
    ) -> Self {
        Self {
            depends_on: depends_on.into(),
            condition,
            value: value.into(),
        }
    }
}

impl Default for ConditionalRule {
    /// The blank rule created when the editor switches a question to conditional.
    fn default() -> Self {
        Self {
            depends_on: QuestionId(String::new()),
            condition: Condition::Equals,
            value: AnswerValue::Text(String::new()),
        }
    }
}

/// Variant-specific shape of a question, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice {
        options: Vec<String>,
    },
    MultiChoice {
        options: Vec<String>,
    },
    ShortText,
    LongText,
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    FileUpload {
        #[serde(rename = "acceptedTypes", default)]
        accepted_types: Vec<String>,
        #[serde(rename = "maxSize", default, skip_serializing_if = "Option::is_none")]
        max_size: Option<f64>,
    },
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::SingleChoice { .. } => QuestionType::SingleChoice,
            QuestionKind::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionKind::ShortText => QuestionType::ShortText,
            QuestionKind::LongText => QuestionType::LongText,
            QuestionKind::Numeric { .. } => QuestionType::Numeric,
            QuestionKind::FileUpload { .. } => QuestionType::FileUpload,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// A single assessment question: common fields plus the variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(
        id: impl Into<QuestionId>,
        prompt: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            id: id.into(),
            prompt: prompt.into(),
            required: false,
            max_length: None,
            conditional: None,
            kind,
        };
        question.validate()?;
        Ok(question)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Result<Self, QuestionError> {
        self.max_length = Some(max_length);
        self.validate()?;
        Ok(self)
    }

    pub fn with_conditional(mut self, rule: ConditionalRule) -> Self {
        self.conditional = Some(rule);
        self
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Max length as it applies to the respondent; ignored outside text variants.
    pub fn text_max_length(&self) -> Option<u32> {
        if self.question_type().is_text() {
            self.max_length
        } else {
            None
        }
    }

    /// Checks the construction invariants of the variant.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match &self.kind {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options }
                if options.is_empty() =>
            {
                return Err(QuestionError::NoOptions {
                    id: self.id.clone(),
                });
            }
            QuestionKind::Numeric {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => {
                return Err(QuestionError::InvertedRange {
                    id: self.id.clone(),
                    min: *min,
                    max: *max,
                });
            }
            _ => {}
        }

        if self.question_type().is_text() && self.max_length == Some(0) {
            return Err(QuestionError::ZeroMaxLength {
                id: self.id.clone(),
            });
        }

        Ok(())
    }
}

/// Construction invariant violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuestionError {
    #[error("question {id} must offer at least one option")]
    NoOptions { id: QuestionId },
    #[error("question {id} has min {min} greater than max {max}")]
    InvertedRange { id: QuestionId, min: f64, max: f64 },
    #[error("question {id} has a max length of zero")]
    ZeroMaxLength { id: QuestionId },
}
