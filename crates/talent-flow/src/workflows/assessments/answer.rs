use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::question::QuestionId;

/// Reference to a file chosen by a respondent. Only the name travels; no bytes are read.
///
/// Serialized as `{"name": ...}`, so a rule comparing a file answer against a bare string
/// never matches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileReference {
    pub name: String,
}

impl FileReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Lower-cased extension including the leading dot, e.g. `.pdf`.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Answer value whose shape depends on the question variant it belongs to.
///
/// Also used as the comparison operand of a conditional rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Choices(BTreeSet<String>),
    File(FileReference),
}

impl AnswerValue {
    pub fn choices<I, S>(selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(selected.into_iter().map(Into::into).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Choices(selected) => Some(selected),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileReference> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Choices(_) => "choices",
            Self::File(_) => "file",
        }
    }

    /// String form used by substring comparisons. Mirrors browser `String(value)`.
    pub(crate) fn coerce_string(&self) -> String {
        match self {
            Self::Number(number) => number_to_string(*number),
            Self::Text(text) => text.clone(),
            Self::Choices(selected) => selected.iter().cloned().collect::<Vec<_>>().join(","),
            Self::File(file) => file.name.clone(),
        }
    }

    /// Numeric form used by ordering comparisons. Mirrors browser `Number(value)`;
    /// anything that does not parse becomes NaN so every comparison is false.
    pub(crate) fn coerce_number(&self) -> f64 {
        match self {
            Self::Number(number) => *number,
            Self::Text(text) => parse_number(text),
            Self::Choices(selected) => match selected.len() {
                0 => 0.0,
                1 => selected.iter().next().map_or(f64::NAN, |only| parse_number(only)),
                _ => f64::NAN,
            },
            Self::File(file) => parse_number(&file.name),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AnswerValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<FileReference> for AnswerValue {
    fn from(value: FileReference) -> Self {
        Self::File(value)
    }
}

impl From<BTreeSet<String>> for AnswerValue {
    fn from(value: BTreeSet<String>) -> Self {
        Self::Choices(value)
    }
}

fn number_to_string(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number == f64::INFINITY {
        "Infinity".to_string()
    } else if number == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if number == 0.0 {
        "0".to_string()
    } else if number.fract() == 0.0 {
        format!("{number:.0}")
    } else {
        number.to_string()
    }
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // Rust accepts "inf" and "nan" spellings that the browser does not.
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Respondent answers keyed by question id. Updates return a new set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<QuestionId, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.0.contains_key(id)
    }

    /// Key-wise replacement; `self` is left untouched.
    pub fn with_answer(&self, id: QuestionId, value: AnswerValue) -> Self {
        let mut next = self.0.clone();
        next.insert(id, value);
        Self(next)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, QuestionId, AnswerValue> {
        self.0.iter()
    }
}

impl FromIterator<(QuestionId, AnswerValue)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AnswerSet {
    type Item = (&'a QuestionId, &'a AnswerValue);
    type IntoIter = btree_map::Iter<'a, QuestionId, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
