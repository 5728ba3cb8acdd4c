//! Conditional visibility: the per-question predicate and the save-time dependency check.

use std::collections::{HashMap, HashSet};

use super::answer::{AnswerSet, AnswerValue};
use super::question::{Condition, ConditionalRule, Question, QuestionId};

/// Decides whether `question` is shown for the current answers.
///
/// Questions without a rule are always visible. A rule whose dependency has no answer
/// (unanswered, or an id that matches no question) hides the question.
pub fn is_visible(question: &Question, answers: &AnswerSet) -> bool {
    let Some(rule) = &question.conditional else {
        return true;
    };

    match answers.get(&rule.depends_on) {
        Some(dependency) => rule.matches(dependency),
        None => false,
    }
}

impl ConditionalRule {
    /// Compares the dependency's answer against the rule operand.
    pub fn matches(&self, dependency: &AnswerValue) -> bool {
        match self.condition {
            Condition::Equals => dependency == &self.value,
            Condition::NotEquals => dependency != &self.value,
            Condition::Contains => contains(dependency, &self.value),
            Condition::GreaterThan => dependency.coerce_number() > self.value.coerce_number(),
            Condition::LessThan => dependency.coerce_number() < self.value.coerce_number(),
        }
    }
}

fn contains(dependency: &AnswerValue, operand: &AnswerValue) -> bool {
    match dependency {
        AnswerValue::Choices(selected) => match operand {
            AnswerValue::Text(option) => selected.contains(option),
            _ => false,
        },
        other => other
            .coerce_string()
            .contains(operand.coerce_string().as_str()),
    }
}

/// A rule pointing at an id that is not part of the assessment. Valid, but always hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub question: QuestionId,
    pub depends_on: QuestionId,
}

/// Dependency shapes that leave questions permanently hidden.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    #[error("question {question} depends on itself")]
    SelfReference { question: QuestionId },
    #[error("conditional dependencies form a cycle: {}", join_path(.path))]
    Cycle { path: Vec<QuestionId> },
}

fn join_path(path: &[QuestionId]) -> String {
    path.iter()
        .map(QuestionId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result of walking the `dependsOn` parent pointers of an assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub dangling: Vec<DanglingReference>,
    pub errors: Vec<DependencyError>,
}

impl DependencyReport {
    pub fn is_acyclic(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walks every question's parent pointer, reporting dangling targets, self references
/// and cycles. Each cycle is reported once, starting at the first question reached.
pub fn check_dependencies(questions: &[Question]) -> DependencyReport {
    let known: HashSet<&QuestionId> = questions.iter().map(|question| &question.id).collect();
    let mut parents: HashMap<&QuestionId, &QuestionId> = HashMap::new();
    let mut report = DependencyReport::default();

    for question in questions {
        let Some(rule) = &question.conditional else {
            continue;
        };

        if rule.depends_on == question.id {
            report.errors.push(DependencyError::SelfReference {
                question: question.id.clone(),
            });
        } else if known.contains(&rule.depends_on) {
            parents.insert(&question.id, &rule.depends_on);
        } else {
            report.dangling.push(DanglingReference {
                question: question.id.clone(),
                depends_on: rule.depends_on.clone(),
            });
        }
    }

    let mut settled: HashSet<&QuestionId> = HashSet::new();
    for question in questions {
        let mut path: Vec<&QuestionId> = Vec::new();
        let mut current = &question.id;

        loop {
            if settled.contains(current) {
                break;
            }
            if let Some(start) = path.iter().position(|id| *id == current) {
                report.errors.push(DependencyError::Cycle {
                    path: path[start..].iter().map(|id| (*id).clone()).collect(),
                });
                break;
            }
            path.push(current);
            match parents.get(current) {
                Some(parent) => current = *parent,
                None => break,
            }
        }

        settled.extend(path);
    }

    report
}
