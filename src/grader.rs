//! Automated quiz grading and per-quiz statistics.
//!
//! Submitted answers are compared to the stored correct option with exact
//! string equality (case-sensitive, no normalization). Option phrasing is
//! canonicalized at parse time, so bit-exact comparison here stays
//! unambiguous across clients.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{GradeResult, QuestionResult, Quiz};
use crate::errors::TutorError;

// Feedback tiers, evaluated top-down; the first threshold the score
// reaches wins, so each lower bound is inclusive.
const FEEDBACK_TIERS: &[(f32, [&str; 2])] = &[
  (90.0, [
    "Excellent work! You've mastered this topic.",
    "Consider exploring more advanced concepts in this subject.",
  ]),
  (80.0, [
    "Great job! You have a solid understanding of this topic.",
    "Review the incorrect answers to strengthen your knowledge.",
  ]),
  (70.0, [
    "Good effort! You're on the right track.",
    "Focus on the areas where you made mistakes.",
  ]),
  (60.0, [
    "You're making progress, but there's room for improvement.",
    "Review the fundamental concepts before moving forward.",
  ]),
  (0.0, [
    "This topic needs more attention.",
    "Consider reviewing the basics and asking the tutor for help.",
  ]),
];

fn subject_tip(subject: &str) -> Option<&'static str> {
  match subject {
    "Mathematics" => Some("Practice more problems to improve your mathematical thinking."),
    "Physics" => Some("Focus on understanding the underlying principles."),
    "Biology" => Some("Try to connect concepts to real-world examples."),
    _ => None,
  }
}

/// Grade a completed quiz against its stored correct answers.
/// An answer-count mismatch is a reported error, never a panic.
pub fn grade(quiz: &Quiz, answers: &[String]) -> Result<GradeResult, TutorError> {
  if answers.len() != quiz.questions.len() {
    return Err(TutorError::AnswerCountMismatch {
      expected: quiz.questions.len(),
      got: answers.len(),
    });
  }

  let mut correct = 0u32;
  let mut per_question = Vec::with_capacity(quiz.questions.len());
  for (question, selected) in quiz.questions.iter().zip(answers) {
    let is_correct = *selected == question.correct_option;
    if is_correct {
      correct += 1;
    }
    per_question.push(QuestionResult {
      question: question.text.clone(),
      selected: selected.clone(),
      correct_answer: question.correct_option.clone(),
      is_correct,
      explanation: question.explanation.clone(),
    });
  }

  let total = quiz.questions.len() as u32;
  let score_percentage = if total > 0 { correct as f32 * 100.0 / total as f32 } else { 0.0 };

  Ok(GradeResult {
    total,
    correct,
    score_percentage,
    per_question,
    feedback: build_feedback(score_percentage, &quiz.subject),
  })
}

fn build_feedback(score: f32, subject: &str) -> Vec<String> {
  let tier = FEEDBACK_TIERS
    .iter()
    .find(|(threshold, _)| score >= *threshold)
    .map(|(_, lines)| lines)
    .unwrap_or(&FEEDBACK_TIERS[FEEDBACK_TIERS.len() - 1].1);

  let mut feedback: Vec<String> = tier.iter().map(|s| s.to_string()).collect();
  if let Some(tip) = subject_tip(subject) {
    feedback.push(tip.to_string());
  }
  feedback
}

/// Per-quiz breakdown exposed to the dashboard: how the question texts
/// classify across cognitive kinds, plus the time budget.
#[derive(Clone, Debug, Serialize)]
pub struct QuizStatistics {
  pub total_questions: usize,
  pub question_kinds: BTreeMap<&'static str, usize>,
  pub difficulty: String,
  pub estimated_time_seconds: u32,
  pub subject: String,
  pub topic: String,
}

// Keyword tables checked in order; the first matching class wins.
const KIND_TABLE: &[(&str, &[&str])] = &[
  ("problem_solving", &["calculate", "solve", "find"]),
  ("conceptual", &["explain", "why", "how"]),
  ("critical_thinking", &["compare", "analyze", "evaluate"]),
];

pub fn quiz_statistics(quiz: &Quiz) -> QuizStatistics {
  let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
  for q in &quiz.questions {
    let text = q.text.to_lowercase();
    let kind = KIND_TABLE
      .iter()
      .find(|(_, words)| words.iter().any(|w| text.contains(w)))
      .map(|(name, _)| *name)
      .unwrap_or("recall");
    *kinds.entry(kind).or_insert(0) += 1;
  }

  QuizStatistics {
    total_questions: quiz.questions.len(),
    question_kinds: kinds,
    difficulty: quiz.difficulty.as_str().to_string(),
    estimated_time_seconds: quiz.time_limit_seconds,
    subject: quiz.subject.clone(),
    topic: quiz.topic.clone(),
  }
}
