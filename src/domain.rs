//! Domain models used by the backend: answers, quizzes, lifecycle records,
//! grading results, and the per-session learning log.

use serde::{Deserialize, Serialize};

/// Requested quiz difficulty. Also drives the per-question time budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::Intermediate }
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }

  /// Parse a client-supplied difficulty, defaulting to intermediate.
  pub fn parse_or_default(s: &str) -> Self {
    match s.trim().to_lowercase().as_str() {
      "beginner" => Difficulty::Beginner,
      "advanced" => Difficulty::Advanced,
      _ => Difficulty::Intermediate,
    }
  }

  /// Seconds budgeted per question at this difficulty.
  pub fn seconds_per_question(&self) -> u32 {
    match self {
      Difficulty::Beginner => 90,
      Difficulty::Intermediate => 75,
      Difficulty::Advanced => 60,
    }
  }

  /// Total time limit for a quiz: per-question budget plus a flat buffer.
  pub fn time_limit_seconds(&self, num_questions: usize) -> u32 {
    const BUFFER_SECS: u32 = 300;
    self.seconds_per_question() * num_questions as u32 + BUFFER_SECS
  }
}

/// Inferred difficulty of a free-text student question. Distinct from
/// [`Difficulty`]: the lowest band is "basic", not "beginner".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionDifficulty {
  Basic,
  Intermediate,
  Advanced,
}

/// Structured explanation produced for a single student question.
/// Every field must be present and well-shaped or the record is rejected
/// by the schema validator; immutable once returned.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
  pub key_points: Vec<String>,
  pub step_by_step: String,
  pub real_world_example: String,
  pub common_mistakes: Vec<String>,
  pub additional_tips: Vec<String>,
}

/// One multiple-choice question. `correct_option` holds the full option
/// text and must equal one of `options`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
  pub text: String,
  pub options: Vec<String>,
  pub correct_option: String,
  pub explanation: String,
}

/// A titled set of multiple-choice questions. Read-only after creation;
/// lifecycle status lives on the wrapping [`QuizRecord`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
  pub id: String,
  pub title: String,
  pub subject: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub questions: Vec<QuizQuestion>,
  pub time_limit_seconds: u32,
}

/// Where a quiz or answer came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
  Generated,
  Fallback,
}

/// Lifecycle states of a quiz record. Transitions only move forward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
  Generated,
  Started,
  Completed,
}

impl QuizStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuizStatus::Generated => "generated",
      QuizStatus::Started => "started",
      QuizStatus::Completed => "completed",
    }
  }
}

impl std::fmt::Display for QuizStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Lifecycle wrapper owning a [`Quiz`]. Status, timestamps, and results
/// are written exactly once per transition; nothing else mutates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizRecord {
  pub quiz: Quiz,
  pub status: QuizStatus,
  pub generated_at: u64,
  pub started_at: Option<u64>,
  pub completed_at: Option<u64>,
  pub results: Option<GradeResult>,
}

/// Per-question grading outcome.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionResult {
  pub question: String,
  pub selected: String,
  pub correct_answer: String,
  pub is_correct: bool,
  pub explanation: String,
}

/// The scored outcome of a completed quiz attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GradeResult {
  pub total: u32,
  pub correct: u32,
  pub score_percentage: f32,
  pub per_question: Vec<QuestionResult>,
  pub feedback: Vec<String>,
}

/// One entry in the session's question log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionEntry {
  pub subject: String,
  pub question_text: String,
  pub topic: String,
  pub difficulty: QuestionDifficulty,
  pub answer: AnswerRecord,
  pub timestamp: u64,
}

/// A recorded quiz attempt (score-level view, fed to subject analytics).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizAttempt {
  pub subject: String,
  pub topic: String,
  pub score: f32,
  pub time_taken_seconds: u32,
  pub timestamp: u64,
}

/// Completed-quiz history entry appended by the lifecycle on completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub quiz_id: String,
  pub timestamp: u64,
  pub subject: String,
  pub topic: String,
  pub difficulty: Difficulty,
  pub score: f32,
  pub time_taken_seconds: u32,
  pub total_questions: u32,
  pub correct_answers: u32,
}

/// Priority attached to a recommendation. Higher sorts first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  High,
  Medium,
}

impl Priority {
  pub fn rank(&self) -> u8 {
    match self {
      Priority::High => 2,
      Priority::Medium => 1,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
  SubjectFocus,
  TopicExploration,
  GapFilling,
  QuizPractice,
  QuizAdvancement,
  Engagement,
}

/// One personalized learning recommendation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recommendation {
  pub kind: RecommendationKind,
  pub priority: Priority,
  pub title: String,
  pub description: String,
  pub action: String,
  pub subject: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn time_limit_scales_with_difficulty_and_count() {
    assert_eq!(Difficulty::Beginner.time_limit_seconds(5), 5 * 90 + 300);
    assert_eq!(Difficulty::Intermediate.time_limit_seconds(4), 4 * 75 + 300);
    assert_eq!(Difficulty::Advanced.time_limit_seconds(10), 10 * 60 + 300);
  }

  #[test]
  fn difficulty_parse_defaults_to_intermediate() {
    assert_eq!(Difficulty::parse_or_default("Beginner"), Difficulty::Beginner);
    assert_eq!(Difficulty::parse_or_default("ADVANCED"), Difficulty::Advanced);
    assert_eq!(Difficulty::parse_or_default("nonsense"), Difficulty::Intermediate);
  }

  #[test]
  fn quiz_round_trips_through_json() {
    let quiz = Quiz {
      id: "q1".into(),
      title: "Algebra Basics".into(),
      subject: "Mathematics".into(),
      topic: "Algebra".into(),
      difficulty: Difficulty::Beginner,
      questions: vec![QuizQuestion {
        text: "What is 2 + 2?".into(),
        options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
        correct_option: "4".into(),
        explanation: "Two plus two equals four.".into(),
      }],
      time_limit_seconds: 390,
    };
    let json = serde_json::to_string(&quiz).expect("serialize");
    let back: Quiz = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(quiz, back);
  }

  #[test]
  fn grade_result_round_trips_through_json() {
    let result = GradeResult {
      total: 2,
      correct: 1,
      score_percentage: 50.0,
      per_question: vec![QuestionResult {
        question: "What is the SI unit of force?".into(),
        selected: "Joule (J)".into(),
        correct_answer: "Newton (N)".into(),
        is_correct: false,
        explanation: "Force is measured in Newtons.".into(),
      }],
      feedback: vec!["This topic needs more attention.".into()],
    };
    let json = serde_json::to_string(&result).expect("serialize");
    let back: GradeResult = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(result, back);
  }
}
