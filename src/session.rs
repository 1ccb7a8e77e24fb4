//! Learner session aggregate, quiz lifecycle, and the session store.
//!
//! A [`LearnerSession`] owns one learner's question log, quiz records, and
//! analytics counters for the lifetime of the session. All collections are
//! append-only; the only mutable fields are the lifecycle status/timestamps
//! on a quiz record, written exactly once per transition.
//!
//! The core assumes at most one in-flight operation per session. Callers
//! that can race (two browser tabs) must go through [`SessionStore::update`],
//! which the in-memory implementation runs under its write lock.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::analytics::{infer_difficulty, infer_topic};
use crate::domain::{
  AnswerRecord, GradeResult, HistoryEntry, QuestionDifficulty, QuestionEntry, Quiz, QuizAttempt,
  QuizRecord, QuizStatus,
};
use crate::errors::TutorError;
use crate::grader;
use crate::util::now_epoch;

pub const FREE_QUIZ_LIMIT: u32 = 3;

/// Insertion-ordered topic -> count tallies. Order matters: analytics
/// report topics in the order they were first seen.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicCounts(Vec<(String, u32)>);

impl TopicCounts {
  pub fn bump(&mut self, topic: &str, by: u32) {
    match self.0.iter_mut().find(|(t, _)| t == topic) {
      Some((_, n)) => *n += by,
      None => self.0.push((topic.to_string(), by)),
    }
  }

  pub fn get(&self, topic: &str) -> u32 {
    self.0.iter().find(|(t, _)| t == topic).map(|(_, n)| *n).unwrap_or(0)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
    self.0.iter().map(|(t, n)| (t.as_str(), *n))
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerSession {
  pub id: String,
  pub created_at: u64,
  pub last_activity: u64,

  // Learning data
  pub questions: Vec<QuestionEntry>,
  pub quiz_attempts: Vec<QuizAttempt>,
  pub subjects_explored: Vec<String>,
  pub strength_counts: TopicCounts,
  pub gap_counts: TopicCounts,

  // Quiz lifecycle records, in generation order
  pub quiz_records: Vec<QuizRecord>,
  pub quiz_history: Vec<HistoryEntry>,

  // Subscription counters (enforcement is the collaborator's concern)
  pub is_premium: bool,
  pub quiz_generations: u32,
  pub free_quiz_limit: u32,
}

impl LearnerSession {
  pub fn new(id: impl Into<String>) -> Self {
    let now = now_epoch();
    Self {
      id: id.into(),
      created_at: now,
      last_activity: now,
      questions: Vec::new(),
      quiz_attempts: Vec::new(),
      subjects_explored: Vec::new(),
      strength_counts: TopicCounts::default(),
      gap_counts: TopicCounts::default(),
      quiz_records: Vec::new(),
      quiz_history: Vec::new(),
      is_premium: false,
      quiz_generations: 0,
      free_quiz_limit: FREE_QUIZ_LIMIT,
    }
  }

  fn touch(&mut self) {
    self.last_activity = now_epoch();
  }

  /// Record a student question with its structured answer. Topic and
  /// difficulty are inferred heuristically and feed the counters.
  pub fn add_question(&mut self, subject: &str, question_text: &str, answer: AnswerRecord) {
    let topic = infer_topic(subject, question_text);
    let difficulty = infer_difficulty(question_text);

    self.strength_counts.bump(&topic, 1);
    if difficulty == QuestionDifficulty::Advanced {
      self.gap_counts.bump(&topic, 1);
    }

    if !self.subjects_explored.iter().any(|s| s == subject) {
      self.subjects_explored.push(subject.to_string());
    }

    self.questions.push(QuestionEntry {
      subject: subject.to_string(),
      question_text: question_text.to_string(),
      topic,
      difficulty,
      answer,
      timestamp: now_epoch(),
    });
    self.touch();
  }

  /// Record a quiz attempt at score level. High scores strengthen the
  /// topic, low scores widen its gap.
  pub fn record_quiz_attempt(&mut self, subject: &str, quiz: &Quiz, score: f32, time_taken_seconds: u32) {
    if score >= 80.0 {
      self.strength_counts.bump(&quiz.topic, 2);
    } else if score < 60.0 {
      self.gap_counts.bump(&quiz.topic, 2);
    }

    if !self.subjects_explored.iter().any(|s| s == subject) {
      self.subjects_explored.push(subject.to_string());
    }

    self.quiz_attempts.push(QuizAttempt {
      subject: subject.to_string(),
      topic: quiz.topic.clone(),
      score,
      time_taken_seconds,
      timestamp: now_epoch(),
    });
    self.touch();
  }

  /// Take ownership of a generated quiz and open its lifecycle record in
  /// the `generated` state. Returns the record id.
  pub fn generate_quiz_record(&mut self, quiz: Quiz) -> String {
    let id = quiz.id.clone();
    self.quiz_records.push(QuizRecord {
      quiz,
      status: QuizStatus::Generated,
      generated_at: now_epoch(),
      started_at: None,
      completed_at: None,
      results: None,
    });
    self.quiz_generations += 1;
    self.touch();
    id
  }

  pub fn quiz_record(&self, quiz_id: &str) -> Option<&QuizRecord> {
    self.quiz_records.iter().find(|r| r.quiz.id == quiz_id)
  }

  fn quiz_record_mut(&mut self, quiz_id: &str) -> Result<&mut QuizRecord, TutorError> {
    self
      .quiz_records
      .iter_mut()
      .find(|r| r.quiz.id == quiz_id)
      .ok_or_else(|| TutorError::QuizNotFound(quiz_id.to_string()))
  }

  /// generated -> started. Records the start timestamp that anchors the
  /// answer-collection deadline (`quiz.time_limit_seconds` later).
  pub fn start(&mut self, quiz_id: &str) -> Result<&QuizRecord, TutorError> {
    let record = self.quiz_record_mut(quiz_id)?;
    if record.status != QuizStatus::Generated {
      return Err(TutorError::InvalidTransition { from: record.status, to: QuizStatus::Started });
    }
    record.status = QuizStatus::Started;
    record.started_at = Some(now_epoch());
    self.touch();
    Ok(self.quiz_record(quiz_id).expect("record just updated"))
  }

  /// started -> completed. Grades the submission, stores the result, and
  /// appends the history entry that drives analytics.
  pub fn complete(&mut self, quiz_id: &str, answers: &[String]) -> Result<GradeResult, TutorError> {
    let record = self.quiz_record_mut(quiz_id)?;
    if record.status != QuizStatus::Started {
      return Err(TutorError::InvalidTransition { from: record.status, to: QuizStatus::Completed });
    }

    let results = grader::grade(&record.quiz, answers)?;
    let completed_at = now_epoch();
    let time_taken = completed_at.saturating_sub(record.started_at.unwrap_or(completed_at)) as u32;

    record.status = QuizStatus::Completed;
    record.completed_at = Some(completed_at);
    record.results = Some(results.clone());

    let entry = HistoryEntry {
      quiz_id: quiz_id.to_string(),
      timestamp: completed_at,
      subject: record.quiz.subject.clone(),
      topic: record.quiz.topic.clone(),
      difficulty: record.quiz.difficulty,
      score: results.score_percentage,
      time_taken_seconds: time_taken,
      total_questions: results.total,
      correct_answers: results.correct,
    };

    // Completed quizzes weigh heavier than single questions or raw
    // attempt records.
    if entry.score >= 80.0 {
      self.strength_counts.bump(&entry.topic, 3);
    } else if entry.score < 60.0 {
      self.gap_counts.bump(&entry.topic, 3);
    }

    self.quiz_history.push(entry);
    self.touch();
    Ok(results)
  }

  /// Records still awaiting a start or a submission, in generation order.
  pub fn active_quizzes(&self) -> Vec<&QuizRecord> {
    self
      .quiz_records
      .iter()
      .filter(|r| matches!(r.status, QuizStatus::Generated | QuizStatus::Started))
      .collect()
  }

  /// Completed history, newest first.
  pub fn quiz_history_desc(&self) -> Vec<HistoryEntry> {
    let mut entries = self.quiz_history.clone();
    entries.reverse();
    entries
  }

  // ---------------- Subscription counters -----------------

  pub fn can_generate_quiz(&self) -> bool {
    self.is_premium || self.quiz_generations < self.free_quiz_limit
  }

  /// Remaining free-tier generations; -1 means unlimited (premium).
  pub fn remaining_free_quizzes(&self) -> i64 {
    if self.is_premium {
      -1
    } else {
      i64::from(self.free_quiz_limit.saturating_sub(self.quiz_generations))
    }
  }

  pub fn upgrade_to_premium(&mut self) {
    self.is_premium = true;
    self.touch();
  }
}

/// Session storage boundary. The core never touches process-wide state;
/// whatever holds the sessions is injected through this trait.
pub trait SessionStore: Send + Sync {
  fn get(&self, id: &str) -> Option<LearnerSession>;
  fn put(&self, session: LearnerSession);
  fn remove(&self, id: &str) -> bool;
  /// Run a mutation against the stored session, serialized by the store.
  /// Returns false when the session does not exist.
  fn update(&self, id: &str, f: &mut dyn FnMut(&mut LearnerSession)) -> bool;
  fn len(&self) -> usize;
}

/// Process-local store backing the default deployment. Mutations run under
/// the write lock, satisfying the per-session serialization contract.
#[derive(Default)]
pub struct InMemorySessionStore {
  inner: RwLock<HashMap<String, LearnerSession>>,
}

impl InMemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SessionStore for InMemorySessionStore {
  fn get(&self, id: &str) -> Option<LearnerSession> {
    self.inner.read().expect("session store lock").get(id).cloned()
  }

  fn put(&self, session: LearnerSession) {
    self.inner.write().expect("session store lock").insert(session.id.clone(), session);
  }

  fn remove(&self, id: &str) -> bool {
    self.inner.write().expect("session store lock").remove(id).is_some()
  }

  fn update(&self, id: &str, f: &mut dyn FnMut(&mut LearnerSession)) -> bool {
    let mut guard = self.inner.write().expect("session store lock");
    match guard.get_mut(id) {
      Some(session) => {
        f(session);
        true
      }
      None => false,
    }
  }

  fn len(&self) -> usize {
    self.inner.read().expect("session store lock").len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;
  use crate::fallback::{fallback_answer, fallback_quiz};

  fn session_with_quiz() -> (LearnerSession, String) {
    let mut session = LearnerSession::new("s1");
    let quiz = fallback_quiz("Physics", "Mechanics", Difficulty::Intermediate, 2);
    let id = session.generate_quiz_record(quiz);
    (session, id)
  }

  fn correct_answers(session: &LearnerSession, id: &str) -> Vec<String> {
    session
      .quiz_record(id)
      .unwrap()
      .quiz
      .questions
      .iter()
      .map(|q| q.correct_option.clone())
      .collect()
  }

  #[test]
  fn lifecycle_happy_path() {
    let (mut session, id) = session_with_quiz();
    assert_eq!(session.quiz_record(&id).unwrap().status, QuizStatus::Generated);

    session.start(&id).expect("start");
    assert_eq!(session.quiz_record(&id).unwrap().status, QuizStatus::Started);
    assert!(session.quiz_record(&id).unwrap().started_at.is_some());

    let answers = correct_answers(&session, &id);
    let results = session.complete(&id, &answers).expect("complete");
    assert_eq!(results.score_percentage, 100.0);

    let record = session.quiz_record(&id).unwrap();
    assert_eq!(record.status, QuizStatus::Completed);
    assert!(record.completed_at.is_some());
    assert_eq!(session.quiz_history.len(), 1);
    assert_eq!(session.quiz_history[0].correct_answers, 2);
  }

  #[test]
  fn complete_before_start_is_invalid() {
    let (mut session, id) = session_with_quiz();
    let answers = correct_answers(&session, &id);
    let err = session.complete(&id, &answers).unwrap_err();
    assert_eq!(
      err,
      TutorError::InvalidTransition { from: QuizStatus::Generated, to: QuizStatus::Completed }
    );
  }

  #[test]
  fn double_start_is_invalid() {
    let (mut session, id) = session_with_quiz();
    session.start(&id).expect("first start");
    let err = session.start(&id).unwrap_err();
    assert_eq!(
      err,
      TutorError::InvalidTransition { from: QuizStatus::Started, to: QuizStatus::Started }
    );
  }

  #[test]
  fn completed_record_cannot_restart_or_recomplete() {
    let (mut session, id) = session_with_quiz();
    session.start(&id).expect("start");
    let answers = correct_answers(&session, &id);
    session.complete(&id, &answers).expect("complete");

    assert!(matches!(session.start(&id), Err(TutorError::InvalidTransition { .. })));
    assert!(matches!(session.complete(&id, &answers), Err(TutorError::InvalidTransition { .. })));
  }

  #[test]
  fn wrong_answer_count_surfaces_and_leaves_record_started() {
    let (mut session, id) = session_with_quiz();
    session.start(&id).expect("start");
    let err = session.complete(&id, &["only one".to_string()]).unwrap_err();
    assert_eq!(err, TutorError::AnswerCountMismatch { expected: 2, got: 1 });
    assert_eq!(session.quiz_record(&id).unwrap().status, QuizStatus::Started);
  }

  #[test]
  fn unknown_quiz_id_is_reported() {
    let mut session = LearnerSession::new("s2");
    assert!(matches!(session.start("missing"), Err(TutorError::QuizNotFound(_))));
  }

  #[test]
  fn free_tier_counters() {
    let mut session = LearnerSession::new("s3");
    assert!(session.can_generate_quiz());
    assert_eq!(session.remaining_free_quizzes(), 3);

    for _ in 0..3 {
      let quiz = fallback_quiz("Biology", "Cell Biology", Difficulty::Beginner, 1);
      session.generate_quiz_record(quiz);
    }
    assert!(!session.can_generate_quiz());
    assert_eq!(session.remaining_free_quizzes(), 0);

    session.upgrade_to_premium();
    assert!(session.can_generate_quiz());
    assert_eq!(session.remaining_free_quizzes(), -1);
  }

  #[test]
  fn add_question_updates_counters_and_subjects() {
    let mut session = LearnerSession::new("s4");
    let answer = fallback_answer("Mathematics", "Prove that the square root of 2 is irrational");
    session.add_question("Mathematics", "Prove that the square root of 2 is irrational", answer);

    assert_eq!(session.subjects_explored, vec!["Mathematics".to_string()]);
    assert_eq!(session.questions.len(), 1);
    assert_eq!(session.questions[0].difficulty, QuestionDifficulty::Advanced);
    // An advanced question opens a gap on its topic.
    assert_eq!(session.gap_counts.get(&session.questions[0].topic), 1);
  }

  #[test]
  fn store_round_trip_and_update() {
    let store = InMemorySessionStore::new();
    assert!(store.get("a").is_none());

    store.put(LearnerSession::new("a"));
    assert_eq!(store.len(), 1);

    let updated = store.update("a", &mut |s| s.upgrade_to_premium());
    assert!(updated);
    assert!(store.get("a").unwrap().is_premium);

    assert!(store.remove("a"));
    assert!(!store.remove("a"));
  }

  #[test]
  fn session_round_trips_through_json() {
    let (mut session, id) = session_with_quiz();
    session.start(&id).expect("start");
    let answers = correct_answers(&session, &id);
    session.complete(&id, &answers).expect("complete");

    let json = serde_json::to_string(&session).expect("serialize");
    let back: LearnerSession = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.quiz_history.len(), 1);
    assert_eq!(back.quiz_record(&id).unwrap().status, QuizStatus::Completed);
  }
}
