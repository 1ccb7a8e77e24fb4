//! Core error taxonomy.
//!
//! Content-generation failures (unparseable or schema-violating provider
//! output, provider unavailability) are absorbed by the fallback chain and
//! never surface here. What remains is structural misuse and lookups that
//! the immediate caller must handle explicitly.

use thiserror::Error;

use crate::domain::QuizStatus;

#[derive(Error, Debug, PartialEq)]
pub enum TutorError {
  #[error("invalid quiz transition: {from} -> {to}")]
  InvalidTransition { from: QuizStatus, to: QuizStatus },

  #[error("answer count mismatch: quiz has {expected} questions, got {got} answers")]
  AnswerCountMismatch { expected: usize, got: usize },

  #[error("quiz not found: {0}")]
  QuizNotFound(String),

  #[error("session not found: {0}")]
  SessionNotFound(String),

  #[error("free quiz limit reached ({limit})")]
  SubscriptionLimit { limit: u32 },

  #[error("provider unavailable: {0}")]
  ProviderUnavailable(String),
}
