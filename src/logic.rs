//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This is where the recovery chain lives: gate check, provider tiers in
//! order, parse + validate, and finally the deterministic fallback bank.
//! A learner always receives a schema-valid answer or quiz; only
//! structural misuse (bad transition, wrong answer count, unknown ids)
//! surfaces as a typed error.

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::analytics;
use crate::domain::{AnswerRecord, ContentSource, Difficulty, GradeResult, Quiz, QuizRecord};
use crate::errors::TutorError;
use crate::fallback::{fallback_answer, fallback_quiz};
use crate::parser::{parse_answer, parse_quiz, RawResponse};
use crate::state::AppState;
use crate::validate::{validate_answer, validate_quiz};

/// Produce a validated answer for a student question. Provider tiers are
/// tried in order when the gate allows; anything unusable drops to the
/// fallback bank.
#[instrument(level = "info", skip(state, question), fields(%subject, question_len = question.len()))]
pub async fn generate_answer(state: &AppState, subject: &str, question: &str) -> (AnswerRecord, ContentSource) {
  if let Some(provider) = &state.provider {
    if !state.gate.is_available() {
      warn!(target: "tutor", %subject, "Provider gated off; serving fallback answer");
    } else {
      for model in provider.tiers() {
        match provider.generate_answer_text(&state.prompts, model, subject, question).await {
          Ok(text) => {
            let raw = RawResponse::Text(text);
            if let Some(candidate) = parse_answer(&raw) {
              if validate_answer(&candidate) {
                match serde_json::from_value::<AnswerRecord>(candidate) {
                  Ok(answer) => {
                    info!(target: "tutor", %subject, %model, "Answer generated");
                    return (answer, ContentSource::Generated);
                  }
                  Err(e) => error!(target: "tutor", %model, error = %e, "Validated answer failed to convert"),
                }
              } else {
                warn!(target: "tutor", %model, "Answer failed schema validation; falling back");
              }
            } else {
              warn!(target: "tutor", %model, "Answer text unparseable after repairs; falling back");
            }
            // Parse/schema failures are content problems, not transport
            // problems; another tier would get the same prompt, so stop.
            break;
          }
          Err(e) => {
            let class = state.gate.record_failure(&e);
            error!(target: "tutor", %model, ?class, error = %e, "Provider call failed; trying next tier");
            if !state.gate.is_available() {
              break;
            }
          }
        }
      }
    }
  }

  info!(target: "tutor", %subject, "Serving fallback answer");
  (fallback_answer(subject, question), ContentSource::Fallback)
}

/// Produce a validated quiz of exactly `count` questions.
#[instrument(level = "info", skip(state), fields(%subject, %topic, difficulty = %difficulty.as_str(), count))]
pub async fn generate_quiz(
  state: &AppState,
  subject: &str,
  topic: &str,
  difficulty: Difficulty,
  count: usize,
) -> (Quiz, ContentSource) {
  if let Some(provider) = &state.provider {
    if !state.gate.is_available() {
      warn!(target: "quiz", %subject, %topic, "Provider gated off; serving fallback quiz");
    } else {
      for model in provider.tiers() {
        match provider.generate_quiz_text(&state.prompts, model, subject, topic, difficulty, count).await {
          Ok(text) => {
            let raw = RawResponse::Text(text);
            if let Some(draft) = parse_quiz(&raw, count) {
              if validate_quiz(&draft, count) {
                let quiz = Quiz {
                  id: Uuid::new_v4().to_string(),
                  title: draft.title,
                  subject: subject.to_string(),
                  topic: topic.to_string(),
                  difficulty,
                  time_limit_seconds: difficulty.time_limit_seconds(count),
                  questions: draft.questions,
                };
                info!(target: "quiz", id = %quiz.id, %model, "Quiz generated");
                return (quiz, ContentSource::Generated);
              }
              warn!(target: "quiz", %model, questions = draft.questions.len(), expected = count, "Quiz draft failed validation; falling back");
            } else {
              warn!(target: "quiz", %model, "Quiz text unparseable; falling back");
            }
            break;
          }
          Err(e) => {
            let class = state.gate.record_failure(&e);
            error!(target: "quiz", %model, ?class, error = %e, "Provider call failed; trying next tier");
            if !state.gate.is_available() {
              break;
            }
          }
        }
      }
    }
  }

  info!(target: "quiz", %subject, %topic, "Serving fallback quiz");
  (fallback_quiz(subject, topic, difficulty, count), ContentSource::Fallback)
}

/// Outcome of an "ask the tutor" request.
pub struct AskOutcome {
  pub session_id: String,
  pub answer: AnswerRecord,
  pub source: ContentSource,
  pub learning_tip: String,
}

/// Answer a question and record it in the learner's session.
#[instrument(level = "info", skip(state, question), fields(%subject, question_len = question.len()))]
pub async fn ask(state: &AppState, session_id: Option<&str>, subject: &str, question: &str) -> AskOutcome {
  let sid = state.ensure_session(session_id);
  let (answer, source) = generate_answer(state, subject, question).await;

  let mut tip = String::new();
  state.sessions.update(&sid, &mut |session| {
    session.add_question(subject, question, answer.clone());
    tip = analytics::learning_tip(session, subject);
  });

  info!(target: "tutor", session_id = %sid, ?source, "Question answered and recorded");
  AskOutcome { session_id: sid, answer, source, learning_tip: tip }
}

/// Generate a quiz and open its lifecycle record in the session.
#[instrument(level = "info", skip(state), fields(%subject, %topic, count))]
pub async fn create_quiz(
  state: &AppState,
  session_id: &str,
  subject: &str,
  topic: &str,
  difficulty: Difficulty,
  count: usize,
) -> Result<(Quiz, ContentSource), TutorError> {
  let (quiz, source) = generate_quiz(state, subject, topic, difficulty, count).await;

  let mut stored = false;
  state.sessions.update(session_id, &mut |session| {
    session.generate_quiz_record(quiz.clone());
    stored = true;
  });
  if !stored {
    return Err(TutorError::SessionNotFound(session_id.to_string()));
  }

  info!(target: "quiz", session_id = %session_id, quiz_id = %quiz.id, ?source, "Quiz recorded in session");
  Ok((quiz, source))
}

/// Transition a quiz to `started` and return the updated record.
#[instrument(level = "info", skip(state), fields(%session_id, %quiz_id))]
pub fn start_quiz(state: &AppState, session_id: &str, quiz_id: &str) -> Result<QuizRecord, TutorError> {
  let mut outcome: Option<Result<QuizRecord, TutorError>> = None;
  let found = state.sessions.update(session_id, &mut |session| {
    outcome = Some(session.start(quiz_id).map(|r| r.clone()));
  });
  if !found {
    return Err(TutorError::SessionNotFound(session_id.to_string()));
  }
  outcome.expect("update ran")
}

/// Grade a submission, transition the quiz to `completed`, and record the
/// attempt for analytics.
#[instrument(level = "info", skip(state, answers), fields(%session_id, %quiz_id, answers = answers.len()))]
pub fn submit_quiz(
  state: &AppState,
  session_id: &str,
  quiz_id: &str,
  answers: &[String],
) -> Result<GradeResult, TutorError> {
  let mut outcome: Option<Result<GradeResult, TutorError>> = None;
  let found = state.sessions.update(session_id, &mut |session| {
    let result = session.complete(quiz_id, answers);
    if let Ok(grade) = &result {
      let record = session.quiz_record(quiz_id).expect("record just completed").clone();
      let time_taken = session
        .quiz_history
        .last()
        .map(|h| h.time_taken_seconds)
        .unwrap_or(0);
      session.record_quiz_attempt(&record.quiz.subject, &record.quiz, grade.score_percentage, time_taken);
    }
    outcome = Some(result);
  });
  if !found {
    return Err(TutorError::SessionNotFound(session_id.to_string()));
  }
  outcome.expect("update ran")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;
  use crate::session::InMemorySessionStore;
  use std::sync::Arc;

  fn offline_state() -> AppState {
    AppState::with_store(Arc::new(InMemorySessionStore::new()), None, Prompts::default())
  }

  #[tokio::test]
  async fn ask_without_provider_serves_fallback_and_records_question() {
    let state = offline_state();
    let outcome = ask(&state, None, "Physics", "What is mechanics about?").await;
    assert_eq!(outcome.source, ContentSource::Fallback);
    assert!(!outcome.answer.key_points.is_empty());
    assert!(outcome.learning_tip.starts_with("Great start!"), "tip reflects the recorded question");

    let session = state.sessions.get(&outcome.session_id).expect("session");
    assert_eq!(session.questions.len(), 1);
    assert_eq!(session.questions[0].topic, "Mechanics");
  }

  #[tokio::test]
  async fn full_quiz_flow_offline() {
    let state = offline_state();
    let sid = state.ensure_session(None);

    let (quiz, source) =
      create_quiz(&state, &sid, "Mathematics", "Algebra", Difficulty::Beginner, 4).await.expect("create");
    assert_eq!(source, ContentSource::Fallback);
    assert_eq!(quiz.questions.len(), 4);

    let record = start_quiz(&state, &sid, &quiz.id).expect("start");
    assert!(record.started_at.is_some());

    let answers: Vec<String> = quiz.questions.iter().map(|q| q.correct_option.clone()).collect();
    let results = submit_quiz(&state, &sid, &quiz.id, &answers).expect("submit");
    assert_eq!(results.score_percentage, 100.0);

    let session = state.sessions.get(&sid).expect("session");
    assert_eq!(session.quiz_history.len(), 1);
    assert_eq!(session.quiz_attempts.len(), 1);
    assert_eq!(session.quiz_attempts[0].score, 100.0);
  }

  #[tokio::test]
  async fn lifecycle_misuse_surfaces_typed_errors() {
    let state = offline_state();
    let sid = state.ensure_session(None);
    let (quiz, _) =
      create_quiz(&state, &sid, "Biology", "Cell Biology", Difficulty::Intermediate, 2).await.expect("create");

    let answers: Vec<String> = quiz.questions.iter().map(|q| q.correct_option.clone()).collect();
    assert!(matches!(
      submit_quiz(&state, &sid, &quiz.id, &answers),
      Err(TutorError::InvalidTransition { .. })
    ));

    start_quiz(&state, &sid, &quiz.id).expect("start");
    assert!(matches!(
      start_quiz(&state, &sid, &quiz.id),
      Err(TutorError::InvalidTransition { .. })
    ));

    assert!(matches!(
      submit_quiz(&state, &sid, &quiz.id, &answers[..1]),
      Err(TutorError::AnswerCountMismatch { expected: 2, got: 1 })
    ));
  }

  #[tokio::test]
  async fn unknown_session_is_reported() {
    let state = offline_state();
    assert!(matches!(
      start_quiz(&state, "ghost", "q"),
      Err(TutorError::SessionNotFound(_))
    ));
  }
}
