//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic. Each handler is instrumented; structural misuse maps to explicit
//! status codes, content failures never surface (the fallback chain
//! absorbs them).

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::analytics;
use crate::domain::Difficulty;
use crate::errors::TutorError;
use crate::grader::quiz_statistics;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

fn error_response(err: TutorError) -> (StatusCode, Json<ErrorOut>) {
  let status = match &err {
    TutorError::InvalidTransition { .. } => StatusCode::CONFLICT,
    TutorError::AnswerCountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    TutorError::QuizNotFound(_) | TutorError::SessionNotFound(_) => StatusCode::NOT_FOUND,
    TutorError::SubscriptionLimit { .. } => StatusCode::FORBIDDEN,
    TutorError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
  };
  (status, Json(ErrorOut { error: err.to_string() }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, active_sessions: state.sessions.len() })
}

#[instrument(level = "info", skip(state, body), fields(question_len = body.question.len()))]
pub async fn http_post_ask(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AskIn>,
) -> Result<Json<AskOut>, (StatusCode, Json<ErrorOut>)> {
  if body.question.trim().is_empty() {
    return Err((StatusCode::BAD_REQUEST, Json(ErrorOut { error: "Please provide a question".into() })));
  }
  let subject = body.subject.unwrap_or_else(|| "General".into());
  let outcome = logic::ask(&state, body.session_id.as_deref(), &subject, &body.question).await;
  info!(target: "tutor", session_id = %outcome.session_id, %subject, "HTTP ask served");
  Ok(Json(AskOut {
    session_id: outcome.session_id,
    subject,
    answer_markdown: render_answer_markdown(&outcome.answer),
    answer: outcome.answer,
    source: outcome.source,
    learning_tip: outcome.learning_tip,
  }))
}

#[instrument(level = "info", skip(state, body), fields(%body.subject, %body.topic))]
pub async fn http_post_generate_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateQuizIn>,
) -> Result<Json<GenerateQuizOut>, (StatusCode, Json<ErrorOut>)> {
  let session_id = state.ensure_session(body.session_id.as_deref());

  // Subscription gate: consulted at the boundary, not enforced by the core.
  let session = state
    .sessions
    .get(&session_id)
    .ok_or_else(|| error_response(TutorError::SessionNotFound(session_id.clone())))?;
  if !session.can_generate_quiz() {
    return Err(error_response(TutorError::SubscriptionLimit { limit: session.free_quiz_limit }));
  }

  let difficulty = Difficulty::parse_or_default(body.difficulty.as_deref().unwrap_or_default());
  let count = match body.num_questions {
    Some(n) if (3..=10).contains(&n) => n,
    _ => 5,
  };

  let (quiz, source) = logic::create_quiz(&state, &session_id, &body.subject, &body.topic, difficulty, count)
    .await
    .map_err(error_response)?;
  let statistics = quiz_statistics(&quiz);
  let remaining = state
    .sessions
    .get(&session_id)
    .map(|s| s.remaining_free_quizzes())
    .unwrap_or(0);

  info!(target: "quiz", %session_id, quiz_id = %quiz.id, ?source, "HTTP quiz generated");
  Ok(Json(GenerateQuizOut { session_id, quiz, source, statistics, remaining_free_quizzes: remaining }))
}

#[instrument(level = "info")]
pub async fn http_get_available() -> impl IntoResponse {
  Json(AvailableOut {
    available_quizzes: analytics::curriculum()
      .iter()
      .map(|(s, ts)| SubjectTopics {
        subject: s.to_string(),
        topics: ts.iter().map(|t| t.to_string()).collect(),
      })
      .collect(),
    difficulty_levels: vec!["beginner", "intermediate", "advanced"],
  })
}

#[instrument(level = "info", skip(state), fields(%quiz_id))]
pub async fn http_post_start_quiz(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
  Json(body): Json<SessionRef>,
) -> Result<Json<StartQuizOut>, (StatusCode, Json<ErrorOut>)> {
  let record = logic::start_quiz(&state, &body.session_id, &quiz_id).map_err(error_response)?;
  let started_at = record.started_at.unwrap_or_default();
  info!(target: "quiz", session_id = %body.session_id, %quiz_id, "HTTP quiz started");
  Ok(Json(StartQuizOut {
    quiz_id,
    status: record.status,
    started_at,
    time_limit_seconds: record.quiz.time_limit_seconds,
    answer_deadline: started_at + u64::from(record.quiz.time_limit_seconds),
  }))
}

#[instrument(level = "info", skip(state, body), fields(%quiz_id, answers = body.answers.len()))]
pub async fn http_post_submit_quiz(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
  Json(body): Json<SubmitQuizIn>,
) -> Result<Json<SubmitQuizOut>, (StatusCode, Json<ErrorOut>)> {
  let results = logic::submit_quiz(&state, &body.session_id, &quiz_id, &body.answers).map_err(error_response)?;
  info!(
    target: "quiz",
    session_id = %body.session_id,
    %quiz_id,
    score = %format!("{:.1}", results.score_percentage),
    "HTTP quiz submitted"
  );
  Ok(Json(SubmitQuizOut { session_id: body.session_id, quiz_id, results }))
}

#[instrument(level = "info", skip(state), fields(session_id = %q.session_id))]
pub async fn http_get_quiz_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionRef>,
) -> Result<Json<QuizHistoryOut>, (StatusCode, Json<ErrorOut>)> {
  let session = state
    .sessions
    .get(&q.session_id)
    .ok_or_else(|| error_response(TutorError::SessionNotFound(q.session_id.clone())))?;
  Ok(Json(QuizHistoryOut { session_id: q.session_id, quiz_history: session.quiz_history_desc() }))
}

#[instrument(level = "info", skip(state), fields(session_id = %q.session_id))]
pub async fn http_get_dashboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionRef>,
) -> Result<Json<DashboardOut>, (StatusCode, Json<ErrorOut>)> {
  let session = state
    .sessions
    .get(&q.session_id)
    .ok_or_else(|| error_response(TutorError::SessionNotFound(q.session_id.clone())))?;
  Ok(Json(DashboardOut {
    session_id: q.session_id,
    progress_summary: analytics::progress_summary(&session),
    subject_analytics: analytics::subject_analytics(&session),
    performance_breakdown: analytics::quiz_performance_breakdown(&session),
    recommendations: analytics::recommendations(&session),
    recent_activity: analytics::learning_history(&session, 5),
    quiz_history: session.quiz_history_desc(),
    active_quizzes: session.active_quizzes().into_iter().map(ActiveQuizOut::from).collect(),
  }))
}

#[instrument(level = "info", skip(state), fields(session_id = %q.session_id))]
pub async fn http_get_recommendations(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionRef>,
) -> Result<Json<RecommendationsOut>, (StatusCode, Json<ErrorOut>)> {
  let session = state
    .sessions
    .get(&q.session_id)
    .ok_or_else(|| error_response(TutorError::SessionNotFound(q.session_id.clone())))?;
  Ok(Json(RecommendationsOut {
    session_id: q.session_id,
    recommendations: analytics::recommendations(&session),
  }))
}

#[instrument(level = "info", skip(state), fields(session_id = %body.session_id))]
pub async fn http_post_reset_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionRef>,
) -> impl IntoResponse {
  let removed = state.sessions.remove(&body.session_id);
  info!(target: "tutorforge_backend", session_id = %body.session_id, removed, "HTTP session reset");
  Json(ResetOut { success: true })
}
