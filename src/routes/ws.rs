//! WebSocket upgrade + message loop. Each client message is parsed as JSON
//! and forwarded to core logic. We reply with a single JSON message per
//! request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::analytics;
use crate::domain::Difficulty;
use crate::logic;
use crate::protocol::{render_answer_markdown, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "tutorforge_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "tutorforge_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "tutorforge_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "tutorforge_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "tutorforge_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Ask { session_id, subject, question } => {
      let outcome = logic::ask(state, session_id.as_deref(), &subject, &question).await;
      tracing::info!(target: "tutor", session_id = %outcome.session_id, %subject, "WS ask served");
      ServerWsMessage::Answer {
        session_id: outcome.session_id,
        answer_markdown: render_answer_markdown(&outcome.answer),
        answer: outcome.answer,
        source: outcome.source,
        learning_tip: outcome.learning_tip,
      }
    }

    ClientWsMessage::GenerateQuiz { session_id, subject, topic, difficulty, num_questions } => {
      let sid = state.ensure_session(session_id.as_deref());
      let gated = state.sessions.get(&sid).map(|s| !s.can_generate_quiz()).unwrap_or(true);
      if gated {
        return ServerWsMessage::Error { message: "Free quiz limit reached".into() };
      }
      let difficulty = Difficulty::parse_or_default(difficulty.as_deref().unwrap_or_default());
      let count = match num_questions {
        Some(n) if (3..=10).contains(&n) => n,
        _ => 5,
      };
      match logic::create_quiz(state, &sid, &subject, &topic, difficulty, count).await {
        Ok((quiz, source)) => {
          tracing::info!(target: "quiz", session_id = %sid, quiz_id = %quiz.id, "WS quiz generated");
          ServerWsMessage::Quiz { session_id: sid, quiz, source }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::StartQuiz { session_id, quiz_id } => {
      match logic::start_quiz(state, &session_id, &quiz_id) {
        Ok(record) => {
          let started_at = record.started_at.unwrap_or_default();
          tracing::info!(target: "quiz", %session_id, %quiz_id, "WS quiz started");
          ServerWsMessage::QuizStarted {
            quiz_id,
            started_at,
            answer_deadline: started_at + u64::from(record.quiz.time_limit_seconds),
          }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitQuiz { session_id, quiz_id, answers } => {
      match logic::submit_quiz(state, &session_id, &quiz_id, &answers) {
        Ok(results) => {
          tracing::info!(target: "quiz", %session_id, %quiz_id, score = %format!("{:.1}", results.score_percentage), "WS quiz submitted");
          ServerWsMessage::QuizResults { quiz_id, results }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Recommendations { session_id } => match state.sessions.get(&session_id) {
      Some(session) => ServerWsMessage::Recommendations {
        recommendations: analytics::recommendations(&session),
      },
      None => ServerWsMessage::Error { message: format!("session not found: {session_id}") },
    },
  }
}
