//! Minimal chat-completions client for our use-cases.
//!
//! We only call chat.completions and request either plain text or a strict
//! JSON object. Calls are instrumented and log model names, latencies, and
//! response sizes (not contents).
//!
//! The client deliberately returns *raw text*: recovering a structured
//! record from it is the parser's job, so transport and parsing stay
//! independently testable. Failures come back as `Err(String)` whose
//! content feeds the provider gate's classifier.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::{teaching_style, Prompts};
use crate::domain::Difficulty;
use crate::util::fill_template;

#[derive(Clone)]
pub struct ProviderClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl ProviderClient {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Model tiers in the order the generation chain tries them.
  pub fn tiers(&self) -> [&str; 2] {
    [&self.strong_model, &self.fast_model]
  }

  /// Chat completion returning the raw assistant text.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    json_object: bool,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json_object.then(|| ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "tutorforge-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_provider_error(&body).unwrap_or(body);
      return Err(format!("Provider HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Provider usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Ask for a structured answer to a student question. Returns raw text
  /// for the parser to recover an AnswerRecord from.
  #[instrument(
    level = "info",
    skip(self, prompts, question),
    fields(%subject, model = %model, question_len = question.len())
  )]
  pub async fn generate_answer_text(
    &self,
    prompts: &Prompts,
    model: &str,
    subject: &str,
    question: &str,
  ) -> Result<String, String> {
    let user = fill_template(
      &prompts.answer_user_template,
      &[("subject", subject), ("question", question), ("style", teaching_style(subject))],
    );
    let start = std::time::Instant::now();
    let result = self.chat(model, &prompts.answer_system, &user, 0.7, true).await;
    let elapsed = start.elapsed();

    match &result {
      Ok(text) => info!(?elapsed, response_len = text.len(), "Answer text received"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during answer generation"),
    }
    result
  }

  /// Ask for a quiz in the line-marker format. Returns raw text for the
  /// quiz line scanner.
  #[instrument(
    level = "info",
    skip(self, prompts),
    fields(%subject, %topic, difficulty = %difficulty.as_str(), count, model = %model)
  )]
  pub async fn generate_quiz_text(
    &self,
    prompts: &Prompts,
    model: &str,
    subject: &str,
    topic: &str,
    difficulty: Difficulty,
    count: usize,
  ) -> Result<String, String> {
    let count_str = count.to_string();
    let user = fill_template(
      &prompts.quiz_user_template,
      &[
        ("subject", subject),
        ("topic", topic),
        ("difficulty", difficulty.as_str()),
        ("count", &count_str),
      ],
    );
    let start = std::time::Instant::now();
    let result = self.chat(model, &prompts.quiz_system, &user, 0.7, false).await;
    let elapsed = start.elapsed();

    match &result {
      Ok(text) => info!(?elapsed, response_len = text.len(), "Quiz text received"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during quiz generation"),
    }
    result
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from a provider error body.
fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn provider_error_body_extraction() {
    let body = r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}"#;
    assert_eq!(extract_provider_error(body).as_deref(), Some("You exceeded your current quota"));
    assert!(extract_provider_error("not json").is_none());
  }
}
