//! Loading tutoring configuration (prompts + teaching-style table) from TOML.
//!
//! See `TutorConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the provider client. Defaults are sensible for
/// curriculum-aligned high-school tutoring. Override in TOML to tune
/// tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Answer generation
  pub answer_system: String,
  pub answer_user_template: String,
  // Quiz generation
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      answer_system: "You are an expert tutor for high school students. Provide clear, engaging explanations aligned with the national curriculum. Respond ONLY with strict JSON.".into(),
      answer_user_template: concat!(
        "Subject: {subject}\n",
        "Teaching style: {style}\n",
        "Student question: {question}\n\n",
        "Actually TEACH the student about the topic; no generic acknowledgments.\n",
        "Return JSON with fields: key_points (array of 3-4 strings), step_by_step (string), ",
        "real_world_example (string), common_mistakes (array of strings), additional_tips (array of strings).",
      ).into(),
      quiz_system: "You are an expert quiz creator for high school students. Create engaging, curriculum-aligned multiple-choice questions.".into(),
      quiz_user_template: concat!(
        "Create a {difficulty} level quiz for {subject} focusing on {topic}.\n\n",
        "Number of questions: {count}. Multiple choice with 4 options (A, B, C, D); ",
        "all options plausible, exactly one correct; include an explanation per question.\n\n",
        "Structure the response exactly as follows:\n\n",
        "QUIZ TITLE: [Engaging quiz title]\n\n",
        "QUESTION 1:\n",
        "[Question text]\n",
        "A) [Option A]\n",
        "B) [Option B]\n",
        "C) [Option C]\n",
        "D) [Option D]\n",
        "CORRECT ANSWER: [A/B/C/D]\n",
        "EXPLANATION: [Brief explanation of why this is correct]\n\n",
        "[Continue for all {count} questions]",
      ).into(),
    }
  }
}

/// Per-subject teaching styles, interpolated into the answer prompt.
pub fn teaching_style(subject: &str) -> &'static str {
  match subject {
    "Mathematics" => "step-by-step problem solving with clear explanations",
    "Physics" => "conceptual understanding with real-world examples",
    "Chemistry" => "molecular visualization with practical applications",
    "Biology" => "life science connections with everyday context",
    "History" => "narrative storytelling with critical analysis",
    "Geography" => "spatial thinking with local and global perspectives",
    "English" => "language development with cultural context",
    _ => "interactive learning with practical examples",
  }
}

/// Attempt to load `TutorConfig` from AGENT_CONFIG_PATH. On any parsing/IO
/// error, returns None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TutorConfig>(&s) {
      Ok(cfg) => {
        info!(target: "tutorforge_backend", %path, "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "tutorforge_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "tutorforge_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_prompts_carry_required_placeholders() {
    let p = Prompts::default();
    for key in ["{subject}", "{question}", "{style}"] {
      assert!(p.answer_user_template.contains(key), "missing {key} in answer template");
    }
    for key in ["{subject}", "{topic}", "{difficulty}", "{count}"] {
      assert!(p.quiz_user_template.contains(key), "missing {key} in quiz template");
    }
  }

  #[test]
  fn teaching_style_has_generic_default() {
    assert_eq!(teaching_style("Astrology"), teaching_style("General"));
    assert!(teaching_style("Mathematics").contains("step-by-step"));
  }
}
