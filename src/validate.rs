//! Schema validation of candidate records before they reach a learner.
//!
//! Validation is a hard gate: any violation rejects the whole record and
//! the caller must fall back. There is no partial credit, so everything
//! downstream may assume a validated record is fully shaped.

use serde_json::Value;

use crate::parser::QuizDraft;

// Required answer fields and whether each is a sequence of strings or a
// plain string.
const ANSWER_FIELDS: &[(&str, bool)] = &[
  ("key_points", true),
  ("step_by_step", false),
  ("real_world_example", false),
  ("common_mistakes", true),
  ("additional_tips", true),
];

/// Check a candidate answer object against the AnswerRecord contract.
pub fn validate_answer(record: &Value) -> bool {
  let obj = match record.as_object() {
    Some(o) => o,
    None => return false,
  };

  for (key, is_sequence) in ANSWER_FIELDS {
    match obj.get(*key) {
      Some(Value::Array(items)) if *is_sequence => {
        if !items.iter().all(Value::is_string) {
          return false;
        }
      }
      Some(Value::String(_)) if !is_sequence => {}
      _ => return false,
    }
  }
  true
}

/// Check a quiz draft: non-empty title, exact question count, and per
/// question exactly 4 options, a correct answer drawn from those options,
/// and a non-empty explanation.
pub fn validate_quiz(draft: &QuizDraft, expected_question_count: usize) -> bool {
  if draft.title.trim().is_empty() {
    return false;
  }
  if draft.questions.len() != expected_question_count {
    return false;
  }
  for q in &draft.questions {
    if q.text.trim().is_empty() {
      return false;
    }
    if q.options.len() != 4 {
      return false;
    }
    if q.correct_option.trim().is_empty() || !q.options.contains(&q.correct_option) {
      return false;
    }
    if q.explanation.trim().is_empty() {
      return false;
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::QuizQuestion;
  use serde_json::json;

  fn good_answer() -> Value {
    json!({
      "key_points": ["a", "b"],
      "step_by_step": "steps",
      "real_world_example": "example",
      "common_mistakes": ["m"],
      "additional_tips": ["t"],
    })
  }

  #[test]
  fn answer_accepts_complete_record() {
    assert!(validate_answer(&good_answer()));
  }

  #[test]
  fn answer_rejects_missing_field() {
    let mut v = good_answer();
    v.as_object_mut().unwrap().remove("step_by_step");
    assert!(!validate_answer(&v));
  }

  #[test]
  fn answer_rejects_wrong_container_type() {
    let mut v = good_answer();
    v["key_points"] = json!("not a list");
    assert!(!validate_answer(&v));

    let mut v = good_answer();
    v["step_by_step"] = json!(["not", "a", "string"]);
    assert!(!validate_answer(&v));

    let mut v = good_answer();
    v["common_mistakes"] = json!([1, 2, 3]);
    assert!(!validate_answer(&v));
  }

  fn good_question() -> QuizQuestion {
    QuizQuestion {
      text: "What is 2 + 2?".into(),
      options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
      correct_option: "4".into(),
      explanation: "Arithmetic.".into(),
    }
  }

  #[test]
  fn quiz_accepts_complete_draft() {
    let draft = QuizDraft { title: "T".into(), questions: vec![good_question(), good_question()] };
    assert!(validate_quiz(&draft, 2));
  }

  #[test]
  fn quiz_rejects_count_mismatch_and_empty_title() {
    let draft = QuizDraft { title: "T".into(), questions: vec![good_question()] };
    assert!(!validate_quiz(&draft, 2));

    let untitled = QuizDraft { title: "  ".into(), questions: vec![good_question()] };
    assert!(!validate_quiz(&untitled, 1));
  }

  #[test]
  fn quiz_rejects_bad_questions() {
    let mut q = good_question();
    q.options.pop();
    assert!(!validate_quiz(&QuizDraft { title: "T".into(), questions: vec![q] }, 1));

    let mut q = good_question();
    q.correct_option = "7".into();
    assert!(!validate_quiz(&QuizDraft { title: "T".into(), questions: vec![q] }, 1));

    let mut q = good_question();
    q.explanation.clear();
    assert!(!validate_quiz(&QuizDraft { title: "T".into(), questions: vec![q] }, 1));
  }
}
