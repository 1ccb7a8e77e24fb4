//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::analytics::{Activity, PerformanceBreakdown, ProgressSummary, SubjectAnalytics};
use crate::domain::{
    AnswerRecord, ContentSource, GradeResult, HistoryEntry, Quiz, QuizRecord, QuizStatus,
    Recommendation,
};
use crate::grader::QuizStatistics;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Ask {
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
        subject: String,
        question: String,
    },
    GenerateQuiz {
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
        subject: String,
        topic: String,
        difficulty: Option<String>,
        #[serde(rename = "numQuestions")]
        num_questions: Option<usize>,
    },
    StartQuiz {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "quizId")]
        quiz_id: String,
    },
    SubmitQuiz {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "quizId")]
        quiz_id: String,
        answers: Vec<String>,
    },
    Recommendations {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Answer {
        #[serde(rename = "sessionId")]
        session_id: String,
        answer: AnswerRecord,
        #[serde(rename = "answerMarkdown")]
        answer_markdown: String,
        source: ContentSource,
        #[serde(rename = "learningTip")]
        learning_tip: String,
    },
    Quiz {
        #[serde(rename = "sessionId")]
        session_id: String,
        quiz: Quiz,
        source: ContentSource,
    },
    QuizStarted {
        #[serde(rename = "quizId")]
        quiz_id: String,
        #[serde(rename = "startedAt")]
        started_at: u64,
        #[serde(rename = "answerDeadline")]
        answer_deadline: u64,
    },
    QuizResults {
        #[serde(rename = "quizId")]
        quiz_id: String,
        results: GradeResult,
    },
    Recommendations {
        recommendations: Vec<Recommendation>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct AskIn {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub subject: Option<String>,
    pub question: String,
}

#[derive(Serialize)]
pub struct AskOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub subject: String,
    pub answer: AnswerRecord,
    #[serde(rename = "answerMarkdown")]
    pub answer_markdown: String,
    pub source: ContentSource,
    #[serde(rename = "learningTip")]
    pub learning_tip: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuizIn {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub subject: String,
    pub topic: String,
    pub difficulty: Option<String>,
    #[serde(rename = "numQuestions")]
    pub num_questions: Option<usize>,
}

#[derive(Serialize)]
pub struct GenerateQuizOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub quiz: Quiz,
    pub source: ContentSource,
    pub statistics: QuizStatistics,
    #[serde(rename = "remainingFreeQuizzes")]
    pub remaining_free_quizzes: i64,
}

#[derive(Debug, Deserialize)]
pub struct SessionRef {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Serialize)]
pub struct StartQuizOut {
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    pub status: QuizStatus,
    #[serde(rename = "startedAt")]
    pub started_at: u64,
    #[serde(rename = "timeLimitSeconds")]
    pub time_limit_seconds: u32,
    #[serde(rename = "answerDeadline")]
    pub answer_deadline: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub answers: Vec<String>,
}

#[derive(Serialize)]
pub struct SubmitQuizOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    pub results: GradeResult,
}

#[derive(Serialize)]
pub struct QuizHistoryOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "quizHistory")]
    pub quiz_history: Vec<HistoryEntry>,
}

#[derive(Serialize)]
pub struct ActiveQuizOut {
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    pub status: QuizStatus,
    #[serde(rename = "generatedAt")]
    pub generated_at: u64,
    pub quiz: Quiz,
}

impl From<&QuizRecord> for ActiveQuizOut {
    fn from(r: &QuizRecord) -> Self {
        Self {
            quiz_id: r.quiz.id.clone(),
            status: r.status,
            generated_at: r.generated_at,
            quiz: r.quiz.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct DashboardOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "progressSummary")]
    pub progress_summary: ProgressSummary,
    #[serde(rename = "subjectAnalytics")]
    pub subject_analytics: Vec<SubjectAnalytics>,
    #[serde(rename = "performanceBreakdown")]
    pub performance_breakdown: PerformanceBreakdown,
    pub recommendations: Vec<Recommendation>,
    #[serde(rename = "recentActivity")]
    pub recent_activity: Vec<Activity>,
    #[serde(rename = "quizHistory")]
    pub quiz_history: Vec<HistoryEntry>,
    #[serde(rename = "activeQuizzes")]
    pub active_quizzes: Vec<ActiveQuizOut>,
}

#[derive(Serialize)]
pub struct RecommendationsOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct SubjectTopics {
    pub subject: String,
    pub topics: Vec<String>,
}

#[derive(Serialize)]
pub struct AvailableOut {
    #[serde(rename = "availableQuizzes")]
    pub available_quizzes: Vec<SubjectTopics>,
    #[serde(rename = "difficultyLevels")]
    pub difficulty_levels: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct ResetOut {
    pub success: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    #[serde(rename = "activeSessions")]
    pub active_sessions: usize,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

/// Render a structured answer as display markdown for clients that show a
/// single rich-text block.
pub fn render_answer_markdown(answer: &AnswerRecord) -> String {
    let mut out = String::new();
    out.push_str("### Key Points\n");
    for point in &answer.key_points {
        out.push_str(&format!("- {point}\n"));
    }
    out.push_str("\n### Step-by-Step Explanation\n");
    out.push_str(&answer.step_by_step);
    out.push_str("\n\n### Real-world Example\n");
    out.push_str(&answer.real_world_example);
    out.push_str("\n\n### Common Mistakes\n");
    for mistake in &answer.common_mistakes {
        out.push_str(&format!("- {mistake}\n"));
    }
    out.push_str("\n### Additional Tips\n");
    for tip in &answer.additional_tips {
        out.push_str(&format!("- {tip}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_contains_every_section() {
        let answer = AnswerRecord {
            key_points: vec!["one".into(), "two".into()],
            step_by_step: "steps here".into(),
            real_world_example: "an example".into(),
            common_mistakes: vec!["a mistake".into()],
            additional_tips: vec!["a tip".into()],
        };
        let md = render_answer_markdown(&answer);
        for heading in [
            "### Key Points",
            "### Step-by-Step Explanation",
            "### Real-world Example",
            "### Common Mistakes",
            "### Additional Tips",
        ] {
            assert!(md.contains(heading), "missing {heading}");
        }
        assert!(md.contains("- one\n- two"));
        assert!(md.contains("steps here"));
    }

    #[test]
    fn ws_messages_deserialize_from_tagged_json() {
        let msg: ClientWsMessage = serde_json::from_str(
            r#"{"type": "ask", "subject": "Physics", "question": "What is a force?"}"#,
        )
        .expect("parse");
        assert!(matches!(msg, ClientWsMessage::Ask { session_id: None, .. }));

        let msg: ClientWsMessage = serde_json::from_str(
            r#"{"type": "submit_quiz", "sessionId": "s", "quizId": "q", "answers": ["a"]}"#,
        )
        .expect("parse");
        assert!(matches!(msg, ClientWsMessage::SubmitQuiz { .. }));
    }
}
