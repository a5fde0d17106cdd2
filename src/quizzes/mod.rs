/// Quiz scoring domain
pub mod manager;

pub use manager::QuizManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded quiz attempt. Immutable once created; only the binary
/// correctness vector is stored, never the raw answers.
#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub id: String,
    pub user_id: String,
    pub card_id: String,
    /// 1 for each correctly answered question, 0 otherwise.
    pub marks: Vec<i64>,
    pub submitted_at: DateTime<Utc>,
}

impl QuizSubmission {
    pub fn score(&self) -> i64 {
        self.marks.iter().sum()
    }
}

/// What the student sees after submitting. The correct count is only
/// present when the card exposes scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<i64>>,
    /// True when this call returned a previously recorded attempt.
    pub already_submitted: bool,
}

/// Per-question aggregate for admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub question: String,
    pub correct_count: i64,
}

/// Aggregate results of a card's quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResults {
    pub submission_count: i64,
    pub questions: Vec<QuestionStats>,
}
