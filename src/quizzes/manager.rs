/// Quiz grading, recording, and admin reporting
use crate::{
    account::AccountManager,
    cards::{Card, CardManager, EvalMode},
    db::is_unique_violation,
    error::{ApiError, ApiResult},
    quizzes::{QuestionStats, QuizResults, QuizSubmission, SubmissionOutcome},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

pub struct QuizManager {
    db: SqlitePool,
    cards: Arc<CardManager>,
    accounts: Arc<AccountManager>,
}

impl QuizManager {
    pub fn new(db: SqlitePool, cards: Arc<CardManager>, accounts: Arc<AccountManager>) -> Self {
        Self { db, cards, accounts }
    }

    /// Grade and record a quiz attempt. At most one attempt exists per
    /// (user, card); a repeat submission returns the recorded result
    /// instead of erroring.
    pub async fn submit(
        &self,
        user_id: &str,
        directory: &str,
        seq: i64,
        answers: &[serde_json::Value],
    ) -> ApiResult<SubmissionOutcome> {
        let card = self.require_card(directory, seq).await?;

        match card.eval_mode {
            EvalMode::Recorded => {}
            EvalMode::Pending => {
                return Err(ApiError::Forbidden("Quiz is not open yet".to_string()))
            }
            EvalMode::Practice => {
                return Err(ApiError::Forbidden(
                    "Quiz is in practice mode, attempts are not recorded".to_string(),
                ))
            }
        }

        if answers.len() != card.quiz.len() {
            return Err(ApiError::Validation(format!(
                "Expected {} answers, got {}",
                card.quiz.len(),
                answers.len()
            )));
        }

        if let Some(existing) = self.find_submission(user_id, &card.id).await? {
            return Ok(Self::outcome(&card, &existing.marks, true));
        }

        let marks = grade(&card, answers);

        let submission = QuizSubmission {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            card_id: card.id.clone(),
            marks,
            submitted_at: Utc::now(),
        };

        let marks_json = serde_json::to_string(&submission.marks)
            .map_err(|e| ApiError::Internal(format!("Marks serialization failed: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO quiz_submission (id, user_id, card_id, marks, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&submission.id)
        .bind(&submission.user_id)
        .bind(&submission.card_id)
        .bind(&marks_json)
        .bind(submission.submitted_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(user_id = %user_id, card_id = %card.id, "Quiz submission recorded");
                Ok(Self::outcome(&card, &submission.marks, false))
            }
            // A racing duplicate insert resolves to the stored attempt
            Err(e) if is_unique_violation(&e) => {
                let existing = self
                    .find_submission(user_id, &card.id)
                    .await?
                    .ok_or_else(|| ApiError::Internal("Submission vanished".to_string()))?;
                Ok(Self::outcome(&card, &existing.marks, true))
            }
            Err(e) => Err(ApiError::Database(e)),
        }
    }

    /// A user's stored attempt on a card's quiz. Only recorded-mode
    /// quizzes keep a history; the result detail honors `show_score`.
    pub async fn history(
        &self,
        user_id: &str,
        directory: &str,
        seq: i64,
    ) -> ApiResult<SubmissionOutcome> {
        let card = self.require_card(directory, seq).await?;

        if card.eval_mode != EvalMode::Recorded {
            return Err(ApiError::NotFound(
                "No recorded quiz for this card".to_string(),
            ));
        }

        match self.find_submission(user_id, &card.id).await? {
            Some(existing) => Ok(Self::outcome(&card, &existing.marks, true)),
            None => Ok(SubmissionOutcome {
                total: card.quiz.len(),
                score: None,
                marks: None,
                already_submitted: false,
            }),
        }
    }

    /// Per-question correct counts and submission total for admins.
    pub async fn results(&self, directory: &str, seq: i64) -> ApiResult<QuizResults> {
        let card = self.require_card(directory, seq).await?;
        let submissions = self.list_submissions(&card.id).await?;

        let mut correct_counts = vec![0i64; card.quiz.len()];
        for submission in &submissions {
            for (i, mark) in submission.marks.iter().enumerate() {
                if let Some(count) = correct_counts.get_mut(i) {
                    *count += mark;
                }
            }
        }

        let questions = card
            .quiz
            .iter()
            .zip(correct_counts)
            .map(|(question, correct_count)| QuestionStats {
                question_id: question.id.clone(),
                question: question.question.clone(),
                correct_count,
            })
            .collect();

        Ok(QuizResults {
            submission_count: submissions.len() as i64,
            questions,
        })
    }

    /// Export every submission of a card as a semicolon-separated CSV:
    /// a metadata line, a header row, then one `surname;name;score;total`
    /// row per submitter.
    pub async fn export_csv(&self, directory: &str, seq: i64) -> ApiResult<String> {
        let card = self.require_card(directory, seq).await?;
        let submissions = self.list_submissions(&card.id).await?;
        let total = card.quiz.len();

        let mut csv = format!(
            "{};{};{};{}\n",
            csv_field(&card.title),
            csv_field(directory),
            seq,
            submissions.len()
        );
        csv.push_str("surname;name;score;total\n");

        for submission in &submissions {
            let (surname, name) = match self.accounts.get_user(&submission.user_id).await? {
                Some(user) => (user.surname, user.name),
                // Account deleted after submitting
                None => ("?".to_string(), "?".to_string()),
            };

            csv.push_str(&format!(
                "{};{};{};{}\n",
                csv_field(&surname),
                csv_field(&name),
                submission.score(),
                total
            ));
        }

        Ok(csv)
    }

    async fn find_submission(
        &self,
        user_id: &str,
        card_id: &str,
    ) -> ApiResult<Option<QuizSubmission>> {
        let row = sqlx::query(
            "SELECT * FROM quiz_submission WHERE user_id = ?1 AND card_id = ?2",
        )
        .bind(user_id)
        .bind(card_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Self::row_to_submission).transpose()
    }

    async fn list_submissions(&self, card_id: &str) -> ApiResult<Vec<QuizSubmission>> {
        let rows = sqlx::query(
            "SELECT * FROM quiz_submission WHERE card_id = ?1 ORDER BY submitted_at",
        )
        .bind(card_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Self::row_to_submission).collect()
    }

    async fn require_card(&self, directory: &str, seq: i64) -> ApiResult<Card> {
        self.cards
            .get(directory, seq)
            .await?
            .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
    }

    fn outcome(card: &Card, marks: &[i64], already_submitted: bool) -> SubmissionOutcome {
        let (score, marks) = if card.show_score {
            (Some(marks.iter().sum()), Some(marks.to_vec()))
        } else {
            (None, None)
        };

        SubmissionOutcome {
            total: card.quiz.len(),
            score,
            marks,
            already_submitted,
        }
    }

    fn row_to_submission(row: sqlx::sqlite::SqliteRow) -> ApiResult<QuizSubmission> {
        let marks_raw: String = row.try_get("marks")?;
        let marks = serde_json::from_str(&marks_raw)
            .map_err(|e| ApiError::Internal(format!("Corrupt marks column: {}", e)))?;
        let submitted_at: DateTime<Utc> = row.try_get("submitted_at")?;

        Ok(QuizSubmission {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            card_id: row.try_get("card_id")?,
            marks,
            submitted_at,
        })
    }
}

/// Score each answer 1/0 against the question's correct index. An
/// absent or out-of-range correct index, or a non-integer answer,
/// scores 0.
fn grade(card: &Card, answers: &[serde_json::Value]) -> Vec<i64> {
    card.quiz
        .iter()
        .zip(answers)
        .map(|(question, answer)| {
            let correct = match question.correct {
                Some(c) if c >= 0 && (c as usize) < question.options.len() => c,
                _ => return 0,
            };
            match answer.as_i64() {
                Some(given) if given == correct => 1,
                _ => 0,
            }
        })
        .collect()
}

/// Escape one CSV field: quote when it contains a separator, quote,
/// or newline, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains(';') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
