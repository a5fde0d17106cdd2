/// Card domain model
///
/// A card is a lesson unit inside a directory. Files, videos, quiz
/// questions, and flashcards are embedded as JSON columns; the card
/// owns them outright.
pub mod manager;

pub use manager::CardManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub label: String,
    /// Filename inside the card's storage prefix.
    pub href: String,
    #[serde(default)]
    pub hover: String,
    pub visible: bool,
}

/// A video linked from a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub label: String,
    pub href: String,
}

/// One quiz question. `correct` is the index into `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<i64>,
}

/// A flashcard: question and answer, each with an optional image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub question_image: String,
    pub answer: String,
    #[serde(default)]
    pub answer_image: String,
}

/// Quiz evaluation mode. The wire values are kept as-is for
/// compatibility with existing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalMode {
    /// Account-gated, scored, and recorded.
    #[serde(rename = "oui")]
    Recorded,
    /// Anonymous practice, nothing recorded.
    #[serde(rename = "non")]
    Practice,
    /// Quiz not yet open to students.
    #[serde(rename = "attente")]
    Pending,
}

impl EvalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMode::Recorded => "oui",
            EvalMode::Practice => "non",
            EvalMode::Pending => "attente",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oui" => Some(EvalMode::Recorded),
            "non" => Some(EvalMode::Practice),
            "attente" => Some(EvalMode::Pending),
            _ => None,
        }
    }
}

/// A lesson card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub directory: String,
    pub seq: i64,
    pub display_order: i64,
    pub title: String,
    /// Background image filename within the card prefix, empty if none.
    pub bg: String,
    pub cloud: bool,
    pub presentation: Vec<String>,
    pub plan: Vec<String>,
    /// Free-form content blocks, interpreted by the client.
    pub content: Vec<serde_json::Value>,
    pub content_version: i64,
    pub files: Vec<FileRef>,
    pub videos: Vec<VideoRef>,
    pub quiz: Vec<QuizQuestion>,
    pub flashcards: Vec<Flashcard>,
    pub eval_mode: EvalMode,
    pub show_score: bool,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Storage prefix owning every object attached to this card.
    pub fn storage_prefix(&self) -> String {
        crate::storage::paths::card_prefix(&self.directory, self.seq)
    }

    /// Projection served to students: hidden files are stripped, and
    /// correct answers are withheld unless the quiz is in anonymous
    /// practice mode.
    pub fn public_view(&self) -> Card {
        let mut card = self.clone();

        card.files.retain(|f| f.visible);

        if card.eval_mode != EvalMode::Practice {
            for question in &mut card.quiz {
                question.correct = None;
            }
        }

        card
    }
}

/// Where to insert a new entry in an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    Start,
    End,
    At(usize),
}

impl InsertPosition {
    /// Parse the wire value: "start", "end", a number, or absent.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("start") => InsertPosition::Start,
            Some("end") | None => InsertPosition::End,
            Some(other) => match other.parse::<usize>() {
                Ok(n) => InsertPosition::At(n),
                Err(_) => InsertPosition::End,
            },
        }
    }

    /// Resolve to a concrete index in a list of the given length.
    /// Numeric positions insert after the named index, clamped.
    pub fn resolve(&self, len: usize) -> usize {
        match self {
            InsertPosition::Start => 0,
            InsertPosition::End => len,
            InsertPosition::At(n) => (*n + 1).min(len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card() -> Card {
        Card {
            id: "c1".to_string(),
            directory: "algebra".to_string(),
            seq: 1,
            display_order: 1,
            title: "Fractions".to_string(),
            bg: String::new(),
            cloud: false,
            presentation: vec![],
            plan: vec![],
            content: vec![],
            content_version: 1,
            files: vec![
                FileRef {
                    label: "Cours".to_string(),
                    href: "cours.pdf".to_string(),
                    hover: String::new(),
                    visible: true,
                },
                FileRef {
                    label: "Corrigé".to_string(),
                    href: "corrige.pdf".to_string(),
                    hover: String::new(),
                    visible: false,
                },
            ],
            videos: vec![],
            quiz: vec![QuizQuestion {
                id: "q1".to_string(),
                question: "2+2?".to_string(),
                image: None,
                options: vec!["3".to_string(), "4".to_string()],
                correct: Some(1),
            }],
            flashcards: vec![],
            eval_mode: EvalMode::Recorded,
            show_score: true,
            visible: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_eval_mode_wire_values() {
        assert_eq!(
            serde_json::to_string(&EvalMode::Recorded).unwrap(),
            "\"oui\""
        );
        assert_eq!(
            serde_json::from_str::<EvalMode>("\"attente\"").unwrap(),
            EvalMode::Pending
        );
        assert_eq!(EvalMode::parse("non"), Some(EvalMode::Practice));
        assert_eq!(EvalMode::parse("maybe"), None);
    }

    #[test]
    fn test_public_view_strips_hidden_files() {
        let view = sample_card().public_view();
        assert_eq!(view.files.len(), 1);
        assert_eq!(view.files[0].href, "cours.pdf");
    }

    #[test]
    fn test_public_view_withholds_answers_when_recorded() {
        let view = sample_card().public_view();
        assert_eq!(view.quiz[0].correct, None);
    }

    #[test]
    fn test_public_view_keeps_answers_in_practice_mode() {
        let mut card = sample_card();
        card.eval_mode = EvalMode::Practice;
        let view = card.public_view();
        assert_eq!(view.quiz[0].correct, Some(1));
    }

    #[test]
    fn test_insert_position_resolution() {
        assert_eq!(InsertPosition::parse(Some("start")).resolve(5), 0);
        assert_eq!(InsertPosition::parse(Some("end")).resolve(5), 5);
        assert_eq!(InsertPosition::parse(None).resolve(5), 5);
        // Numeric position inserts after that index
        assert_eq!(InsertPosition::parse(Some("2")).resolve(5), 3);
        // Clamped to list length
        assert_eq!(InsertPosition::parse(Some("9")).resolve(5), 5);
        // Unparseable falls back to end
        assert_eq!(InsertPosition::parse(Some("abc")).resolve(5), 5);
    }
}
