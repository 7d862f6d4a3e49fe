use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::VocabularyItem;

/// Multiple-choice question derived from one vocabulary item.
///
/// The correct answer is always the item's meaning and appears exactly once
/// among the options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizQuestionRecord")]
pub struct QuizQuestion {
    item: VocabularyItem,
    options: Vec<String>,
    correct_answer: String,
}

impl QuizQuestion {
    /// Build a question from an item and its already-ordered options.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidOptionCount` for an empty option list,
    /// `ValidationError::EmptyMeaning` when the item has no meaning to ask for,
    /// `ValidationError::DuplicateOption` when an option repeats, and
    /// `ValidationError::MissingCorrectAnswer` when the item's meaning is absent.
    pub fn new(item: VocabularyItem, options: Vec<String>) -> Result<Self, ValidationError> {
        if options.is_empty() {
            return Err(ValidationError::InvalidOptionCount { count: 0 });
        }

        if item.meaning().trim().is_empty() {
            return Err(ValidationError::EmptyMeaning {
                id: item.id().to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(ValidationError::DuplicateOption {
                    id: item.id().to_string(),
                    option: option.clone(),
                });
            }
        }
        if !seen.contains(item.meaning()) {
            return Err(ValidationError::MissingCorrectAnswer {
                id: item.id().to_string(),
            });
        }

        let correct_answer = item.meaning().to_owned();
        Ok(Self {
            item,
            options,
            correct_answer,
        })
    }

    #[must_use]
    pub fn item(&self) -> &VocabularyItem {
        &self.item
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn is_correct(&self, selected: &str) -> bool {
        selected == self.correct_answer
    }
}

/// Wire shape of a question; decoded questions go through [`QuizQuestion::new`].
#[derive(Deserialize)]
struct QuizQuestionRecord {
    item: VocabularyItem,
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<String>,
}

impl TryFrom<QuizQuestionRecord> for QuizQuestion {
    type Error = ValidationError;

    fn try_from(record: QuizQuestionRecord) -> Result<Self, Self::Error> {
        if let Some(answer) = &record.correct_answer {
            if answer != record.item.meaning() {
                return Err(ValidationError::CorrectAnswerMismatch {
                    id: record.item.id().to_string(),
                });
            }
        }
        Self::new(record.item, record.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VocabularyId;

    fn allah() -> VocabularyItem {
        VocabularyItem::new(VocabularyId::parse("w1").unwrap(), "اللَّهُ", "Allah", "God").unwrap()
    }

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn accepts_well_formed_options() {
        let q = QuizQuestion::new(allah(), opts(&["Lord", "God", "Day", "King"])).unwrap();
        assert_eq!(q.correct_answer(), "God");
        assert!(q.is_correct("God"));
        assert!(!q.is_correct("god"));
    }

    #[test]
    fn rejects_missing_correct_answer() {
        let err = QuizQuestion::new(allah(), opts(&["Lord", "Day"])).unwrap_err();
        assert_eq!(err, ValidationError::MissingCorrectAnswer { id: "w1".into() });
    }

    #[test]
    fn rejects_duplicates() {
        let err = QuizQuestion::new(allah(), opts(&["God", "Lord", "God"])).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateOption { .. }));
    }

    fn decode(json: &str) -> Result<QuizQuestion, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn decoding_revalidates_options() {
        let item = r#"{"id":"w1","primary_text":"","transliteration":"Allah","meaning":"God"}"#;

        let duplicated = format!(
            r#"{{"item":{item},"options":["Lord","Lord"],"correct_answer":"Lord"}}"#
        );
        assert!(decode(&duplicated).is_err());

        let wrong_answer = format!(
            r#"{{"item":{item},"options":["Lord","God"],"correct_answer":"Lord"}}"#
        );
        let err = decode(&wrong_answer).unwrap_err();
        assert!(err.to_string().contains("differs from its meaning"));

        let blank = r#"{"item":{"id":"w1","primary_text":"","transliteration":"","meaning":""},"options":[""]}"#;
        assert!(decode(blank).is_err());
    }

    #[test]
    fn decoded_question_scores_its_meaning() {
        let original = QuizQuestion::new(allah(), opts(&["Lord", "God", "Day"])).unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let decoded = decode(&json).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.is_correct("God"));
    }
}
