use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{LessonId, VocabularyId};

/// A single word taught in a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    id: VocabularyId,
    primary_text: String,
    transliteration: String,
    meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    example_verse: Option<String>,
}

impl VocabularyItem {
    /// Build an item. Only the structural fields are checked: the id is already
    /// non-blank by construction and the meaning must not be empty, since it is
    /// the answer the quiz asks for.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyMeaning` if `meaning` is blank.
    pub fn new(
        id: VocabularyId,
        primary_text: impl Into<String>,
        transliteration: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let meaning = meaning.into();
        if meaning.trim().is_empty() {
            return Err(ValidationError::EmptyMeaning {
                id: id.to_string(),
            });
        }
        Ok(Self {
            id,
            primary_text: primary_text.into(),
            transliteration: transliteration.into(),
            meaning,
            example_verse: None,
        })
    }

    #[must_use]
    pub fn with_example_verse(mut self, verse: impl Into<String>) -> Self {
        self.example_verse = Some(verse.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &VocabularyId {
        &self.id
    }

    #[must_use]
    pub fn primary_text(&self) -> &str {
        &self.primary_text
    }

    #[must_use]
    pub fn transliteration(&self) -> &str {
        &self.transliteration
    }

    #[must_use]
    pub fn meaning(&self) -> &str {
        &self.meaning
    }

    #[must_use]
    pub fn example_verse(&self) -> Option<&str> {
        self.example_verse.as_deref()
    }
}

/// Structural checks shared by lesson construction and question generation.
///
/// # Errors
///
/// Returns `ValidationError::EmptyItems` for an empty slice,
/// `ValidationError::DuplicateId` when two items share an id, and
/// `ValidationError::EmptyMeaning` for items with a blank meaning.
pub fn validate_items(items: &[VocabularyItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id()) {
            return Err(ValidationError::DuplicateId {
                id: item.id().to_string(),
            });
        }
        // Deserialized items skip `VocabularyItem::new`.
        if item.meaning().trim().is_empty() {
            return Err(ValidationError::EmptyMeaning {
                id: item.id().to_string(),
            });
        }
    }
    Ok(())
}

/// A numbered group of vocabulary items presented together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    number: u32,
    title: String,
    description: String,
    items: Vec<VocabularyItem>,
}

impl Lesson {
    /// Create a lesson from its vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `items` fails [`validate_items`].
    pub fn new(
        id: LessonId,
        number: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        items: Vec<VocabularyItem>,
    ) -> Result<Self, ValidationError> {
        validate_items(&items)?;
        Ok(Self {
            id,
            number,
            title: title.into(),
            description: description.into(),
            items,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    #[must_use]
    pub fn overview(&self) -> LessonOverview {
        LessonOverview {
            id: self.id.clone(),
            number: self.number,
            title: self.title.clone(),
            description: self.description.clone(),
            word_count: self.items.len(),
        }
    }
}

/// Listing entry for a lesson without its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonOverview {
    pub id: LessonId,
    pub number: u32,
    pub title: String,
    pub description: String,
    pub word_count: usize,
}
