//! Built-in starter lessons.

use quiz_core::ValidationError;
use quiz_core::model::{Lesson, LessonId, VocabularyId, VocabularyItem};

use crate::repository::{LessonRepository, StorageError};

struct SeedLesson {
    number: u32,
    title: &'static str,
    description: &'static str,
    /// (arabic, transliteration, meaning)
    words: &'static [(&'static str, &'static str, &'static str)],
}

const SEED_LESSONS: &[SeedLesson] = &[
    SeedLesson {
        number: 1,
        title: "Basic Words",
        description: "Learn fundamental Quranic terms",
        words: &[
            ("اللَّهُ", "Allah", "God"),
            ("رَبُّ", "Rabb", "Lord"),
            ("رَحْمَٰنِ", "Rahman", "Most Merciful"),
            ("رَحِيمِ", "Rahim", "Most Compassionate"),
            ("مَلِكِ", "Malik", "King"),
            ("يَوْمِ", "Yawm", "Day"),
            ("دِينِ", "Deen", "Judgment/Religion"),
            ("نَعْبُدُ", "Na'budu", "We worship"),
            ("نَسْتَعِينُ", "Nasta'een", "We seek help"),
            ("صِرَاطَ", "Sirat", "Path"),
        ],
    },
    SeedLesson {
        number: 2,
        title: "Common Verbs",
        description: "Master frequently used verbs",
        words: &[
            ("قَالَ", "Qala", "He said"),
            ("كَانَ", "Kana", "Was/Were"),
            ("جَاءَ", "Jaa'a", "He came"),
            ("ذَهَبَ", "Dhahaba", "He went"),
            ("عَمِلَ", "'Amila", "He did/worked"),
            ("آمَنَ", "Aamana", "He believed"),
            ("كَفَرَ", "Kafara", "He disbelieved"),
            ("عَلِمَ", "'Alima", "He knew"),
            ("سَمِعَ", "Sami'a", "He heard"),
            ("رَأَى", "Ra'a", "He saw"),
        ],
    },
    SeedLesson {
        number: 3,
        title: "Pronouns & Particles",
        description: "Understand connecting words",
        words: &[
            ("هُوَ", "Huwa", "He"),
            ("هِيَ", "Hiya", "She"),
            ("أَنْتَ", "Anta", "You (masculine)"),
            ("أَنَا", "Ana", "I"),
            ("نَحْنُ", "Nahnu", "We"),
            ("هُمْ", "Hum", "They"),
            ("مِنْ", "Min", "From"),
            ("إِلَىٰ", "Ila", "To/Towards"),
            ("فِي", "Fee", "In"),
            ("عَلَىٰ", "'Ala", "On/Upon"),
        ],
    },
];

fn build_lesson(seed: &SeedLesson) -> Result<Lesson, ValidationError> {
    let items = seed
        .words
        .iter()
        .enumerate()
        .map(|(i, (arabic, transliteration, meaning))| {
            let id = VocabularyId::parse(format!("l{}w{:02}", seed.number, i + 1))?;
            VocabularyItem::new(id, *arabic, *transliteration, *meaning)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Lesson::new(
        LessonId::for_number(seed.number),
        seed.number,
        seed.title,
        seed.description,
        items,
    )
}

/// The starter lessons shipped with the app.
///
/// # Errors
///
/// Returns `ValidationError` if the built-in data is malformed.
pub fn sample_lessons() -> Result<Vec<Lesson>, ValidationError> {
    SEED_LESSONS.iter().map(build_lesson).collect()
}

/// Upsert the starter lessons, returning how many were written.
///
/// # Errors
///
/// Returns `StorageError` if a lesson cannot be stored.
pub async fn seed_sample_lessons(lessons: &dyn LessonRepository) -> Result<usize, StorageError> {
    let sample = sample_lessons().map_err(|e| StorageError::Serialization(e.to_string()))?;
    for lesson in &sample {
        lessons.upsert_lesson(lesson).await?;
    }
    log::info!("seeded {} sample lessons", sample.len());
    Ok(sample.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    #[test]
    fn sample_lessons_are_valid() {
        let lessons = sample_lessons().unwrap();
        assert_eq!(lessons.len(), 3);
        assert!(lessons.iter().all(|l| l.items().len() == 10));
        assert_eq!(lessons[0].items()[0].meaning(), "God");
        assert_eq!(lessons[2].id().as_str(), "lesson_3");
    }

    #[tokio::test]
    async fn seeding_is_repeatable() {
        let repo = InMemoryRepository::new();
        assert_eq!(seed_sample_lessons(&repo).await.unwrap(), 3);
        assert_eq!(seed_sample_lessons(&repo).await.unwrap(), 3);
        assert_eq!(repo.list_lessons().await.unwrap().len(), 3);
    }
}
