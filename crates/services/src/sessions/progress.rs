use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};

use quiz_core::Clock;
use quiz_core::model::{LearnerId, LessonId, LessonOverview, VocabularyId};
use storage::repository::{LessonRepository, ResultRecord, ResultRepository};

use crate::error::SessionError;

/// Reads every recorded result for a learner.
const ALL_RESULTS: u32 = u32::MAX;

/// Snapshot of a learner's practice, as shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Consecutive UTC days with at least one submitted quiz, ending today or
    /// yesterday. Zero once a full day has been skipped.
    pub current_streak: u32,
    pub lessons_completed: usize,
    pub quizzes_taken: usize,
    /// Distinct words answered in quizzes submitted today.
    pub words_practiced_today: usize,
    /// First lesson, by number, with no recorded attempt.
    pub next_lesson: Option<LessonOverview>,
}

/// Practice history for one vocabulary word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordProgress {
    pub lesson_id: LessonId,
    pub item_id: VocabularyId,
    pub primary_text: String,
    pub transliteration: String,
    pub meaning: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Tally {
    total: u32,
    correct: u32,
    last: Option<DateTime<Utc>>,
}

/// Learner-level progress derived from lessons and recorded results.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    results: Arc<dyn ResultRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            results,
        }
    }

    /// Streak, completed lessons, today's words and the next lesson to take.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn dashboard(&self, learner_id: &LearnerId) -> Result<Dashboard, SessionError> {
        let records = self.results.list_results(learner_id, None, ALL_RESULTS).await?;
        let today = self.clock.now().date_naive();

        let practiced: HashSet<&LessonId> = records.iter().map(|r| r.result.lesson_id()).collect();
        let words_today: HashSet<(&LessonId, &VocabularyId)> = records
            .iter()
            .filter(|r| r.submitted_at.date_naive() == today)
            .flat_map(|r| {
                r.result
                    .responses()
                    .iter()
                    .map(move |resp| (r.result.lesson_id(), &resp.item_id))
            })
            .collect();

        let mut lessons = self.lessons.list_lessons().await?;
        lessons.sort_by_key(|l| l.number);
        let next_lesson = lessons.into_iter().find(|l| !practiced.contains(&l.id));

        Ok(Dashboard {
            current_streak: current_streak(&records, today),
            lessons_completed: practiced.len(),
            quizzes_taken: records.len(),
            words_practiced_today: words_today.len(),
            next_lesson,
        })
    }

    /// Every word of every lesson, in lesson order, with its attempt counts.
    /// Words never answered report zero attempts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn word_progress(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Vec<WordProgress>, SessionError> {
        let records = self.results.list_results(learner_id, None, ALL_RESULTS).await?;

        let mut tallies: HashMap<(LessonId, VocabularyId), Tally> = HashMap::new();
        for record in &records {
            for response in record.result.responses() {
                let tally = tallies
                    .entry((record.result.lesson_id().clone(), response.item_id.clone()))
                    .or_default();
                tally.total += 1;
                if response.is_correct {
                    tally.correct += 1;
                }
                if tally.last.is_none_or(|last| record.submitted_at > last) {
                    tally.last = Some(record.submitted_at);
                }
            }
        }

        let mut overviews = self.lessons.list_lessons().await?;
        overviews.sort_by_key(|l| l.number);

        let mut out = Vec::new();
        for overview in overviews {
            let lesson = self.lessons.get_lesson(&overview.id).await?;
            for item in lesson.items() {
                let tally = tallies
                    .remove(&(lesson.id().clone(), item.id().clone()))
                    .unwrap_or_default();
                out.push(WordProgress {
                    lesson_id: lesson.id().clone(),
                    item_id: item.id().clone(),
                    primary_text: item.primary_text().to_owned(),
                    transliteration: item.transliteration().to_owned(),
                    meaning: item.meaning().to_owned(),
                    total_attempts: tally.total,
                    correct_attempts: tally.correct,
                    last_practiced: tally.last,
                });
            }
        }
        Ok(out)
    }
}

fn current_streak(records: &[ResultRecord], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.submitted_at.date_naive()).collect();

    let yesterday = today.checked_sub_days(Days::new(1));
    let mut cursor = if days.contains(&today) {
        Some(today)
    } else if yesterday.is_some_and(|d| days.contains(&d)) {
        yesterday
    } else {
        None
    };

    let mut streak = 0;
    while let Some(day) = cursor.filter(|d| days.contains(d)) {
        streak += 1;
        cursor = day.checked_sub_days(Days::new(1));
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{AttemptId, Lesson, Response, SessionResult};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, NewResultRecord};
    use storage::seed::seed_sample_lessons;

    fn amina() -> LearnerId {
        LearnerId::parse("amina").unwrap()
    }

    fn record_for(lesson: &Lesson, wrong: &[usize], at: DateTime<Utc>) -> NewResultRecord {
        let responses = lesson
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| Response {
                question_index: i,
                item_id: item.id().clone(),
                selected_answer: String::new(),
                is_correct: !wrong.contains(&i),
                elapsed_seconds: 2,
            })
            .collect();
        NewResultRecord {
            attempt_id: AttemptId::new_v4(),
            learner_id: amina(),
            submitted_at: at,
            result: SessionResult::from_responses(
                lesson.id().clone(),
                lesson.items().len(),
                responses,
            )
            .unwrap(),
        }
    }

    async fn service(repo: &InMemoryRepository) -> ProgressService {
        seed_sample_lessons(repo).await.unwrap();
        ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn fresh_learner_starts_at_lesson_one() {
        let repo = InMemoryRepository::new();
        let dashboard = service(&repo).await.dashboard(&amina()).await.unwrap();

        assert_eq!(dashboard.current_streak, 0);
        assert_eq!(dashboard.lessons_completed, 0);
        assert_eq!(dashboard.words_practiced_today, 0);
        assert_eq!(
            dashboard.next_lesson.map(|l| l.id),
            Some(LessonId::for_number(1))
        );
    }

    #[tokio::test]
    async fn dashboard_counts_streak_lessons_and_todays_words() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo).await;
        let one = repo.get_lesson(&LessonId::for_number(1)).await.unwrap();
        let two = repo.get_lesson(&LessonId::for_number(2)).await.unwrap();

        // Three consecutive days ending today, plus an older day after a gap.
        for (days_ago, lesson) in [(0, &one), (0, &one), (1, &two), (2, &one), (5, &one)] {
            repo.append_result(&record_for(lesson, &[], fixed_now() - Duration::days(days_ago)))
                .await
                .unwrap();
        }

        let dashboard = svc.dashboard(&amina()).await.unwrap();
        assert_eq!(dashboard.current_streak, 3);
        assert_eq!(dashboard.lessons_completed, 2);
        assert_eq!(dashboard.quizzes_taken, 5);
        assert_eq!(dashboard.words_practiced_today, 10);
        assert_eq!(
            dashboard.next_lesson.map(|l| l.id),
            Some(LessonId::for_number(3))
        );
    }

    #[tokio::test]
    async fn streak_survives_until_a_day_is_skipped() {
        let repo = InMemoryRepository::new();
        let one = {
            seed_sample_lessons(&repo).await.unwrap();
            repo.get_lesson(&LessonId::for_number(1)).await.unwrap()
        };
        repo.append_result(&record_for(&one, &[], fixed_now() - Duration::days(1)))
            .await
            .unwrap();
        repo.append_result(&record_for(&one, &[], fixed_now() - Duration::days(2)))
            .await
            .unwrap();

        let yesterday_streak = ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        assert_eq!(yesterday_streak.dashboard(&amina()).await.unwrap().current_streak, 2);

        let lapsed = ProgressService::new(
            Clock::fixed(fixed_now() + Duration::days(1)),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let dashboard = lapsed.dashboard(&amina()).await.unwrap();
        assert_eq!(dashboard.current_streak, 0);
        assert_eq!(dashboard.words_practiced_today, 0);
    }

    #[tokio::test]
    async fn word_progress_lists_every_word_with_attempts() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo).await;
        let one = repo.get_lesson(&LessonId::for_number(1)).await.unwrap();

        repo.append_result(&record_for(&one, &[0], fixed_now() - Duration::hours(3)))
            .await
            .unwrap();
        repo.append_result(&record_for(&one, &[], fixed_now()))
            .await
            .unwrap();

        let words = svc.word_progress(&amina()).await.unwrap();
        assert_eq!(words.len(), 30);

        let first = &words[0];
        assert_eq!(first.lesson_id, LessonId::for_number(1));
        assert_eq!(first.item_id, *one.items()[0].id());
        assert_eq!(first.total_attempts, 2);
        assert_eq!(first.correct_attempts, 1);
        assert_eq!(first.last_practiced, Some(fixed_now()));

        let untouched = &words[10];
        assert_eq!(untouched.lesson_id, LessonId::for_number(2));
        assert_eq!(untouched.total_attempts, 0);
        assert!(untouched.last_practiced.is_none());
    }
}
