use std::sync::Arc;

use chrono::Duration;
use quiz_core::model::{AuthContext, LearnerId, LessonId};
use quiz_core::rng::RngSource;
use quiz_core::time::fixed_now;
use services::{Clock, ProgressService, QuizLoopService, RepositorySink};
use storage::seed::seed_sample_lessons;
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    seed_sample_lessons(&repo).await.expect("seed");
    repo
}

/// Runs one quiz on `lesson`, missing the first question, submitted at `clock`.
async fn take_quiz(repo: &SqliteRepository, clock: Clock, lesson: u32) {
    let svc = QuizLoopService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(RepositorySink::new(Arc::new(repo.clone()))),
    );
    let mut quiz = svc
        .start_quiz(&LessonId::for_number(lesson), &mut RngSource::seeded(5))
        .await
        .unwrap();
    let mut first = true;
    while let Some(question) = quiz.current_question() {
        let selected = if first {
            "not a meaning".to_owned()
        } else {
            question.correct_answer().to_owned()
        };
        first = false;
        quiz.answer(selected, 3).unwrap();
        quiz.next().unwrap();
    }
    let auth = AuthContext::local(LearnerId::parse("amina").unwrap());
    svc.submit(&mut quiz, &auth).await.unwrap();
}

#[tokio::test]
async fn sqlite_progress_tracks_streak_and_words() {
    let repo = connect("memdb_progress").await;
    let learner = LearnerId::parse("amina").unwrap();

    take_quiz(&repo, Clock::fixed(fixed_now() - Duration::days(1)), 1).await;
    take_quiz(&repo, Clock::fixed(fixed_now()), 1).await;
    take_quiz(&repo, Clock::fixed(fixed_now()), 2).await;

    let progress = ProgressService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );

    let dashboard = progress.dashboard(&learner).await.unwrap();
    assert_eq!(dashboard.current_streak, 2);
    assert_eq!(dashboard.lessons_completed, 2);
    assert_eq!(dashboard.quizzes_taken, 3);
    assert_eq!(dashboard.words_practiced_today, 20);
    assert_eq!(
        dashboard.next_lesson.map(|l| l.id),
        Some(LessonId::for_number(3))
    );

    let words = progress.word_progress(&learner).await.unwrap();
    assert_eq!(words.len(), 30);
    let lesson_one: Vec<_> = words
        .iter()
        .filter(|w| w.lesson_id == LessonId::for_number(1))
        .collect();
    assert!(lesson_one.iter().all(|w| w.total_attempts == 2));
    assert!(lesson_one.iter().all(|w| w.last_practiced == Some(fixed_now())));
    assert_eq!(
        lesson_one.iter().map(|w| w.correct_attempts).sum::<u32>(),
        18
    );
    assert!(
        words
            .iter()
            .filter(|w| w.lesson_id == LessonId::for_number(3))
            .all(|w| w.total_attempts == 0)
    );
}
