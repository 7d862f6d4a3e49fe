use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quiz_core::model::{AuthContext, LearnerId, LessonId};
use quiz_core::rng::RngSource;
use quiz_core::time::fixed_now;
use services::{
    Clock, QuizLoopService, RepositorySink, ResultHistoryService, ResultSink, ResultSubmission,
    SessionError, SinkError, SubmissionReceipt,
};
use storage::repository::{InMemoryRepository, ResultRepository, StorageError};
use storage::seed::seed_sample_lessons;

async fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    seed_sample_lessons(&repo).await.unwrap();
    repo
}

fn learner() -> AuthContext {
    AuthContext::local(LearnerId::parse("amina").unwrap())
}

#[tokio::test]
async fn quiz_loop_records_result_for_learner() {
    let repo = seeded_repo().await;
    let svc = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(RepositorySink::new(Arc::new(repo.clone()))),
    );

    let lessons = svc.list_lessons().await.unwrap();
    assert_eq!(lessons.len(), 3);

    let mut quiz = svc
        .start_quiz(&LessonId::for_number(1), &mut RngSource::seeded(7))
        .await
        .unwrap();
    let mut answered = 0;
    while !quiz.is_complete() {
        let question = quiz.current_question().unwrap();
        // Miss every third word.
        let selected = if answered % 3 == 2 {
            question
                .options()
                .iter()
                .find(|o| !question.is_correct(o))
                .unwrap()
                .clone()
        } else {
            question.correct_answer().to_owned()
        };
        quiz.answer(selected, 2).unwrap();
        quiz.next().unwrap();
        answered += 1;
    }
    assert_eq!(answered, 10);

    let receipt = svc.submit(&mut quiz, &learner()).await.unwrap();
    let SubmissionReceipt::Stored { result_id } = receipt.clone() else {
        panic!("expected a stored receipt");
    };

    let stored = repo.get_result(result_id).await.unwrap();
    assert_eq!(stored.attempt_id, quiz.attempt_id());
    assert_eq!(stored.submitted_at, fixed_now());
    assert_eq!(stored.result.correct_count(), 7);
    assert_eq!(stored.result.total_elapsed_seconds(), 20);

    // A repeated submit hands back the same receipt without writing again.
    let again = svc.submit(&mut quiz, &learner()).await.unwrap();
    assert_eq!(again, receipt);

    let history = ResultHistoryService::new(Arc::new(repo.clone()));
    let items = history
        .list_recent(learner().learner_id(), None, 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert!((items[0].score_percentage - 70.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn abandoned_quiz_leaves_no_result() {
    let repo = seeded_repo().await;
    let svc = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(RepositorySink::new(Arc::new(repo.clone()))),
    );

    let mut quiz = svc
        .start_quiz(&LessonId::for_number(2), &mut RngSource::seeded(1))
        .await
        .unwrap();
    let correct = quiz.current_question().unwrap().correct_answer().to_owned();
    quiz.answer(correct, 1).unwrap();
    drop(quiz);

    let recorded = repo
        .list_results(learner().learner_id(), None, 10)
        .await
        .unwrap();
    assert!(recorded.is_empty());
}

#[tokio::test]
async fn unknown_lesson_is_a_storage_error() {
    let repo = seeded_repo().await;
    let svc = QuizLoopService::new(
        Clock::default(),
        Arc::new(repo.clone()),
        Arc::new(RepositorySink::new(Arc::new(repo))),
    );
    let err = svc
        .start_quiz(&LessonId::for_number(99), &mut RngSource::seeded(1))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::NotFound)));
}

/// Fails the first submission, then accepts.
struct FlakySink {
    calls: AtomicUsize,
}

#[async_trait]
impl ResultSink for FlakySink {
    async fn submit(&self, _submission: &ResultSubmission) -> Result<SubmissionReceipt, SinkError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SinkError::Rejected("try again".into()));
        }
        Ok(SubmissionReceipt::Accepted {
            message: "Lesson completed".into(),
            words_learned: Some(10),
        })
    }
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let repo = seeded_repo().await;
    let sink = Arc::new(FlakySink {
        calls: AtomicUsize::new(0),
    });
    let svc = QuizLoopService::new(Clock::fixed(fixed_now()), Arc::new(repo), sink.clone());

    let mut quiz = svc
        .start_quiz(&LessonId::for_number(3), &mut RngSource::seeded(3))
        .await
        .unwrap();
    while !quiz.is_complete() {
        let correct = quiz.current_question().unwrap().correct_answer().to_owned();
        quiz.answer(correct, 1).unwrap();
        quiz.next().unwrap();
    }

    let err = svc.submit(&mut quiz, &learner()).await.unwrap_err();
    assert!(matches!(err, SessionError::Sink(SinkError::Rejected(_))));
    assert!(quiz.receipt().is_none());

    let receipt = svc.submit(&mut quiz, &learner()).await.unwrap();
    assert!(matches!(
        receipt,
        SubmissionReceipt::Accepted {
            words_learned: Some(10),
            ..
        }
    ));
    svc.submit(&mut quiz, &learner()).await.unwrap();
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
}
