use std::sync::Arc;

use chrono::{DateTime, Utc};

use quiz_core::model::{
    AttemptId, AuthContext, Lesson, LessonId, LessonOverview, QuizQuestion, Response,
};
use quiz_core::quiz::{
    GeneratorConfig, QuizSession, SessionProgress, SessionState, generate_questions,
};
use quiz_core::{Clock, RandomSource};
use storage::repository::LessonRepository;

use crate::error::SessionError;
use crate::sink::{ResultSink, ResultSubmission, SubmissionReceipt};

/// One learner's attempt at a lesson quiz.
///
/// Wraps the quiz state machine with the attempt id used for submission and the
/// receipt once submitted. Dropping it before submission leaves no trace.
#[derive(Debug)]
pub struct LessonQuiz {
    attempt_id: AttemptId,
    started_at: DateTime<Utc>,
    session: QuizSession,
    receipt: Option<SubmissionReceipt>,
}

impl LessonQuiz {
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.session.current_question()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.session.progress()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    #[must_use]
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the question was already answered
    /// or the quiz is complete.
    pub fn answer(
        &mut self,
        selected: impl Into<String>,
        elapsed_seconds: u32,
    ) -> Result<Response, SessionError> {
        Ok(self.session.submit_answer(selected, elapsed_seconds)?)
    }

    /// Move to the next question, or complete the quiz after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the current question is unanswered
    /// or the quiz is complete.
    pub fn next(&mut self) -> Result<SessionState, SessionError> {
        Ok(self.session.advance()?)
    }
}

/// Orchestrates lesson loading, quiz start and result submission.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    sink: Arc<dyn ResultSink>,
    config: GeneratorConfig,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            clock,
            lessons,
            sink,
            config: GeneratorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Lessons available to quiz on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_lessons(&self) -> Result<Vec<LessonOverview>, SessionError> {
        Ok(self.lessons.list_lessons().await?)
    }

    /// Load a lesson and start a quiz over its vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the lesson cannot be loaded and
    /// `SessionError::Validation` if its vocabulary cannot form a quiz.
    pub async fn start_quiz<R: RandomSource + ?Sized>(
        &self,
        lesson_id: &LessonId,
        rng: &mut R,
    ) -> Result<LessonQuiz, SessionError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        self.start_quiz_for(&lesson, rng)
    }

    /// Start a quiz for a lesson the caller already holds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if the vocabulary cannot form a quiz.
    pub fn start_quiz_for<R: RandomSource + ?Sized>(
        &self,
        lesson: &Lesson,
        rng: &mut R,
    ) -> Result<LessonQuiz, SessionError> {
        let questions = generate_questions(lesson.items(), &self.config, rng)?;
        let session = QuizSession::new(lesson.id().clone(), questions)?;
        let quiz = LessonQuiz {
            attempt_id: AttemptId::new_v4(),
            started_at: self.clock.now(),
            session,
            receipt: None,
        };
        log::info!(
            "started quiz {} for {} ({} questions)",
            quiz.attempt_id,
            lesson.id(),
            quiz.session.questions().len()
        );
        Ok(quiz)
    }

    /// Finalize a completed quiz and hand the result to the sink.
    ///
    /// Once a submission succeeds its receipt is kept on the quiz, and later calls
    /// return it without submitting again. A failed submission may be retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the quiz is not complete and
    /// `SessionError::Sink` if the sink refuses the result.
    pub async fn submit(
        &self,
        quiz: &mut LessonQuiz,
        auth: &AuthContext,
    ) -> Result<SubmissionReceipt, SessionError> {
        if let Some(receipt) = &quiz.receipt {
            return Ok(receipt.clone());
        }

        let result = quiz.session.finalize()?;
        let submission = ResultSubmission {
            attempt_id: quiz.attempt_id,
            auth: auth.clone(),
            submitted_at: self.clock.now(),
            result,
        };

        match self.sink.submit(&submission).await {
            Ok(receipt) => {
                log::info!(
                    "submitted quiz {} for {}: {:.1}%",
                    quiz.attempt_id,
                    submission.result.lesson_id(),
                    submission.result.score_percentage()
                );
                quiz.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                log::warn!("submitting quiz {} failed: {e}", quiz.attempt_id);
                Err(e.into())
            }
        }
    }
}
