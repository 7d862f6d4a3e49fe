mod auth;
mod ids;
mod question;
mod result;
mod vocabulary;

pub use auth::AuthContext;
pub use ids::{AttemptId, LearnerId, LessonId, VocabularyId};
pub use question::QuizQuestion;
pub use result::{Response, SessionResult};
pub use vocabulary::{Lesson, LessonOverview, VocabularyItem, validate_items};
