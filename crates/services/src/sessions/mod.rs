mod history;
mod progress;
mod workflow;

// Public API of the quiz session subsystem.
pub use history::{LessonStats, ResultHistoryService, ResultListItem};
pub use progress::{Dashboard, ProgressService, WordProgress};
pub use workflow::{LessonQuiz, QuizLoopService};
