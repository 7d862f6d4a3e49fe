#![forbid(unsafe_code)]

pub mod error;
pub mod remote;
pub mod sessions;
pub mod sink;

pub use quiz_core::Clock;

pub use error::{SessionError, SinkError};
pub use remote::{RemoteConfig, RemoteResultSink};
pub use sessions::{
    Dashboard, LessonQuiz, LessonStats, ProgressService, QuizLoopService, ResultHistoryService,
    ResultListItem, WordProgress,
};
pub use sink::{RepositorySink, ResultSink, ResultSubmission, SubmissionReceipt};
