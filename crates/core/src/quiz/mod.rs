mod generator;
mod progress;
mod session;

pub use generator::{DEFAULT_OPTION_COUNT, GeneratorConfig, QuestionOrder, generate_questions};
pub use progress::SessionProgress;
pub use session::{InvalidStateError, QuizSession, SessionPhase, SessionState};
