pub mod config;
pub mod console;
pub mod quiz;

pub use quiz::bank::QuestionBank;
pub use quiz::engine::{DrawMode, GradeOutcome, PresentedQuestion, QuizEngine};
pub use quiz::error::{LoadError, QuizError};
pub use quiz::session::SessionStore;
pub use quiz::{DisplayOption, Label, ParticipantId, QuestionRecord};
