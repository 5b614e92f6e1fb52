pub mod question;

pub use question::{ExamLevel, Language, QuestionRecord, QuizRequest, OPTION_COUNT};
