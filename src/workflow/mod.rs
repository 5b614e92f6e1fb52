pub mod quiz_flow;
pub mod quiz_session;

pub use quiz_flow::{QuizFlow, QuizReport};
pub use quiz_session::{AnswerOutcome, QuizSession, Score, SessionPhase};
