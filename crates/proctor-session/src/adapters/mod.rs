//! Adapters implementing outbound ports in-process

pub mod answer_key;
pub mod question_bank;

pub use answer_key::AnswerKeyGrader;
pub use question_bank::{BankQuestion, QuestionBank};
