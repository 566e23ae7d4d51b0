//! Repository layer for database operations.

mod choice;
mod question;
mod user;
mod vote;

pub use choice::ChoiceRepository;
pub use question::{QuestionRepository, QuestionSearch};
pub use user::UserRepository;
pub use vote::{RecordOutcome, VoteRepository};
