//! Business logic services.

pub mod admin;
pub mod pagination;
pub mod question;
pub mod user;
pub mod vote;

pub use admin::{
    AdminService, Changelist, ChangelistRow, ChoiceInput, CreateQuestionInput, Fieldset,
    InlineConfig, PubDateFilter, QUESTION_ADMIN, QuestionAdminConfig, QuestionAdminView,
    UpdateQuestionInput,
};
pub use pagination::Page;
pub use question::{QuestionDetail, QuestionService, Tally};
pub use user::{CreateUserInput, UserService};
pub use vote::{ALREADY_VOTED_MESSAGE, INVALID_CHOICE_MESSAGE, VoteOutcome, VoteService};
