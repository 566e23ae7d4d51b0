//! Vote service.

use polls_common::AppResult;
use polls_db::repositories::{QuestionRepository, RecordOutcome, VoteRepository};
use tracing::{debug, info};

/// Shown when the client address already voted on the question.
pub const ALREADY_VOTED_MESSAGE: &str = "You have already voted.";

/// Shown when the submitted choice is missing or unknown.
pub const INVALID_CHOICE_MESSAGE: &str = "You didn't select a choice.";

/// Result of casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was counted.
    Recorded {
        /// Question voted on.
        question_id: i32,
        /// Choice whose counter was incremented.
        choice_id: i32,
    },
    /// The address already voted on this question.
    AlreadyVoted,
    /// The choice is missing, malformed or belongs to another question.
    InvalidChoice,
}

impl VoteOutcome {
    /// Message to show on the re-rendered detail page, if the vote was rejected.
    #[must_use]
    pub const fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Recorded { .. } => None,
            Self::AlreadyVoted => Some(ALREADY_VOTED_MESSAGE),
            Self::InvalidChoice => Some(INVALID_CHOICE_MESSAGE),
        }
    }
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    question_repo: QuestionRepository,
    vote_repo: VoteRepository,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(question_repo: QuestionRepository, vote_repo: VoteRepository) -> Self {
        Self {
            question_repo,
            vote_repo,
        }
    }

    /// Cast a vote from `client_ip`.
    ///
    /// `choice_param` is the raw `choice` form value. A missing question is an
    /// error; every other rejection is reported through [`VoteOutcome`].
    pub async fn cast(
        &self,
        question_id: i32,
        choice_param: Option<&str>,
        client_ip: &str,
    ) -> AppResult<VoteOutcome> {
        self.question_repo.get_by_id(question_id).await?;

        let Some(choice_id) = parse_choice(choice_param) else {
            // An earlier vote takes precedence over a bad selection.
            let outcome = if self.vote_repo.exists(question_id, client_ip).await? {
                VoteOutcome::AlreadyVoted
            } else {
                VoteOutcome::InvalidChoice
            };
            debug!(question_id, client_ip, ?outcome, "Vote rejected");
            return Ok(outcome);
        };

        let outcome = match self
            .vote_repo
            .record(question_id, choice_id, client_ip)
            .await?
        {
            RecordOutcome::Recorded(_) => {
                info!(question_id, choice_id, client_ip, "Vote recorded");
                return Ok(VoteOutcome::Recorded {
                    question_id,
                    choice_id,
                });
            }
            RecordOutcome::AlreadyVoted => VoteOutcome::AlreadyVoted,
            RecordOutcome::ChoiceNotFound => VoteOutcome::InvalidChoice,
        };

        debug!(question_id, choice_id, client_ip, ?outcome, "Vote rejected");
        Ok(outcome)
    }
}

fn parse_choice(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|value| value.trim().parse().ok())
}
