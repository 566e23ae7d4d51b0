//! Vote repository.
//!
//! A vote is recorded by [`VoteRepository::record`], which checks for an
//! earlier vote from the same address, bumps the choice counter and stores the
//! vote row in a single transaction. The unique index on
//! `(question_id, ip_address)` backs the check up when two requests from the
//! same address race each other.

use std::sync::Arc;

use polls_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, SqlErr, TransactionTrait, sea_query::Expr,
};

use crate::entities::{Choice, Vote, choice, vote};

/// Result of [`VoteRepository::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Counter incremented and vote stored.
    Recorded(vote::Model),
    /// This address already voted on the question. Nothing changed.
    AlreadyVoted,
    /// The choice does not exist or belongs to another question. Nothing changed.
    ChoiceNotFound,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether an address has voted on a question.
    pub async fn exists(&self, question_id: i32, ip_address: &str) -> AppResult<bool> {
        let count = Vote::find()
            .filter(vote::Column::QuestionId.eq(question_id))
            .filter(vote::Column::IpAddress.eq(ip_address))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count votes cast on a question.
    pub async fn count_by_question(&self, question_id: i32) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::QuestionId.eq(question_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a vote for `choice_id` on `question_id` from `ip_address`.
    ///
    /// Either both the counter increment and the vote row are committed, or
    /// neither is.
    pub async fn record(
        &self,
        question_id: i32,
        choice_id: i32,
        ip_address: &str,
    ) -> AppResult<RecordOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let outcome = Self::record_in(&txn, question_id, choice_id, ip_address)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match outcome {
            RecordOutcome::Recorded(_) => txn.commit().await,
            RecordOutcome::AlreadyVoted | RecordOutcome::ChoiceNotFound => txn.rollback().await,
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(outcome)
    }

    async fn record_in(
        txn: &DatabaseTransaction,
        question_id: i32,
        choice_id: i32,
        ip_address: &str,
    ) -> Result<RecordOutcome, DbErr> {
        let existing = Vote::find()
            .filter(vote::Column::QuestionId.eq(question_id))
            .filter(vote::Column::IpAddress.eq(ip_address))
            .count(txn)
            .await?;
        if existing > 0 {
            return Ok(RecordOutcome::AlreadyVoted);
        }

        // Scoped to the question so a foreign choice id cannot be bumped.
        let updated = Choice::update_many()
            .col_expr(choice::Column::Votes, Expr::col(choice::Column::Votes).add(1))
            .filter(choice::Column::Id.eq(choice_id))
            .filter(choice::Column::QuestionId.eq(question_id))
            .exec(txn)
            .await?;
        if updated.rows_affected == 0 {
            return Ok(RecordOutcome::ChoiceNotFound);
        }

        let model = vote::ActiveModel {
            question_id: Set(question_id),
            ip_address: Set(ip_address.to_string()),
            ..Default::default()
        };
        match model.insert(txn).await {
            Ok(vote) => Ok(RecordOutcome::Recorded(vote)),
            Err(err) if is_unique_violation(&err) => Ok(RecordOutcome::AlreadyVoted),
            Err(err) => Err(err),
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
