//! Question repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use polls_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
    sea_query::{Expr, Func},
};
use tracing::warn;

use crate::entities::{Question, choice, question};

/// Admin changelist criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionSearch {
    /// Case-insensitive substring of `question_text`.
    pub text: Option<String>,
    /// Inclusive lower bound on `pub_date`.
    pub published_since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `pub_date`.
    pub published_before: Option<DateTime<Utc>>,
}

impl QuestionSearch {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col(question::Column::QuestionText)))
                    .like(contains_pattern(text)),
            );
        }
        if let Some(since) = self.published_since {
            condition = condition.add(question::Column::PubDate.gte(since));
        }
        if let Some(before) = self.published_before {
            condition = condition.add(question::Column::PubDate.lt(before));
        }

        condition
    }
}

/// `LIKE` pattern matching `text` anywhere, lowercased, wildcards escaped.
fn contains_pattern(text: &str) -> String {
    format!(
        "%{}%",
        text.to_lowercase().replace('%', "\\%").replace('_', "\\_")
    )
}

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Published questions at `now`, newest first.
    #[must_use]
    pub fn published_query(now: DateTime<Utc>) -> Select<Question> {
        Question::find()
            .filter(question::Column::PubDate.lte(now))
            .order_by_desc(question::Column::PubDate)
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a question by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: i32) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(AppError::QuestionNotFound(id))
    }

    /// All published questions, newest first.
    pub async fn find_published(&self, now: DateTime<Utc>) -> AppResult<Vec<question::Model>> {
        Self::published_query(now)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of published questions, newest first.
    ///
    /// `page_index` is zero-based.
    pub async fn find_published_page(
        &self,
        now: DateTime<Utc>,
        page_index: u64,
        per_page: u64,
    ) -> AppResult<Vec<question::Model>> {
        Self::published_query(now)
            .paginate(self.db.as_ref(), per_page)
            .fetch_page(page_index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count published questions.
    pub async fn count_published(&self, now: DateTime<Utc>) -> AppResult<u64> {
        Question::find()
            .filter(question::Column::PubDate.lte(now))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search questions for the admin changelist, newest first.
    pub async fn search(
        &self,
        criteria: &QuestionSearch,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(criteria.condition())
            .order_by_desc(question::Column::PubDate)
            .order_by_desc(question::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count questions matching the admin changelist criteria.
    pub async fn count_search(&self, criteria: &QuestionSearch) -> AppResult<u64> {
        Question::find()
            .filter(criteria.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a question together with its choices.
    ///
    /// `question_id` of each choice is filled in from the new question. Either
    /// every row is committed or none is.
    pub async fn create_with_choices(
        &self,
        question: question::ActiveModel,
        choices: Vec<choice::ActiveModel>,
    ) -> AppResult<(question::Model, Vec<choice::Model>)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match Self::create_with_choices_in(&txn, question, choices).await {
            Ok(created) => {
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(created)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback of question create failed");
                }
                Err(AppError::Database(err.to_string()))
            }
        }
    }

    async fn create_with_choices_in(
        txn: &DatabaseTransaction,
        question: question::ActiveModel,
        choices: Vec<choice::ActiveModel>,
    ) -> Result<(question::Model, Vec<choice::Model>), DbErr> {
        let question = question.insert(txn).await?;

        let mut created = Vec::with_capacity(choices.len());
        for mut choice in choices {
            choice.question_id = Set(question.id);
            created.push(choice.insert(txn).await?);
        }

        Ok((question, created))
    }

    /// Update a question.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a question. Choices and votes go with it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = Question::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::QuestionNotFound(id));
        }
        Ok(())
    }
}
