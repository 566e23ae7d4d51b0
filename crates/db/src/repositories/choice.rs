//! Choice repository.

use std::sync::Arc;

use polls_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::entities::{Choice, choice};

/// Choice repository for database operations.
#[derive(Clone)]
pub struct ChoiceRepository {
    db: Arc<DatabaseConnection>,
}

impl ChoiceRepository {
    /// Create a new choice repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a choice by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<choice::Model>> {
        Choice::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Choices of a question in insertion order.
    pub async fn find_by_question(&self, question_id: i32) -> AppResult<Vec<choice::Model>> {
        Choice::find()
            .filter(choice::Column::QuestionId.eq(question_id))
            .order_by_asc(choice::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new choice.
    pub async fn create(&self, model: choice::ActiveModel) -> AppResult<choice::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a choice.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = Choice::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Choice not found: {id}")));
        }
        Ok(())
    }
}
