//! Question entity.

use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub question_text: String,

    /// Date published
    #[sea_orm(indexed)]
    pub pub_date: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the question is visible at `now`.
    #[must_use]
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    /// Whether `pub_date` falls within the day leading up to `now`.
    #[must_use]
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::choice::Entity")]
    Choices,

    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::choice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Choices.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_at(pub_date: DateTime<Utc>) -> Model {
        Model {
            id: 1,
            question_text: "What's up?".to_string(),
            pub_date: pub_date.into(),
        }
    }

    #[test]
    fn test_was_published_recently_with_future_question() {
        let now = Utc::now();
        let question = question_at(now + Duration::days(30));
        assert!(!question.was_published_recently(now));
        assert!(!question.is_published(now));
    }

    #[test]
    fn test_was_published_recently_with_old_question() {
        let now = Utc::now();
        let question = question_at(now - Duration::days(1) - Duration::seconds(1));
        assert!(!question.was_published_recently(now));
        assert!(question.is_published(now));
    }

    #[test]
    fn test_was_published_recently_with_recent_question() {
        let now = Utc::now();
        let question =
            question_at(now - Duration::hours(23) - Duration::minutes(59) - Duration::seconds(59));
        assert!(question.was_published_recently(now));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        assert!(question_at(now).was_published_recently(now));
        assert!(question_at(now - Duration::days(1)).was_published_recently(now));
    }
}
