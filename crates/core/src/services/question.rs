//! Question service: the read side of the polls.

use chrono::{DateTime, Utc};
use polls_common::{AppError, AppResult};
use polls_db::{
    entities::{choice, question},
    repositories::{ChoiceRepository, QuestionRepository},
};
use serde::Serialize;

use super::pagination::{self, Page};

/// A question together with its choices in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDetail {
    pub question: question::Model,
    pub choices: Vec<choice::Model>,
}

/// Vote counts of a question as two parallel sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub question: question::Model,
    /// Choice texts, in choice order.
    pub labels: Vec<String>,
    /// Vote counts, aligned with `labels`.
    pub data: Vec<i32>,
}

impl Tally {
    /// Build a tally from a question and its choices.
    #[must_use]
    pub fn new(question: question::Model, choices: Vec<choice::Model>) -> Self {
        let (labels, data) = choices
            .into_iter()
            .map(|c| (c.choice_text, c.votes))
            .unzip();
        Self {
            question,
            labels,
            data,
        }
    }

    /// Sum of all votes.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.data.iter().map(|&v| i64::from(v)).sum()
    }
}

/// Question service for business logic.
#[derive(Clone)]
pub struct QuestionService {
    question_repo: QuestionRepository,
    choice_repo: ChoiceRepository,
    page_size: u64,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub const fn new(
        question_repo: QuestionRepository,
        choice_repo: ChoiceRepository,
        page_size: u64,
    ) -> Self {
        Self {
            question_repo,
            choice_repo,
            page_size,
        }
    }

    /// All questions published at `now`, newest first.
    pub async fn latest(&self, now: DateTime<Utc>) -> AppResult<Vec<question::Model>> {
        self.question_repo.find_published(now).await
    }

    /// One page of the index listing.
    ///
    /// `page_param` is the raw `page` query value.
    pub async fn index_page(
        &self,
        now: DateTime<Utc>,
        page_param: Option<&str>,
    ) -> AppResult<Page<question::Model>> {
        let count = self.question_repo.count_published(now).await?;
        let (number, num_pages) = pagination::resolve(page_param, count, self.page_size);

        let items = if count == 0 {
            Vec::new()
        } else {
            self.question_repo
                .find_published_page(now, number - 1, self.page_size)
                .await?
        };

        Ok(Page::new(number, num_pages, count, items))
    }

    /// A published question and its choices.
    ///
    /// Questions scheduled for the future are reported as missing.
    pub async fn published_detail(&self, id: i32, now: DateTime<Utc>) -> AppResult<QuestionDetail> {
        let question = self
            .question_repo
            .find_by_id(id)
            .await?
            .filter(|q| q.is_published(now))
            .ok_or(AppError::QuestionNotFound(id))?;

        let choices = self.choice_repo.find_by_question(id).await?;
        Ok(QuestionDetail { question, choices })
    }

    /// A question and its choices, published or not.
    pub async fn detail(&self, id: i32) -> AppResult<QuestionDetail> {
        let question = self.question_repo.get_by_id(id).await?;
        let choices = self.choice_repo.find_by_question(id).await?;
        Ok(QuestionDetail { question, choices })
    }

    /// Labels and vote counts of a question.
    pub async fn tally(&self, id: i32) -> AppResult<Tally> {
        let QuestionDetail { question, choices } = self.detail(id).await?;
        Ok(Tally::new(question, choices))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn question_at(id: i32, text: &str, offset: Duration) -> question::Model {
        question::Model {
            id,
            question_text: text.to_string(),
            pub_date: (Utc::now() + offset).into(),
        }
    }

    fn choice_with(id: i32, question_id: i32, text: &str, votes: i32) -> choice::Model {
        choice::Model {
            id,
            question_id,
            choice_text: text.to_string(),
            votes,
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n))
        }
    }

    fn service(db: MockDatabase, page_size: u64) -> QuestionService {
        let conn = Arc::new(db.into_connection());
        QuestionService::new(
            QuestionRepository::new(Arc::clone(&conn)),
            ChoiceRepository::new(conn),
            page_size,
        )
    }

    #[tokio::test]
    async fn test_index_page_empty_listing() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[count_row(0)]]),
            5,
        );

        let page = svc.index_page(Utc::now(), None).await.unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn test_latest_returns_published_questions() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                question_at(2, "Past question 2.", -Duration::days(5)),
                question_at(1, "Past question 1.", -Duration::days(30)),
            ]]),
            5,
        );

        let latest = svc.latest(Utc::now()).await.unwrap();

        let texts: Vec<_> = latest.iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(texts, ["Past question 2.", "Past question 1."]);
    }

    #[tokio::test]
    async fn test_index_page_past_the_end_shows_last_page() {
        let last = question_at(1, "Oldest", -Duration::days(40));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(6)]])
                .append_query_results([[last]]),
            5,
        );

        let page = svc.index_page(Utc::now(), Some("7")).await.unwrap();

        assert_eq!(page.number, 2);
        assert_eq!(page.num_pages, 2);
        assert!(page.has_previous);
        assert!(!page.has_next);
        assert_eq!(page.items[0].question_text, "Oldest");
    }

    #[tokio::test]
    async fn test_published_detail_hides_future_question() {
        let future = question_at(2, "Future question.", Duration::days(30));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[future]]),
            5,
        );

        let result = svc.published_detail(2, Utc::now()).await;
        assert!(matches!(result, Err(AppError::QuestionNotFound(2))));
    }

    #[tokio::test]
    async fn test_published_detail_returns_choices() {
        let past = question_at(1, "Past question.", -Duration::days(30));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[past]])
                .append_query_results([[
                    choice_with(1, 1, "Not much", 0),
                    choice_with(2, 1, "The sky", 0),
                ]]),
            5,
        );

        let detail = svc.published_detail(1, Utc::now()).await.unwrap();
        assert_eq!(detail.question.question_text, "Past question.");
        assert_eq!(detail.choices.len(), 2);
    }

    #[tokio::test]
    async fn test_detail_shows_future_question() {
        let future = question_at(3, "Future question.", Duration::days(30));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[future]])
                .append_query_results([Vec::<choice::Model>::new()]),
            5,
        );

        let detail = svc.detail(3).await.unwrap();
        assert_eq!(detail.question.id, 3);
        assert!(detail.choices.is_empty());
    }

    #[tokio::test]
    async fn test_tally_labels_and_data_align() {
        let question = question_at(1, "Which one?", -Duration::days(1));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[question]])
                .append_query_results([[
                    choice_with(1, 1, "Choice 1", 5),
                    choice_with(2, 1, "Choice 2", 3),
                ]]),
            5,
        );

        let tally = svc.tally(1).await.unwrap();

        assert_eq!(tally.labels, ["Choice 1", "Choice 2"]);
        assert_eq!(tally.data, [5, 3]);
        assert_eq!(tally.total(), 8);
    }

    #[tokio::test]
    async fn test_tally_without_choices_is_empty() {
        let question = question_at(1, "Nothing to pick", -Duration::days(1));
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[question]])
                .append_query_results([Vec::<choice::Model>::new()]),
            5,
        );

        let tally = svc.tally(1).await.unwrap();
        assert!(tally.labels.is_empty());
        assert!(tally.data.is_empty());
    }

    #[tokio::test]
    async fn test_tally_missing_question() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<question::Model>::new()]),
            5,
        );

        assert!(matches!(
            svc.tally(9).await,
            Err(AppError::QuestionNotFound(9))
        ));
    }
}
