//! Admin service: question management behind the admin endpoints.
//!
//! The admin surface is described by the static [`QUESTION_ADMIN`]
//! configuration. The service implements the changelist (search plus a
//! publication date filter) and question/choice editing with inline choices.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use polls_common::AppResult;
use polls_db::{
    entities::{choice, question},
    repositories::{ChoiceRepository, QuestionRepository, QuestionSearch},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::pagination::{self, Page};

/// A group of fields on the question form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    /// Heading, `None` for the untitled first group.
    pub name: Option<&'static str>,
    pub fields: &'static [&'static str],
    /// Rendered folded until expanded.
    pub collapsed: bool,
}

/// Related rows edited on the parent's form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InlineConfig {
    pub model: &'static str,
    pub fields: &'static [&'static str],
    /// Blank rows offered on the form.
    pub extra: usize,
}

/// Admin configuration of the question model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionAdminConfig {
    pub fieldsets: &'static [Fieldset],
    pub inlines: &'static [InlineConfig],
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub list_per_page: u64,
}

/// The question admin.
pub const QUESTION_ADMIN: QuestionAdminConfig = QuestionAdminConfig {
    fieldsets: &[
        Fieldset {
            name: None,
            fields: &["question_text"],
            collapsed: false,
        },
        Fieldset {
            name: Some("Date information"),
            fields: &["pub_date"],
            collapsed: true,
        },
    ],
    inlines: &[InlineConfig {
        model: "choice",
        fields: &["choice_text", "votes"],
        extra: 3,
    }],
    list_display: &["question_text", "pub_date", "was_published_recently"],
    list_filter: &["pub_date"],
    search_fields: &["question_text"],
    list_per_page: 100,
};

/// Publication date filter of the changelist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PubDateFilter {
    #[default]
    Any,
    Today,
    #[serde(rename = "past_7_days")]
    Past7Days,
    ThisMonth,
    ThisYear,
}

impl PubDateFilter {
    /// Inclusive lower and exclusive upper `pub_date` bounds at `now`.
    #[must_use]
    pub fn bounds(self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let today = now.date_naive();
        let tomorrow = today + Duration::days(1);

        let range = match self {
            Self::Any => None,
            Self::Today => Some((today, tomorrow)),
            Self::Past7Days => Some((today - Duration::days(7), tomorrow)),
            Self::ThisMonth => month_range(today),
            Self::ThisYear => year_range(today),
        };

        range.map_or((None, None), |(since, before)| {
            (Some(midnight(since)), Some(midnight(before)))
        })
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn month_range(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = today.with_day(1)?;
    let next = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
    };
    Some((first, next))
}

fn year_range(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
    ))
}

/// One changelist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelistRow {
    pub id: i32,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub was_published_recently: bool,
}

impl ChangelistRow {
    fn new(question: question::Model, now: DateTime<Utc>) -> Self {
        Self {
            was_published_recently: question.was_published_recently(now),
            id: question.id,
            question_text: question.question_text,
            pub_date: question.pub_date.with_timezone(&Utc),
        }
    }
}

/// The question changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changelist {
    /// Search text as submitted.
    pub query: String,
    pub filter: PubDateFilter,
    #[serde(flatten)]
    pub page: Page<ChangelistRow>,
}

/// A question as shown on its admin page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionAdminView {
    pub question: question::Model,
    pub choices: Vec<choice::Model>,
    pub was_published_recently: bool,
}

/// Inline choice row.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChoiceInput {
    #[validate(length(min = 1, max = 200))]
    pub choice_text: String,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub votes: i32,
}

impl ChoiceInput {
    fn is_blank(&self) -> bool {
        self.choice_text.trim().is_empty()
    }
}

/// Input for creating a question with its choices.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionInput {
    #[validate(length(min = 1, max = 200))]
    pub question_text: String,

    pub pub_date: DateTime<Utc>,

    /// Inline rows; blank ones are ignored.
    #[serde(default)]
    pub choices: Vec<ChoiceInput>,
}

/// Input for updating a question.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionInput {
    #[validate(length(min = 1, max = 200))]
    pub question_text: Option<String>,

    pub pub_date: Option<DateTime<Utc>>,
}

/// Admin service for business logic.
#[derive(Clone)]
pub struct AdminService {
    question_repo: QuestionRepository,
    choice_repo: ChoiceRepository,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(question_repo: QuestionRepository, choice_repo: ChoiceRepository) -> Self {
        Self {
            question_repo,
            choice_repo,
        }
    }

    /// The question admin configuration.
    #[must_use]
    pub const fn config(&self) -> &'static QuestionAdminConfig {
        &QUESTION_ADMIN
    }

    /// Questions matching `query` and `filter`, newest first.
    pub async fn changelist(
        &self,
        query: Option<&str>,
        filter: PubDateFilter,
        page_param: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Changelist> {
        let (published_since, published_before) = filter.bounds(now);
        let criteria = QuestionSearch {
            text: query.map(str::to_string),
            published_since,
            published_before,
        };

        let per_page = QUESTION_ADMIN.list_per_page;
        let count = self.question_repo.count_search(&criteria).await?;
        let (number, num_pages) = pagination::resolve(page_param, count, per_page);

        let items = if count == 0 {
            Vec::new()
        } else {
            self.question_repo
                .search(&criteria, per_page, (number - 1) * per_page)
                .await?
        };

        let page = Page::new(number, num_pages, count, items).map(|q| ChangelistRow::new(q, now));

        Ok(Changelist {
            query: query.unwrap_or_default().to_string(),
            filter,
            page,
        })
    }

    /// A question with its choices.
    pub async fn show(&self, id: i32, now: DateTime<Utc>) -> AppResult<QuestionAdminView> {
        let question = self.question_repo.get_by_id(id).await?;
        let choices = self.choice_repo.find_by_question(id).await?;
        Ok(QuestionAdminView {
            was_published_recently: question.was_published_recently(now),
            question,
            choices,
        })
    }

    /// Create a question and its non-blank inline choices.
    pub async fn create_question(
        &self,
        mut input: CreateQuestionInput,
        now: DateTime<Utc>,
    ) -> AppResult<QuestionAdminView> {
        input.question_text = input.question_text.trim().to_string();
        input.validate()?;

        let choices: Vec<ChoiceInput> = input
            .choices
            .into_iter()
            .filter(|c| !c.is_blank())
            .map(|c| ChoiceInput {
                choice_text: c.choice_text.trim().to_string(),
                votes: c.votes,
            })
            .collect();
        for choice in &choices {
            choice.validate()?;
        }

        let (question, created) = self
            .question_repo
            .create_with_choices(
                question::ActiveModel {
                    question_text: Set(input.question_text),
                    pub_date: Set(input.pub_date.into()),
                    ..Default::default()
                },
                choices
                    .into_iter()
                    .map(|c| choice::ActiveModel {
                        choice_text: Set(c.choice_text),
                        votes: Set(c.votes),
                        ..Default::default()
                    })
                    .collect(),
            )
            .await?;

        info!(question_id = question.id, choices = created.len(), "Question created");

        Ok(QuestionAdminView {
            was_published_recently: question.was_published_recently(now),
            question,
            choices: created,
        })
    }

    /// Update a question's text or publication date.
    pub async fn update_question(
        &self,
        id: i32,
        mut input: UpdateQuestionInput,
        now: DateTime<Utc>,
    ) -> AppResult<QuestionAdminView> {
        input.question_text = input.question_text.map(|t| t.trim().to_string());
        input.validate()?;

        let question = self.question_repo.get_by_id(id).await?;
        let mut active: question::ActiveModel = question.into();

        if let Some(text) = input.question_text {
            active.question_text = Set(text);
        }
        if let Some(pub_date) = input.pub_date {
            active.pub_date = Set(pub_date.into());
        }

        let question = self.question_repo.update(active).await?;
        let choices = self.choice_repo.find_by_question(id).await?;

        info!(question_id = id, "Question updated");

        Ok(QuestionAdminView {
            was_published_recently: question.was_published_recently(now),
            question,
            choices,
        })
    }

    /// Add a choice to an existing question.
    pub async fn add_choice(
        &self,
        question_id: i32,
        mut input: ChoiceInput,
    ) -> AppResult<choice::Model> {
        input.choice_text = input.choice_text.trim().to_string();
        input.validate()?;

        self.question_repo.get_by_id(question_id).await?;
        let choice = self.insert_choice(question_id, input).await?;

        info!(question_id, choice_id = choice.id, "Choice added");
        Ok(choice)
    }

    /// Delete a question with its choices and votes.
    pub async fn delete_question(&self, id: i32) -> AppResult<()> {
        self.question_repo.delete(id).await?;
        info!(question_id = id, "Question deleted");
        Ok(())
    }

    /// Delete a single choice.
    pub async fn delete_choice(&self, id: i32) -> AppResult<()> {
        self.choice_repo.delete(id).await?;
        info!(choice_id = id, "Choice deleted");
        Ok(())
    }

    async fn insert_choice(
        &self,
        question_id: i32,
        input: ChoiceInput,
    ) -> AppResult<choice::Model> {
        self.choice_repo
            .create(choice::ActiveModel {
                question_id: Set(question_id),
                choice_text: Set(input.choice_text),
                votes: Set(input.votes),
                ..Default::default()
            })
            .await
    }
}
