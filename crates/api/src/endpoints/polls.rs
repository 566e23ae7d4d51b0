//! Poll pages: index, detail, vote, results and graph.

use axum::{
    Form, Router,
    extract::{Path, Query, State, rejection::FormRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use polls_common::AppError;
use polls_core::{QuestionDetail, Tally, VoteOutcome};
use polls_db::entities::user;
use serde::{Deserialize, Serialize};

use super::{page_context, parse_id};
use crate::{
    extractors::{ClientIp, MaybeUser, SessionUser},
    middleware::AppState,
    response::{PageResult, found},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/polls/", get(index))
        .route("/polls/{question_id}/", get(detail))
        .route("/polls/{question_id}/results/", get(results))
        .route("/polls/{question_id}/vote/", post(vote))
        .route("/polls/{question_id}/results/graph/", get(graph))
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoteForm {
    choice: Option<String>,
}

/// One bar of the HTML fallback chart.
#[derive(Debug, Serialize)]
struct Bar<'a> {
    label: &'a str,
    votes: i32,
    percent: i64,
}

fn bars(tally: &Tally) -> Vec<Bar<'_>> {
    let total = tally.total();
    tally
        .labels
        .iter()
        .zip(&tally.data)
        .map(|(label, &votes)| Bar {
            label,
            votes,
            percent: if total > 0 {
                (i64::from(votes) * 100 + total / 2) / total
            } else {
                0
            },
        })
        .collect()
}

async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<IndexQuery>,
) -> PageResult<Response> {
    let page = state
        .question_service
        .index_page(Utc::now(), query.page.as_deref())
        .await?;

    let mut context = page_context(user.as_ref());
    context.insert("latest_question_list", &page.items);
    context.insert("is_paginated", &(page.num_pages > 1));
    context.insert("page_obj", &page);

    Ok(state
        .templates
        .page(StatusCode::OK, "polls/index.html", &context)?)
}

async fn detail(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(question_id): Path<String>,
) -> PageResult<Response> {
    let question_id = parse_id(&question_id)?;
    let detail = state
        .question_service
        .published_detail(question_id, Utc::now())
        .await?;

    render_detail(&state, &user, &detail, None)
}

async fn results(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(question_id): Path<String>,
) -> PageResult<Response> {
    let question_id = parse_id(&question_id)?;
    let detail = state.question_service.detail(question_id).await?;

    let mut context = page_context(user.as_ref());
    context.insert("question", &detail.question);
    context.insert("choices", &detail.choices);

    Ok(state
        .templates
        .page(StatusCode::OK, "polls/results.html", &context)?)
}

async fn vote(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    client_ip: Result<ClientIp, AppError>,
    Path(question_id): Path<String>,
    form: Result<Form<VoteForm>, FormRejection>,
) -> PageResult<Response> {
    let ClientIp(client_ip) = client_ip?;
    let question_id = parse_id(&question_id)?;
    // A body that is not a form counts as no choice selected.
    let choice = form.ok().and_then(|Form(form)| form.choice);
    let outcome = state
        .vote_service
        .cast(question_id, choice.as_deref(), &client_ip)
        .await?;

    if let VoteOutcome::Recorded { question_id, .. } = outcome {
        return Ok(found(&format!("/polls/{question_id}/results/")));
    }

    let detail = state.question_service.detail(question_id).await?;
    render_detail(&state, &user, &detail, outcome.error_message())
}

async fn graph(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(question_id): Path<String>,
) -> PageResult<Response> {
    let question_id = parse_id(&question_id)?;
    let tally = state.question_service.tally(question_id).await?;

    let mut context = page_context(user.as_ref());
    context.insert("question", &tally.question);
    context.insert("labels", &tally.labels);
    context.insert("data", &tally.data);
    context.insert("bars", &bars(&tally));

    Ok(state
        .templates
        .page(StatusCode::OK, "polls/graph.html", &context)?)
}

fn render_detail(
    state: &AppState,
    user: &user::Model,
    detail: &QuestionDetail,
    error_message: Option<&str>,
) -> PageResult<Response> {
    let mut context = page_context(Some(user));
    context.insert("question", &detail.question);
    context.insert("choices", &detail.choices);
    if let Some(message) = error_message {
        context.insert("error_message", message);
    }

    Ok(state
        .templates
        .page(StatusCode::OK, "polls/detail.html", &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use polls_db::entities::question;

    fn tally(data: &[i32]) -> Tally {
        Tally {
            question: question::Model {
                id: 1,
                question_text: "Q".to_string(),
                pub_date: Utc::now().into(),
            },
            labels: data.iter().map(|v| format!("Choice {v}")).collect(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_bar_percentages() {
        let t = tally(&[5, 3]);
        let percents: Vec<i64> = bars(&t).iter().map(|b| b.percent).collect();
        assert_eq!(percents, [63, 38]);
    }

    #[test]
    fn test_bars_without_votes() {
        let t = tally(&[0, 0]);
        assert!(bars(&t).iter().all(|b| b.percent == 0));
    }
}
