//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `polls_test`)
//!   `TEST_DB_PASSWORD` (default: `polls_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use polls_db::entities::{choice, question};
use polls_db::repositories::{
    ChoiceRepository, QuestionRepository, QuestionSearch, RecordOutcome, VoteRepository,
};
use polls_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{DatabaseConnection, Set, SqlxPostgresConnector};

/// Share the test database's connection pool (the `mock` dev feature makes
/// `DatabaseConnection` non-`Clone`).
fn shared_connection(db: &TestDatabase) -> DatabaseConnection {
    SqlxPostgresConnector::from_sqlx_postgres_pool(
        db.connection().get_postgres_connection_pool().clone(),
    )
}

async fn seed_question(
    db: &TestDatabase,
    text: &str,
    choices: &[&str],
) -> (question::Model, Vec<choice::Model>) {
    let conn = Arc::new(shared_connection(db));
    let questions = QuestionRepository::new(Arc::clone(&conn));
    let choice_repo = ChoiceRepository::new(conn);

    let question = questions
        .create(question::ActiveModel {
            question_text: Set(text.to_string()),
            pub_date: Set((Utc::now() - Duration::hours(1)).into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut created = Vec::new();
    for text in choices {
        created.push(
            choice_repo
                .create(choice::ActiveModel {
                    question_id: Set(question.id),
                    choice_text: Set((*text).to_string()),
                    ..Default::default()
                })
                .await
                .unwrap(),
        );
    }
    (question, created)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_vote_from_same_address_is_rejected() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let (question, choices) = seed_question(&db, "What's up?", &["Not much", "The sky"]).await;
    let conn = Arc::new(shared_connection(&db));
    let votes = VoteRepository::new(Arc::clone(&conn));

    let first = votes.record(question.id, choices[0].id, "10.0.0.1").await.unwrap();
    assert!(matches!(first, RecordOutcome::Recorded(_)));

    let second = votes.record(question.id, choices[1].id, "10.0.0.1").await.unwrap();
    assert_eq!(second, RecordOutcome::AlreadyVoted);

    let counts: Vec<i32> = ChoiceRepository::new(conn)
        .find_by_question(question.id)
        .await
        .unwrap()
        .iter()
        .map(|c| c.votes)
        .collect();
    assert_eq!(counts, [1, 0]);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_votes_from_distinct_addresses_are_all_counted() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let (question, choices) = seed_question(&db, "Pick one", &["A"]).await;
    let conn = Arc::new(shared_connection(&db));
    let votes = VoteRepository::new(Arc::clone(&conn));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let votes = votes.clone();
            let (question_id, choice_id) = (question.id, choices[0].id);
            tokio::spawn(async move {
                votes
                    .record(question_id, choice_id, &format!("10.0.1.{i}"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, RecordOutcome::Recorded(_)));
    }

    let choice = ChoiceRepository::new(conn)
        .find_by_id(choices[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(choice.votes, 20);
    assert_eq!(votes.count_by_question(question.id).await.unwrap(), 20);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_votes_from_one_address_count_once() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let (question, choices) = seed_question(&db, "Race", &["A"]).await;
    let conn = Arc::new(shared_connection(&db));
    let votes = VoteRepository::new(Arc::clone(&conn));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let votes = votes.clone();
            let (question_id, choice_id) = (question.id, choices[0].id);
            tokio::spawn(async move { votes.record(question_id, choice_id, "10.0.0.9").await })
        })
        .collect();

    let mut recorded = 0;
    for handle in handles {
        // A losing racer may surface as a serialization failure instead of AlreadyVoted.
        if let Ok(RecordOutcome::Recorded(_)) = handle.await.unwrap() {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);

    let choice = ChoiceRepository::new(conn)
        .find_by_id(choices[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(choice.votes, 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_choice_of_other_question_is_rejected() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let (first, _) = seed_question(&db, "First", &["A"]).await;
    let (_, other_choices) = seed_question(&db, "Second", &["B"]).await;
    let conn = Arc::new(shared_connection(&db));

    let outcome = VoteRepository::new(Arc::clone(&conn))
        .record(first.id, other_choices[0].id, "10.0.0.1")
        .await
        .unwrap();
    assert_eq!(outcome, RecordOutcome::ChoiceNotFound);

    let untouched = ChoiceRepository::new(conn)
        .find_by_id(other_choices[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.votes, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_failed_choice_leaves_no_question_behind() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let questions = QuestionRepository::new(Arc::new(shared_connection(&db)));

    let result = questions
        .create_with_choices(
            question::ActiveModel {
                question_text: Set("Half written".to_string()),
                pub_date: Set(Utc::now().into()),
                ..Default::default()
            },
            vec![
                choice::ActiveModel {
                    choice_text: Set("Fine".to_string()),
                    votes: Set(0),
                    ..Default::default()
                },
                choice::ActiveModel {
                    choice_text: Set("Negative".to_string()),
                    votes: Set(-1),
                    ..Default::default()
                },
            ],
        )
        .await;

    assert!(result.is_err());
    assert_eq!(
        questions.count_search(&QuestionSearch::default()).await.unwrap(),
        0
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_question_removes_choices_and_votes() {
    let db = TestDatabase::create_unique().await.expect("Failed to create db");
    let (question, choices) = seed_question(&db, "Short lived", &["A", "B"]).await;
    let conn = Arc::new(shared_connection(&db));
    let votes = VoteRepository::new(Arc::clone(&conn));
    votes.record(question.id, choices[1].id, "10.0.0.1").await.unwrap();

    QuestionRepository::new(Arc::clone(&conn))
        .delete(question.id)
        .await
        .unwrap();

    assert!(ChoiceRepository::new(conn)
        .find_by_question(question.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(votes.count_by_question(question.id).await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
}
