//! Database-backed workflow tests. These need a reachable Postgres instance;
//! set POLLSITE_TEST_DATABASE_URL to run them, otherwise each test returns
//! early without asserting anything.

use std::env;

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use pollsite::db::dbclient::DBClient;
use pollsite::db::model;
use pollsite::db::schema::{Question, User};
use pollsite::voting::{self, CastOutcome};

async fn test_db() -> Option<DBClient> {
    let url = match env::var("POLLSITE_TEST_DATABASE_URL") {
        Err(_) => return None,
        Ok(v) => v,
    };

    let db = DBClient::new(&url).await.expect("failed to connect to test database");
    db.ensure_schema().await.expect("failed to initialize test schema");

    Some(db)
}

fn unique(prefix: &str) -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();

    format!("{}-{}", prefix, suffix.to_lowercase())
}

async fn add_voter(db: &DBClient) -> User {
    model::add_user(db.conn(), &unique("voter"), "not-a-real-hash")
        .await
        .expect("failed to add test user")
}

async fn add_open_question(db: &DBClient) -> Question {
    let now = Utc::now();

    model::add_question(
        db.conn(),
        &unique("question"),
        now - Duration::days(5),
        Some(now + Duration::days(5)),
        &["first".to_owned(), "second".to_owned()],
    )
    .await
    .expect("failed to add test question")
}

async fn total_votes(db: &DBClient, id_question: i64) -> i64 {
    model::question_choices(db.conn(), id_question)
        .await
        .expect("failed to load choices")
        .iter()
        .map(|c| c.votes)
        .sum()
}

#[tokio::test]
async fn revote_updates_rather_than_duplicates() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let voter = add_voter(&db).await;
    let question = add_open_question(&db).await;
    let (a, b) = (question.choices[0].id, question.choices[1].id);

    let first = voting::cast_vote(db.conn(), voter.id, question.id, Some(a), Utc::now())
        .await
        .unwrap();
    match first {
        CastOutcome::Recorded { id_choice, revoted } => {
            assert_eq!(id_choice, a);
            assert!(!revoted);
        }
        other => panic!("expected Recorded, got {:?}", other),
    }

    let original = model::get_user_vote(db.conn(), voter.id, question.id)
        .await
        .unwrap()
        .expect("vote should exist");

    let second = voting::cast_vote(db.conn(), voter.id, question.id, Some(b), Utc::now())
        .await
        .unwrap();
    match second {
        CastOutcome::Recorded { id_choice, revoted } => {
            assert_eq!(id_choice, b);
            assert!(revoted);
        }
        other => panic!("expected Recorded, got {:?}", other),
    }

    // Still one vote row for (user, question), same identity, new target.
    let updated = model::get_user_vote(db.conn(), voter.id, question.id)
        .await
        .unwrap()
        .expect("vote should still exist");
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.id_choice, b);
    assert_eq!(total_votes(&db, question.id).await, 1);
}

#[tokio::test]
async fn choice_from_another_question_is_rejected() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let voter = add_voter(&db).await;
    let question = add_open_question(&db).await;
    let other = add_open_question(&db).await;

    let outcome = voting::cast_vote(
        db.conn(),
        voter.id,
        question.id,
        Some(other.choices[0].id),
        Utc::now(),
    )
    .await
    .unwrap();

    match outcome {
        CastOutcome::InvalidChoice(q) => assert_eq!(q.id, question.id),
        other => panic!("expected InvalidChoice, got {:?}", other),
    }

    assert!(model::get_user_vote(db.conn(), voter.id, question.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(total_votes(&db, question.id).await, 0);
}

#[tokio::test]
async fn future_question_is_not_votable() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let voter = add_voter(&db).await;
    let question = model::add_question(
        db.conn(),
        &unique("question"),
        Utc::now() + Duration::days(5),
        None,
        &["first".to_owned(), "second".to_owned()],
    )
    .await
    .unwrap();

    let outcome = voting::cast_vote(
        db.conn(),
        voter.id,
        question.id,
        Some(question.choices[0].id),
        Utc::now(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, CastOutcome::NotVotable));
    assert_eq!(total_votes(&db, question.id).await, 0);
}

#[tokio::test]
async fn counts_are_derived_and_reads_are_idempotent() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let question = add_open_question(&db).await;
    let a = question.choices[0].id;

    for _ in 0..3 {
        let voter = add_voter(&db).await;
        voting::cast_vote(db.conn(), voter.id, question.id, Some(a), Utc::now())
            .await
            .unwrap();
    }

    let first_read = model::question_choices(db.conn(), question.id).await.unwrap();
    let second_read = model::question_choices(db.conn(), question.id).await.unwrap();

    let votes_a = first_read.iter().find(|c| c.id == a).unwrap().votes;
    assert_eq!(votes_a, 3);

    for (x, y) in first_read.iter().zip(second_read.iter()) {
        assert_eq!(x.id, y.id);
        assert_eq!(x.votes, y.votes);
    }
}

#[tokio::test]
async fn deleting_a_question_cascades_to_votes() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let voter = add_voter(&db).await;
    let question = add_open_question(&db).await;

    voting::cast_vote(
        db.conn(),
        voter.id,
        question.id,
        Some(question.choices[0].id),
        Utc::now(),
    )
    .await
    .unwrap();

    assert!(model::delete_question(db.conn(), question.id).await.unwrap());

    assert!(model::get_question(db.conn(), question.id).await.unwrap().is_none());
    assert!(model::get_user_vote(db.conn(), voter.id, question.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn inverted_window_is_rejected_at_creation() {
    let db = match test_db().await {
        None => return,
        Some(v) => v,
    };

    let now = Utc::now();
    let result = model::add_question(
        db.conn(),
        &unique("question"),
        now,
        Some(now - Duration::days(1)),
        &["first".to_owned(), "second".to_owned()],
    )
    .await;

    assert!(result.is_err());
}
