use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{query, PgPool, Row};
use tokio_stream::StreamExt;

use crate::db::schema::{Choice, Question, User, Vote};
use crate::policy;

/// The five most recently published questions at or before `now`. Fixed cap,
/// no pagination.
pub async fn list_latest_questions(
    conn: &PgPool,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Question>> {
    let mut stream = query(
        "SELECT id, question_text, pub_date, end_date FROM question
         WHERE pub_date <= $1
         ORDER BY pub_date DESC
         LIMIT 5;",
    )
    .bind(now)
    .map(|r: PgRow| Question {
        id: r.get("id"),
        question_text: r.get("question_text"),
        pub_date: r.get("pub_date"),
        end_date: r.get("end_date"),
        choices: Vec::new(),
    })
    .fetch(conn);

    let mut result = Vec::new();
    while let Some(mut row) = stream.try_next().await? {
        row.choices = question_choices(conn, row.id).await?;
        result.push(row);
    }

    Ok(result)
}

pub async fn get_question(conn: &PgPool, id: i64) -> anyhow::Result<Option<Question>> {
    let r = query("SELECT id, question_text, pub_date, end_date FROM question WHERE id=$1;")
        .bind(id)
        .map(|r: PgRow| Question {
            id: r.get("id"),
            question_text: r.get("question_text"),
            pub_date: r.get("pub_date"),
            end_date: r.get("end_date"),
            choices: Vec::new(),
        })
        .fetch_optional(conn)
        .await?;

    let mut r = match r {
        None => return Ok(None),
        Some(v) => v,
    };

    r.choices = question_choices(conn, r.id).await?;

    Ok(Some(r))
}

/// Choices of a question with their vote counts. The count is computed from
/// vote rows on every read; there is no stored counter to fall out of sync.
pub async fn question_choices(conn: &PgPool, id_question: i64) -> anyhow::Result<Vec<Choice>> {
    let mut stream = query(
        "SELECT c.id, c.id_question, c.choice_text, COUNT(v.id) AS votes
         FROM choice c
         LEFT JOIN vote v ON v.id_choice = c.id
         WHERE c.id_question = $1
         GROUP BY c.id, c.id_question, c.choice_text
         ORDER BY c.id;",
    )
    .bind(id_question)
    .map(|r: PgRow| Choice {
        id: r.get("id"),
        id_question: r.get("id_question"),
        choice_text: r.get("choice_text"),
        votes: r.get("votes"),
    })
    .fetch(conn);

    let mut result = Vec::new();
    while let Some(row) = stream.try_next().await? {
        result.push(row);
    }

    Ok(result)
}

pub async fn add_question(
    conn: &PgPool,
    question_text: &str,
    pub_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    choices: &[String],
) -> anyhow::Result<Question> {
    policy::validate_window(pub_date, end_date)?;

    if choices.len() < 2 {
        anyhow::bail!("a question needs at least 2 choices; got {}", choices.len());
    }

    let mut tx = conn.begin().await?;

    let r = query(
        "INSERT INTO question (question_text, pub_date, end_date)
         VALUES ($1, $2, $3)
         RETURNING id;",
    )
    .bind(question_text)
    .bind(pub_date)
    .bind(end_date)
    .fetch_one(&mut tx)
    .await?;

    let id: i64 = r.get("id");

    let mut choice_result = Vec::new();

    for choice in choices {
        let choice_r = query(
            "INSERT INTO choice (id_question, choice_text)
             VALUES ($1, $2)
             RETURNING id;",
        )
        .bind(id)
        .bind(choice)
        .fetch_one(&mut tx)
        .await?;

        choice_result.push(Choice {
            id: choice_r.get("id"),
            id_question: id,
            choice_text: choice.clone(),
            votes: 0,
        });
    }

    tx.commit().await?;

    Ok(Question {
        id,
        question_text: question_text.to_owned(),
        pub_date,
        end_date,
        choices: choice_result,
    })
}

pub async fn delete_question(conn: &PgPool, id: i64) -> anyhow::Result<bool> {
    let r = query("DELETE FROM question WHERE id=$1;")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(r.rows_affected() > 0)
}

/// A user's vote on a question, if any. The (user, question) pair is the
/// logical key; a revote re-targets this record rather than adding another.
pub async fn get_user_vote(
    conn: &PgPool,
    id_user: i64,
    id_question: i64,
) -> anyhow::Result<Option<Vote>> {
    let r = query(
        "SELECT id, id_choice, id_question, id_user, time_cast FROM vote
         WHERE id_user=$1 AND id_question=$2;",
    )
    .bind(id_user)
    .bind(id_question)
    .map(|r: PgRow| Vote {
        id: r.get("id"),
        id_choice: r.get("id_choice"),
        id_question: r.get("id_question"),
        id_user: r.get("id_user"),
        time_cast: r.get("time_cast"),
    })
    .fetch_optional(conn)
    .await?;

    Ok(r)
}

/// Insert a fresh vote. Two concurrent first votes race on the preceding
/// lookup; the unique index resolves the loser into an update instead of a
/// duplicate row.
pub async fn record_vote(
    conn: &PgPool,
    id_user: i64,
    id_question: i64,
    id_choice: i64,
) -> anyhow::Result<()> {
    query(
        "INSERT INTO vote (id_choice, id_question, id_user, time_cast)
         VALUES ($1, $2, $3, NOW())
         ON CONFLICT (id_user, id_question)
         DO UPDATE SET id_choice = EXCLUDED.id_choice, time_cast = NOW();",
    )
    .bind(id_choice)
    .bind(id_question)
    .bind(id_user)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_vote_choice(conn: &PgPool, id_vote: i64, id_choice: i64) -> anyhow::Result<()> {
    query("UPDATE vote SET id_choice=$2, time_cast=NOW() WHERE id=$1;")
        .bind(id_vote)
        .bind(id_choice)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn check_username_taken(conn: &PgPool, username: &str) -> anyhow::Result<bool> {
    let r = query("SELECT EXISTS(SELECT 1 FROM poll_user WHERE username=$1) AS known;")
        .bind(username)
        .fetch_one(conn)
        .await?;

    Ok(r.get::<Option<bool>, _>("known").unwrap_or(false))
}

pub async fn add_user(conn: &PgPool, username: &str, password_hash: &str) -> anyhow::Result<User> {
    let r = query(
        "INSERT INTO poll_user (username, password_hash)
         VALUES ($1, $2)
         RETURNING id, time_created;",
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(conn)
    .await?;

    Ok(User {
        id: r.get("id"),
        username: username.to_owned(),
        password_hash: password_hash.to_owned(),
        time_created: r.get("time_created"),
    })
}

pub async fn get_user_by_name(conn: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
    let r = query(
        "SELECT id, username, password_hash, time_created FROM poll_user WHERE username=$1;",
    )
    .bind(username)
    .map(|r: PgRow| User {
        id: r.get("id"),
        username: r.get("username"),
        password_hash: r.get("password_hash"),
        time_created: r.get("time_created"),
    })
    .fetch_optional(conn)
    .await?;

    Ok(r)
}
