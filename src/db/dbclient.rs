use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Statements are executed one at a time; sqlx prepares each query, so the
/// bootstrap script cannot be sent as a single batch.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS poll_user (
        id            BIGSERIAL PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        time_created  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );",
    "CREATE TABLE IF NOT EXISTS question (
        id            BIGSERIAL PRIMARY KEY,
        question_text TEXT NOT NULL,
        pub_date      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        end_date      TIMESTAMPTZ,
        CONSTRAINT question_window CHECK (end_date IS NULL OR end_date >= pub_date)
    );",
    "CREATE TABLE IF NOT EXISTS choice (
        id          BIGSERIAL PRIMARY KEY,
        id_question BIGINT NOT NULL REFERENCES question(id) ON DELETE CASCADE,
        choice_text TEXT NOT NULL
    );",
    // id_question is denormalized from choice so the one-vote-per-question
    // invariant can be a real unique index instead of application-only logic.
    "CREATE TABLE IF NOT EXISTS vote (
        id          BIGSERIAL PRIMARY KEY,
        id_choice   BIGINT NOT NULL REFERENCES choice(id) ON DELETE CASCADE,
        id_question BIGINT NOT NULL REFERENCES question(id) ON DELETE CASCADE,
        id_user     BIGINT NOT NULL REFERENCES poll_user(id) ON DELETE CASCADE,
        time_cast   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT one_vote_per_question UNIQUE (id_user, id_question)
    );",
];

pub struct DBClient {
    pool: PgPool,
}

impl DBClient {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(8).connect(url).await?;

        Ok(Self { pool })
    }

    pub fn conn(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        Ok(())
    }
}
