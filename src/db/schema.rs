use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub id: i64,
    pub id_question: i64,
    pub choice_text: String,
    /// Derived count of vote rows pointing at this choice, never a stored counter.
    pub votes: i64,
}

#[derive(Debug, Clone)]
pub struct Vote {
    pub id: i64,
    pub id_choice: i64,
    pub id_question: i64,
    pub id_user: i64,
    pub time_cast: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub time_created: DateTime<Utc>,
}
