//! The vote-recording workflow: eligibility check, choice validation, and the
//! one-vote-per-user-per-question upsert.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::model;
use crate::db::schema::{Choice, Question};

/// Why a submitted ballot was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotError {
    /// The question id did not resolve.
    NotFound,
    /// The question exists but is outside its voting window right now.
    NotVotable,
    /// No choice was submitted, or the submitted choice does not belong to
    /// the question.
    InvalidChoice,
}

/// Result of a vote submission.
#[derive(Debug)]
pub enum CastOutcome {
    Recorded { id_choice: i64, revoted: bool },
    NotFound,
    NotVotable,
    /// Carries the question so the caller can re-render the ballot form
    /// without losing place.
    InvalidChoice(Question),
}

/// Pure admission check over already-fetched data. Evaluated at submission
/// time, which closes the race where a voting window ends between page load
/// and submission.
pub fn check_ballot<'q>(
    question: Option<&'q Question>,
    submitted: Option<i64>,
    now: DateTime<Utc>,
) -> Result<&'q Choice, BallotError> {
    let question = match question {
        None => return Err(BallotError::NotFound),
        Some(v) => v,
    };

    if !question.can_vote(now) {
        return Err(BallotError::NotVotable);
    }

    let id_choice = match submitted {
        None => return Err(BallotError::InvalidChoice),
        Some(v) => v,
    };

    question
        .choices
        .iter()
        .find(|c| c.id == id_choice)
        .ok_or(BallotError::InvalidChoice)
}

/// Record `id_user`'s vote on `id_question`. If the user already has a vote
/// there, its target choice is updated in place; the vote row keeps its
/// identity. The unique index on (id_user, id_question) backstops the
/// lookup-then-write race.
pub async fn cast_vote(
    conn: &PgPool,
    id_user: i64,
    id_question: i64,
    submitted: Option<i64>,
    now: DateTime<Utc>,
) -> anyhow::Result<CastOutcome> {
    let question = match model::get_question(conn, id_question).await? {
        None => return Ok(CastOutcome::NotFound),
        Some(v) => v,
    };

    let id_choice = match check_ballot(Some(&question), submitted, now) {
        Ok(choice) => choice.id,
        Err(BallotError::NotFound) => return Ok(CastOutcome::NotFound),
        Err(BallotError::NotVotable) => return Ok(CastOutcome::NotVotable),
        Err(BallotError::InvalidChoice) => return Ok(CastOutcome::InvalidChoice(question)),
    };

    let existing = model::get_user_vote(conn, id_user, id_question).await?;

    match &existing {
        None => model::record_vote(conn, id_user, id_question, id_choice).await?,
        Some(v) => model::update_vote_choice(conn, v.id, id_choice).await?,
    }

    Ok(CastOutcome::Recorded {
        id_choice,
        revoted: existing.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn question(days: i64, duration: Option<i64>) -> Question {
        let pub_date = Utc::now() + Duration::days(days);

        Question {
            id: 7,
            question_text: "Best editor?".to_owned(),
            pub_date,
            end_date: duration.map(|d| pub_date + Duration::days(d)),
            choices: vec![
                Choice {
                    id: 70,
                    id_question: 7,
                    choice_text: "vim".to_owned(),
                    votes: 0,
                },
                Choice {
                    id: 71,
                    id_question: 7,
                    choice_text: "emacs".to_owned(),
                    votes: 0,
                },
            ],
        }
    }

    #[test]
    fn missing_question_is_not_found() {
        assert_eq!(
            check_ballot(None, Some(70), Utc::now()),
            Err(BallotError::NotFound)
        );
    }

    #[test]
    fn future_question_is_not_votable() {
        let q = question(5, None);
        assert_eq!(
            check_ballot(Some(&q), Some(70), Utc::now()),
            Err(BallotError::NotVotable)
        );
    }

    #[test]
    fn ended_question_is_not_votable() {
        let q = question(-5, Some(3));
        assert_eq!(
            check_ballot(Some(&q), Some(70), Utc::now()),
            Err(BallotError::NotVotable)
        );
    }

    #[test]
    fn missing_choice_is_invalid() {
        let q = question(-1, None);
        assert_eq!(
            check_ballot(Some(&q), None, Utc::now()),
            Err(BallotError::InvalidChoice)
        );
    }

    #[test]
    fn foreign_choice_is_invalid() {
        // Open window (now-5d .. now+5d); the choice id belongs elsewhere.
        let q = question(-5, Some(10));
        assert_eq!(
            check_ballot(Some(&q), Some(999), Utc::now()),
            Err(BallotError::InvalidChoice)
        );
    }

    #[test]
    fn valid_ballot_is_accepted() {
        let q = question(-5, Some(10));
        let choice = check_ballot(Some(&q), Some(71), Utc::now()).unwrap();
        assert_eq!(choice.id, 71);
        assert_eq!(choice.choice_text, "emacs");
    }
}
