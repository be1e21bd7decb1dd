use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use evlog::meta;
use serde::Deserialize;

use crate::db::model;
use crate::runtime::get_logger;
use crate::voting::{self, CastOutcome};
use crate::web::error::AppError;
use crate::web::{auth, pages, AppState};

#[derive(Deserialize)]
pub struct NoticeParams {
    notice: Option<String>,
    poll: Option<i64>,
}

#[derive(Deserialize)]
pub struct VoteForm {
    choice: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: Option<String>,
    password: Option<String>,
    next: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupForm {
    username: Option<String>,
    password1: Option<String>,
    password2: Option<String>,
}

pub async fn root() -> Redirect {
    Redirect::to("/polls")
}

pub async fn index(
    State(app): State<Arc<AppState>>,
    Query(params): Query<NoticeParams>,
) -> Result<Html<String>, AppError> {
    let questions = model::list_latest_questions(app.db.conn(), Utc::now()).await?;

    let notice = params
        .notice
        .as_deref()
        .and_then(|code| pages::notice_message(code, params.poll));

    Ok(Html(pages::index_page(&questions, notice.as_deref())))
}

pub async fn detail(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let now = Utc::now();

    let question = match model::get_question(app.db.conn(), id).await? {
        None => {
            return Ok(Redirect::to(&format!("/polls?notice=not-found&poll={}", id)).into_response())
        }
        Some(v) => v,
    };

    if !question.can_vote(now) {
        return Ok(Redirect::to(&format!("/polls?notice=not-votable&poll={}", id)).into_response());
    }

    let prior = match auth::session_user(&headers) {
        None => None,
        Some(id_user) => model::get_user_vote(app.db.conn(), id_user, id)
            .await?
            .map(|v| v.id_choice),
    };

    Ok(Html(pages::detail_page(&question, prior, None)).into_response())
}

pub async fn results(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<NoticeParams>,
) -> Result<Response, AppError> {
    let question = match model::get_question(app.db.conn(), id).await? {
        None => {
            return Ok(Redirect::to(&format!("/polls?notice=not-found&poll={}", id)).into_response())
        }
        Some(v) => v,
    };

    if !question.is_published(Utc::now()) {
        return Ok(Redirect::to(&format!("/polls?notice=no-results&poll={}", id)).into_response());
    }

    let confirmation = match params.notice.as_deref() {
        Some("voted") => Some("Your vote has been recorded."),
        _ => None,
    };

    Ok(Html(pages::results_page(&question, confirmation)).into_response())
}

pub async fn vote(
    State(app): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    form: Result<Form<VoteForm>, FormRejection>,
) -> Result<Response, AppError> {
    // The auth gate comes before every other check; login bounces back here.
    let id_user = match auth::session_user(&headers) {
        None => {
            get_logger().info("Unauthenticated vote attempt.", meta! {
                "QuestionID" => id,
                "Addr" => addr,
            });
            return Ok(
                Redirect::to(&format!("/accounts/login?next=/polls/{}/vote", id)).into_response(),
            );
        }
        Some(v) => v,
    };

    let submitted = form
        .ok()
        .and_then(|Form(f)| f.choice)
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let outcome = voting::cast_vote(app.db.conn(), id_user, id, submitted, Utc::now()).await?;

    match outcome {
        CastOutcome::Recorded { id_choice, revoted } => {
            get_logger().info("Vote recorded.", meta! {
                "QuestionID" => id,
                "ChoiceID" => id_choice,
                "UserID" => id_user,
                "Addr" => addr,
                "Revoted" => revoted,
            });
            Ok(Redirect::to(&format!("/polls/{}/results?notice=voted", id)).into_response())
        }
        CastOutcome::NotFound => {
            get_logger().info("Vote attempted on unknown question.", meta! {
                "QuestionID" => id,
                "UserID" => id_user,
                "Addr" => addr,
            });
            Ok(Redirect::to(&format!("/polls?notice=not-found&poll={}", id)).into_response())
        }
        CastOutcome::NotVotable => {
            get_logger().info("Vote attempted outside the voting window.", meta! {
                "QuestionID" => id,
                "UserID" => id_user,
                "Addr" => addr,
            });
            Ok(Redirect::to(&format!("/polls?notice=not-votable&poll={}", id)).into_response())
        }
        CastOutcome::InvalidChoice(question) => {
            get_logger().info("Vote submitted without a valid choice.", meta! {
                "QuestionID" => id,
                "UserID" => id_user,
                "Addr" => addr,
            });

            let prior = model::get_user_vote(app.db.conn(), id_user, id)
                .await?
                .map(|v| v.id_choice);

            // Inline re-render, no redirect: the voter corrects their input
            // without losing place.
            Ok(Html(pages::detail_page(
                &question,
                prior,
                Some("You didn't select a choice."),
            ))
            .into_response())
        }
    }
}

/// Only ever send the user back to a local path; anything else becomes the
/// listing.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(v) if v.starts_with('/') && !v.starts_with("//") => v,
        _ => "/polls",
    }
}

pub async fn login_form(Query(params): Query<LoginQuery>) -> Html<String> {
    Html(pages::login_page(params.next.as_deref(), None))
}

pub async fn login_submit(
    State(app): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let user = match model::get_user_by_name(app.db.conn(), &username).await? {
        Some(u) if auth::verify_password(&password, &u.password_hash) => u,
        _ => {
            get_logger().info("Failed login attempt.", meta! {
                "Username" => username,
            });
            return Ok(Html(pages::login_page(
                form.next.as_deref(),
                Some("Invalid username or password."),
            ))
            .into_response());
        }
    };

    get_logger().info("User logged in.", meta! {
        "UserID" => user.id,
        "Username" => user.username,
    });

    let token = auth::issue_session(user.id);
    let target = safe_next(form.next.as_deref()).to_owned();

    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Redirect::to(&target),
    )
        .into_response())
}

pub async fn logout(headers: HeaderMap) -> Response {
    auth::drop_session(&headers);

    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Redirect::to("/accounts/login"),
    )
        .into_response()
}

pub async fn signup_form() -> Html<String> {
    Html(pages::signup_page(None))
}

pub async fn signup_submit(
    State(app): State<Arc<AppState>>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let username = form.username.unwrap_or_default().trim().to_lowercase();
    let password1 = form.password1.unwrap_or_default();
    let password2 = form.password2.unwrap_or_default();

    let acceptable = auth::valid_username(&username)
        && password1.len() >= 8
        && password1 == password2
        && !model::check_username_taken(app.db.conn(), &username).await?;

    if !acceptable {
        get_logger().info("Rejected signup attempt.", meta! {
            "Username" => username,
        });
        return Ok(Html(pages::signup_page(Some(
            "Registration failed. Please register again.",
        )))
        .into_response());
    }

    let hash = auth::hash_password(&password1)?;
    let user = model::add_user(app.db.conn(), &username, &hash).await?;

    get_logger().info("User registered.", meta! {
        "UserID" => user.id,
        "Username" => user.username,
    });

    let token = auth::issue_session(user.id);

    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Redirect::to("/polls"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_targets_are_restricted_to_local_paths() {
        assert_eq!(safe_next(Some("/polls/3/vote")), "/polls/3/vote");
        assert_eq!(safe_next(Some("https://evil.example")), "/polls");
        assert_eq!(safe_next(Some("//evil.example")), "/polls");
        assert_eq!(safe_next(None), "/polls");
    }
}
