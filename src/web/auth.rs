//! Session and credential handling for the voting gate.
//!
//! Sessions are opaque random tokens held in process memory; the cookie is
//! the only thing the client keeps. Restarting the server logs everyone out,
//! which is acceptable for this service.

use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use regex::Regex;

static SESSIONS: Lazy<DashMap<String, i64>> = Lazy::new(DashMap::new);

static SESSION_COOKIE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|;\s*)session=([A-Za-z0-9]{32})").unwrap());

static VALIDATE_USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z0-9-]+$").unwrap());

pub fn issue_session(id_user: i64) -> String {
    let token: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    SESSIONS.insert(token.clone(), id_user);

    token
}

pub fn session_cookie(token: &str) -> String {
    format!("session={}; Path=/; HttpOnly", token)
}

pub fn clear_session_cookie() -> String {
    "session=; Path=/; HttpOnly; Max-Age=0".to_owned()
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    SESSION_COOKIE
        .captures(cookies)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_owned())
}

/// The verified user identity for this request, if any.
pub fn session_user(headers: &HeaderMap) -> Option<i64> {
    let token = token_from_headers(headers)?;

    SESSIONS.get(&token).map(|entry| *entry.value())
}

pub fn drop_session(headers: &HeaderMap) {
    if let Some(token) = token_from_headers(headers) {
        SESSIONS.remove(&token);
    }
}

pub fn valid_username(name: &str) -> bool {
    VALIDATE_USERNAME.is_match(name)
}

pub fn hash_password(raw: &str) -> anyhow::Result<String> {
    Ok(bcrypt::hash(raw, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(raw: &str, hash: &str) -> bool {
    bcrypt::verify(raw, hash).unwrap_or(false)
}
