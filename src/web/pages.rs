//! Server-rendered HTML projections. Read-only; nothing here touches the
//! database or mutates vote counts.

use itertools::Itertools;

use crate::db::schema::Question;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }

    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n\
         <nav><a href=\"/polls\">Polls</a> | \
         <a href=\"/accounts/login\">Log in</a> | \
         <a href=\"/accounts/signup\">Sign up</a> | \
         <a href=\"/accounts/logout\">Log out</a></nav>\n\
         {}\n\
         </body>\n\
         </html>\n",
        escape(title),
        body
    )
}

/// Redirect notices travel as short codes in the query string; the landing
/// page turns them back into the user-facing message. Unknown codes render
/// nothing.
pub fn notice_message(code: &str, poll: Option<i64>) -> Option<String> {
    match code {
        "not-found" => Some(format!("Poll {} was not found.", poll?)),
        "not-votable" => Some(format!("Poll {} is not available for voting.", poll?)),
        "no-results" => Some(format!("Poll {}'s results are not available.", poll?)),
        _ => None,
    }
}

pub fn index_page(questions: &[Question], notice: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        body.push_str(&format!("<p class=\"notice\">{}</p>\n", escape(notice)));
    }

    body.push_str("<h1>Latest polls</h1>\n");

    if questions.is_empty() {
        body.push_str("<p>No polls are available.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for q in questions {
            body.push_str(&format!(
                "<li><a href=\"/polls/{}\">{}</a> \
                 (<a href=\"/polls/{}/results\">results</a>)</li>\n",
                q.id,
                escape(&q.question_text),
                q.id
            ));
        }
        body.push_str("</ul>\n");
    }

    layout("Latest polls", &body)
}

/// The ballot form. `prior` preselects the caller's existing choice so a
/// revote starts from what they picked last time.
pub fn detail_page(question: &Question, prior: Option<i64>, error: Option<&str>) -> String {
    let mut body = String::new();

    body.push_str(&format!("<h1>{}</h1>\n", escape(&question.question_text)));

    if let Some(error) = error {
        body.push_str(&format!("<p class=\"error\"><strong>{}</strong></p>\n", escape(error)));
    }

    body.push_str(&format!(
        "<form action=\"/polls/{}/vote\" method=\"post\">\n",
        question.id
    ));

    for choice in &question.choices {
        let checked = match prior {
            Some(id) if id == choice.id => " checked",
            _ => "",
        };
        body.push_str(&format!(
            "<label><input type=\"radio\" name=\"choice\" value=\"{}\"{}> {}</label><br>\n",
            choice.id,
            checked,
            escape(&choice.choice_text)
        ));
    }

    body.push_str("<button type=\"submit\">Vote</button>\n</form>\n");
    body.push_str(&format!(
        "<p><a href=\"/polls/{}/results\">Results</a> | <a href=\"/polls\">Back to polls</a></p>\n",
        question.id
    ));

    layout(&question.question_text, &body)
}

pub fn results_page(question: &Question, confirmation: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(confirmation) = confirmation {
        body.push_str(&format!("<p class=\"notice\">{}</p>\n", escape(confirmation)));
    }

    body.push_str(&format!("<h1>{}</h1>\n", escape(&question.question_text)));
    body.push_str("<ul>\n");

    for choice in question.choices.iter().sorted_by_key(|c| -c.votes) {
        let noun = if choice.votes == 1 { "vote" } else { "votes" };
        body.push_str(&format!(
            "<li>{} &mdash; {} {}</li>\n",
            escape(&choice.choice_text),
            choice.votes,
            noun
        ));
    }

    body.push_str("</ul>\n");
    body.push_str(&format!(
        "<p><a href=\"/polls/{}\">Vote again</a> | <a href=\"/polls\">Back to polls</a></p>\n",
        question.id
    ));

    layout(&question.question_text, &body)
}

pub fn login_page(next: Option<&str>, error: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(error) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", escape(error)));
    }

    body.push_str("<h1>Log in</h1>\n<form action=\"/accounts/login\" method=\"post\">\n");

    if let Some(next) = next {
        body.push_str(&format!(
            "<input type=\"hidden\" name=\"next\" value=\"{}\">\n",
            escape(next)
        ));
    }

    body.push_str(
        "<label>Username <input type=\"text\" name=\"username\"></label><br>\n\
         <label>Password <input type=\"password\" name=\"password\"></label><br>\n\
         <button type=\"submit\">Log in</button>\n\
         </form>\n\
         <p><a href=\"/accounts/signup\">Sign up</a></p>\n",
    );

    layout("Log in", &body)
}

pub fn signup_page(error: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(error) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", escape(error)));
    }

    body.push_str(
        "<h1>Sign up</h1>\n\
         <form action=\"/accounts/signup\" method=\"post\">\n\
         <label>Username <input type=\"text\" name=\"username\"></label><br>\n\
         <label>Password <input type=\"password\" name=\"password1\"></label><br>\n\
         <label>Confirm password <input type=\"password\" name=\"password2\"></label><br>\n\
         <button type=\"submit\">Sign up</button>\n\
         </form>\n",
    );

    layout("Sign up", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>&\"war's\"</b>"),
            "&lt;b&gt;&amp;&quot;war&#x27;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn notice_codes_map_to_messages() {
        assert_eq!(
            notice_message("not-found", Some(3)).unwrap(),
            "Poll 3 was not found."
        );
        assert_eq!(
            notice_message("not-votable", Some(3)).unwrap(),
            "Poll 3 is not available for voting."
        );
        assert!(notice_message("not-found", None).is_none());
        assert!(notice_message("bogus", Some(3)).is_none());
    }
}
