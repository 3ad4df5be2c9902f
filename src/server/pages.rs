//! Server-rendered HTML pages. Every user-supplied string is escaped.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::csrf::CSRF_FIELD;
use crate::forms::FormErrors;
use crate::identity::{CurrentUser, User};

/// Values echoed back into a re-rendered login form.
#[derive(Debug)]
pub struct LoginView<'a> {
    pub username: &'a str,
    pub remember: bool,
    pub next: Option<&'a str>,
    pub csrf: Option<&'a str>,
    pub errors: &'a FormErrors,
}

#[derive(Debug)]
pub struct RegisterView<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub csrf: Option<&'a str>,
    pub errors: &'a FormErrors,
}

fn layout(title: &str, current: &CurrentUser, flashes: &[String], body: &str) -> String {
    let nav = match current.user() {
        Some(_) => r#"<a href="/index">Home</a> <a href="/logout">Logout</a>"#,
        None => r#"<a href="/index">Home</a> <a href="/login">Login</a> <a href="/register">Register</a>"#,
    };
    let mut flash_html = String::new();
    if !flashes.is_empty() {
        flash_html.push_str("<ul class=\"flashes\">");
        for f in flashes {
            flash_html.push_str(&format!("<li>{}</li>", text(f)));
        }
        flash_html.push_str("</ul>");
    }
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{} - Investment Builder</title></head>\n<body>\n<nav>{}</nav>\n<hr>\n{}\n{}\n</body>\n</html>\n",
        text(title),
        nav,
        flash_html,
        body
    )
}

fn field_errors(errors: &FormErrors, field: &str) -> String {
    errors
        .field(field)
        .iter()
        .map(|m| format!("<span class=\"error\" style=\"color: red;\">[{}]</span>", text(m)))
        .collect::<Vec<_>>()
        .join("<br>")
}

fn csrf_input(csrf: Option<&str>) -> String {
    csrf.map(|t| format!("<input type=\"hidden\" name=\"{}\" value=\"{}\">", CSRF_FIELD, attr(t)))
        .unwrap_or_default()
}

pub fn index_page(user: &std::sync::Arc<User>, flashes: &[String]) -> String {
    let body = format!(
        "<h1>Hi, {}!</h1>\n<p>Your user id is <code>{}</code>.</p>\n<p>Signed in at {}.</p>",
        text(&user.name),
        text(user.id.as_str()),
        user.logged_in_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    layout("Home", &CurrentUser::User(user.clone()), flashes, &body)
}

pub fn login_page(view: &LoginView<'_>, flashes: &[String]) -> String {
    let action = match view.next {
        Some(n) => format!("/login?next={}", urlencoding::encode(n)),
        None => "/login".to_string(),
    };
    let body = format!(
        concat!(
            "<h1>Sign In</h1>\n",
            "<form action=\"{action}\" method=\"post\" novalidate>\n",
            "{csrf}{csrf_err}\n",
            "<p><label for=\"username\">Username</label><br>",
            "<input id=\"username\" name=\"username\" type=\"text\" size=\"32\" value=\"{username}\"><br>{username_err}</p>\n",
            "<p><label for=\"password\">Password</label><br>",
            "<input id=\"password\" name=\"password\" type=\"password\" size=\"32\"><br>{password_err}</p>\n",
            "<p><input id=\"remember_me\" name=\"remember_me\" type=\"checkbox\" value=\"y\"{checked}> ",
            "<label for=\"remember_me\">Remember Me</label></p>\n",
            "<p><input type=\"submit\" value=\"Sign In\"></p>\n",
            "</form>\n",
            "<p>New User? <a href=\"/register\">Click to Register!</a></p>"
        ),
        action = attr(&action),
        csrf = csrf_input(view.csrf),
        csrf_err = field_errors(view.errors, CSRF_FIELD),
        username = attr(view.username),
        username_err = field_errors(view.errors, "username"),
        password_err = field_errors(view.errors, "password"),
        checked = if view.remember { " checked" } else { "" },
    );
    layout("Sign In", &CurrentUser::Anonymous, flashes, &body)
}

pub fn register_page(view: &RegisterView<'_>, flashes: &[String]) -> String {
    let body = format!(
        concat!(
            "<h1>Register</h1>\n",
            "<form action=\"/register\" method=\"post\" novalidate>\n",
            "{csrf}{csrf_err}\n",
            "<p><label for=\"username\">Username</label><br>",
            "<input id=\"username\" name=\"username\" type=\"text\" size=\"32\" value=\"{username}\"><br>{username_err}</p>\n",
            "<p><label for=\"email\">Email</label><br>",
            "<input id=\"email\" name=\"email\" type=\"text\" size=\"64\" value=\"{email}\"><br>{email_err}</p>\n",
            "<p><label for=\"password\">Password</label><br>",
            "<input id=\"password\" name=\"password\" type=\"password\" size=\"32\"><br>{password_err}</p>\n",
            "<p><label for=\"password2\">Repeat Password</label><br>",
            "<input id=\"password2\" name=\"password2\" type=\"password\" size=\"32\"><br>{password2_err}</p>\n",
            "<p><input type=\"submit\" value=\"Register\"></p>\n",
            "</form>"
        ),
        csrf = csrf_input(view.csrf),
        csrf_err = field_errors(view.errors, CSRF_FIELD),
        username = attr(view.username),
        username_err = field_errors(view.errors, "username"),
        email = attr(view.email),
        email_err = field_errors(view.errors, "email"),
        password_err = field_errors(view.errors, "password"),
        password2_err = field_errors(view.errors, "password2"),
    );
    layout("Register", &CurrentUser::Anonymous, flashes, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use std::sync::Arc;

    #[test]
    fn index_escapes_username() {
        let user = Arc::new(User::with_id(UserId::from("42"), "<b>eve</b>"));
        let html = index_page(&user, &[]);
        assert!(html.contains("Hi, &lt;b&gt;eve&lt;/b&gt;!"));
        assert!(html.contains("<code>42</code>"));
        assert!(html.contains("href=\"/logout\""));
    }

    #[test]
    fn login_page_shows_errors_and_flash() {
        let mut errors = FormErrors::new();
        errors.add("username", "This field is required.");
        let view = LoginView { username: "", remember: false, next: Some("/index"), csrf: Some("tok"), errors: &errors };
        let html = login_page(&view, &["Please log in to access this page.".to_string()]);
        assert!(html.contains("[This field is required.]"));
        assert!(html.contains("<li>Please log in to access this page.</li>"));
        assert!(html.contains("action=\"/login?next=%2Findex\""));
        assert!(html.contains("name=\"csrf_token\" value=\"tok\""));
    }

    #[test]
    fn register_page_keeps_entered_values() {
        let errors = FormErrors::new();
        let view = RegisterView { username: "neo", email: "neo@\"x\".io", csrf: None, errors: &errors };
        let html = register_page(&view, &[]);
        assert!(html.contains("value=\"neo\""));
        assert!(html.contains("neo@&quot;x&quot;.io"));
        assert!(!html.contains("csrf_token"));
    }
}
