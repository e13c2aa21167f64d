//! Server-rendered HTML
//!
//! Plain string rendering for the home page, the list fragment, the delete
//! confirmation step and the static auth error page. Every user-supplied
//! value goes through [`escape_html`].

use std::fmt::Write;

use crate::form::BookmarkForm;
use crate::list::{BookmarkList, DeleteConfirmation, EMPTY_MESSAGE};
use crate::model::{Bookmark, User};

/// Id of the element the live feed script swaps list fragments into
pub const LIST_CONTAINER_ID: &str = "bookmark-list";

/// Escapes text for HTML element content and quoted attribute values
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // Keeps fragments single-line for server-sent events.
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link target for a stored url; anything but http(s) becomes inert
fn safe_href(url: &str) -> String {
    let lower = url.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        escape_html(url)
    } else {
        "#".to_string()
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title></head><body>{}</body></html>",
        escape_html(title),
        body
    )
}

/// Gated home page: header, creation form and list
///
/// `notice` is shown above the list (used for the failed-delete alert).
pub fn render_home(
    user: &User,
    form: &BookmarkForm,
    list: &BookmarkList,
    notice: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str("<main>");
    let _ = write!(
        body,
        "<header><h1>Smart Bookmarks</h1><span>{}</span>\
         <form method=\"post\" action=\"/auth/signout\"><button type=\"submit\">Sign out</button></form>\
         </header>",
        escape_html(user.email.as_deref().unwrap_or(&user.id))
    );
    body.push_str(&render_form(form));
    if let Some(notice) = notice {
        let _ = write!(body, "<p role=\"alert\">{}</p>", escape_html(notice));
    }
    let _ = write!(
        body,
        "<section id=\"{}\">{}</section>",
        LIST_CONTAINER_ID,
        render_list(list)
    );
    body.push_str("</main>");
    body.push_str(&live_script());

    layout("Smart Bookmarks", &body)
}

/// Disables the submit button and relabels it while the POST is in flight
const SUBMIT_GUARD: &str = "const b = this.querySelector('button[type=submit]'); \
     if (b.disabled) return false; b.disabled = true; b.textContent = 'Adding...';";

pub fn render_form(form: &BookmarkForm) -> String {
    let disabled = if form.is_loading() { " disabled" } else { "" };
    let label = if form.is_loading() {
        "Adding..."
    } else {
        "Add Bookmark"
    };

    format!(
        "<form method=\"post\" action=\"/bookmarks\" onsubmit=\"{}\">\
         <h2>Add New Bookmark</h2>\
         <label for=\"url\">URL</label>\
         <input type=\"url\" id=\"url\" name=\"url\" value=\"{}\" placeholder=\"https://example.com\" required>\
         <label for=\"title\">Title</label>\
         <input type=\"text\" id=\"title\" name=\"title\" value=\"{}\" placeholder=\"Bookmark title\" required>\
         <button type=\"submit\"{}>{}</button>\
         </form>",
        SUBMIT_GUARD,
        escape_html(&form.url),
        escape_html(&form.title),
        disabled,
        label
    )
}

/// List fragment; also the payload of each live update
pub fn render_list(list: &BookmarkList) -> String {
    if list.is_loading() {
        return "<p>Loading bookmarks...</p>".to_string();
    }
    if list.is_empty() {
        return format!("<p>{}</p>", EMPTY_MESSAGE);
    }

    let mut out = String::from("<h2>Your Bookmarks</h2><ul>");
    for row in list.rows() {
        let _ = write!(
            out,
            "<li><a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{title}</a>\
             <p>{url}</p><p>{created}</p>\
             <a href=\"/bookmarks/{id}/delete\">Delete</a></li>",
            href = safe_href(&row.url),
            url = escape_html(&row.url),
            title = escape_html(&row.title),
            created = escape_html(&row.created),
            id = escape_html(&row.id),
        );
    }
    out.push_str("</ul>");
    out
}

/// Second step of a delete: the explicit confirmation prompt
pub fn render_confirm_delete(
    confirmation: &DeleteConfirmation,
    bookmark: Option<&Bookmark>,
) -> String {
    let subject = bookmark
        .map(|b| format!("<p>{}</p><p>{}</p>", escape_html(&b.title), escape_html(&b.url)))
        .unwrap_or_default();

    let body = format!(
        "<main><h1>Delete bookmark</h1><p>{prompt}</p>{subject}\
         <form method=\"post\" action=\"/bookmarks/{id}/delete\">\
         <button type=\"submit\" name=\"confirm\" value=\"yes\">Delete</button>\
         <button type=\"submit\" name=\"confirm\" value=\"no\">Cancel</button>\
         </form></main>",
        prompt = escape_html(confirmation.prompt),
        subject = subject,
        id = escape_html(&confirmation.id),
    );

    layout("Delete bookmark", &body)
}

pub fn render_auth_code_error() -> String {
    layout(
        "Authentication Error",
        "<main><h1>Authentication Error</h1>\
         <p>There was an error during authentication. Please try again.</p>\
         <a href=\"/login\">Go to Login</a></main>",
    )
}

fn live_script() -> String {
    format!(
        "<script>\
         const feed = new EventSource('/events');\
         feed.addEventListener('bookmarks', (e) => {{\
         document.getElementById('{}').innerHTML = e.data;\
         }});\
         </script>",
        LIST_CONTAINER_ID
    )
}
