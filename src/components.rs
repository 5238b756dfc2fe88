// In many cases, we need to do a let binding to satisfy the borrow checker
// and for some reason, clippy identifies those as unnecessary. Maybe there
// are and clippy knows more than me, maybe not.
#![allow(clippy::let_and_return)]

use super::models;
use ammonia::{clean, clean_text};
use chrono::{DateTime, Datelike, Utc};

const STYLES: &str = r#"
    * { box-sizing: border-box; }
    body { font-family: ui-sans-serif, system-ui, sans-serif; margin: 0; background: #fafafa; color: #18181b; }
    a { color: inherit; }
    .container { max-width: 72rem; margin: 0 auto; padding: 2rem 1rem; }
    .card { background: white; border: 1px solid #e4e4e7; border-radius: 0.5rem; padding: 1rem; }
    .stack > * + * { margin-top: 0.75rem; }
    .row { display: flex; gap: 0.5rem; align-items: center; }
    .between { justify-content: space-between; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); gap: 1rem; }
    .layout { display: grid; grid-template-columns: minmax(0, 1fr) minmax(0, 1fr); gap: 1.5rem; }
    .muted { color: #71717a; font-size: 0.875rem; }
    .error { background: #fef2f2; color: #b91c1c; border-radius: 0.375rem; padding: 0.75rem; font-size: 0.875rem; }
    .notice { background: #f0fdf4; color: #15803d; border-radius: 0.375rem; padding: 0.75rem; font-size: 0.875rem; }
    .pinned { border-color: #a1a1aa; }
    .btn { border: 1px solid #18181b; background: #18181b; color: white; border-radius: 0.375rem; padding: 0.4rem 0.8rem; cursor: pointer; }
    .btn-outline { background: white; color: #18181b; }
    .btn-danger { background: white; color: #b91c1c; border-color: #fca5a5; }
    input, textarea { width: 100%; border: 1px solid #d4d4d8; border-radius: 0.375rem; padding: 0.5rem; font: inherit; }
    textarea { min-height: 8rem; }
    .prose p { margin: 0.5rem 0; }
    .htmx-request .when-idle { display: none; }
    .when-busy { display: none; }
    .htmx-request .when-busy { display: inline; }
    @media (max-width: 48rem) { .layout { grid-template-columns: 1fr; } }
    @media (prefers-color-scheme: dark) {
        body { background: black; color: #fafafa; }
        .card, .btn-outline, .btn-danger, input, textarea { background: #18181b; color: #fafafa; border-color: #3f3f46; }
    }
"#;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

pub struct Page<'a> {
    pub title: &'a str,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html lang="en">
                <head>
                    <meta charset="utf-8" />
                    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
                    <title>{title}</title>
                    <style>{STYLES}</style>
                </head>
                <body hx-boost="true">
                    {body_html}
                    <script src="https://unpkg.com/htmx.org@1.9.6"></script>
                    <script>
                        htmx.config.defaultSwapStyle = "outerHTML"
                    </script>
                </body>
            </html>
            "#,
            title = clean_text(self.title),
            body_html = self.children.render()
        )
    }
}

fn error_box(error: Option<&str>) -> String {
    match error {
        Some(e) => format!(r#"<div class="error" role="alert">{}</div>"#, clean_text(e)),
        None => "".to_string(),
    }
}

pub struct Landing;
impl Component for Landing {
    fn render(&self) -> String {
        r#"
        <main class="container stack">
            <h1>Notes</h1>
            <p class="muted">
                Jot things down, pin what matters, and let AI boil any note
                down to a short summary and a few key points.
            </p>
            <ol class="stack">
                <li>Write a note.</li>
                <li>Pin the ones you keep coming back to.</li>
                <li>Open a note and summarize it with one click.</li>
            </ol>
            <div class="row">
                <a class="btn" href="/signup">Get started</a>
                <a class="btn btn-outline" href="/login">Sign in</a>
            </div>
        </main>
        "#
        .to_string()
    }
}

pub struct Container<'a> {
    pub children: Box<dyn Component + 'a>,
}
impl Component for Container<'_> {
    fn render(&self) -> String {
        format!(
            r#"<main class="container">{}</main>"#,
            self.children.render()
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Signup,
}

pub struct AuthForm<'a> {
    pub kind: AuthKind,
    pub email: &'a str,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}
impl Component for AuthForm<'_> {
    fn render(&self) -> String {
        let (heading, action, submit, busy, other) = match self.kind {
            AuthKind::Login => (
                "Sign In",
                "/login",
                "Sign In",
                "Signing in...",
                r#"Don't have an account? <a href="/signup">Sign up</a>"#,
            ),
            AuthKind::Signup => (
                "Create Account",
                "/signup",
                "Sign Up",
                "Creating account...",
                r#"Already have an account? <a href="/login">Sign in</a>"#,
            ),
        };
        let notice = match self.notice {
            Some(n) => format!(r#"<div class="notice">{}</div>"#, clean_text(n)),
            None => "".to_string(),
        };
        format!(
            r#"
            <form id="auth-form" class="card stack" hx-post="{action}" hx-disabled-elt="button">
                <h1>{heading}</h1>
                {notice}
                <label for="email">Email</label>
                <input id="email" type="email" name="email" value="{email}" required placeholder="you@example.com" />
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required minlength="6" />
                {error}
                <button class="btn">
                    <span class="when-idle">{submit}</span>
                    <span class="when-busy">{busy}</span>
                </button>
                <p class="muted">{other}</p>
            </form>
            "#,
            email = clean_text(self.email),
            error = error_box(self.error),
        )
    }
}

pub struct Dashboard<'a> {
    pub user: &'a models::AuthUser,
    pub notes: &'a [models::Note],
}
impl Component for Dashboard<'_> {
    fn render(&self) -> String {
        let email = self.user.email.as_deref().unwrap_or("");
        let form = CreateNoteForm {
            title: "",
            content: "",
            error: None,
        }
        .render();
        let grid = NotesGrid { notes: self.notes }.render();
        format!(
            r#"
            <div class="container stack">
                <header class="row between">
                    <div>
                        <h1>Dashboard</h1>
                        <p class="muted">Your notes and summaries</p>
                    </div>
                    <div class="row">
                        <span class="muted">{email}</span>
                        <form hx-post="/logout"><button class="btn btn-outline">Sign out</button></form>
                    </div>
                </header>
                <section class="card stack">
                    <h2>Create Note</h2>
                    {form}
                </section>
                <div class="layout">
                    {grid}
                    <div id="viewer"></div>
                </div>
            </div>
            "#,
            email = clean_text(email),
        )
    }
}

pub struct CreateNoteForm<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub error: Option<&'a str>,
}
impl Component for CreateNoteForm<'_> {
    fn render(&self) -> String {
        format!(
            r##"
            <form
                id="create-note-form"
                class="stack"
                hx-post="/notes"
                hx-target="#notes-grid"
                hx-disabled-elt="button"
                hx-on::after-request="if (event.detail.successful && event.detail.target.id === 'notes-grid') this.reset()"
            >
                <input type="text" name="title" placeholder="Title" value="{title}" required />
                <textarea name="content" placeholder="Write your note..." required>{content}</textarea>
                {error}
                <button class="btn">
                    <span class="when-idle">Create Note</span>
                    <span class="when-busy">Creating...</span>
                </button>
            </form>
            "##,
            title = clean_text(self.title),
            content = clean_text(self.content),
            error = error_box(self.error),
        )
    }
}

pub struct NotesGrid<'a> {
    pub notes: &'a [models::Note],
}
impl Component for NotesGrid<'_> {
    fn render(&self) -> String {
        if self.notes.is_empty() {
            return r#"
            <section id="notes-grid" class="card">
                <p class="muted">No notes yet. Create your first note above.</p>
            </section>
            "#
            .to_string();
        }
        let cards = self
            .notes
            .iter()
            .map(|note| NoteCard { note }.render())
            .collect::<Vec<String>>()
            .join("");
        format!(r#"<section id="notes-grid" class="grid">{cards}</section>"#)
    }
}

const EXCERPT_CHARS: usize = 140;

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

pub struct NoteCard<'a> {
    pub note: &'a models::Note,
}
impl Component for NoteCard<'_> {
    fn render(&self) -> String {
        let id = self.note.id;
        let (pin_action, pin_label, card_class) = if self.note.pinned {
            ("unpin", "Unpin", "card stack pinned")
        } else {
            ("pin", "Pin", "card stack")
        };
        let pinned_badge = if self.note.pinned {
            r#"<span class="muted" title="Pinned">📌</span>"#
        } else {
            ""
        };
        format!(
            r##"
            <article class="{card_class}">
                <header class="row between">
                    <h3>{pinned_badge} {title}</h3>
                </header>
                <p class="muted">{created}</p>
                <p>{excerpt}</p>
                <div class="row">
                    <button class="btn btn-outline" hx-get="/notes/{id}" hx-target="#viewer">Open</button>
                    <button class="btn btn-outline" hx-post="/notes/{id}/{pin_action}" hx-target="#notes-grid">{pin_label}</button>
                    <button
                        class="btn btn-danger"
                        hx-delete="/notes/{id}"
                        hx-target="#notes-grid"
                        hx-confirm="Delete this note? This also deletes its summary."
                    >Delete</button>
                </div>
            </article>
            "##,
            title = clean_text(&self.note.title),
            created = format_date(&self.note.created_at),
            excerpt = clean_text(&excerpt(&self.note.content)),
        )
    }
}

pub struct NoteViewer<'a> {
    pub note: &'a models::Note,
    pub summary: Option<&'a models::Summary>,
    pub now: DateTime<Utc>,
}
impl Component for NoteViewer<'_> {
    fn render(&self) -> String {
        let summary = SummaryPanel {
            note_id: self.note.id,
            summary: self.summary,
            error: None,
            now: self.now,
        }
        .render();
        format!(
            r#"
            <div id="viewer">
                <article class="card stack">
                    <h2>{title}</h2>
                    <p class="muted">{created}</p>
                    {summary}
                    <div class="prose">{content}</div>
                </article>
            </div>
            "#,
            title = clean_text(&self.note.title),
            created = format_date(&self.note.created_at),
            content = clean(&markdown::to_html(&self.note.content)),
        )
    }
}

pub struct SummaryPanel<'a> {
    pub note_id: uuid::Uuid,
    pub summary: Option<&'a models::Summary>,
    pub error: Option<&'a str>,
    pub now: DateTime<Utc>,
}
impl Component for SummaryPanel<'_> {
    fn render(&self) -> String {
        let note_id = self.note_id;
        let (status, body, button) = match self.summary {
            Some(s) => {
                let bullets = s
                    .bullet_points
                    .iter()
                    .map(|b| format!("<li>{}</li>", clean_text(b)))
                    .collect::<Vec<String>>()
                    .join("");
                (
                    format!(
                        r#"<p class="muted">Summarized • {}</p>"#,
                        format_relative(&s.updated_at, &self.now)
                    ),
                    format!(
                        r#"<p>{}</p><ul>{bullets}</ul>"#,
                        clean_text(&s.summary_text)
                    ),
                    format!(
                        r#"<button class="btn" hx-post="/notes/{note_id}/summarize" hx-target="closest section" hx-confirm="Overwrite summary?">
                            <span class="when-idle">Re-summarize</span>
                            <span class="when-busy">Summarizing...</span>
                        </button>
                        <p class="muted">This will overwrite the existing summary.</p>"#
                    ),
                )
            }
            None => (
                "".to_string(),
                r#"<p class="muted">No summary yet.</p>"#.to_string(),
                format!(
                    r#"<button class="btn" hx-post="/notes/{note_id}/summarize" hx-target="closest section">
                        <span class="when-idle">Summarize with AI</span>
                        <span class="when-busy">Summarizing...</span>
                    </button>"#
                ),
            ),
        };
        format!(
            r#"
            <section class="card stack" id="summary-{note_id}">
                {status}
                {button}
                {error}
                {body}
            </section>
            "#,
            error = error_box(self.error),
        )
    }
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y, %-I:%M %p").to_string()
}

fn plural(n: i64, unit: &str) -> String {
    format!("{n} {unit}{} ago", if n == 1 { "" } else { "s" })
}

/// "just now", "5 minutes ago", ... and a plain date after a week.
pub fn format_relative(ts: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff = *now - *ts;
    let mins = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if mins < 1 {
        "just now".to_string()
    } else if mins < 60 {
        plural(mins, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else if ts.year() == now.year() {
        ts.format("%b %-d").to_string()
    } else {
        ts.format("%b %-d, %Y").to_string()
    }
}
