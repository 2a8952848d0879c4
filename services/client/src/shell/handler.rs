//! services/client/src/shell/handler.rs
//!
//! Executes one parsed command against the core and renders the reply lines.

use std::path::Path;

use folio_core::{
    access_decision, Access, CatalogError, ContentItem, Denial, ItemDraft, ReaderState,
    ReadingSession, SessionError, Upload, ValidationError,
};
use tracing::info;

use crate::shell::protocol::{Command, HELP};
use crate::shell::state::{AppState, ShellState};

/// Runs `command` and returns what the terminal should print.
pub async fn execute(app: &AppState, shell: &mut ShellState, command: Command) -> Vec<String> {
    match command {
        // --- Session ---
        Command::Login { email, password } => {
            match app.sessions.establish_session(&email, &password).await {
                Ok(()) => vec![signed_in(app)],
                Err(e) => vec![format!("Login failed: {e}")],
            }
        }
        Command::Register {
            email,
            password,
            name,
        } => match app.sessions.create_account(&email, &password, &name).await {
            Ok(()) => vec![signed_in(app)],
            Err(SessionError::Validation(errors)) => field_lines(&errors),
            Err(e) => vec![format!("Registration failed: {e}")],
        },
        Command::Federated { token } => {
            match app.sessions.establish_federated_session(&token).await {
                Ok(()) => vec![signed_in(app)],
                Err(e) => vec![format!("Federated login failed: {e}")],
            }
        }
        Command::Logout => {
            shell.close_reader();
            app.sessions.terminate_session().await;
            vec!["Signed out.".to_string()]
        }
        Command::Upgrade => match app.sessions.upgrade_entitlement().await {
            Ok(identity) => vec![format!(
                "You're VIP now (subscription {}).",
                identity.subscription_id.unwrap_or_default()
            )],
            Err(e) => vec![format!("Upgrade failed: {e}")],
        },
        Command::Refresh => match app.sessions.refresh_identity().await {
            Ok(_) => vec![signed_in(app)],
            Err(e) => vec![format!("Refresh failed: {e}")],
        },

        // --- Catalog ---
        Command::List { filter, term } => {
            let items = app.catalog.search(&term, filter);
            if items.is_empty() {
                return vec!["No books match.".to_string()];
            }
            items.iter().map(listing_line).collect()
        }
        Command::Show { id } => {
            let Some(item) = app.catalog.get_by_id(&id) else {
                return vec![format!("Book {id} not found.")];
            };
            let identity = app.context().identity();
            let action = match access_decision(identity.as_ref(), &item) {
                Access::Granted => format!("Ready to read: `open {}`", item.id),
                Access::RequiresLogin => "Sign in to read this book.".to_string(),
                Access::RequiresUpgrade => "VIP only. Run `upgrade` to unlock.".to_string(),
            };
            vec![
                format!("{} by {}", item.title, item.author),
                item.description.clone(),
                format!("Published {} | {}", item.published_at, tier_label(&item)),
                action,
            ]
        }
        Command::Publish {
            cover,
            content,
            pages,
            is_premium,
            title,
            description,
        } => {
            let (cover, content) = match (read_upload(&cover).await, read_upload(&content).await) {
                (Ok(cover), Ok(content)) => (cover, content),
                (Err(e), _) | (_, Err(e)) => return vec![e],
            };
            let author = app
                .context()
                .identity()
                .map(|identity| identity.name)
                .unwrap_or_default();
            let draft = ItemDraft {
                title,
                author,
                description,
                is_premium,
                total_pages: pages,
                cover: Some(cover),
                content: Some(content),
            };
            match app.catalog.create(draft).await {
                Ok(item) => vec![format!("Published [{}] {}", item.id, item.title)],
                Err(CatalogError::Validation(errors)) => field_lines(&errors),
                Err(e) => vec![format!("Publish failed: {e}")],
            }
        }
        Command::History => {
            let history = app.catalog.reading_history();
            if history.items.is_empty() {
                return vec!["No books started yet.".to_string()];
            }
            let mut lines: Vec<String> = history
                .items
                .iter()
                .map(|item| {
                    let page = item.started_at().unwrap_or_default();
                    match item.total_pages {
                        Some(total) => format!("[{}] {}: page {page} of {total}", item.id, item.title),
                        None => format!("[{}] {}: page {page}", item.id, item.title),
                    }
                })
                .collect();
            lines.push(format!(
                "{} books started, {} pages read",
                history.books_started, history.pages_read
            ));
            lines
        }

        // --- Reader ---
        Command::Open { id } => {
            shell.close_reader();
            shell.reader = app.reader.open(&id).await;
            match &shell.reader {
                ReaderState::Ready(session) => vec![
                    format!(
                        "Reading {} ({})",
                        session.item().title,
                        session.access_reference().as_str()
                    ),
                    status_line(session),
                ],
                ReaderState::Denied(Denial::RequiresLogin) => vec!["Please log in first.".to_string()],
                ReaderState::Denied(Denial::RequiresUpgrade) => {
                    vec!["This book is VIP only. Run `upgrade` to unlock.".to_string()]
                }
                ReaderState::Error(e) => vec![format!("Could not open: {e}")],
                ReaderState::Loading => vec!["Loading...".to_string()],
            }
        }
        Command::Close => {
            if shell.close_reader() {
                vec!["Closed.".to_string()]
            } else {
                vec!["No book is open.".to_string()]
            }
        }
        Command::Next => with_session(shell, |s| {
            s.next_page();
        }),
        Command::Prev => with_session(shell, |s| {
            s.prev_page();
        }),
        Command::Page(page) => with_session(shell, |s| {
            s.go_to_page(page);
        }),
        Command::ZoomIn => with_session(shell, |s| {
            s.zoom_in();
        }),
        Command::ZoomOut => with_session(shell, |s| {
            s.zoom_out();
        }),
        Command::ZoomReset => with_session(shell, |s| {
            s.reset_zoom();
        }),
        Command::Fullscreen => with_session(shell, |s| {
            s.toggle_fullscreen();
        }),
        Command::Move => with_session(shell, ReadingSession::pointer_activity),
        Command::Loaded(pages) => with_session(shell, |s| s.document_loaded(pages)),

        Command::Help => HELP.lines().map(str::to_string).collect(),
        Command::Quit => {
            info!("Quit requested.");
            shell.close_reader();
            vec!["Bye.".to_string()]
        }
    }
}

fn with_session(shell: &mut ShellState, action: impl FnOnce(&mut ReadingSession)) -> Vec<String> {
    match shell.reader.session_mut() {
        Some(session) => {
            action(session);
            vec![status_line(session)]
        }
        None => vec!["No book is open.".to_string()],
    }
}

fn field_lines(errors: &ValidationError) -> Vec<String> {
    errors
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect()
}

/// Reads a local file into an upload, typed by its extension.
async fn read_upload(path: &Path) -> Result<Upload, String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Could not read {}: {e}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Upload::new(file_name, mime_type, data))
}

fn signed_in(app: &AppState) -> String {
    match app.context().identity() {
        Some(identity) => {
            let mut badges = Vec::new();
            if identity.capabilities.is_vip {
                badges.push("VIP");
            }
            if identity.capabilities.is_author {
                badges.push("author");
            }
            if badges.is_empty() {
                format!("Signed in as {} <{}>", identity.name, identity.email)
            } else {
                format!(
                    "Signed in as {} <{}> [{}]",
                    identity.name,
                    identity.email,
                    badges.join(", ")
                )
            }
        }
        None => "Not signed in.".to_string(),
    }
}

fn tier_label(item: &ContentItem) -> &'static str {
    if item.is_premium {
        "VIP Only"
    } else {
        "Free"
    }
}

fn listing_line(item: &ContentItem) -> String {
    let progress = match (item.started_at(), item.total_pages) {
        (Some(page), Some(total)) => format!(" | page {page}/{total}"),
        (Some(page), None) => format!(" | page {page}"),
        (None, _) => String::new(),
    };
    format!(
        "[{}] {} by {} ({}){}",
        item.id,
        item.title,
        item.author,
        tier_label(item),
        progress
    )
}

pub fn status_line(session: &ReadingSession) -> String {
    let view = session.view();
    format!(
        "Page {} of {} | zoom {}% | fullscreen {} | controls {}",
        view.current_page,
        view.total_pages,
        view.zoom_level,
        if view.is_fullscreen { "on" } else { "off" },
        if view.controls_visible { "shown" } else { "hidden" },
    )
}
