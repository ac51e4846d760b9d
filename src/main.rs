use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use diary_search::api::{DiaryApi, HttpDiaryApi};
use diary_search::auth::TokenAuth;
use diary_search::clipboard::SystemClipboard;
use diary_search::config::{Cli, Config};
use diary_search::capabilities::Clipboard;
use diary_search::diary_entry::DiaryEntry;
use diary_search::error::{ApiResult, ClipboardError};
use diary_search::search_page::{MountOutcome, SearchPage, SearchTicket};
use diary_search::ui::{Action, UI};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Outcome of background work, applied to the page on the event loop.
enum Completion {
    Search(SearchTicket, ApiResult<Vec<DiaryEntry>>),
    Delete(String, ApiResult<()>),
    Share(String, Result<(), ClipboardError>),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::from_cli(Cli::parse()).wrap_err("invalid configuration")?;
    init_tracing(&config.log_file)?;
    tracing::info!("Starting diary search v{}", env!("CARGO_PKG_VERSION"));

    let auth = TokenAuth::new(config.token.clone());
    let api = Arc::new(HttpDiaryApi::new(
        config.api_url.clone(),
        auth.token().map(str::to_string),
        config.timeout,
    )?);
    let clipboard = Arc::new(SystemClipboard::new());
    let mut router = config.router.clone();
    let mut page = SearchPage::new(config.site_origin.clone());

    let initial_query = match page.prepare_mount(&auth, &mut router) {
        MountOutcome::Redirected => {
            eprintln!("Not signed in. Pass --token or set DIARY_TOKEN to search your diaries.");
            return Ok(());
        }
        MountOutcome::Ready { initial_query } => initial_query,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
    let mut ui = UI::new()?;

    if let Some(query) = initial_query {
        ui.move_cursor_to_end(&page);
        spawn_search(&mut page, &query, &api, &tx);
    }

    loop {
        while let Ok(completion) = rx.try_recv() {
            match completion {
                Completion::Search(ticket, outcome) => {
                    page.complete_search(ticket, outcome);
                }
                Completion::Delete(id, outcome) => page.complete_delete(&id, outcome, &mut ui),
                Completion::Share(id, outcome) => page.complete_share(&id, outcome, &mut ui),
            }
        }

        ui.display(&page)?;

        if let Some(action) = ui.handle_input(&mut page)? {
            match action {
                Action::Submit => {
                    let query = page.query.clone();
                    spawn_search(&mut page, &query, &api, &tx);
                }
                Action::Delete(id) => {
                    if page.confirm_delete(&id, &mut ui) {
                        spawn_delete(id, &api, &tx);
                    }
                }
                Action::Share(id) => {
                    let link = page.share_link(&id);
                    spawn_share(id, link, &clipboard, &tx);
                }
                Action::Quit => break,
            }
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

fn spawn_search(
    page: &mut SearchPage,
    query: &str,
    api: &Arc<HttpDiaryApi>,
    tx: &UnboundedSender<Completion>,
) {
    if let Some(ticket) = page.begin_search(query) {
        let api = Arc::clone(api);
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.search(&ticket.query).await;
            // receiver is gone once the UI has quit
            let _ = tx.send(Completion::Search(ticket, outcome));
        });
    }
}

fn spawn_delete(id: String, api: &Arc<HttpDiaryApi>, tx: &UnboundedSender<Completion>) {
    let api = Arc::clone(api);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = api.delete(&id).await;
        let _ = tx.send(Completion::Delete(id, outcome));
    });
}

fn spawn_share(
    id: String,
    link: String,
    clipboard: &Arc<SystemClipboard>,
    tx: &UnboundedSender<Completion>,
) {
    let clipboard = Arc::clone(clipboard);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = clipboard.write_text(&link).await;
        let _ = tx.send(Completion::Share(id, outcome));
    });
}

fn init_tracing(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .wrap_err_with(|| format!("cannot open log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diary_search=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
