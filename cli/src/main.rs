//! plank CLI - mount a board and follow it from the terminal.
//!
//! Mounts one board session, keeps it synchronized in the background, and
//! prints activity notifications and failure notices as they arrive. Ctrl-C
//! tears the session down.
//!
//! ```text
//! main() -> Settings::load() -> BoardSession::mount() -> event loop
//!                                                            |
//!                                       apply() + print notifications
//! ```

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use plank_api::ApiClient;
use plank_config::Settings;
use plank_engine::{BoardSession, SessionEvent, SessionOptions};
use plank_types::Identity;

fn init_tracing(data_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let log_path = data_dir.join("logs").join("plank.log");
    if let Some(parent) = log_path.parent()
        && fs::create_dir_all(parent).is_ok()
        && let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path)
    {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %log_path.display(), "Logging initialized");
        return;
    }

    // If we can't open a log file, prefer "no logs" over interleaving them
    // with the session output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn print_board(session: &BoardSession) {
    let board = session.board();
    println!(
        "{} ({} unread notifications)",
        board.name,
        session.notifications().unread_count()
    );
    for column in &board.columns {
        println!("  {} [{}]", column.title, column.tasks.len());
        for task in &column.tasks {
            println!("    - {}", task.title);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let board_id = match std::env::args().nth(1) {
        Some(id) if !id.trim().is_empty() => id,
        _ => bail!("usage: plank <board-id>"),
    };

    let settings = Settings::load().context("failed to load configuration")?;
    let data_dir = settings.data_dir();
    init_tracing(&data_dir);

    let viewer = Identity {
        id: settings.identity.id.clone(),
        name: settings.identity.name.clone(),
        email: settings.identity.email.clone(),
    };
    if viewer.name.trim().is_empty() && viewer.email.trim().is_empty() {
        bail!(
            "no identity configured: set [identity] in config.toml \
             or PLANK_USER_NAME / PLANK_USER_EMAIL"
        );
    }

    let api = ApiClient::new(settings.server_url().context("invalid server url")?);
    let options = SessionOptions {
        poll_interval: settings.poll_interval(),
        stream_idle_timeout: settings.stream_idle_timeout(),
        data_dir,
    };

    let mut session = BoardSession::mount(api, &board_id, viewer, &options)
        .await
        .with_context(|| format!("failed to mount board {board_id}"))?;

    print_board(&session);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = session.next_event() => {
                let Some(event) = event else { break };
                let observed = matches!(event, SessionEvent::ActivityObserved(_));
                session.apply(event);
                if observed && let Some(item) = session.notifications().items().first() {
                    println!("[{}] {}: {}", item.kind.as_str(), item.user, item.action);
                }
                for notice in session.take_notices() {
                    eprintln!("! {notice}");
                }
            }
        }
    }

    session.close();
    Ok(())
}
