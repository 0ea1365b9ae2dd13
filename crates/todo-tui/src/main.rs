use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_tui::backend::{BackingStore, HttpStore, MemoryStore};
use todo_tui::shell::AppShell;
use todo_tui::store::TodoStore;
use todo_tui::ui;

fn main() -> Result<()> {
    // Logs go to a file, never stdout: the alternate screen owns stdout.
    if let Ok(path) = std::env::var("TODO_TUI_LOG") {
        let file =
            File::create(&path).with_context(|| format!("failed to open log file {path}"))?;
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    }

    let backend: Box<dyn BackingStore> = match std::env::var("TODO_API_URL") {
        Ok(url) => {
            tracing::info!(%url, "syncing against http backend");
            Box::new(HttpStore::new(url))
        }
        Err(_) => Box::new(MemoryStore::new()),
    };

    let mut shell = AppShell::new(TodoStore::new(backend));
    shell.start();
    ui::run(&mut shell).context("terminal session failed")?;
    Ok(())
}
