//! services/client/src/bin/folio.rs

use std::sync::Arc;

use folio_client::{
    adapters::SqliteStore,
    config::Config,
    error::ClientError,
    shell::{execute, AppState, Command, ShellState},
};
use folio_core::Redirect;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Backend at {}", config.api_url);

    // --- 2. Open Local State ---
    info!("Opening local state at {}...", config.state_database_url);
    let store = Arc::new(SqliteStore::connect(&config.state_database_url).await?);

    // --- 3. Wire the Core ---
    let app = AppState::build(&config, store)?;
    let mut redirects = app.context().redirects();

    match app.sessions.restore_session().await {
        Some(session) => println!("Welcome back, {}.", session.identity.name),
        None => println!("Not signed in. Type `help` for commands."),
    }
    app.catalog.load().await;
    println!("{} books in the catalog.", app.catalog.items().len());

    // --- 4. Run the Shell ---
    let mut shell = ShellState::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            redirect = redirects.recv() => match redirect {
                Ok(Redirect::Login) => {
                    shell.close_reader();
                    println!("Your session has expired. Please log in again.");
                }
                Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} redirects."),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        let quit = command == Command::Quit;
                        for reply in execute(&app, &mut shell, command).await {
                            println!("{reply}");
                        }
                        if quit {
                            break;
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    shell.close_reader();
    info!("Shell closed.");
    Ok(())
}
