// Entry point for the snapdeck TUI.
// Loads config, sends logs to a file, and runs the app on a tokio runtime.

use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use snapdeck::api::{ApiClient, HttpTransport, SessionNavigator};
use snapdeck::app::App;
use snapdeck::config::{self, Config};
use snapdeck::error::Result;
use snapdeck::query::QueryClient;

fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

/// The terminal belongs to the UI, so logs go to the cache directory.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = config::log_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::options().create(true).append(true).open(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let navigator = Arc::new(SessionNavigator::new(config.api_url.clone()));
    let api = ApiClient::new(transport, navigator.clone(), config.login_path.clone());
    info!(api_url = %config.api_url, "starting snapdeck");

    let mut terminal = ratatui::try_init()?;
    let mut app = App::new(api, QueryClient::new(), navigator);
    let result = app.run(&mut terminal).await;
    ratatui::try_restore()?;

    if let Err(e) = &result {
        error!(error = %e, "snapdeck exited with an error");
    }
    result
}
