mod account_store;
mod carousel;
mod cli;
mod config;
mod dashboard;
mod error;
mod fetch;
mod models;
mod presentation;
mod provider_clients;
mod scheduler;
mod storage;
mod terminal;
mod utils;

pub use account_store::AccountRegistry;
pub use carousel::Carousel;
pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use error::{BackendError, Result};
pub use fetch::{FetchOrchestrator, FetchState, FetchStatus};
pub use models::{AccountProfile, ProfileInput};
pub use presentation::{format_money, select_view, RenderState, ViewInput, ViewMode};
pub use provider_clients::{NewApiClient, UsageClient};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use terminal::render_text;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn run() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(cli::dispatch(cli));
    // A pending stdin read would otherwise hold shutdown open.
    runtime.shutdown_background();

    if let Err(err) = result {
        eprintln!("error: {err}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }
        std::process::exit(1);
    }
}
