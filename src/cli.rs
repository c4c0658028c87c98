use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;

use crate::account_store::AccountRegistry;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::error::{BackendError, Result};
use crate::fetch::FetchOrchestrator;
use crate::models::{normalize_optional_string, ProfileInput};
use crate::presentation::{card_view, CardPosition};
use crate::provider_clients::NewApiClient;
use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use crate::terminal::{render_text, run_interactive};

#[derive(Debug, Parser)]
#[command(
    name = "quota-carousel",
    version,
    about = "Rotating balance and daily-usage dashboard for new-api consoles"
)]
pub struct Cli {
    /// Directory holding settings.json
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep accounts in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive dashboard (default)
    Run(RunArgs),

    /// List configured accounts
    List,

    /// Add an account
    Add(AddArgs),

    /// Change fields of an account
    Edit(EditArgs),

    /// Delete an account
    Remove {
        /// Account id, as printed by `list`
        id: String,
    },

    /// Fetch every account once and print its card
    Status,
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Refresh period in seconds (default: 60)
    #[arg(long, value_name = "N")]
    pub refresh_secs: Option<u64>,

    /// Carousel rotation period in seconds (default: 5)
    #[arg(long, value_name = "N")]
    pub rotate_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub cookie: String,
    #[arg(long)]
    pub user_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Account id, as printed by `list`
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub cookie: Option<String>,
    #[arg(long)]
    pub user_id: Option<String>,
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = DashboardConfig::resolve(cli.data_dir);
    let storage = open_storage(&config, cli.ephemeral)?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => cmd_run(storage, config, args).await,
        Commands::List => cmd_list(storage),
        Commands::Add(args) => cmd_add(storage, &config, args),
        Commands::Edit(args) => cmd_edit(storage, args),
        Commands::Remove { id } => cmd_remove(storage, &id),
        Commands::Status => cmd_status(storage, &config).await,
    }
}

fn open_storage(config: &DashboardConfig, ephemeral: bool) -> Result<Arc<dyn KeyValueStore>> {
    if ephemeral {
        log::info!("[cli] using in-memory storage");
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    }
    let store = FileKeyValueStore::open(config.store_path())?;
    log::debug!("[cli] settings at {}", store.path().display());
    Ok(Arc::new(store))
}

async fn cmd_run(storage: Arc<dyn KeyValueStore>, config: DashboardConfig, args: RunArgs) -> Result<()> {
    let config = config.with_intervals(
        args.refresh_secs.map(Duration::from_secs),
        args.rotate_secs.map(Duration::from_secs),
    );
    let client = Arc::new(NewApiClient::new(config.request_timeout)?);
    let dashboard = Dashboard::open(storage, client, config)?;
    run_interactive(dashboard).await
}

fn cmd_list(storage: Arc<dyn KeyValueStore>) -> Result<()> {
    let registry = AccountRegistry::load(storage)?;
    if registry.is_empty() {
        println!("No accounts configured.");
        return Ok(());
    }
    for (index, account) in registry.list().iter().enumerate() {
        println!("{}. {}", index + 1, account.name);
        println!("   id:     {}", account.id);
        println!("   url:    {}", account.endpoint_url);
        println!("   user:   {}", account.user_id);
        println!("   cookie: {}", account.masked_cookie());
    }
    Ok(())
}

fn cmd_add(storage: Arc<dyn KeyValueStore>, config: &DashboardConfig, args: AddArgs) -> Result<()> {
    let mut registry = AccountRegistry::load(storage)?;
    let input = ProfileInput {
        name: args.name,
        endpoint_url: args
            .url
            .unwrap_or_else(|| config.default_endpoint_url.clone()),
        auth_cookie: args.cookie,
        user_id: args
            .user_id
            .unwrap_or_else(|| config.default_user_id.clone()),
    };
    let account = registry.add(input)?;
    println!("Added {} ({})", account.name, account.id);
    Ok(())
}

fn cmd_edit(storage: Arc<dyn KeyValueStore>, args: EditArgs) -> Result<()> {
    let mut registry = AccountRegistry::load(storage)?;
    let account = registry
        .get(&args.id)
        .ok_or(BackendError::AccountNotFound)?;
    let input = merge_edit(account.input(), &args);

    if !registry.update(&args.id, input)? {
        return Err(BackendError::AccountNotFound);
    }
    println!("Updated {}", args.id);
    Ok(())
}

/// Blank flags leave the field unchanged.
fn merge_edit(mut input: ProfileInput, args: &EditArgs) -> ProfileInput {
    if let Some(name) = normalize_optional_string(args.name.clone()) {
        input.name = name;
    }
    if let Some(url) = normalize_optional_string(args.url.clone()) {
        input.endpoint_url = url;
    }
    if let Some(cookie) = args.cookie.as_ref().filter(|value| !value.trim().is_empty()) {
        input.auth_cookie = cookie.clone();
    }
    if let Some(user_id) = normalize_optional_string(args.user_id.clone()) {
        input.user_id = user_id;
    }
    input
}

fn cmd_remove(storage: Arc<dyn KeyValueStore>, id: &str) -> Result<()> {
    let mut registry = AccountRegistry::load(storage)?;
    let removed = registry.remove(id)?.ok_or(BackendError::AccountNotFound)?;
    println!("Removed {}", removed.name);
    Ok(())
}

async fn cmd_status(storage: Arc<dyn KeyValueStore>, config: &DashboardConfig) -> Result<()> {
    let registry = AccountRegistry::load(storage)?;
    if registry.is_empty() {
        println!("No accounts configured.");
        return Ok(());
    }

    let (changes, _) = watch::channel(0u64);
    let client = Arc::new(NewApiClient::new(config.request_timeout)?);
    let fetcher = FetchOrchestrator::new(client, Arc::new(changes));
    fetcher.refresh_all_and_wait(registry.list()).await;

    let total = registry.len();
    for (index, account) in registry.list().iter().enumerate() {
        let state = fetcher.state(&account.id);
        let view = card_view(account, state.as_ref(), CardPosition { index, total });
        print!("{}", render_text(&view));
    }
    Ok(())
}
