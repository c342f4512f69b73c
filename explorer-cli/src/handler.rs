//! Command Handlers

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use explorer_core::{MintPosition, TokenSchedule};
use explorer_db::{LedgerStore, ScanScope, SledLedger};
use explorer_sync::{
    BatchConfig, BatchRunner, MintScheduler, OwnershipSync, PinCheckScheduler, StaticSupply,
    SyncContext, SyncError, TokenMinter,
};

use crate::commands::{Cli, Commands};
use crate::config::ExplorerConfig;
use crate::error::{CliError, CliResult};
use crate::output::print_json;

/// Opened ledger plus the configuration it was opened with
struct App {
    config: ExplorerConfig,
    ledger: Arc<SledLedger>,
}

impl App {
    fn open(config: ExplorerConfig) -> CliResult<Self> {
        let ledger = Arc::new(SledLedger::open(&config.db_path)?);
        Ok(Self { config, ledger })
    }

    fn context(&self) -> CliResult<SyncContext> {
        let oracle = explorer_ipfs::connect(&self.config.ipfs)?;
        Ok(SyncContext::new(self.ledger.clone(), oracle))
    }

    fn runner(&self, ctx: &SyncContext, batch: BatchConfig) -> Arc<BatchRunner> {
        Arc::new(BatchRunner::new(
            Arc::new(OwnershipSync::new(ctx.clone())),
            batch,
        ))
    }

    fn minter(&self, ctx: &SyncContext) -> Arc<TokenMinter> {
        Arc::new(TokenMinter::new(
            ctx.clone(),
            TokenSchedule::production(),
            Arc::new(StaticSupply(self.config.supply)),
        ))
    }
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli, config: ExplorerConfig) -> CliResult<()> {
    let app = App::open(config)?;

    match cli.command {
        Commands::Run => handle_run(&app).await,
        Commands::Sync { token_id } => handle_sync(&app, &token_id).await,
        Commands::Check { all } => handle_check(&app, all).await,
        Commands::Mint { level, number } => handle_mint(&app, level, number).await,
        Commands::Reconcile => handle_reconcile(&app).await,
        Commands::History { token_id } => handle_history(&app, &token_id).await,
        Commands::Owners { peer } => {
            let records = app.ledger.owned_by_peer(&peer).await?;
            print_json(&records)
        }
        Commands::Status => handle_status(&app).await,
    }
}

async fn handle_run(app: &App) -> CliResult<()> {
    let ctx = app.context()?;
    let runner = app.runner(&ctx, app.config.batch.clone());

    let daily = PinCheckScheduler::new(runner.clone(), app.config.pin_check.clone()).start();
    let weekly = MintScheduler::new(app.minter(&ctx), runner, app.config.mint.clone()).start();

    info!(
        db_path = %app.config.db_path.display(),
        period_secs = daily.period().as_secs(),
        "Explorer running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    daily.stop().await;
    weekly.stop().await;
    ctx.shutdown().await;
    Ok(())
}

async fn handle_sync(app: &App, token_id: &str) -> CliResult<()> {
    let ctx = app.context()?;
    let result = OwnershipSync::new(ctx.clone()).sync_token(token_id).await;
    ctx.shutdown().await;

    match result {
        Ok(outcome) => print_json(&outcome),
        Err(SyncError::NoPeersFound(token_id)) => print_json(&json!({
            "status": "no_peers",
            "token_id": token_id,
        })),
        Err(e) => Err(e.into()),
    }
}

async fn handle_check(app: &App, all: bool) -> CliResult<()> {
    let ctx = app.context()?;
    let mut batch = app.config.batch.clone();
    if all {
        batch.scope = ScanScope::All;
    }

    let stats = app.runner(&ctx, batch).run_cycle(None).await;
    ctx.shutdown().await;
    print_json(&stats)
}

async fn handle_mint(app: &App, level: Option<u32>, number: Option<u64>) -> CliResult<()> {
    let target = match (level, number) {
        (Some(level), Some(number)) => MintPosition::new(level, number),
        (None, None) => app.config.supply,
        _ => return Err(CliError::invalid_arg("--level and --number go together")),
    };

    let ctx = app.context()?;
    let report = app.minter(&ctx).mint_until(target).await;
    ctx.shutdown().await;
    print_json(&report?)
}

async fn handle_reconcile(app: &App) -> CliResult<()> {
    let ctx = app.context()?;
    let stats = app
        .runner(&ctx, app.config.batch.clone())
        .reconcile_missing(None)
        .await;
    ctx.shutdown().await;
    print_json(&stats)
}

async fn handle_history(app: &App, token_id: &str) -> CliResult<()> {
    let history = app.ledger.transactions_for_token(token_id).await?;
    if history.is_empty() && !app.ledger.token_exists(token_id).await? {
        return Err(CliError::not_found(token_id));
    }

    let current = app.ledger.get_ownership(token_id).await?;
    print_json(&json!({
        "token_id": token_id,
        "current": current,
        "transactions": history,
    }))
}

async fn handle_status(app: &App) -> CliResult<()> {
    let stats = app.ledger.stats().await?;
    let schedule = TokenSchedule::production();
    let latest = app
        .ledger
        .latest_minted(explorer_core::TOKEN_TYPE_RBT)
        .await?;

    print_json(&json!({
        "ledger": stats,
        "latest_minted": latest,
        "supply": app.config.supply,
        "schedule": {
            "levels": schedule.levels(),
            "total_supply": schedule.total_supply(),
        },
        "config": &app.config,
    }))
}
