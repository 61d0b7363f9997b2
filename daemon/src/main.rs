//! Agora daemon — replays governance scenarios against a node and inspects
//! persisted state.

mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use agora_governance::GovernanceEngine;
use agora_node::{AgoraNode, NodeConfig};
use agora_nullables::{NullClock, NullTreasury};
use agora_store_lmdb::LmdbMetaStore;
use agora_types::{BlockHeight, Identity, TokenAmount};
use agora_utils::StatsCounter;
use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "agora", about = "Agora governance engine daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the persisted governance snapshot.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Block height the clock starts at.
    #[arg(long, env = "AGORA_START_BLOCK")]
    start_block: Option<u64>,

    /// Assumed seconds per block, used only to print durations.
    #[arg(long, default_value_t = 600, env = "AGORA_BLOCK_TIME")]
    block_time: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a scenario file and print query results as JSON.
    Run {
        /// Scenario TOML file.
        scenario: PathBuf,
    },
    /// Print statistics, and optionally one proposal or voter, from the
    /// snapshot in the data directory.
    Inspect {
        #[arg(long)]
        proposal: Option<u64>,
        #[arg(long)]
        voter: Option<String>,
        /// Block height used to derive proposal status.
        #[arg(long)]
        at: Option<u64>,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => {
            let config = NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => NodeConfig::default(),
    };

    let config = NodeConfig {
        data_dir: cli.data_dir.clone().or(base.data_dir.clone()),
        log_level: cli.log_level.clone().unwrap_or(base.log_level.clone()),
        log_format: cli.log_format.clone().unwrap_or(base.log_format.clone()),
        start_block: cli.start_block.unwrap_or(base.start_block),
        ..base
    };
    config.validate()?;
    Ok(config)
}

async fn run_scenario(config: NodeConfig, path: PathBuf, block_time: u64) -> anyhow::Result<()> {
    let scenario = scenario::Scenario::from_file(&path)?;
    tracing::info!(
        steps = scenario.steps.len(),
        file = %path.display(),
        "replaying scenario"
    );

    let clock = Arc::new(NullClock::new(config.start_block));
    let mut treasury = NullTreasury::new();
    for (account, amount) in &scenario.balances {
        treasury.mint(&Identity::new(account.as_str()), TokenAmount::new(u128::from(*amount)));
    }

    let mut node = AgoraNode::new(config, clock.clone(), Box::new(treasury))?;
    node.start()?;
    let handle = node.handle();
    let shutdown = node.shutdown_controller();
    let stats = StatsCounter::new(&scenario::OUTCOMES);

    let outcome = tokio::select! {
        result = scenario::run(&scenario, &handle, &clock, &stats, block_time) => result,
        reason = shutdown.wait_for_signal() => {
            tracing::warn!(?reason, "scenario interrupted");
            Ok(())
        }
    };
    node.stop().await?;
    outcome?;

    println!("{}", serde_json::to_string_pretty(&stats.snapshot())?);
    let unexpected = stats.get("unexpected");
    if unexpected > 0 {
        anyhow::bail!("{unexpected} step(s) did not behave as expected");
    }
    tracing::info!(block = %clock.now(), "scenario complete");
    Ok(())
}

fn inspect(
    config: &NodeConfig,
    proposal: Option<u64>,
    voter: Option<String>,
    at: Option<u64>,
) -> anyhow::Result<()> {
    let dir = config
        .data_dir
        .as_ref()
        .context("inspect needs --data-dir or data_dir in the config")?;
    let store = LmdbMetaStore::open(dir)?;
    let engine = GovernanceEngine::restore(&store)?
        .with_context(|| format!("no governance snapshot in {}", dir.display()))?;

    println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    if let Some(id) = proposal {
        let now = BlockHeight::new(at.unwrap_or(config.start_block));
        let details = engine
            .proposal_details(id, now)
            .with_context(|| format!("proposal {id} not found"))?;
        println!("{}", serde_json::to_string_pretty(&details)?);
    }
    if let Some(voter) = voter {
        let info = engine.voter_info(&Identity::new(voter));
        println!("{}", serde_json::to_string_pretty(&info)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::DefaultConfig = cli.command {
        print!("{}", NodeConfig::default().to_toml_string());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Run { scenario } => {
            agora_node::init_logging(config.log_format()?, &config.log_level)?;
            run_scenario(config, scenario, cli.block_time).await?;
        }
        Command::Inspect {
            proposal,
            voter,
            at,
        } => {
            agora_utils::init_tracing(&config.log_level);
            inspect(&config, proposal, voter, at)?;
        }
        Command::DefaultConfig => {}
    }

    Ok(())
}
