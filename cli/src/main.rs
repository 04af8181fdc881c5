//! `cadenced`: operator tool for the Cadence global engine
//!
//! Drives a sled-backed engine one command at a time: genesis, block
//! advancement with event dispatch, scheduling and state inspection.

mod accounts;
mod commands;
mod config;

use anyhow::Result;
use cadence_global::ReturnKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "cadenced")]
#[command(about = "Cadence global engine node", version = VERSION)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State database directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write genesis state
    Init {
        /// Genesis parameters as JSON; reference network values if omitted
        #[arg(long, value_name = "FILE")]
        genesis: Option<PathBuf>,
    },

    /// Apply a block: update congestion, release and execute due events,
    /// then commit state and account balances together
    Advance {
        #[arg(long)]
        height: u64,

        /// Block time as Unix seconds or RFC 3339
        #[arg(long)]
        time: String,

        /// Transactions in the block
        #[arg(long, default_value_t = 0)]
        txs: i64,
    },

    /// Schedule coins to be returned to an account after a delay
    ScheduleReturn {
        #[arg(long)]
        account: String,

        /// Amount in coins, up to 5 decimal places
        #[arg(long)]
        amount: String,

        /// Seconds after the last block time
        #[arg(long)]
        delay: i64,

        #[arg(long, value_enum, default_value_t = ReturnKindArg::Saving)]
        kind: ReturnKindArg,
    },

    /// Print a JSON snapshot of the global state
    Show,

    /// List scheduled events with their encoded bytes
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// List persisted account balances
    Balances,

    /// Print the state hash
    Hash,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReturnKindArg {
    VoterDeposit,
    ValidatorDeposit,
    DeveloperDeposit,
    Saving,
}

impl From<ReturnKindArg> for ReturnKind {
    fn from(kind: ReturnKindArg) -> Self {
        match kind {
            ReturnKindArg::VoterDeposit => ReturnKind::VoterDeposit,
            ReturnKindArg::ValidatorDeposit => ReturnKind::ValidatorDeposit,
            ReturnKindArg::DeveloperDeposit => ReturnKind::DeveloperDeposit,
            ReturnKindArg::Saving => ReturnKind::Saving,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::resolve_config(cli.config.as_deref())?;

    // RUST_LOG wins over the config file
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    let data_dir = config.data_dir(cli.data_dir.as_deref());
    log::debug!("Using data dir {}", data_dir.display());

    match cli.command {
        Command::Init { genesis } => commands::init(&data_dir, genesis.as_deref()),
        Command::Advance { height, time, txs } => commands::advance(&data_dir, height, &time, txs),
        Command::ScheduleReturn {
            account,
            amount,
            delay,
            kind,
        } => commands::schedule_return(&data_dir, &account, &amount, delay, kind.into()),
        Command::Show => commands::show(&data_dir),
        Command::Events { limit } => commands::events(&data_dir, limit),
        Command::Balances => commands::balances(&data_dir),
        Command::Hash => commands::hash(&data_dir),
    }
}
