//! Argument parsing and dispatch for the `explog` binary.
//!
//! # Usage
//!
//! ```bash
//! explog --caller 0xabc create-experiment "Trial A"
//! explog --caller 0xabc add-step 0 "Hyp" "water boils at 100C"
//! explog step-ids 0
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use explog_core::db::open_db;
use explog_core::{
    core_version, default_log_level, init_logging, ping, ExperimentId, LedgerConfig, LedgerEvent,
    LedgerService, Principal, SqliteLedgerRepository, StepDraft, StepId,
};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

/// Experiment ledger command-line interface
#[derive(Parser, Debug)]
#[command(name = "explog")]
#[command(author, version, about = "Record experiments and their steps in a local ledger")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Ledger database file
    #[arg(long, global = true, default_value = "explog.sqlite3")]
    pub db: PathBuf,

    /// Identity issuing the operation (required for writes)
    #[arg(long, global = true)]
    pub caller: Option<String>,

    /// JSON ledger config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the minimum seconds between step inserts
    #[arg(long, global = true)]
    pub cooldown_secs: Option<u64>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an experiment owned by the caller
    CreateExperiment { name: String },

    /// Append a step to one of the caller's experiments
    AddStep {
        experiment_id: ExperimentId,
        title: String,
        content: String,
        /// Mark the content as ciphertext
        #[arg(long)]
        encrypted: bool,
    },

    /// Overwrite a step's title, content and encryption flag
    UpdateStep {
        step_id: StepId,
        title: String,
        content: String,
        #[arg(long)]
        encrypted: bool,
    },

    /// Flip a step's encryption flag
    ToggleEncryption { step_id: StepId },

    /// Delete a step
    DeleteStep { step_id: StepId },

    /// Show one experiment
    Experiment { experiment_id: ExperimentId },

    /// Show one step
    Step { step_id: StepId },

    /// Show several steps; fails if any is missing
    StepsBatch {
        #[arg(required = true)]
        step_ids: Vec<StepId>,
    },

    /// List live step ids of an experiment
    StepIds { experiment_id: ExperimentId },

    /// List live steps of an experiment
    Steps { experiment_id: ExperimentId },

    /// List experiments owned by a principal (defaults to the caller)
    Owned { owner: Option<String> },

    /// Show experiment and step counters
    Counts,

    /// Display version information
    Version,
}

#[derive(Serialize)]
struct MutationOutput<T: Serialize> {
    result: T,
    events: Vec<LedgerEvent>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Counts {
    experiment_count: u64,
    step_count: u64,
}

pub fn execute(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("explog {}", env!("CARGO_PKG_VERSION"));
        println!("explog_core {} ({})", core_version(), ping());
        return Ok(());
    }

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let config = load_config(&cli)?;
    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open ledger at {}", cli.db.display()))?;
    let mut ledger = LedgerService::new(SqliteLedgerRepository::new(&conn), config);
    info!(
        "event=cli_command module=cli status=start db={} cooldown_secs={}",
        cli.db.display(),
        config.step_cooldown_secs
    );

    match &cli.command {
        Commands::CreateExperiment { name } => {
            let caller = require_caller(&cli)?;
            let id = ledger.create_experiment(&caller, name)?;
            print_mutation(id, ledger.take_events())
        }
        Commands::AddStep {
            experiment_id,
            title,
            content,
            encrypted,
        } => {
            let caller = require_caller(&cli)?;
            let draft = StepDraft::new(title.as_str(), content.as_str(), *encrypted);
            let id = ledger.add_step(&caller, *experiment_id, &draft)?;
            print_mutation(id, ledger.take_events())
        }
        Commands::UpdateStep {
            step_id,
            title,
            content,
            encrypted,
        } => {
            let caller = require_caller(&cli)?;
            let draft = StepDraft::new(title.as_str(), content.as_str(), *encrypted);
            ledger.update_step(&caller, *step_id, &draft)?;
            print_mutation((), ledger.take_events())
        }
        Commands::ToggleEncryption { step_id } => {
            let caller = require_caller(&cli)?;
            let encrypted = ledger.toggle_step_encryption(&caller, *step_id)?;
            print_mutation(encrypted, ledger.take_events())
        }
        Commands::DeleteStep { step_id } => {
            let caller = require_caller(&cli)?;
            ledger.delete_step(&caller, *step_id)?;
            print_mutation((), ledger.take_events())
        }
        Commands::Experiment { experiment_id } => {
            print_json(&ledger.get_experiment(*experiment_id)?)
        }
        Commands::Step { step_id } => print_json(&ledger.get_step(*step_id)?),
        Commands::StepsBatch { step_ids } => print_json(&ledger.get_steps_batch(step_ids)?),
        Commands::StepIds { experiment_id } => {
            print_json(&ledger.get_experiment_step_ids(*experiment_id)?)
        }
        Commands::Steps { experiment_id } => {
            print_json(&ledger.get_experiment_steps(*experiment_id)?)
        }
        Commands::Owned { owner } => {
            let owner = match owner {
                Some(value) => Principal::new(value.as_str())?,
                None => require_caller(&cli)?,
            };
            print_json(&ledger.list_experiments_by_owner(&owner)?)
        }
        Commands::Counts => print_json(&Counts {
            experiment_count: ledger.experiment_count()?,
            step_count: ledger.step_count()?,
        }),
        Commands::Version => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<LedgerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            LedgerConfig::from_json_str(&raw)?
        }
        None => LedgerConfig::default(),
    };
    if let Some(secs) = cli.cooldown_secs {
        config = config.with_step_cooldown_secs(secs);
    }
    Ok(config)
}

fn require_caller(cli: &Cli) -> Result<Principal> {
    let raw = cli
        .caller
        .as_deref()
        .context("--caller is required for this command")?;
    Ok(Principal::new(raw)?)
}

fn print_mutation<T: Serialize>(result: T, events: Vec<LedgerEvent>) -> Result<()> {
    print_json(&MutationOutput { result, events })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
