//! Trickle command-line tool.
//!
//! Queries the emission schedule and replays distributor scenarios against an
//! in-memory ledger. Results are printed as JSON on stdout; logs go to stderr.

mod config;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use trickle_core::types::{AccountId, Amount, Step};
use trickle_schedule::EmissionSchedule;

use crate::config::{Scenario, ScheduleArgs};

/// Trickle emission and staking tool.
#[derive(Parser, Debug)]
#[command(name = "trickle-cli", version, about = "Trickle emission schedule and pool simulator")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Emission rate in force at a step.
    Rate {
        /// Step to query
        #[arg(long)]
        step: Step,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Total emission over the step range (from, to].
    Emission {
        #[arg(long)]
        from: Step,

        #[arg(long)]
        to: Step,

        /// Current step; defaults to `to`
        #[arg(long)]
        current: Option<Step>,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Per-epoch rate table.
    Table {
        /// Number of epochs to list
        #[arg(long, default_value_t = 10)]
        epochs: u64,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Replay a scenario file and print the final balances.
    Simulate {
        /// Scenario file (.json, .toml or .yaml)
        file: PathBuf,

        /// Include the distributor's events in the report
        #[arg(long)]
        events: bool,

        /// Write the final distributor state (bincode) to this path
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct RateReport {
    step: Step,
    epoch: u64,
    rate: Amount,
    /// `None` once the rate no longer changes.
    steps_until_decay: Option<u64>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct EmissionReport {
    from: Step,
    to: Step,
    current: Step,
    emission: Amount,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct EpochRow {
    epoch: u64,
    /// `None` when decay is disabled and epoch 0 never ends.
    last_step: Option<Step>,
    rate: Amount,
    /// Emission over one full period at this rate.
    period_emission: Option<Amount>,
}

fn schedule(args: &ScheduleArgs) -> Result<EmissionSchedule> {
    EmissionSchedule::new(AccountId::ZERO, args.params()).context("invalid schedule parameters")
}

fn rate_report(schedule: &EmissionSchedule, step: Step) -> Result<RateReport> {
    Ok(RateReport {
        step,
        epoch: schedule.epoch(step),
        rate: schedule.rate_at(step)?,
        steps_until_decay: schedule.steps_until_decay(step)?,
    })
}

fn emission_report(
    schedule: &EmissionSchedule,
    from: Step,
    to: Step,
    current: Option<Step>,
) -> Result<EmissionReport> {
    let current = current.unwrap_or(to);
    let emission = schedule
        .cumulative_emission(from, to, current)
        .with_context(|| format!("cannot compute emission over ({from}, {to}]"))?;
    Ok(EmissionReport {
        from,
        to,
        current,
        emission,
    })
}

/// Rows stop early once the rate reaches zero.
fn epoch_table(schedule: &EmissionSchedule, epochs: u64) -> Result<Vec<EpochRow>> {
    let period = schedule.params().period_length;
    let mut rows = Vec::new();
    for epoch in 0..epochs {
        let rate = schedule.rate_for_epoch(epoch)?;
        let period_emission = (period > 0)
            .then(|| rate.checked_mul(Amount::from(period)))
            .flatten();
        rows.push(EpochRow {
            epoch,
            last_step: schedule.epoch_last_step(epoch),
            rate,
            period_emission,
        });
        if rate == 0 || period == 0 {
            break;
        }
    }
    Ok(rows)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Rate { step, schedule: args } => {
            print_json(&rate_report(&schedule(&args)?, step)?)?;
        }
        Commands::Emission {
            from,
            to,
            current,
            schedule: args,
        } => {
            print_json(&emission_report(&schedule(&args)?, from, to, current)?)?;
        }
        Commands::Table {
            epochs,
            schedule: args,
        } => {
            print_json(&epoch_table(&schedule(&args)?, epochs)?)?;
        }
        Commands::Simulate {
            file,
            events,
            state_out,
        } => {
            let loaded = Scenario::load(&file)?;
            let report = scenario::run(&loaded, events)?;
            if let Some(path) = state_out {
                std::fs::write(&path, &report.state)
                    .with_context(|| format!("failed to write state to {}", path.display()))?;
                info!(path = %path.display(), bytes = report.state.len(), "state written");
            }
            print_json(&report)?;
            if report.failed > 0 {
                info!(failed = report.failed, "some actions failed");
            }
        }
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs are written to stderr so stdout carries only the JSON result. Pass
/// `format = "json"` for structured output.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
