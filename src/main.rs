use std::{
    fs,
    path::{Path, PathBuf},
};

use chef_core::emission::EmissionSchedule;
use chef_core::vesting::Grant;
use chef_core::{Amount, BlockNumber, ChefError};
use clap::{Parser, Subcommand};
use serde::Serialize;

mod deploy;
mod ledger;
mod scenario;
mod verify;

use deploy::{run_plan, DeployError, DeployPlan, DryRunDeployer};
use scenario::{Scenario, ScenarioError};
use verify::{replay, OutboxVerifier, VerificationQueue, VerifyError};

#[derive(Parser)]
#[command(name = "cubchef", version, about = "Reward vesting, deployment and verification tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Locked and unlocked split of a single grant at a block
    Quote {
        #[arg(long)]
        amount: Amount,
        #[arg(long)]
        start: BlockNumber,
        #[arg(long)]
        end: BlockNumber,
        #[arg(long)]
        block: BlockNumber,
        #[arg(long, default_value_t = 0)]
        claimed: Amount,
        /// Print the quote as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a deployment plan offline and queue the contracts for verification
    Deploy {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long, default_value = "verify.json")]
        queue: PathBuf,
        /// Keep the entries already in the queue file
        #[arg(long)]
        append: bool,
        /// Write the id -> address map here
        #[arg(long)]
        addresses: Option<PathBuf>,
        /// Write every deploy and call the plan issued here
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Submit every queued contract for source verification
    Verify {
        #[arg(long, default_value = "verify.json")]
        queue: PathBuf,
        #[arg(long, default_value = "verify-outbox.jsonl")]
        outbox: PathBuf,
        #[arg(long, default_value = "polygon")]
        network: String,
    },
    /// Replay a reward scenario against a fresh chef
    Simulate {
        #[arg(long)]
        scenario: PathBuf,
        /// Write the final chef and token state here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Emission rate of a stepped schedule
    Emission {
        #[arg(long)]
        start_block: BlockNumber,
        #[arg(long, value_delimiter = ',', required = true)]
        rates: Vec<Amount>,
        #[arg(long, value_delimiter = ',', required = true)]
        offsets: Vec<BlockNumber>,
        #[arg(long)]
        block: BlockNumber,
        /// Also print the total emitted from `start_block` up to `block`
        #[arg(long)]
        total: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Chef(#[from] ChefError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("grant end block {end} is before its start {start}")]
    GrantWindow { start: BlockNumber, end: BlockNumber },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn quote_cmd(
    amount: Amount,
    start: BlockNumber,
    end: BlockNumber,
    block: BlockNumber,
    claimed: Amount,
    json: bool,
) -> Result<(), CliError> {
    if end < start {
        return Err(CliError::GrantWindow { start, end });
    }
    let grant = Grant {
        claimed,
        ..Grant::new(amount, start, end)
    };
    let quote = grant.quote(block);
    if json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        println!("locked:   {}", quote.locked);
        println!("unlocked: {}", quote.unlocked);
        println!("claimed:  {}", quote.claimed);
    }
    Ok(())
}

fn deploy_cmd(
    plan_path: &Path,
    queue_path: &Path,
    append: bool,
    addresses: Option<&Path>,
    transcript: Option<&Path>,
) -> Result<(), CliError> {
    let plan = DeployPlan::load(plan_path)?;
    let mut queue = if append && queue_path.exists() {
        VerificationQueue::load(queue_path)?
    } else {
        VerificationQueue::new()
    };
    let mut deployer = DryRunDeployer::new(&plan.deployer);
    println!("Deploying {} steps to {} as {}", plan.steps.len(), plan.network, plan.deployer);

    let result = run_plan(&plan, &mut deployer, &mut queue, Some(queue_path));
    if let Some(path) = transcript {
        write_json(path, &deployer.transcript())?;
    }
    let report = result?;
    if let Some(path) = addresses {
        write_json(path, &report.addresses)?;
    }
    println!(
        "Deployed {} contracts, {} calls; {} queued in {}",
        report.addresses.len(),
        report.calls,
        queue.len(),
        queue_path.display()
    );
    Ok(())
}

fn verify_cmd(queue_path: &Path, outbox: &Path, network: &str) -> Result<(), CliError> {
    let queue = VerificationQueue::load(queue_path)?;
    let mut verifier = OutboxVerifier::open(outbox, network)?;
    let report = replay(&queue, &mut verifier);
    println!(
        "verify: {} submitted, {} already verified, {} failed",
        report.verified.len(),
        report.already_verified.len(),
        report.failed.len()
    );
    Ok(())
}

fn simulate_cmd(path: &Path, report_path: Option<&Path>) -> Result<(), CliError> {
    let scenario = Scenario::load(path)?;
    let report = scenario::run(&scenario)?;
    println!(
        "simulate: {} steps, final block {}, {} claims, supply {}",
        report.steps_run,
        report.final_block,
        report.claims.len(),
        report.ledger.meta.total_supply
    );
    if let Some(out) = report_path {
        write_json(out, &report)?;
    }
    Ok(())
}

fn emission_cmd(
    start_block: BlockNumber,
    rates: &[Amount],
    offsets: &[BlockNumber],
    block: BlockNumber,
    total: bool,
) -> Result<(), CliError> {
    let schedule = EmissionSchedule::new(start_block, rates, offsets)?;
    println!("tokens per block at {block}: {}", schedule.rate_at(block));
    if total {
        println!(
            "emitted {start_block}..{block}: {}",
            schedule.emitted_between(start_block, block)?
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Quote {
            amount,
            start,
            end,
            block,
            claimed,
            json,
        } => quote_cmd(amount, start, end, block, claimed, json),
        Command::Deploy {
            plan,
            queue,
            append,
            addresses,
            transcript,
        } => deploy_cmd(&plan, &queue, append, addresses.as_deref(), transcript.as_deref()),
        Command::Verify {
            queue,
            outbox,
            network,
        } => verify_cmd(&queue, &outbox, &network),
        Command::Simulate { scenario, report } => simulate_cmd(&scenario, report.as_deref()),
        Command::Emission {
            start_block,
            rates,
            offsets,
            block,
            total,
        } => emission_cmd(start_block, &rates, &offsets, block, total),
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
