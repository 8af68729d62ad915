use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;
use txseq_sequence::{SequenceManager, SequenceStatus};
use txseq_types::{NodeId, TransactionId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(args, cli.format),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::Diff(args) => cmd_diff(args, cli.format),
    }
}

fn cmd_init(args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    if args.out.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.out.display());
    }
    let owner = NodeId::new(args.owner).context("invalid owner")?;
    let status = SequenceStatus::empty(owner, args.capacity).context("invalid capacity")?;
    write_status(&args.out, &status)?;

    match format {
        OutputFormat::Text => {
            println!(
                "{} Wrote empty status for {} ({} slots) to {}",
                "✓".green().bold(),
                status.owner().to_string().cyan(),
                status.capacity(),
                args.out.display().to_string().bold()
            );
        }
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "path": args.out,
                    "owner": status.owner(),
                    "capacity": status.capacity(),
                })
            );
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let bytes = fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let status = SequenceStatus::read(&bytes)
        .with_context(|| format!("decoding {}", args.file.display()))?;
    let active = active_slots(&status);

    match format {
        OutputFormat::Text => {
            println!("Owner:     {}", status.owner().to_string().cyan().bold());
            println!("Capacity:  {}", status.capacity());
            println!("Confirmed: {}", status.total_confirmed());
            if active.is_empty() {
                println!("\nNo transactions confirmed.");
            } else {
                println!("\n{:>10}  {}", "position".dimmed(), "sequence".dimmed());
                for (position, sequence) in &active {
                    println!("{position:>10}  {}", sequence.to_string().yellow());
                }
            }
            if args.hex {
                println!("\n{}", hex::encode(&bytes));
            }
        }
        OutputFormat::Json => {
            let slots: Vec<_> = active
                .iter()
                .map(|(position, sequence)| json!({ "position": position, "sequence": sequence }))
                .collect();
            let mut out = json!({
                "owner": status.owner(),
                "capacity": status.capacity(),
                "total_confirmed": status.total_confirmed(),
                "slots": slots,
            });
            if args.hex {
                out["hex"] = json!(hex::encode(&bytes));
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let local = load_status(&args.local)?;
    let remote = load_status(&args.remote)?;
    let missing = missing_ids(&local, &remote)?;

    match format {
        OutputFormat::Text => {
            if missing.is_empty() {
                println!(
                    "{} {} is up to date with {}",
                    "✓".green().bold(),
                    args.local.display(),
                    args.remote.display()
                );
            } else {
                println!(
                    "{} transaction(s) missing from {}:",
                    missing.len().to_string().red().bold(),
                    args.local.display()
                );
                for id in &missing {
                    println!("  {}", id.to_string().yellow());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&missing)?);
        }
    }
    Ok(())
}

fn load_status(path: &Path) -> anyhow::Result<SequenceStatus> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    SequenceStatus::read(&bytes).with_context(|| format!("decoding {}", path.display()))
}

fn write_status(path: &Path, status: &SequenceStatus) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, status.store()).with_context(|| format!("writing {}", path.display()))
}

/// Ids `remote` has confirmed that `local` has not.
fn missing_ids(
    local: &SequenceStatus,
    remote: &SequenceStatus,
) -> anyhow::Result<Vec<TransactionId>> {
    let manager = SequenceManager::new(local.owner().clone(), local.capacity())?;
    manager.fill(local)?;
    let missing = manager
        .check_self_status(remote)
        .context("comparing snapshots")?;
    debug!(missing = missing.len(), "diff computed");
    Ok(missing)
}

/// `(position, sequence)` of every slot with at least one confirmation.
fn active_slots(status: &SequenceStatus) -> Vec<(usize, u64)> {
    status
        .slots()
        .iter()
        .enumerate()
        .filter(|(_, &sequence)| sequence > 0)
        .map(|(position, &sequence)| (position, sequence))
        .collect()
}
