use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use secure_erase::progress::{board, read_status_file, StatusMirror};
use secure_erase::ui::{status_line, ProgressView};
use secure_erase::wipe_orchestrator::{LogEntry, Severity};
use secure_erase::*;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Exit status for a session stopped by the operator (128 + SIGINT)
const EXIT_CANCELLED: u8 = 130;

const RENDER_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "secure-erase")]
#[command(about = "Standards-driven overwrite erasure of physical storage devices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); defaults to the per-user config file
    #[arg(long, global = true, env = "SECURE_ERASE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Erase a device according to a standard
    Erase {
        /// Device path (e.g. /dev/sdb or \\.\PhysicalDrive2)
        device: PathBuf,

        /// Erase standard (BSI_VS_A, NIST_800_88, DOD_5220_22_M)
        #[arg(short, long, default_value = "NIST_800_88")]
        standard: StandardId,

        /// Disk number used by the fallback utility, if it cannot be inferred from the path
        #[arg(long)]
        disk_number: Option<u32>,

        /// Expected device size in bytes, used for fallback estimates
        #[arg(long)]
        size_hint: Option<u64>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        serial: Option<String>,

        /// Write the session report (JSON) to this path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Mirror live progress into this JSON file
        #[arg(long)]
        status_file: Option<PathBuf>,

        /// Never hand the device to the external wipe utility
        #[arg(long)]
        no_fallback: bool,

        /// Confirm that the device may be destroyed
        #[arg(short, long)]
        yes: bool,
    },

    /// List the supported erase standards
    Standards,

    /// Show a progress status file written by a running session
    Status {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = secure_erase::logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Erase {
            device,
            standard,
            disk_number,
            size_hint,
            model,
            serial,
            report,
            status_file,
            no_fallback,
            yes,
        } => {
            let mut identity = DeviceIdentity::new(device);
            if let Some(number) = disk_number {
                identity = identity.with_disk_number(number);
            }
            if let Some(bytes) = size_hint {
                identity = identity.with_size_hint(bytes);
            }
            if let Some(model) = model {
                identity = identity.with_model(model);
            }
            if let Some(serial) = serial {
                identity = identity.with_serial(serial);
            }

            let mut config = config;
            if no_fallback {
                config.fallback.enabled = false;
            }
            if status_file.is_some() {
                config.status.file = status_file;
            }

            if !yes {
                refuse_without_confirmation(&identity, standard);
                return Ok(ExitCode::FAILURE);
            }

            erase(identity, standard, config, report).await
        }
        Commands::Standards => {
            list_standards();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { file } => {
            show_status(&file)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn refuse_without_confirmation(device: &DeviceIdentity, standard: StandardId) {
    let definition = standard.definition();
    eprintln!(
        "{} {}",
        "WARNING:".red().bold(),
        format!("all data on {} would be destroyed.", device.label()).as_str().bold()
    );
    eprintln!(
        "Standard: {} ({} pass(es){})",
        definition.name,
        definition.write_pass_count(),
        if definition.verify { ", verified" } else { "" }
    );
    eprintln!("Re-run with --yes to erase the device.");
}

async fn erase(
    device: DeviceIdentity,
    standard: StandardId,
    config: EngineConfig,
    report_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let channel = board().register(&device, config.sector_size);
    let mirror = config
        .status
        .file
        .clone()
        .map(|path| StatusMirror::spawn(channel.clone(), path, config.status.interval()));

    let session = EraseSession::new(device.clone(), standard, config).with_channel(channel.clone());
    setup_signal_handlers(session.cancel_token())?;

    println!(
        "\n{} {} with {}",
        "Erasing".bold(),
        device.label(),
        standard.definition().name
    );

    let mut view = if io::stderr().is_terminal() {
        ProgressView::new()
    } else {
        ProgressView::hidden()
    };

    let mut task = tokio::task::spawn_blocking(move || session.run());
    let mut ticker = tokio::time::interval(RENDER_INTERVAL);
    let report = loop {
        tokio::select! {
            joined = &mut task => break joined.context("Erase session panicked")?,
            _ = ticker.tick() => view.render(&channel.snapshot()),
        }
    };
    view.finish(&channel.snapshot());

    if let Some(mirror) = mirror {
        mirror.shutdown().await;
    }

    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("\nReport saved to: {}", path.display());
    }

    Ok(match report.outcome {
        SessionOutcome::Erased => ExitCode::SUCCESS,
        SessionOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        SessionOutcome::Failed => ExitCode::FAILURE,
    })
}

fn print_report(report: &SessionReport) {
    println!("\n{}", "=".repeat(70));
    println!("{}", "Session log".bold());
    for entry in &report.log {
        println!("  {}", format_entry(entry));
    }

    println!("{}", "=".repeat(70));
    let outcome = match report.outcome {
        SessionOutcome::Erased => "ERASED".green().bold(),
        SessionOutcome::Cancelled => "CANCELLED".yellow().bold(),
        SessionOutcome::Failed => "FAILED".red().bold(),
    };
    println!("Outcome:      {}", outcome);
    println!("Method:       {}", report.method);
    println!("Passes:       {}/{}", report.passes_completed, report.passes_required);
    println!("Duration:     {:.1}s", report.duration_seconds);
    println!("Compliance:   {}", report.compliance.conformity);
    println!("              {}", report.compliance.summary);
    println!("Fingerprint:  {}", report.fingerprint);
}

fn format_entry(entry: &LogEntry) -> String {
    let kind = format!("{:<15}", entry.kind.to_string());
    let kind = match entry.severity {
        Severity::Info => kind.as_str().normal(),
        Severity::Success => kind.as_str().green(),
        Severity::Warning => kind.as_str().yellow(),
        Severity::Error => kind.as_str().red(),
    };
    format!("{} {} {}", entry.timestamp.format("%H:%M:%S"), kind, entry.message)
}

fn list_standards() {
    println!("\n{}", "SUPPORTED ERASE STANDARDS".bold());
    for definition in algorithms::CATALOG.iter() {
        println!("\n  {} ({})", definition.name.bold(), definition.id);
        println!("    {}", definition.description);
        let patterns: Vec<String> = definition.write_patterns().map(|p| p.label()).collect();
        println!(
            "    Passes: {} [{}]{}",
            definition.write_pass_count(),
            patterns.join(", "),
            if definition.verify { ", verified" } else { "" }
        );
        println!("    Mandatory for: {}", definition.mandatory_for);
        for requirement in definition.requirements {
            println!("      - {}", requirement);
        }
    }
}

fn show_status(file: &std::path::Path) -> Result<()> {
    let state = read_status_file(file).with_context(|| format!("Failed to read {}", file.display()))?;
    println!(
        "{} {} ({}, serial {}, {:.1} GB)",
        "Device:".bold(),
        state.disk.path,
        state.disk.model,
        state.disk.serial,
        state.disk.capacity_gb
    );
    if !state.current_operation.operation.is_empty() {
        println!("{} {}", "Operation:".bold(), state.current_operation.operation);
    }
    println!("{} {}", "Progress:".bold(), status_line(&state));
    println!("{} {}", "Updated:".bold(), state.timestamp.to_rfc3339());
    Ok(())
}

#[cfg(unix)]
fn setup_signal_handlers(cancel: CancelToken) -> Result<()> {
    use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            eprintln!("\n\nInterrupt received! Stopping erase operation...");
            eprintln!("   Please wait for the current chunk to finish writing...");
            cancel.cancel();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(cancel: CancelToken) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n\nInterrupt received! Stopping erase operation...");
            cancel.cancel();
        }
    });
    Ok(())
}
