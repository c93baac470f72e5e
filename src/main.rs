//! lxz - Linux hardware analyzer.
//!
//! Inspects CPU, memory, storage, GPU, motherboard and sensor state from
//! /proc, /sys and optional diagnostic tools, and exports the inventory as
//! JSON or a plain-text report. Runs an interactive menu when invoked with
//! no subcommand.

mod config;
mod display;
mod hardware;
mod probe;
mod report;
mod units;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::hardware::{
    CpuReader, GpuReader, MemoryReader, SensorReader, Snapshot, StorageReader,
};

/// Linux hardware analyzer
#[derive(Parser)]
#[command(name = "lxz")]
#[command(version)]
#[command(about = "Inspect and export CPU, memory, storage, GPU and sensor information")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show CPU information
    Cpu,
    /// Show memory and swap information
    Memory,
    /// Show storage devices and partitions
    Storage,
    /// Show GPU information
    Gpu,
    /// Show motherboard and BIOS information
    Board,
    /// Show temperature, fan and battery readings
    Sensors,
    /// Show a compact overview of every domain
    Overview,
    /// Export the full inventory to a report file
    Export {
        /// Report format (defaults to the configured format, else both)
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Directory to write the report into (defaults to home)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Txt,
    Both,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|err| {
        warn!(%err, "falling back to default config");
        Config::default()
    });

    if unsafe { libc::geteuid() } != 0 {
        eprintln!(
            "{}",
            "Warning: running without root privileges, some information may be limited.".yellow()
        );
    }

    match cli.command {
        Some(Commands::Cpu) => display::print_cpu(&CpuReader::new().collect()),
        Some(Commands::Memory) => display::print_memory(&MemoryReader::new().collect()),
        Some(Commands::Storage) => display::print_storage(&StorageReader::new().collect()),
        Some(Commands::Gpu) => display::print_gpu(&GpuReader::new().collect()),
        Some(Commands::Board) => display::print_board(&MemoryReader::new().motherboard()),
        Some(Commands::Sensors) => display::print_sensors(&SensorReader::new().collect()),
        Some(Commands::Overview) => display::print_overview(&Snapshot::collect()),
        Some(Commands::Export { format, output }) => {
            let format = resolve_format(format, &config);
            let dir = output.unwrap_or_else(|| config.export_dir());
            run_export(format, &dir)?;
        }
        None => run_menu(&config),
    }

    Ok(())
}

/// Explicit flag wins, then the configured default, then both formats.
fn resolve_format(flag: Option<ExportFormat>, config: &Config) -> ExportFormat {
    if let Some(format) = flag {
        return format;
    }
    match config.export.format.as_deref() {
        Some("json") => ExportFormat::Json,
        Some("txt") => ExportFormat::Txt,
        _ => ExportFormat::Both,
    }
}

fn run_export(format: ExportFormat, dir: &Path) -> Result<()> {
    println!("{}", "Collecting system information...".cyan());
    let snapshot = Snapshot::collect();

    if matches!(format, ExportFormat::Json | ExportFormat::Both) {
        let path = report::export_json(&snapshot, dir)?;
        println!(
            "{} JSON report exported to: {}",
            "✓".green(),
            path.display().to_string().bold()
        );
    }
    if matches!(format, ExportFormat::Txt | ExportFormat::Both) {
        let path = report::export_txt(&snapshot, dir)?;
        println!(
            "{} TXT report exported to: {}",
            "✓".green(),
            path.display().to_string().bold()
        );
    }
    Ok(())
}

/// The interactive numbered menu. Re-prompts on invalid input and exits
/// cleanly on "0".
fn run_menu(config: &Config) {
    display::print_banner();
    loop {
        display::print_menu();
        print!("{} ", "Select an option:".bold().yellow());
        let _ = io::stdout().flush();

        match read_line().as_str() {
            "1" => display::print_cpu(&CpuReader::new().collect()),
            "2" => display::print_memory(&MemoryReader::new().collect()),
            "3" => display::print_storage(&StorageReader::new().collect()),
            "4" => display::print_gpu(&GpuReader::new().collect()),
            "5" => display::print_board(&MemoryReader::new().motherboard()),
            "6" => display::print_sensors(&SensorReader::new().collect()),
            "7" => display::print_overview(&Snapshot::collect()),
            "8" => export_menu(config),
            "0" | "" => {
                println!("\n{}", "Thank you for using lxz. Goodbye!".bright_cyan());
                return;
            }
            _ => {
                println!("{}", "Invalid option. Please try again.".red());
            }
        }
        pause();
    }
}

fn export_menu(config: &Config) {
    println!("{}", "Export Options:".bold().cyan());
    println!("  [{}] Export as JSON", "1".yellow());
    println!("  [{}] Export as TXT", "2".yellow());
    println!("  [{}] Export both formats", "3".yellow());
    println!("  [{}] Cancel", "0".yellow());
    print!("{} ", "Select option:".bold().yellow());
    let _ = io::stdout().flush();

    let format = match read_line().as_str() {
        "1" => ExportFormat::Json,
        "2" => ExportFormat::Txt,
        "3" => ExportFormat::Both,
        _ => return,
    };

    if let Err(err) = run_export(format, &config.export_dir()) {
        println!("{} {err:#}", "Export failed:".red());
    }
}

fn pause() {
    print!("\n{}", "Press Enter to continue...".dimmed());
    let _ = io::stdout().flush();
    let _ = read_line();
}

fn read_line() -> String {
    let mut input = String::new();
    let _ = io::stdin().lock().read_line(&mut input);
    input.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_domain_subcommands() {
        let cli = Cli::parse_from(["lxz", "cpu"]);
        assert!(matches!(cli.command, Some(Commands::Cpu)));

        let cli = Cli::parse_from(["lxz", "export", "--format", "json"]);
        match cli.command {
            Some(Commands::Export { format, output }) => {
                assert_eq!(format, Some(ExportFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected export subcommand"),
        }
    }

    #[test]
    fn format_resolution_precedence() {
        let mut config = Config::default();
        assert_eq!(resolve_format(None, &config), ExportFormat::Both);

        config.export.format = Some("json".to_string());
        assert_eq!(resolve_format(None, &config), ExportFormat::Json);
        assert_eq!(
            resolve_format(Some(ExportFormat::Txt), &config),
            ExportFormat::Txt
        );

        config.export.format = Some("yaml".to_string());
        assert_eq!(resolve_format(None, &config), ExportFormat::Both);
    }
}
