mod adapters;
mod classifiers;
mod config;
mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tokio::sync::Mutex;

use roll_core::{ExportFormat, export};
use roll_engine::SessionManager;
use roll_store::Store;

use crate::adapters::{SharedStore, StoreRosterSource, StoreSubmissionSink};
use crate::config::{RollConfig, config_path};

#[derive(Parser)]
#[command(name = "roll", about = "Attendance session CLI and MCP server")]
struct Cli {
    /// Override the data directory (default: $ROLL_DATA_DIR or ~/.roll)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Import classes, sections and students from a roster TOML file
    Seed {
        /// Roster file
        file: PathBuf,
    },

    /// List known class sections
    Sections,

    /// List the students enrolled in a section, in roster order
    Students {
        #[arg(long = "class")]
        class_id: String,
        #[arg(long = "section")]
        section_id: String,
    },

    /// List submitted attendance
    Submissions,

    /// Export a submitted roster
    Export {
        #[arg(long = "class")]
        class_id: String,
        #[arg(long = "section")]
        section_id: String,
        /// Session date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// json or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn data_dir(cli: &Cli) -> PathBuf {
    roll_store::resolve_base_dir(cli.data_dir.as_deref())
}

fn open_store(cli: &Cli) -> Result<Store> {
    let base = data_dir(cli);
    Store::open_in_dir(&base)
        .with_context(|| format!("failed to open store in {}", base.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Seed { file } => cmd_seed(&cli, file),
        Commands::Sections => cmd_sections(&cli),
        Commands::Students {
            class_id,
            section_id,
        } => cmd_students(&cli, class_id, section_id),
        Commands::Submissions => cmd_submissions(&cli),
        Commands::Export {
            class_id,
            section_id,
            date,
            format,
            out,
        } => cmd_export(&cli, class_id, section_id, *date, *format, out.as_deref()),
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let base = data_dir(cli);
    let config = RollConfig::load(&config_path(cli.config.as_deref(), &base))?;
    let store: SharedStore = Arc::new(Mutex::new(open_store(cli)?));
    let classifiers = classifiers::build_classifiers(&config)?;

    let engine = SessionManager::new(
        Arc::new(StoreRosterSource::new(store.clone())),
        classifiers,
        Arc::new(StoreSubmissionSink::new(store)),
        config.engine.clone(),
    );
    tracing::info!("starting MCP server with data in {}", base.display());

    let service = server::RollServer::new(engine)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;

    tokio::select! {
        quit = service.waiting() => {
            quit.context("MCP server task failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }
    Ok(())
}

fn cmd_seed(cli: &Cli, file: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let summary = store
        .import_roster_file(file)
        .with_context(|| format!("failed to import {}", file.display()))?;
    println!(
        "imported {} classes, {} sections, {} enrollments",
        summary.classes, summary.sections, summary.enrollments
    );
    Ok(())
}

fn cmd_sections(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let sections = store.list_sections().context("failed to list sections")?;
    if sections.is_empty() {
        println!("(no sections)");
    }
    for s in sections {
        println!(
            "{}/{}  {} - {}  ({} students)",
            s.class_id, s.section_id, s.class_name, s.section_name, s.students
        );
    }
    Ok(())
}

fn cmd_students(cli: &Cli, class_id: &str, section_id: &str) -> Result<()> {
    let store = open_store(cli)?;
    let roster = store
        .list_students(class_id, section_id)
        .context("failed to list students")?;
    println!("{} - {}", roster.class_name, roster.section_name);
    for student in &roster.students {
        println!(
            "{:<8}  {:<8}  {}",
            student.roll_number, student.id, student.display_name
        );
    }
    Ok(())
}

fn cmd_submissions(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let submissions = store
        .list_submissions()
        .context("failed to list submissions")?;
    if submissions.is_empty() {
        println!("(no submissions)");
    }
    for s in submissions {
        println!(
            "{}  {}/{}  present={} absent={}  submitted {}",
            s.date, s.class_id, s.section_id, s.present, s.absent, s.submitted_at
        );
    }
    Ok(())
}

fn cmd_export(
    cli: &Cli,
    class_id: &str,
    section_id: &str,
    date: NaiveDate,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<()> {
    let store = open_store(cli)?;
    let snapshot = store
        .load_submission(class_id, section_id, date)
        .context("failed to load submission")?;
    let text = export(&snapshot, format).context("failed to serialize export")?;

    match out {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("exported to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
