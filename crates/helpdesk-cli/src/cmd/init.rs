use super::Session;
use crate::output::{CliError, render_mode};
use anyhow::Context as _;
use clap::Args;
use helpdesk_core::SqliteStore;
use helpdesk_core::config::{self, DATABASE_FILE, PROJECT_DIR};
use helpdesk_core::db::migrations::LATEST_SCHEMA_VERSION;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-run initialization even if `.helpdesk/` already exists. Existing
    /// tickets and config are kept; missing pieces are recreated.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "helpdesk.sqlite3\nhelpdesk.sqlite3-wal\nhelpdesk.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    path: String,
    config_written: bool,
    schema_version: u32,
}

/// Execute `hd init`. Creates the project skeleton:
///
/// ```text
/// .helpdesk/
///   config.toml        (limits, default priority, staff members)
///   helpdesk.sqlite3   (ticket store, migrated to the latest schema)
///   .gitignore         (the database and its WAL files)
/// ```
///
/// # Errors
///
/// Returns an error if `.helpdesk/` already exists and `--force` is not set,
/// or if any filesystem or database step fails.
pub fn run_init(args: &InitArgs, session: &Session<'_>) -> anyhow::Result<()> {
    let helpdesk_dir = session.project_root.join(PROJECT_DIR);

    if helpdesk_dir.exists() && !args.force {
        return Err(CliError {
            message: format!("{PROJECT_DIR}/ already exists"),
            suggestion: Some("Use `hd init --force` to repair a partial setup.".to_string()),
            error_code: None,
        }
        .into());
    }

    let config_written = config::write_default_project_config(session.project_root)?;
    init_store(&helpdesk_dir)?;

    let gitignore_path = helpdesk_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, GITIGNORE).with_context(|| {
            format!("Failed to write .gitignore: {}", gitignore_path.display())
        })?;
    }
    info!(path = %helpdesk_dir.display(), config_written, "project initialized");

    let result = InitOutput {
        ok: true,
        path: helpdesk_dir.display().to_string(),
        config_written,
        schema_version: LATEST_SCHEMA_VERSION,
    };
    let human = |r: &InitOutput, w: &mut dyn Write| -> std::io::Result<()> {
        if session.quiet {
            return Ok(());
        }
        writeln!(w, "✓ Initialized {PROJECT_DIR}/ in {}", session.project_root.display())?;
        writeln!(w)?;
        if r.config_written {
            writeln!(w, "  Config:   {PROJECT_DIR}/config.toml (new)")?;
        } else {
            writeln!(w, "  Config:   {PROJECT_DIR}/config.toml (kept)")?;
        }
        writeln!(w, "  Database: {PROJECT_DIR}/{DATABASE_FILE} (schema v{})", r.schema_version)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  List staff ids under [staff] members in the config.")?;
        writeln!(w, "  Set your identity: export HELPDESK_ACTOR=your-name")?;
        writeln!(w, "  File a ticket:     hd create --topic \"...\" --description \"...\"")
    };
    render_mode(session.output, &result, human, human)
}

fn init_store(helpdesk_dir: &Path) -> anyhow::Result<()> {
    let db_path = helpdesk_dir.join(DATABASE_FILE);
    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to create database: {}", db_path.display()))?;
    Ok(())
}
