pub mod comment;
pub mod completions;
pub mod create;
pub mod delete;
pub mod edit;
pub mod init;
pub mod list;
pub mod restorations;
pub mod show;
pub mod transition;

use crate::actor;
use crate::output::{CliError, OutputMode};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use helpdesk_core::config::{self, DATABASE_FILE, PROJECT_DIR, ProjectConfig, UserConfig};
use helpdesk_core::model::{Actor, Payload};
use helpdesk_core::{ErrorCode, Helpdesk, HelpdeskError, SqliteStore};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-invocation settings every command handler receives.
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    pub project_root: &'a Path,
    pub output: OutputMode,
    pub quiet: bool,
    pub actor_flag: Option<&'a str>,
    pub user: &'a UserConfig,
}

/// An opened project: the service over its database plus the acting user.
pub struct Project {
    pub desk: Helpdesk<SqliteStore>,
    pub config: ProjectConfig,
    pub actor: Actor,
}

impl Session<'_> {
    /// Locate the enclosing project, load its config, open the store and
    /// resolve who is acting.
    pub fn open(&self) -> Result<Project> {
        let root = find_project_root(self.project_root).ok_or_else(|| {
            CliError::with_details(
                format!(
                    "{}: no {PROJECT_DIR}/ directory in {} or its parents",
                    ErrorCode::NotInitialized.message(),
                    self.project_root.display()
                ),
                ErrorCode::NotInitialized.hint(),
                ErrorCode::NotInitialized.code(),
            )
        })?;

        let config = config::load_project_config(&root).map_err(|err| {
            CliError::with_details(
                format!("{err:#}"),
                ErrorCode::ConfigParseError.hint(),
                ErrorCode::ConfigParseError.code(),
            )
        })?;

        let db_path = root.join(PROJECT_DIR).join(DATABASE_FILE);
        let store = SqliteStore::open(&db_path).map_err(HelpdeskError::Storage)?;
        let desk = Helpdesk::new(store).with_limits(config.limits);

        let name = actor::resolve_actor(self.actor_flag, self.user.actor.as_deref());
        let actor = actor::identify(name, &config.staff);
        debug!(actor = %actor, root = %root.display(), "project opened");

        Ok(Project {
            desk,
            config,
            actor,
        })
    }
}

/// Walk up from `start` to the first directory holding a project dir.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// clap value parser for repeated `--set field=value` arguments.
pub fn parse_field(pair: &str) -> std::result::Result<(String, String), String> {
    Payload::parse_pair(pair)
}

pub fn payload_from(fields: &[(String, String)]) -> Payload {
    fields.iter().cloned().collect()
}

/// Second-precision UTC timestamp for human output.
pub fn human_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
