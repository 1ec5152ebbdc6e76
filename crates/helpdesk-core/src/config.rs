use crate::model::{Actor, ActorId, Identity, Priority};
use crate::validate::Limits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project state directory, created by `hd init`.
pub const PROJECT_DIR: &str = ".helpdesk";

/// Database file inside [`PROJECT_DIR`].
pub const DATABASE_FILE: &str = "helpdesk.sqlite3";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub tickets: TicketsConfig,
    #[serde(default)]
    pub staff: StaffConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketsConfig {
    /// Priority used when `hd create` is given none.
    #[serde(default)]
    pub default_priority: Priority,
}

/// The identity/role lookup: actor ids listed here are staff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffConfig {
    #[serde(default)]
    pub members: Vec<String>,
}

impl StaffConfig {
    #[must_use]
    pub fn is_staff(&self, id: &ActorId) -> bool {
        self.members.iter().any(|member| member.trim() == id.as_str())
    }

    /// Attach the staff capability to an authenticated id.
    #[must_use]
    pub fn identify(&self, id: ActorId) -> Actor {
        let staff = self.is_staff(&id);
        Actor::Authenticated(Identity { id, staff })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default acting identity.
    #[serde(default)]
    pub actor: Option<String>,
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(CONFIG_FILE)
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a commented default project config unless one exists.
///
/// Returns whether a file was written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_project_config(project_root: &Path) -> Result<bool> {
    let path = project_config_path(project_root);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, DEFAULT_PROJECT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

const DEFAULT_PROJECT_CONFIG: &str = r#"# Helpdesk project configuration.

[limits]
topic_max_chars = 18
description_max_chars = 255
reason_max_chars = 255
comment_max_chars = 8192

[tickets]
default_priority = "low"

[staff]
# Actor ids with the staff capability.
members = []
"#;

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("helpdesk").join(CONFIG_FILE))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Pick the output mode: explicit flag, then `FORMAT` env, then user
/// config, then `pretty` on a terminal and `text` otherwise.
#[must_use]
pub fn resolve_output(
    cli_format: Option<&str>,
    env_format: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> &'static str {
    [cli_format, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .unwrap_or(if is_tty { "pretty" } else { "text" })
}
