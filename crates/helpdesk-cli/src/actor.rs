//! Acting identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `HELPDESK_ACTOR` env > user config
//! `actor` > `USER` env (TTY only). Nothing resolved means the anonymous
//! actor, which the access policy turns away. The staff capability is never
//! claimed by the caller; it comes from the project's `[staff]` list.

use helpdesk_core::config::StaffConfig;
use helpdesk_core::model::{Actor, ActorId};
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    let explicit = [
        cli_flag.map(str::to_string),
        env.get("HELPDESK_ACTOR"),
        configured.map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .map(|name| name.trim().to_string())
    .find(|name| !name.is_empty());
    if explicit.is_some() {
        return explicit;
    }

    if env.is_tty() {
        return env.get("USER").map(|name| name.trim().to_string());
    }

    None
}

/// Resolve the acting user name, if any.
pub fn resolve_actor(cli_flag: Option<&str>, configured: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, configured, &RealEnv)
}

/// Turn a resolved name into an [`Actor`], consulting the staff list.
pub fn identify(name: Option<String>, staff: &StaffConfig) -> Actor {
    name.map_or(Actor::Anonymous, |name| staff.identify(ActorId::new(name)))
}
