//! `hd completions` — shell completion scripts.

use clap::Args;
use clap_complete::{Shell, generate};
use std::io::Write;

const BIN_NAME: &str = "hd";

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    write_completions(shell, command, &mut stdout.lock());
    Ok(())
}

fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) {
    generate(shell, command, BIN_NAME, out);
}
