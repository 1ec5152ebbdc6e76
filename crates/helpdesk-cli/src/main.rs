#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Session;
use helpdesk_core::config::{self, UserConfig};
use helpdesk_core::workflow::Transition;
use output::{CliError, OutputMode};
use std::env;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hd: support tickets with a staff-gated status workflow",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (unless HELPDESK_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output. Shorthand for `--format json`.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; defaults to pretty on a terminal and text in pipes.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this user (skips HELPDESK_ACTOR and config resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a helpdesk project",
        long_about = "Create .helpdesk/ with a default config and an empty ticket database.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    hd init\n\n    # Recreate missing pieces of an existing project\n    hd init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "File a new ticket",
        long_about = "File a new ticket owned by the acting user. Staff handle tickets; they cannot file them.",
        after_help = "EXAMPLES:\n    # File a ticket\n    hd create --topic \"Printer jam\" --description \"Tray 2 jams on duplex\"\n\n    # With an explicit priority\n    hd create --topic \"VPN down\" --description \"Cannot connect\" --priority high --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Show one ticket",
        long_about = "Show a ticket and its comments. Only staff and the owner can see a ticket.",
        after_help = "EXAMPLES:\n    hd show 12\n\n    # Emit machine-readable output\n    hd show 12 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "List tickets",
        long_about = "List tickets newest first. Staff see all tickets; everyone else sees their own.",
        after_help = "EXAMPLES:\n    # Everything you can see\n    hd list\n\n    # Staff triage queue\n    hd list --status active --priority high"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Edit an active ticket",
        long_about = "Change the description or priority of your own ticket while it is still active.",
        after_help = "EXAMPLES:\n    hd edit 12 --set priority=high\n\n    hd edit 12 --set description=\"Also tray 1\" --set priority=medium"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Delete a ticket (staff)",
        long_about = "Delete a ticket together with its comments and restoration history. Staff only.",
        after_help = "EXAMPLES:\n    hd --actor sam delete 12"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Workflow",
        about = "Decline a ticket (staff)",
        long_about = "Decline an active ticket, or a ticket awaiting restoration. A reason is required.",
        after_help = "EXAMPLES:\n    hd decline 12 --reason \"Duplicate of #9\""
    )]
    Decline(cmd::transition::DeclineArgs),

    #[command(
        next_help_heading = "Workflow",
        about = "Approve a ticket (staff)",
        long_about = "Approve an active ticket, or a ticket awaiting restoration.",
        after_help = "EXAMPLES:\n    hd approve 12"
    )]
    Approve(cmd::transition::TransitionArgs),

    #[command(
        next_help_heading = "Workflow",
        about = "Ask staff to reconsider a declined ticket (owner)",
        long_about = "Move your declined ticket to in-restoration. The decline reason is kept on the restoration request.",
        after_help = "EXAMPLES:\n    hd restore 12"
    )]
    Restore(cmd::transition::TransitionArgs),

    #[command(
        next_help_heading = "Workflow",
        visible_alias = "start-process",
        about = "Start processing an approved ticket (staff)",
        after_help = "EXAMPLES:\n    hd start 12"
    )]
    Start(cmd::transition::TransitionArgs),

    #[command(
        next_help_heading = "Workflow",
        visible_alias = "done",
        about = "Complete an in-process ticket (staff)",
        after_help = "EXAMPLES:\n    hd complete 12"
    )]
    Complete(cmd::transition::TransitionArgs),

    #[command(
        next_help_heading = "Workflow",
        about = "List restoration requests (staff)",
        long_about = "List restoration requests oldest first, with their outcome once staff decided.",
        after_help = "EXAMPLES:\n    # Requests waiting for a decision\n    hd restorations --pending\n\n    # History of one ticket\n    hd restorations --ticket 12 --json"
    )]
    Restorations(cmd::restorations::RestorationsArgs),

    #[command(
        next_help_heading = "Comments",
        about = "Add, list, edit or delete comments",
        long_about = "Comments are open while a ticket is in process, to staff and the ticket owner."
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    hd completions bash > ~/.local/share/bash-completion/completions/hd"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("HELPDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "helpdesk=debug,hd=debug,info"
        } else {
            "helpdesk=info,hd=info,warn"
        })
    });

    let format = env::var("HELPDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_user_config() -> UserConfig {
    config::load_user_config().unwrap_or_else(|err| {
        warn!("ignoring user config: {err:#}");
        UserConfig::default()
    })
}

fn dispatch(command: &Commands, session: &Session<'_>) -> anyhow::Result<()> {
    use cmd::transition::run_transition;

    match command {
        Commands::Init(args) => cmd::init::run_init(args, session),
        Commands::Create(args) => cmd::create::run_create(args, session),
        Commands::Show(args) => cmd::show::run_show(args, session),
        Commands::List(args) => cmd::list::run_list(args, session),
        Commands::Edit(args) => cmd::edit::run_edit(args, session),
        Commands::Delete(args) => cmd::delete::run_delete(args, session),
        Commands::Decline(args) => cmd::transition::run_decline(args, session),
        Commands::Approve(args) => run_transition(Transition::Approve, args, session),
        Commands::Restore(args) => run_transition(Transition::Restore, args, session),
        Commands::Start(args) => run_transition(Transition::StartProcess, args, session),
        Commands::Complete(args) => run_transition(Transition::Complete, args, session),
        Commands::Restorations(args) => cmd::restorations::run_restorations(args, session),
        Commands::Comment(args) => cmd::comment::run_comment(args, session),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.verbose {
        debug!("verbose mode enabled");
    }

    let user = load_user_config();
    let output = output::resolve_output_mode(cli.format, cli.json, user.output.as_deref());
    let project_root = env::current_dir()?;

    let session = Session {
        project_root: &project_root,
        output,
        quiet: cli.quiet,
        actor_flag: cli.actor.as_deref(),
        user: &user,
    };

    if let Err(err) = dispatch(&cli.command, &session) {
        output::render_error(output, &CliError::from_anyhow(&err))?;
        std::process::exit(1);
    }
    Ok(())
}
