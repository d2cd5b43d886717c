mod cmd;
mod output;

use clap::{Parser, Subcommand};
use claimdesk_core::ClaimMode;
use cmd::{config::ConfigSubcommand, Remote};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "claimdesk",
    about = "Moderation review queue: serve it, claim topics and act on reviewables",
    version,
    propagate_version = true
)]
struct Cli {
    /// Review server base URL
    #[arg(
        long,
        global = true,
        env = "CLAIMDESK_SERVER",
        default_value = "http://localhost:7800"
    )]
    server: String,

    /// Acting moderator's user id
    #[arg(long, global = true, env = "CLAIMDESK_USER_ID")]
    user_id: Option<u64>,

    /// Acting moderator's username
    #[arg(long, global = true, env = "CLAIMDESK_USERNAME")]
    username: Option<String>,

    /// Coordinator config file (YAML)
    #[arg(long, global = true, env = "CLAIMDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Confirm prompts without asking
    #[arg(long, global = true, short = 'y')]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the review server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "7800")]
        port: u16,
        /// YAML seed file with the initial reviewables
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Override the seed's claim mode: disabled, optional or required
        #[arg(long)]
        claim_mode: Option<ClaimMode>,
    },

    /// List pending reviewables
    List,

    /// Show one reviewable
    Show { id: u64 },

    /// Perform an action on a reviewable
    Perform {
        id: u64,
        /// Server action name, e.g. approve_post
        action: String,
        /// Rejection reason, for actions that require one
        #[arg(long)]
        reason: Option<String>,
        /// Extra payload field as key=value (repeatable)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Claim the topic of a reviewable
    Claim { id: u64 },

    /// Release your claim on the topic of a reviewable
    Unclaim { id: u64 },

    /// Follow queue changes live
    Watch,

    /// Inspect the coordinator config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Watch => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let remote = Remote {
        server: cli.server,
        user_id: cli.user_id,
        username: cli.username,
        config: cli.config,
        assume_yes: cli.yes,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Serve {
            port,
            seed,
            claim_mode,
        } => cmd::serve::run(port, seed.as_deref(), claim_mode),
        Commands::List => cmd::review::list(&remote),
        Commands::Show { id } => cmd::review::show(&remote, id),
        Commands::Perform {
            id,
            action,
            reason,
            fields,
        } => cmd::perform::run(&remote, id, &action, reason.as_deref(), &fields),
        Commands::Claim { id } => cmd::claim::run(&remote, id, false),
        Commands::Unclaim { id } => cmd::claim::run(&remote, id, true),
        Commands::Watch => cmd::watch::run(&remote),
        Commands::Config { subcommand } => {
            cmd::config::run(remote.config.as_deref(), subcommand, remote.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
