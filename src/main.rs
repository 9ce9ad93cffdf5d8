use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use mkquiz::commands;
use mkquiz::config;
use mkquiz::prompt::TerminalPrompter;
use mkquiz::{server, AppState};

const DEFAULT_LOG_FILTER: &str = "mkquiz=info";

#[derive(Parser, Debug)]
#[command(name = "mkquiz", version, about = "Create and manage quizzes for a static quiz site")]
struct Cli {
    /// Configuration file. Defaults to .mkquizrc in the working directory.
    #[arg(long, global = true, env = "MKQUIZ_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the project root, quizzes manifest and template paths
    Config,
    /// Add a quiz from a question JSON file
    Add,
    /// Remove quizzes and their folders
    #[command(visible_alias = "rmv")]
    Remove,
    /// Regenerate every quiz folder from the manifest (writes a backup first)
    #[command(visible_alias = "revive")]
    Rebuild,
    /// Normalize every path stored in the manifest
    FixPaths,
    /// Print every quiz in the manifest
    List,
    /// Run the HTTP API
    Serve {
        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,

        /// Directory served at `/`, e.g. a browser UI
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Scratch directory for uploads
        #[arg(long, env = "MKQUIZ_UPLOADS", default_value = "uploads")]
        uploads: PathBuf,

        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
    },
    /// Print a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// `LOG_LEVEL` wins over `RUST_LOG`. A bare level such as `debug` applies to
/// this crate only.
fn init_logging() {
    let filter = match std::env::var("LOG_LEVEL").ok().filter(|v| !v.trim().is_empty()) {
        Some(level) if level.contains('=') => EnvFilter::try_new(level).ok(),
        Some(level) => EnvFilter::try_new(format!("mkquiz={}", level.trim())).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Command, config_path: &Path) -> Result<()> {
    match command {
        Command::Config => {
            commands::config::run(config_path, &mut TerminalPrompter::stdio())?;
        }
        Command::Add => {
            commands::add::run(config_path, &mut TerminalPrompter::stdio())?;
        }
        Command::Remove => {
            commands::remove::run(config_path, &mut TerminalPrompter::stdio())?;
        }
        Command::Rebuild => {
            commands::rebuild::run(config_path)?;
        }
        Command::FixPaths => {
            commands::fix_paths::run(config_path)?;
        }
        Command::List => {
            commands::list::run(config_path)?;
        }
        Command::Serve {
            port,
            host,
            static_dir,
            uploads,
            gemini_api_key,
        } => {
            let state = AppState::new(config_path.to_path_buf(), uploads).with_gemini_key(gemini_api_key);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(server::serve(state, SocketAddr::new(host, port), static_dir))?;
        }
        Command::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mkquiz", &mut std::io::stdout());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("mkquiz {} - quiz folders, pages and manifest in one place\n", env!("CARGO_PKG_VERSION"));
        Cli::command().print_help()?;
        return Ok(());
    };

    let config_path = config::config_path(cli.config.as_deref());
    if let Err(e) = run(command, &config_path) {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
