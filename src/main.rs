use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use cryptfs_cli::backend::Platform;
use cryptfs_cli::commands;
use cryptfs_cli::config::Settings;
use cryptfs_cli::dispatcher::BackendDispatcher;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cryptfs-cli")]
#[command(version)]
#[command(about = "Manage encrypted repositories with GPG + gocryptfs/cppcryptfs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to $CRYPTFS_CONFIG or the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new encrypted repository
    Create {
        /// GPG user/email the passphrase is encrypted to
        #[arg(short, long)]
        user: String,

        /// Target repository directory (must not exist)
        repo_dir: PathBuf,
    },

    /// Mount an encrypted repository
    Mount {
        /// Comma-separated options passed through to the backend
        #[arg(short, long)]
        options: Option<String>,

        /// Repository directory (containing passphrase.gpg + objects)
        repo_dir: PathBuf,

        /// Mount point, or drive letter on Windows
        mount_point: String,
    },

    /// Unmount a repository
    Umount {
        /// Mount point, or drive letter on Windows
        mount_point: String,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("Caused by: {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let dispatcher = BackendDispatcher::from_settings(&settings, Platform::detect());

    match cli.command {
        Commands::Create { user, repo_dir } => commands::create(&dispatcher, &user, &repo_dir)?,
        Commands::Mount {
            options,
            repo_dir,
            mount_point,
        } => commands::mount(&dispatcher, &repo_dir, &mount_point, options.as_deref())?,
        Commands::Umount { mount_point } => commands::umount(&dispatcher, &mount_point)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .init();
}
