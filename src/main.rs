//! dist - install any binary from ideally any source

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use distillery::cmd;

#[derive(Parser)]
#[command(name = "dist")]
#[command(author, version, about = "install any binary from ideally any source")]
struct Cli {
    /// Path to the configuration file (TOML or YAML)
    #[arg(long, global = true, env = "DISTILLERY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a binary from a release source
    Install {
        /// Reference: alias, owner/repo or provider/owner/repo, with optional @version
        reference: String,
        /// Target OS (defaults to the running platform)
        #[arg(long)]
        os: Option<String>,
        /// Target architecture (defaults to the running platform)
        #[arg(long)]
        arch: Option<String>,
        /// Version to install (overrides @version in the reference)
        #[arg(long)]
        version: Option<String>,
        /// GitHub API token
        #[arg(long, env = "DISTILLERY_GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        /// GitLab API token
        #[arg(long, env = "DISTILLERY_GITLAB_TOKEN", hide_env_values = true)]
        gitlab_token: Option<String>,
        /// Consider pre-release versions for @latest
        #[arg(long, env = "DISTILLERY_INCLUDE_PRE_RELEASES")]
        include_pre_releases: bool,
        /// Skip checksum verification
        #[arg(long, env = "DISTILLERY_NO_CHECKSUM_VERIFY")]
        no_checksum_verify: bool,
        /// Skip signature verification
        #[arg(long, env = "DISTILLERY_NO_SIGNATURE_VERIFY")]
        no_signature_verify: bool,
        /// Accept the best asset even when every score is below threshold
        #[arg(long)]
        no_score_check: bool,
        /// Re-download assets even when cached
        #[arg(long)]
        force: bool,
    },
    /// List installed binaries
    List,
    /// Show resolved configuration and platform
    Info,
    /// Remove cached downloads and metadata
    Clean,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Install {
            reference,
            os,
            arch,
            version,
            github_token,
            gitlab_token,
            include_pre_releases,
            no_checksum_verify,
            no_signature_verify,
            no_score_check,
            force,
        } => {
            cmd::install::run(cmd::install::InstallArgs {
                reference,
                os,
                arch,
                version,
                github_token,
                gitlab_token,
                include_pre_releases,
                no_checksum_verify,
                no_signature_verify,
                no_score_check,
                force,
                config: cli.config,
            })
            .await
        }
        Commands::List => cmd::list::run(cli.config),
        Commands::Info => cmd::info::run(cli.config),
        Commands::Clean => cmd::clean::run(cli.config),
    }
}
