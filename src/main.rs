use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use gh_checks::app::{self, CliHost, recv_event};
use gh_checks::checks::{CancellationGuard, ChecksDialog};
use gh_checks::config::loader;
use gh_checks::engine::{Engine, Event, GitHubEngine, Request};
use gh_checks::github::GitHubClient;
use gh_checks::github::auth::discover_accounts;
use gh_checks::url::parse_pull_request;
use gh_checks::{git, report};

/// How long to wait for the engine to answer a request.
const ENGINE_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "gh-checks", version, about = "Failed pull request checks, step by step")]
struct Cli {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the checks of a pull request with the steps of one check.
    Show {
        /// Pull request URL or `owner/repo#number`.
        pr: String,
        /// Check to focus, by name (defaults to the first failure).
        #[arg(long)]
        check: Option<String>,
        /// Step number of the focused check to open with `--open`.
        #[arg(long, requires = "open")]
        step: Option<u32>,
        /// Open the focused check (or step) on GitHub.
        #[arg(long)]
        open: bool,
    },
    /// Re-run every check suite of the pull request's head commit.
    Rerun {
        /// Pull request URL or `owner/repo#number`.
        pr: String,
    },
    /// Switch to the pull request's repository and check out its branch.
    Checkout {
        /// Pull request URL or `owner/repo#number`.
        pr: String,
    },
}

impl Commands {
    fn pr(&self) -> &str {
        match self {
            Self::Show { pr, .. } | Self::Rerun { pr } | Self::Checkout { pr } => pr.as_str(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = parse_pull_request(cli.command.pr())
        .with_context(|| format!("unrecognised pull request: {}", cli.command.pr()))?;

    // Set up tracing.
    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    // Load config.
    let config = loader::load_config(cli.config.as_deref())?;

    // Install the rustls CryptoProvider before any TLS client is constructed.
    // reqwest 0.13 / rustls 0.23 no longer auto-installs a provider.
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install default CryptoProvider");

    let accounts = discover_accounts(
        config
            .github
            .hosts
            .iter()
            .map(String::as_str)
            .chain([target.host.as_str()]),
    );

    // The engine thread owns its own Tokio runtime and stops on `Shutdown`.
    let engine = GitHubEngine::new(config.clone(), accounts.clone()).start();

    tracing::info!("gh-checks starting");

    let (events_tx, events_rx) = std::sync::mpsc::channel();
    engine.send(Request::FetchRevision {
        repository: target.repository(),
        number: target.number,
        reply_tx: events_tx.clone(),
    });
    let (revision, checks) = match recv_event(&events_rx, ENGINE_REPLY_TIMEOUT)? {
        Event::RevisionFetched { revision, checks } => (revision, checks),
        Event::FetchError { context, message } => bail!("{context}: {message}"),
        Event::MutationOk { .. } | Event::MutationError { .. } => {
            bail!("unexpected engine reply")
        }
    };

    let cwd = std::env::current_dir().ok();
    let should_change_repository =
        git::is_other_repository(cwd.as_deref(), &revision.repository.full_name());
    let host = CliHost::new(engine.clone(), events_tx, &config, target.host.clone(), cwd);
    let dialog = ChecksDialog::new(revision, checks, host, CancellationGuard::new())
        .with_resolve_timeout(config.github.resolve_timeout())
        .with_repository_change(should_change_repository);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let outcome = match cli.command {
        Commands::Show {
            check, step, open, ..
        } => {
            let client = GitHubClient::new(
                config.github.cache_ttl_minutes,
                config.github.log_excerpt_lines,
            );
            rt.block_on(dialog.load_check_runs(&accounts, &client));

            if let Some(name) = check {
                let snapshot = dialog.snapshot();
                let found = snapshot.checks.iter().find(|c| c.name == name);
                let Some(found) = found else {
                    bail!("no check named {name:?} on pull request #{}", target.number);
                };
                dialog.select(found.id);
            }

            println!(
                "{}",
                report::render(
                    dialog.revision(),
                    &dialog.snapshot(),
                    dialog.should_change_repository(),
                    config.defaults.max_commit_message_length,
                )
            );

            if open {
                open_focused(&dialog, step)?;
            }
            dialog.dismiss();
            Ok(())
        }

        Commands::Rerun { .. } => app::rerun(&dialog, &events_rx, ENGINE_REPLY_TIMEOUT)
            .map(|message| println!("{message}")),

        Commands::Checkout { .. } => {
            let snapshot = dialog.snapshot();
            println!("{}", report::failed_summary(snapshot.failed_checks().count()));
            println!(
                "{}...",
                report::confirm_label(dialog.should_change_repository())
            );
            rt.block_on(dialog.switch_to_pull_request())
                .map_err(anyhow::Error::from)
        }
    };

    dialog.teardown();
    engine.send(Request::Shutdown);
    outcome
}

/// Open the focused check, or one of its steps, on GitHub.
fn open_focused(dialog: &ChecksDialog<CliHost>, step: Option<u32>) -> Result<()> {
    let Some(number) = step else {
        dialog.view_selected_check_details();
        return Ok(());
    };
    let check = dialog.selected_check().context("no check is selected")?;
    let step = check
        .action_job_steps
        .iter()
        .flatten()
        .find(|s| s.number == number)
        .with_context(|| format!("check {:?} has no step {number}", check.name))?;
    dialog.view_job_step(step);
    Ok(())
}
