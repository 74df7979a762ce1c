//! repowatch CLI
//!
//! Renders the user and repository outcome streams of a GitHub account.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::time::Instant;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repowatch_core::constants::{
    DEFAULT_GITHUB_API_URL, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_TTL_SECONDS,
};
use repowatch_core::{any_error_visible, Outcome, Repo, User, Visibility};
use repowatch_github::{GithubClient, GithubConfig};
use repowatch_stream::{Repository, RepositoryConfig, Subscription};

/// Upper bound for `--ttl` (one week)
const MAX_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `--timeout` (one hour)
const MAX_TIMEOUT_SECONDS: u64 = 60 * 60;

/// Extra time granted past the HTTP timeout before rendering gives up
const SETTLE_GRACE_SECONDS: u64 = 5;

/// repowatch - cached GitHub profile and repository viewer
#[derive(Parser)]
#[command(name = "repowatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// GitHub API root
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL, global = true)]
    api_url: String,

    /// Cache TTL in seconds
    #[arg(
        long,
        env = "REPOWATCH_TTL",
        default_value_t = DEFAULT_TTL_SECONDS,
        value_parser = clap::value_parser!(u64).range(0..=MAX_TTL_SECONDS),
        global = true
    )]
    ttl: u64,

    /// HTTP timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_TIMEOUT_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECONDS),
        global = true
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve cached data for a user, refreshing what is missing, stale, or failed
    Watch {
        /// GitHub user name
        name: String,
        /// Re-ping every N seconds instead of exiting
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Resolve a user, then fetch the repositories of the resolved login
    Search {
        /// GitHub user name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "repowatch=debug,info"
    } else {
        "repowatch=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = GithubClient::with_config(GithubConfig::new(&cli.api_url).with_timeout(cli.timeout))
        .context("Failed to create GitHub client")?;
    let config = RepositoryConfig::default().with_ttl(Duration::from_secs(cli.ttl));
    let repository = Repository::with_config(Arc::new(client), config);
    repository.spawn_sweepers();

    let deadline = settle_deadline(cli.timeout);

    match cli.command {
        Commands::Watch { name, interval } => cmd_watch(&repository, &name, interval, deadline).await,
        Commands::Search { name } => cmd_search(&repository, &name, deadline).await,
    }
}

fn settle_deadline(timeout: u64) -> Duration {
    Duration::from_secs(timeout.saturating_add(SETTLE_GRACE_SECONDS))
}

/// Ping both streams, optionally on a fixed interval
async fn cmd_watch(
    repository: &Repository,
    name: &str,
    interval: Option<u64>,
    deadline: Duration,
) -> Result<()> {
    println!("{} {}", "👀 Watching:".cyan().bold(), name);

    let mut users = repository.subscribe_user();
    let mut repos = repository.subscribe_repos();

    loop {
        let repo_decision = repository.ping_repo(name);
        let user_decision = repository.ping_user(name);
        debug!(?user_decision, ?repo_decision, "Pinged streams");

        let view = render_until_settled(repository, &mut users, &mut repos, false, deadline).await;

        match interval {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => return view.finish(),
        }
    }
}

/// Force a user lookup, which cascades to the repositories
async fn cmd_search(repository: &Repository, name: &str, deadline: Duration) -> Result<()> {
    println!("{} {}", "🔍 Searching:".cyan().bold(), name);

    let mut users = repository.subscribe_user();
    let mut repos = repository.subscribe_repos();

    repository.fetch_user(name);

    render_until_settled(repository, &mut users, &mut repos, true, deadline)
        .await
        .finish()
}

/// Last outcome seen on each stream.
#[derive(Default)]
struct View {
    user: Option<Outcome<User>>,
    repos: Option<Outcome<Vec<Repo>>>,
}

impl View {
    fn error_visibility(&self) -> Visibility {
        any_error_visible(&[
            self.user.as_ref().map_or(Visibility::Gone, Outcome::error_visibility),
            self.repos.as_ref().map_or(Visibility::Gone, Outcome::error_visibility),
        ])
    }

    fn finish(self) -> Result<()> {
        if self.error_visibility().is_visible() {
            bail!("One or more requests failed");
        }
        if self.user.is_none() && self.repos.is_none() {
            bail!("Timed out waiting for results");
        }
        println!("\n{}", "✅ Done".green().bold());
        Ok(())
    }
}

/// Print outcomes as they arrive until both streams settle or time runs out
async fn render_until_settled(
    repository: &Repository,
    users: &mut Subscription<User>,
    repos: &mut Subscription<Vec<Repo>>,
    cascade: bool,
    deadline: Duration,
) -> View {
    let mut view = View::default();
    let until = Instant::now() + deadline;

    loop {
        tokio::select! {
            Some(outcome) = users.recv() => {
                render_user(&outcome);
                view.user = Some(outcome);
            }
            Some(outcome) = repos.recv() => {
                render_repos(&outcome);
                view.repos = Some(outcome);
            }
            _ = tokio::time::sleep_until(until) => {
                println!("{}", "⏱  Timed out waiting for results".yellow());
                return view;
            }
        }

        if settled(repository, &view, cascade) {
            return view;
        }
    }
}

fn settled(repository: &Repository, view: &View, cascade: bool) -> bool {
    let user_done = !repository.user_coordinator().is_fetching()
        && view.user.as_ref().map_or(false, Outcome::is_terminal);
    let repos_done = !repository.repos_coordinator().is_fetching()
        && view.repos.as_ref().map_or(false, Outcome::is_terminal);

    if cascade {
        let user_failed = view.user.as_ref().map_or(false, Outcome::is_failure);
        (user_done && user_failed) || (user_done && repos_done)
    } else {
        user_done && repos_done
    }
}

fn render_user(outcome: &Outcome<User>) {
    if outcome.loading_visibility().is_visible() {
        println!("   {}", "⏳ Loading user...".dimmed());
    }
    outcome.map_success((), |user| {
        println!("\n{}", "👤 User:".green().bold());
        println!("   {} {}", "Login:".dimmed(), user.login);
        if let Some(name) = &user.name {
            println!("   {} {}", "Name:".dimmed(), name);
        }
        println!("   {} {}", "Bio:".dimmed(), user.bio_or_placeholder());
    });
    outcome.map_error((), |error| {
        println!("{} {}", "❌ User:".red().bold(), error);
    });
}

fn render_repos(outcome: &Outcome<Vec<Repo>>) {
    if outcome.loading_visibility().is_visible() {
        println!("   {}", "⏳ Loading repositories...".dimmed());
    }
    outcome.map_success((), |repos| {
        println!("\n{} {}", "📦 Repositories:".green().bold(), repos.len());
        for repo in repos {
            let stars = format!("★ {}", repo.stargazers_count);
            match &repo.description {
                Some(description) => {
                    println!("   {} {} {}", repo.to_string().yellow(), stars.dimmed(), description)
                }
                None => println!("   {} {}", repo.to_string().yellow(), stars.dimmed()),
            }
        }
    });
    outcome.map_error((), |error| {
        println!("{} {}", "❌ Repositories:".red().bold(), error);
    });
}
