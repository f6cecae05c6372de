//! Contributors CLI - external contributors to VS Code releases

use clap::{Parser, Subcommand};
use contributors_lib::{
    DEFAULT_LEADERBOARD_LIMIT, GitHubSource, LeaderboardTab, Refresher, Release, ReleaseCache,
    ScraperConfig, VersionKey,
};
use serde::Serialize;
use std::cmp::Reverse;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "contributors")]
#[command(about = "Browse external contributors to VS Code releases", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known release versions, newest first
    Versions,

    /// Show the contributors to one release
    Release {
        /// Version id such as `v1_109`, or `latest`
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Find contributors whose handle contains QUERY (case-insensitive)
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Show one contributor's history across cached releases
    History {
        #[arg(value_name = "HANDLE")]
        handle: String,
    },

    /// Check whether HANDLE first contributed in VERSION
    FirstTime {
        #[arg(value_name = "HANDLE")]
        handle: String,

        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Rank contributors across cached releases
    Leaderboard {
        /// Ranking to use (prs or releases)
        #[arg(long, default_value = "prs")]
        tab: LeaderboardTab,

        /// Maximum number of rows
        #[arg(long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
        limit: usize,
    },

    /// Show a contributor's PR-count milestone
    Milestone {
        #[arg(value_name = "HANDLE")]
        handle: String,
    },

    /// Keep the cache refreshed in the background until Ctrl-C
    Watch,
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,contributors_lib=info".to_string(),
            2 => "info,contributors_lib=debug".to_string(),
            _ => "debug,contributors_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_release(release: &Release) {
    println!(
        "VS Code {} ({} contributors, {} PRs)",
        release.display_name,
        release.contributors.len(),
        release.pr_count()
    );
    for contributor in &release.contributors {
        println!("  {} (@{})", contributor.name, contributor.handle);
        for pr in &contributor.pull_requests {
            println!("    {}#{} {}", pr.repo, pr.number, pr.title);
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = ScraperConfig::from_env()?;
    let source = GitHubSource::new(config.clone())?;
    let cache = Arc::new(ReleaseCache::new(source, config));
    let json = cli.json;

    if let Commands::Watch = cli.command {
        return watch(cache).await;
    }

    cache.refresh().await;

    match cli.command {
        Commands::Versions => {
            let versions = cache.versions();
            if json {
                return print_json(&versions);
            }
            for v in versions {
                println!("{}\t{}", v.id, v.display_name);
            }
        }

        Commands::Release { version } => {
            let release = if version.eq_ignore_ascii_case("latest") {
                cache.default_release().await
            } else {
                cache.get_release(&version).await
            };
            let release = release.ok_or_else(|| format!("No release notes found for '{version}'"))?;
            if json {
                return print_json(&*release);
            }
            print_release(&release);
        }

        Commands::Search { query } => {
            let results = cache.search_contributors(&query);
            if json {
                return print_json(&results);
            }
            if results.is_empty() {
                println!("No contributors match '{query}'");
            }
            for c in results {
                println!(
                    "{} (@{}): {} PRs across {} releases",
                    c.name, c.handle, c.total_prs, c.release_count
                );
            }
        }

        Commands::History { handle } => {
            let history = cache
                .contributor_history(&handle)
                .ok_or_else(|| format!("No cached contributions from '{handle}'"))?;
            if json {
                return print_json(&history);
            }
            println!(
                "{} (@{}): {} PRs across {} releases ({} to {})",
                history.name,
                history.handle,
                history.total_prs,
                history.release_count,
                history.first_release,
                history.latest_release
            );
            let mut by_release: Vec<_> = history.prs_by_release.iter().collect();
            by_release.sort_by_key(|(version, _)| Reverse(VersionKey::parse_or_default(version)));
            for (version, prs) in by_release {
                println!("  {version}");
                for pr in prs {
                    println!("    {}#{} {}", pr.repo, pr.number, pr.title);
                }
            }
        }

        Commands::FirstTime { handle, version } => {
            let first_time = cache.is_first_time_contributor(&handle, &version);
            if json {
                return print_json(&first_time);
            }
            if first_time {
                println!("{handle} has no cached contributions before {version}");
            } else {
                println!("{handle} contributed before {version}");
            }
        }

        Commands::Leaderboard { tab, limit } => {
            let entries = cache.leaderboard(tab, limit);
            if json {
                return print_json(&entries);
            }
            for e in entries {
                println!(
                    "{:>3}. {} (@{}): {} PRs, {} releases",
                    e.rank, e.name, e.handle, e.pr_count, e.release_count
                );
            }
        }

        Commands::Milestone { handle } => {
            let status = cache.contributor_milestone(&handle);
            if json {
                return print_json(&status);
            }
            match status.milestone {
                0 => println!("{} has {} PRs, no milestone yet", status.handle, status.pr_count),
                m if status.is_milestone => {
                    println!("{} just reached {m} PRs", status.handle)
                }
                m => println!(
                    "{} has {} PRs (milestone {m})",
                    status.handle, status.pr_count
                ),
            }
        }

        Commands::Watch => {}
    }

    Ok(())
}

async fn watch(cache: Arc<ReleaseCache<GitHubSource>>) -> CliResult {
    let handle = Refresher::spawn(Arc::clone(&cache));
    tracing::info!("Watching release notes, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    handle.shutdown().await;
    let stats = cache.stats();
    tracing::info!(
        versions = stats.catalog_len,
        cached = stats.cached_len,
        "Refresher shut down"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
