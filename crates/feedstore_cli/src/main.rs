//! Command-line client for the feed store.
//!
//! # Responsibility
//! - Open a backend from a TOML config or flags and run one repository call.
//! - Print results as camelCase JSON for quick local inspection.

use clap::{Parser, Subcommand};
use feedstore_core::{
    core_version, open_backend, BackendKind, Feed, FeedService, RecordId, RepoError, StoreConfig,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "feedstore", version, about = "Inspect and edit a feed store")]
struct Cli {
    /// TOML store configuration file.
    #[arg(short, long, env = "FEEDSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured backend (sqlite|document).
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Overrides the configured database or snapshot path.
    #[arg(short, long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints the core version and selected backend.
    Ping,
    /// Lists feeds ordered by name.
    Feeds {
        /// Only feeds marked active.
        #[arg(long)]
        active: bool,
    },
    /// Adds an active feed and prints its id.
    AddFeed {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
    },
    /// Prints one item with its metadata and entities.
    Item { id: RecordId },
    /// Lists the items of one feed.
    Items { feed_id: RecordId },
    /// Removes metadata and entities owned by an item.
    PurgeChildren { item_id: RecordId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("feedstore: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match cli.config.as_ref() {
        Some(path) => StoreConfig::load(path).map_err(|err| err.to_string())?,
        None => StoreConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(path) = cli.path {
        config.path = Some(path);
    }
    feedstore_core::logging::init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let backend = open_backend(&config).map_err(describe)?;
    let service = FeedService::new(backend.as_ref());
    info!(
        "event=cli_run module=cli status=start backend={}",
        service.backend_kind()
    );

    match cli.command {
        Command::Ping => {
            println!("feedstore_core version={}", core_version());
            println!("backend={}", service.backend_kind());
        }
        Command::Feeds { active } => {
            let feeds = if active {
                service.feeds().find_by("active", true)
            } else {
                service.feeds().find()
            };
            print_json(&feeds.map_err(describe)?)?;
        }
        Command::AddFeed { name, url } => {
            let id = service.feeds().create(&Feed::new(name, url)).map_err(describe)?;
            println!("{id}");
        }
        Command::Item { id } => {
            print_json(&service.item_with_children(id).map_err(describe)?)?;
        }
        Command::Items { feed_id } => {
            print_json(&service.items_for_feed(feed_id).map_err(describe)?)?;
        }
        Command::PurgeChildren { item_id } => {
            let summary = service.purge_item_children(item_id).map_err(describe)?;
            println!(
                "metadata={} entities={}",
                summary.metadata, summary.entities
            );
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn describe(err: RepoError) -> String {
    if err.requires_reverification() {
        format!("{err} (outcome unknown; re-read before retrying)")
    } else {
        err.to_string()
    }
}
