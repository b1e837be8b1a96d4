use areena_browser::{
    AreenaClient, AreenaConfig, AreenaError, CatalogLink, DEFAULT_PAGE_SIZE, FileSearchHistory,
    HistoryError, LiveChannel, ManifestDescriptor, PlayableItem, SearchHistory, live_channels,
};
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::{Input, Select};
use serde::Serialize;
use std::process::ExitCode;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "areena")]
#[command(version)]
#[command(about = "Browse Yle Areena and resolve playable stream manifests")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        /// Search keyword; prompted for when omitted
        keyword: Option<String>,

        #[command(flatten)]
        page: PageArgs,

        /// Do not record the keyword in the search history
        #[arg(long)]
        no_history: bool,
    },

    /// List the episodes or seasons of a series
    Series {
        /// Series id, e.g. 1-50552121
        series_id: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List the episodes of a season playlist
    Season {
        /// Season playlist URL as printed by `series`
        season_url: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Resolve the playable manifest of an item
    Resolve {
        /// Page reference, URL or item id, e.g. yleareena://items/1-787136
        page_ref: String,
    },

    /// List the live TV channels
    Live,

    /// Show or edit the search history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent searches, most recent first
    List,
    /// Forget a keyword
    Remove { keyword: String },
}

#[derive(clap::Args)]
struct PageArgs {
    /// Index of the first result
    #[arg(long, default_value_t = 0)]
    offset: u32,

    /// Number of results per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Areena(#[from] AreenaError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct LiveEntry<'a> {
    #[serde(flatten)]
    channel: &'a LiveChannel,
    manifest: ManifestDescriptor,
}

fn init_logging(level: LogLevel) {
    let log_filter = format!(
        "areena_browser={level},areena={level}",
        level = level.as_str()
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn format_duration(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn print_item(item: &PlayableItem) {
    let mut details = Vec::new();
    if item.is_container {
        details.push("series".to_string());
    }
    if let Some(duration) = item.duration_seconds {
        details.push(format_duration(duration));
    }
    if let Some(published) = item.published {
        details.push(published.format("%d.%m.%Y").to_string());
    }

    if details.is_empty() {
        println!("{}", item.title);
    } else {
        println!("{} ({})", item.title, details.join(", "));
    }
    println!("  {}", item.homepage);
}

fn print_links(links: &[CatalogLink], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(links)?);
        return Ok(());
    }

    if links.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for link in links {
        match link {
            CatalogLink::Playable(item) => print_item(item),
            CatalogLink::SearchPage(cursor) => println!(
                "\nMore results: areena search {:?} --offset {} --page-size {}",
                cursor.keyword, cursor.next_offset, cursor.page_size
            ),
            CatalogLink::SeriesPage(cursor) if cursor.is_continuation => println!(
                "\nMore episodes: areena season {:?} --offset {} --page-size {}",
                cursor.season_playlist_url, cursor.next_offset, cursor.page_size
            ),
            CatalogLink::SeriesPage(cursor) => println!(
                "Season {}: areena season {:?}",
                cursor.season_number, cursor.season_playlist_url
            ),
        }
    }

    Ok(())
}

fn print_manifest(manifest: &ManifestDescriptor, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    println!("{}", manifest.url);
    println!("  Format: {}", manifest.stream_format);
    println!("  Source: {}", manifest.source_label);
    for (name, value) in &manifest.http_headers {
        println!("  Header: {}: {}", name, value);
    }

    Ok(())
}

/// Asks for a keyword, offering earlier searches first when there are any
fn prompt_keyword(previous: &[String]) -> Result<String, CliError> {
    if !previous.is_empty() {
        let mut choices = vec!["New search".to_string()];
        choices.extend(previous.iter().cloned());

        let choice = Select::new()
            .with_prompt("Search")
            .items(&choices)
            .default(0)
            .interact()?;
        if choice > 0 {
            return Ok(previous[choice - 1].clone());
        }
    }

    Ok(Input::<String>::new()
        .with_prompt("Search keyword")
        .interact_text()?)
}

fn search(
    client: &AreenaClient,
    keyword: Option<String>,
    page: &PageArgs,
    no_history: bool,
    json: bool,
) -> Result<(), CliError> {
    let history = if no_history {
        None
    } else {
        match FileSearchHistory::open_default() {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(error = %e, "Search history unavailable");
                None
            }
        }
    };

    let keyword = match keyword {
        Some(keyword) => keyword,
        None => {
            let previous = match &history {
                Some(history) => history.list()?,
                None => Vec::new(),
            };
            prompt_keyword(&previous)?
        }
    };

    let links = client.search(&keyword, page.offset, page.page_size)?;

    if let Some(history) = &history {
        if let Err(e) = history.update(&keyword) {
            warn!(error = %e, "Failed to record search keyword");
        }
    }

    print_links(&links, json)
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let json = cli.json;

    match cli.command {
        Commands::History { action } => {
            let history = FileSearchHistory::open_default()?;
            match action {
                HistoryAction::List => {
                    let keywords = history.list()?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&keywords)?);
                    } else if keywords.is_empty() {
                        println!("No recent searches.");
                    } else {
                        keywords.iter().for_each(|keyword| println!("{}", keyword));
                    }
                }
                HistoryAction::Remove { keyword } => history.remove(&keyword)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Live => {
            let channels = live_channels();
            if json {
                let entries: Vec<LiveEntry> = channels
                    .iter()
                    .map(|channel| LiveEntry {
                        channel,
                        manifest: channel.manifest(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for channel in channels {
                    println!("{}", channel.name);
                    println!("  {}", channel.manifest_url());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let client = AreenaClient::new(AreenaConfig::from_env())?;
            match command {
                Commands::Search {
                    keyword,
                    page,
                    no_history,
                } => search(&client, keyword, &page, no_history, json)?,
                Commands::Series { series_id, page } => {
                    let links = client.playlist(&series_id, page.offset, page.page_size)?;
                    print_links(&links, json)?;
                }
                Commands::Season { season_url, page } => {
                    let links = client.season_playlist(&season_url, page.offset, page.page_size)?;
                    print_links(&links, json)?;
                }
                Commands::Resolve { page_ref } => match client.resolve(&page_ref)? {
                    Some(manifest) => print_manifest(&manifest, json)?,
                    None => {
                        eprintln!("Stream unavailable");
                        return Ok(ExitCode::FAILURE);
                    }
                },
                Commands::History { .. } | Commands::Live => {}
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from(["areena", "--json", "search", "Pasila", "--page-size", "10"]);
        assert!(cli.json);
        assert_eq!(cli.log_level, LogLevel::Warn);
        match cli.command {
            Commands::Search {
                keyword,
                page,
                no_history,
            } => {
                assert_eq!(keyword.as_deref(), Some("Pasila"));
                assert_eq!(page.offset, 0);
                assert_eq!(page.page_size, 10);
                assert!(!no_history);
            }
            _ => panic!("expected the search command"),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1429), "23:49");
        assert_eq!(format_duration(5294), "1:28:14");
        assert_eq!(format_duration(0), "0:00");
    }
}
