use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use jikan_sync::cache::{LocalStore, Resolved, SqliteStore};
use jikan_sync::catalog::{CastMember, CatalogItem};
use jikan_sync::config::{Config, ImagePolicy};
use jikan_sync::connectivity::Connectivity;
use jikan_sync::remote::JikanClient;
use jikan_sync::sync::{CatalogPager, CatalogRepository, LoadOutcome, RepositorySettings};
use jikan_sync::logging;

type Repository = CatalogRepository<JikanClient, SqliteStore>;

#[derive(Parser, Debug)]
#[command(name = "jikan-sync")]
#[command(about = "Offline-first anime catalog backed by the Jikan API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jikan-sync/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Never contact the remote API; serve everything from the local cache
  #[arg(long, global = true)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show one page of the ranked catalog
  Top {
    #[arg(short, long, default_value_t = 1)]
    page: u32,
  },
  /// Accumulate several catalog pages into one list
  Browse {
    #[arg(short, long, default_value_t = 2)]
    pages: u32,
  },
  /// Show one anime
  Show { id: i64 },
  /// Follow one anime, printing every change until interrupted
  Watch { id: i64 },
  /// Show the characters of one anime
  Cast { id: i64 },
  /// Search cached titles
  Search { query: String },
  /// Refresh cached records older than the given age
  Sync {
    /// Age in seconds (default: sync.stale_after_secs)
    #[arg(long)]
    max_age: Option<u64>,
  },
  /// Show cache and connectivity status
  Status,
  /// Delete every cached record
  Clear,
}

impl Command {
  /// Whether the command can use the remote API at all. Local-only commands
  /// skip the reachability probe.
  fn uses_network(&self) -> bool {
    !matches!(self, Command::Search { .. } | Command::Clear)
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  // Wire up the repository
  let store = SqliteStore::open(&config.storage.database_path()?)?;
  let client = JikanClient::new(&config.api, &config.catalog)?;

  let use_network = !args.offline && args.command.uses_network();
  let online = use_network && client.reachable().await;
  let connectivity = Connectivity::new(online);
  let client = Arc::new(client);

  let watching = matches!(args.command, Command::Watch { .. });
  let probe = if use_network && watching && config.sync.probe_interval_secs > 0 {
    let probe_client = Arc::clone(&client);
    Some(connectivity.spawn_probe(
      Duration::from_secs(config.sync.probe_interval_secs),
      move || {
        let client = Arc::clone(&probe_client);
        async move { client.reachable().await }
      },
    ))
  } else {
    None
  };

  let repo = Arc::new(CatalogRepository::new(
    client,
    Arc::new(store),
    connectivity,
    RepositorySettings {
      page_size: config.catalog.page_size,
      sweep_concurrency: config.sync.concurrency,
    },
  ));

  let result = run(args.command, &repo, &config).await;

  if let Some(handle) = probe {
    handle.abort();
  }
  result
}

async fn run(command: Command, repo: &Arc<Repository>, config: &Config) -> Result<()> {
  let images = config.images;

  match command {
    Command::Top { page } => {
      let resolved = repo.resolve_page(page).await?;
      print_source(&resolved);
      print_list(&resolved.data.data);
      let pagination = resolved.data.pagination;
      println!(
        "page {} of {}{}",
        pagination.current_page,
        pagination.last_visible_page,
        if pagination.has_next_page { ", more available" } else { "" }
      );
    }

    Command::Browse { pages } => {
      let pager = CatalogPager::new(Arc::clone(repo), config.catalog.max_items);
      pager.load_first().await?;
      for _ in 1..pages {
        if pager.load_more().await? == LoadOutcome::Exhausted {
          break;
        }
      }
      let state = pager.snapshot();
      print_list(&state.items);
      println!(
        "{} items through page {}{}",
        state.items.len(),
        state.current_page,
        if state.has_next { ", more available" } else { "" }
      );
    }

    Command::Show { id } => {
      let resolved = repo.resolve_once(id).await?;
      print_source(&resolved);
      print_detail(&resolved.data, images);
    }

    Command::Watch { id } => {
      let mut subscription = repo.resolve(id)?;
      loop {
        tokio::select! {
          emission = subscription.next() => match emission {
            Some(Ok(resolved)) => {
              print_source(&resolved);
              print_detail(&resolved.data, images);
              println!();
            }
            Some(Err(e)) => {
              eprintln!("error: {}", e);
              if !e.is_retryable() {
                break;
              }
            }
            None => break,
          },
          _ = tokio::signal::ctrl_c() => break,
        }
      }
    }

    Command::Cast { id } => {
      let resolved = repo.resolve_cast_once(id).await?;
      print_source(&resolved);
      if resolved.data.is_empty() {
        println!("no characters known");
      }
      for member in &resolved.data {
        print_cast_member(member, images);
      }
    }

    Command::Search { query } => {
      let found = repo.search(&query)?;
      if found.is_empty() {
        println!("no cached titles match {:?}", query);
      }
      print_list(&found);
    }

    Command::Sync { max_age } => {
      if !repo.connectivity().is_online() {
        return Err(eyre!("Cannot sync while offline"));
      }
      let max_age = Duration::from_secs(max_age.unwrap_or(config.sync.stale_after_secs));
      let items = repo.sync_stale(max_age).await;
      let cast = repo.sync_stale_cast(max_age).await;
      println!(
        "catalog: {} stale, {} refreshed, {} missing, {} failed",
        items.scanned, items.refreshed, items.missing, items.failed
      );
      println!(
        "cast:    {} stale, {} refreshed, {} failed",
        cast.scanned, cast.refreshed, cast.failed
      );
    }

    Command::Status => {
      let store = repo.store();
      println!(
        "connectivity: {}",
        if repo.connectivity().is_online() { "online" } else { "offline" }
      );
      println!("database:     {}", config.storage.database_path()?.display());
      println!("titles:       {}", store.count_items()?);
      println!("characters:   {}", store.count_cast()?);
    }

    Command::Clear => {
      repo.clear()?;
      println!("cache cleared");
    }
  }

  Ok(())
}

fn print_source<T>(resolved: &Resolved<T>) {
  match resolved.cached_at {
    Some(at) => println!(
      "[{}, cached {}]",
      resolved.source.label(),
      at.format("%Y-%m-%d %H:%M")
    ),
    None => println!("[{}]", resolved.source.label()),
  }
}

fn print_list(items: &[CatalogItem]) {
  for item in items {
    let rank = item
      .rank
      .map(|r| format!("#{}", r))
      .unwrap_or_else(|| "-".to_string());
    let score = item
      .score
      .map(|s| format!("{:.2}", s))
      .unwrap_or_else(|| "n/a".to_string());
    println!("{:>6}  {:>5}  {:>7}  {}", rank, score, item.id, item.display_title());
  }
}

fn print_detail(item: &CatalogItem, images: ImagePolicy) {
  println!("{} ({})", item.display_title(), item.id);
  if item.display_title() != item.title {
    println!("  {}", item.title);
  }
  if let Some(japanese) = &item.title_japanese {
    println!("  {}", japanese);
  }

  let mut facts = Vec::new();
  if let Some(kind) = &item.kind {
    facts.push(kind.clone());
  }
  if let Some(episodes) = item.episodes {
    facts.push(format!("{} eps", episodes));
  }
  if let Some(status) = &item.status {
    facts.push(status.clone());
  }
  if let (Some(season), Some(year)) = (&item.season, item.year) {
    facts.push(format!("{} {}", season, year));
  }
  if !facts.is_empty() {
    println!("  {}", facts.join(" | "));
  }

  if let Some(score) = item.score {
    match item.scored_by {
      Some(votes) => println!("  score {:.2} ({} votes)", score, votes),
      None => println!("  score {:.2}", score),
    }
  }
  if let Some(rank) = item.rank {
    println!("  rank #{}", rank);
  }
  if !item.genres.is_empty() {
    let genres: Vec<&str> = item.genres.iter().map(|g| g.name.as_str()).collect();
    println!("  genres: {}", genres.join(", "));
  }
  if !item.studios.is_empty() {
    let studios: Vec<&str> = item.studios.iter().map(|s| s.name.as_str()).collect();
    println!("  studios: {}", studios.join(", "));
  }

  if images.show_posters() {
    if let Some(poster) = item.images.best() {
      println!("  poster: {}", poster);
    }
  }
  if let Some(trailer) = &item.trailer {
    if let Some(url) = &trailer.url {
      println!("  trailer: {}", url);
    }
    if images.show_trailer_thumbnails() {
      if let Some(thumbnail) = &trailer.thumbnail {
        println!("  trailer thumbnail: {}", thumbnail);
      }
    }
  }

  if let Some(synopsis) = &item.synopsis {
    println!();
    println!("{}", synopsis);
  }
}

fn print_cast_member(member: &CastMember, images: ImagePolicy) {
  let voices: Vec<String> = member
    .voice_actors
    .iter()
    .map(|va| format!("{} ({})", va.name, va.language))
    .collect();

  if voices.is_empty() {
    println!("{:<10} {}", member.role, member.name);
  } else {
    println!("{:<10} {}  - {}", member.role, member.name, voices.join(", "));
  }

  if images.show_character_images() {
    if let Some(image) = member.images.best() {
      println!("           {}", image);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn command(argv: &[&str]) -> Command {
    Args::try_parse_from(argv).unwrap().command
  }

  #[test]
  fn test_local_commands_skip_network() {
    assert!(!command(&["jikan-sync", "search", "bebop"]).uses_network());
    assert!(!command(&["jikan-sync", "clear"]).uses_network());
  }

  #[test]
  fn test_remote_commands_use_network() {
    assert!(command(&["jikan-sync", "show", "5"]).uses_network());
    assert!(command(&["jikan-sync", "top", "--page", "2"]).uses_network());
    assert!(command(&["jikan-sync", "sync", "--max-age", "60"]).uses_network());
    assert!(command(&["jikan-sync", "--offline", "watch", "5"]).uses_network());
  }

  #[test]
  fn test_global_flags_after_subcommand() {
    let args = Args::try_parse_from(["jikan-sync", "status", "--offline"]).unwrap();
    assert!(args.offline);
    assert!(matches!(args.command, Command::Status));
  }
}
