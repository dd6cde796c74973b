/// Cadence - command-line streaming player
use anyhow::Context;
use cadence_audio::{DecodingPipeline, HttpRangeFetcher, PacedSink};
use cadence_cache::{AudioCache, RemoveOutcome};
use cadence_catalog::{resolve_uri, HttpCatalog, PageOutcome, SearchPager};
use cadence_cli::config::CadenceConfig;
use cadence_core::{CatalogService, LibraryStore, SearchFilter, SearchItem, TrackId};
use cadence_playback::{PlaybackEvent, PlayerService, PlayerServiceBinder, QueueItem};
use cadence_storage::SqliteLibrary;
use clap::{Parser, Subcommand, ValueEnum};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Stream, queue and cache music from the catalog", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./cadence.toml if present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single song
    Play {
        /// Catalog song id
        id: String,
    },
    /// Play a song and keep going with its radio
    Radio {
        /// Catalog song id seeding the radio
        id: String,
    },
    /// Search the catalog
    Search {
        query: String,
        #[arg(short, long, value_enum, default_value_t = FilterArg::Song)]
        filter: FilterArg,
        /// Number of result pages to fetch
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Play whatever a share link points at (song or playlist)
    Open { uri: String },
    /// Inspect or prune the audio cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// List library playlists
    Playlists,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache occupancy
    Stats,
    /// Drop the cached audio of a song
    Remove { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Song,
    Video,
    Album,
    Artist,
    CommunityPlaylist,
    FeaturedPlaylist,
}

impl From<FilterArg> for SearchFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Song => SearchFilter::Song,
            FilterArg::Video => SearchFilter::Video,
            FilterArg::Album => SearchFilter::Album,
            FilterArg::Artist => SearchFilter::Artist,
            FilterArg::CommunityPlaylist => SearchFilter::CommunityPlaylist,
            FilterArg::FeaturedPlaylist => SearchFilter::FeaturedPlaylist,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = CadenceConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Play { id } => play(&config, &id).await?,
        Commands::Radio { id } => radio(&config, &id).await?,
        Commands::Search {
            query,
            filter,
            pages,
        } => search(&config, &query, filter.into(), pages).await?,
        Commands::Open { uri } => open(&config, &uri).await?,
        Commands::Cache { command } => cache(&config, command)?,
        Commands::Playlists => playlists(&config).await?,
    }

    Ok(())
}

fn open_catalog(config: &CadenceConfig) -> anyhow::Result<Arc<dyn CatalogService>> {
    let catalog = HttpCatalog::new(config.catalog_config()?)?;
    tracing::debug!(base_url = %catalog.base_url(), "Catalog client ready");
    Ok(Arc::new(catalog))
}

fn open_cache(config: &CadenceConfig) -> anyhow::Result<Arc<AudioCache>> {
    let cache = AudioCache::new(config.cache_config())
        .with_context(|| format!("Failed to open cache at {}", config.cache.dir.display()))?;
    Ok(Arc::new(cache))
}

async fn open_library(config: &CadenceConfig) -> anyhow::Result<Arc<SqliteLibrary>> {
    if let Some(parent) = config.database_path().as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let pool = cadence_storage::create_pool(&config.storage.database_url).await?;
    cadence_storage::run_migrations(&pool).await?;
    tracing::info!("Library database ready");
    Ok(Arc::new(SqliteLibrary::new(pool)))
}

/// Build every collaborator and spawn the playback session
async fn start_session(
    config: &CadenceConfig,
) -> anyhow::Result<(PlayerServiceBinder, Arc<dyn CatalogService>)> {
    let catalog = open_catalog(config)?;
    let cache = open_cache(config)?;
    let library = open_library(config).await?;

    let fetcher = HttpRangeFetcher::new(
        tokio::runtime::Handle::current(),
        Duration::from_secs(config.catalog.timeout_secs),
    )?;
    let pipeline = DecodingPipeline::new(
        Arc::clone(&cache),
        Arc::new(fetcher),
        Box::new(PacedSink::new()),
    );

    let store: Arc<dyn LibraryStore> = library;
    let binder = PlayerService::spawn(
        Box::new(pipeline),
        Arc::clone(&catalog),
        cache,
        Some(store),
        config.playback_config(),
    );
    Ok((binder, catalog))
}

async fn lookup_song(catalog: &dyn CatalogService, id: &str) -> anyhow::Result<QueueItem> {
    let song = catalog
        .song(&TrackId::new(id))
        .await?
        .with_context(|| format!("Song not found: {id}"))?;
    Ok(QueueItem::from(song))
}

async fn play(config: &CadenceConfig, id: &str) -> anyhow::Result<()> {
    let (binder, catalog) = start_session(config).await?;
    let events = binder.subscribe();

    let item = lookup_song(catalog.as_ref(), id).await?;
    binder.player().force_play(item).await?;

    follow(binder, events).await
}

async fn radio(config: &CadenceConfig, id: &str) -> anyhow::Result<()> {
    let (binder, catalog) = start_session(config).await?;
    let events = binder.subscribe();

    let item = lookup_song(catalog.as_ref(), id).await?;
    let start = binder.start_radio(item);
    match start.outcome().await {
        Ok(count) => println!("Radio started with {count} songs"),
        Err(e) => println!("Radio unavailable: {e}"),
    }

    follow(binder, events).await
}

async fn open(config: &CadenceConfig, uri: &str) -> anyhow::Result<()> {
    let (binder, catalog) = start_session(config).await?;
    let events = binder.subscribe();

    let songs = resolve_uri(catalog.as_ref(), uri).await?;
    if songs.is_empty() {
        binder.shutdown().await;
        anyhow::bail!("Nothing to play at {uri}");
    }

    println!("Queued {} songs", songs.len());
    let items = songs.into_iter().map(QueueItem::from).collect();
    binder.player().force_play_at_index(items, 0).await?;

    follow(binder, events).await
}

/// Print session events until the queue ends or Ctrl-C
async fn follow(
    binder: PlayerServiceBinder,
    mut events: tokio::sync::broadcast::Receiver<PlaybackEvent>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PlaybackEvent::QueueEnded) => {
                    println!("Queue ended");
                    break;
                }
                Ok(event) => print_event(&binder, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    binder.shutdown().await;
    Ok(())
}

fn print_event(binder: &PlayerServiceBinder, event: &PlaybackEvent) {
    match event {
        PlaybackEvent::TrackChanged { index, track_id } => {
            let snapshot = binder.snapshot();
            match snapshot.items.get(*index) {
                Some(item) => println!(
                    "▶ [{}/{}] {}{}",
                    index + 1,
                    snapshot.items.len(),
                    item.track.title,
                    item.track
                        .artists_text
                        .as_deref()
                        .map(|a| format!(" - {a}"))
                        .unwrap_or_default()
                ),
                None => println!("▶ {track_id}"),
            }
        }
        PlaybackEvent::StateChanged { state } => tracing::debug!(?state, "State changed"),
        PlaybackEvent::TrackFailed {
            track_id,
            reason,
            will_retry,
        } => {
            let action = if *will_retry { "retrying" } else { "skipping" };
            println!("✗ {track_id}: {reason} ({action})");
        }
        PlaybackEvent::RadioExtended { count } => println!("+ {count} songs from radio"),
        PlaybackEvent::RadioFailed { reason } => println!("Radio failed: {reason}"),
        PlaybackEvent::QueueChanged { .. }
        | PlaybackEvent::TrackFinished { .. }
        | PlaybackEvent::QueueEnded => {}
    }
}

async fn search(
    config: &CadenceConfig,
    query: &str,
    filter: SearchFilter,
    pages: usize,
) -> anyhow::Result<()> {
    let pager = SearchPager::new(open_catalog(config)?);
    pager.set_query(query, filter).await;

    for _ in 0..pages.max(1) {
        match pager.load_more().await? {
            PageOutcome::Appended(_) => {}
            PageOutcome::Stale | PageOutcome::Exhausted => break,
        }
    }

    let items = pager.items().await;
    if items.is_empty() {
        println!("No results");
        return Ok(());
    }

    for item in &items {
        match item {
            SearchItem::Song(song) | SearchItem::Video(song) => println!(
                "{}  {}{}",
                song.id,
                song.title,
                song.artists_text
                    .as_deref()
                    .map(|a| format!(" - {a}"))
                    .unwrap_or_default()
            ),
            SearchItem::Album(album) => println!("album     {}", album.title),
            SearchItem::Artist(artist) => println!("artist    {}", artist.name),
            SearchItem::Playlist(playlist) => println!("playlist  {}", playlist.title),
        }
    }
    if pager.has_more().await {
        println!("(more results available, use --pages)");
    }
    Ok(())
}

fn cache(config: &CadenceConfig, command: CacheCommands) -> anyhow::Result<()> {
    let cache = open_cache(config)?;

    match command {
        CacheCommands::Stats => {
            let stats = cache.stats()?;
            println!("Entries:   {}", stats.entries);
            println!(
                "Size:      {:.1} MiB of {:.1} MiB",
                stats.total_bytes as f64 / (1024.0 * 1024.0),
                stats.max_bytes as f64 / (1024.0 * 1024.0)
            );
        }
        CacheCommands::Remove { id } => match cache.remove_resource(&TrackId::new(&id))? {
            RemoveOutcome::Removed => println!("Removed {id}"),
            RemoveOutcome::Deferred => println!("{id} is in use; it will be removed when closed"),
            RemoveOutcome::NotCached => println!("{id} is not cached"),
        },
    }

    cache.flush()?;
    Ok(())
}

async fn playlists(config: &CadenceConfig) -> anyhow::Result<()> {
    let library = open_library(config).await?;
    let previews = library.playlist_previews().await?;

    if previews.is_empty() {
        println!("No playlists");
    }
    for preview in previews {
        println!(
            "{:>4}  {} ({} songs)",
            preview.playlist.id, preview.playlist.name, preview.track_count
        );
    }
    Ok(())
}
