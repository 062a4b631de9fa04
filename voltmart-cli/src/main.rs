//! Voltmart CLI
//!
//! Drives the sync layer against a seeded in-memory marketplace backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voltmart_cache::{CacheConfig, CachedFetcher, TypedCache};
use voltmart_core::constants::LISTINGS_COLLECTION;
use voltmart_core::traits::decode_all;
use voltmart_core::types::{ChartAggregate, GeoPoint, Listing, MapRegion, Profile};
use voltmart_core::SyncConfig;
use voltmart_feed::{FeedConfig, LoadOutcome, PaginatedFeed, RefreshOutcome};
use voltmart_gate::KeyedRefreshGate;
use voltmart_query::DebouncedQuery;
use voltmart_remote::{fixtures, MemoryDataSource};

type Source = Arc<MemoryDataSource>;

/// Voltmart - EV marketplace sync layer
#[derive(Parser)]
#[command(name = "voltmart")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Listings to seed the in-memory backend with
    #[arg(long, global = true, default_value = "45")]
    listings: u64,

    /// Simulated backend latency in milliseconds
    #[arg(long, global = true, default_value = "120", env = "VOLTMART_LATENCY_MS")]
    latency_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through the listings feed, then refresh it
    Feed {
        /// Maximum pages to load
        #[arg(short, long, default_value = "10")]
        pages: u64,
    },

    /// Bump a listing to the top, tapping the button repeatedly
    Bump {
        /// Index of the listing in the seeded feed
        index: u64,
        /// Simultaneous taps
        #[arg(short, long, default_value = "5")]
        taps: usize,
    },

    /// Simulate dragging the map from Hamburg to Berlin
    Pan {
        /// Camera updates during the drag
        #[arg(short, long, default_value = "20")]
        steps: u32,
        /// Milliseconds between camera updates
        #[arg(short, long, default_value = "100")]
        interval_ms: u64,
    },

    /// Look up a seller profile through the cache
    Profile {
        /// Seller number
        seller: u64,
        /// Lookups to perform
        #[arg(short, long, default_value = "3")]
        repeat: u32,
    },

    /// Show price history for a make and model
    Chart {
        /// Manufacturer, e.g. Tesla
        make: String,
        /// Model, e.g. "Model 3"
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "voltmart=debug,info"
    } else {
        "voltmart=info,warn"
    };
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()));
    if cli.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = SyncConfig::from_env();
    config.validate().context("Invalid sync configuration")?;

    let source: Source = Arc::new(MemoryDataSource::new());
    fixtures::seed_marketplace(&source, cli.listings).context("Failed to seed backend")?;
    source.set_latency(Duration::from_millis(cli.latency_ms));
    tracing::debug!(listings = cli.listings, latency_ms = cli.latency_ms, "Backend seeded");

    match cli.command {
        Commands::Feed { pages } => cmd_feed(source, &config, pages).await,
        Commands::Bump { index, taps } => cmd_bump(&source, &config, index, taps).await,
        Commands::Pan { steps, interval_ms } => cmd_pan(source, &config, steps, interval_ms).await,
        Commands::Profile { seller, repeat } => cmd_profile(source, &config, seller, repeat).await,
        Commands::Chart { make, model } => cmd_chart(source, &config, &make, &model).await,
    }
}

/// Page through the feed and refresh it twice
async fn cmd_feed(source: Source, config: &SyncConfig, pages: u64) -> Result<()> {
    println!("{}", "📜 Paging through listings...".cyan().bold());

    let feed: PaginatedFeed<Listing, _> =
        PaginatedFeed::new(source, FeedConfig::from_sync(LISTINGS_COLLECTION, config));

    for _ in 0..pages {
        match feed.load_next_page().await.context("Failed to load page")? {
            LoadOutcome::Loaded { count, has_more } => {
                let state = feed.state();
                println!(
                    "   {} page {} (+{} listings, {} total)",
                    "✓".green(),
                    state.current_page,
                    count,
                    state.len()
                );
                if !has_more {
                    println!("   {}", "End of feed reached".dimmed());
                    break;
                }
            }
            LoadOutcome::Exhausted => break,
            other => println!("   {} {:?}", "…".yellow(), other),
        }
    }

    if let Some(newest) = feed.items().first() {
        println!(
            "\n   {} {} ({})",
            "Newest:".dimmed(),
            newest.title,
            format_price(newest.price_cents)
        );
    }

    println!("\n{}", "🔄 Pulling to refresh twice...".cyan().bold());
    for attempt in 1..=2 {
        match feed.refresh().await.context("Failed to refresh feed")? {
            RefreshOutcome::Refreshed { count, has_more } => println!(
                "   {} attempt {}: {} listings, more: {}",
                "✓".green(),
                attempt,
                count,
                has_more
            ),
            RefreshOutcome::Throttled { remaining } => println!(
                "   {} attempt {}: try again in {}",
                "⏳".yellow(),
                attempt,
                format_remaining(remaining)
            ),
            RefreshOutcome::Superseded => println!("   {} attempt {}: superseded", "…".yellow(), attempt),
        }
    }

    Ok(())
}

/// Bump a listing with several simultaneous taps
async fn cmd_bump(source: &Source, config: &SyncConfig, index: u64, taps: usize) -> Result<()> {
    let listing = fixtures::sample_listing(index);
    println!("{} {}", "🚀 Bumping:".cyan().bold(), listing.title);

    let gate = KeyedRefreshGate::new(config.listing_bump_cooldown);
    let key = listing.id.to_string();

    let attempts = futures::future::join_all((0..taps).map(|_| async { gate.try_acquire(&key) })).await;
    let admitted = attempts.iter().filter(|ok| **ok).count();

    if admitted > 0 {
        let promoted = source
            .promote_listing(listing.id, Utc::now())
            .context("Failed to promote listing")?;
        println!("   {} moved to the top of the feed", "✅".green());
        if let Some(at) = promoted.promoted_at {
            println!("   {} {}", "Promoted at:".dimmed(), at.to_rfc3339());
        }
    }
    println!("   {} of {} taps went through", admitted, taps);
    println!(
        "   {} {}",
        "Next bump in:".dimmed(),
        format_remaining(gate.time_remaining(&key))
    );

    let neighbour = fixtures::sample_listing(index + 1);
    let independent = gate.try_acquire(&neighbour.id.to_string());
    println!(
        "   {} {} can still be bumped: {}",
        "Other listing:".dimmed(),
        neighbour.title,
        independent
    );

    Ok(())
}

/// Drag the map and let the debouncer decide what to fetch
async fn cmd_pan(source: Source, config: &SyncConfig, steps: u32, interval_ms: u64) -> Result<()> {
    println!(
        "{} {} camera updates, {}ms apart",
        "🗺️  Dragging the map:".cyan().bold(),
        steps,
        interval_ms
    );

    let query = DebouncedQuery::new(config.map_debounce_delay, {
        let source = source.clone();
        move |region: MapRegion| {
            let source = source.clone();
            async move { decode_all::<Listing>(source.fetch_in_region(region, 50).await?) }
        }
    });
    let mut updates = query.subscribe();

    let start = MapRegion::around(GeoPoint::new(53.55, 9.99), 0.5, 0.5)?;
    let target = GeoPoint::new(52.52, 13.40);
    let steps = steps.max(1);
    let d_lat = (target.lat - start.center().lat) / f64::from(steps);
    let d_lon = (target.lon - start.center().lon) / f64::from(steps);

    let started = Instant::now();
    let mut region = start;
    for _ in 0..steps {
        region = region.panned(d_lat, d_lon);
        query.trigger(region);
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }

    let latest = query.generation();
    let snapshot = updates
        .wait_for(|s| s.generation == latest && !s.in_flight)
        .await
        .context("Debouncer stopped before answering")?
        .clone();

    let stats = query.stats();
    println!(
        "\n   {} {} triggers, {} queries sent, {} stale responses dropped",
        "✓".green(),
        stats.triggered,
        stats.executed,
        stats.discarded
    );
    println!("   {} {:?}", "Settled after:".dimmed(), started.elapsed());

    if let Some(err) = snapshot.error {
        println!("   {} {}", "❌ Query failed:".red(), err);
        return Ok(());
    }
    let listings = snapshot.result.unwrap_or_default();
    println!("   {} {} listings in view", "📍".green(), listings.len());
    for listing in listings.iter().take(5) {
        println!(
            "      {} {} ({:.2}, {:.2})",
            listing.title,
            format_price(listing.price_cents).dimmed(),
            listing.location.lat,
            listing.location.lon
        );
    }

    Ok(())
}

/// Repeated profile lookups through the cache
async fn cmd_profile(source: Source, config: &SyncConfig, seller: u64, repeat: u32) -> Result<()> {
    println!("{} seller-{}", "👤 Loading profile:".cyan().bold(), seller);

    let cache = Arc::new(TypedCache::with_config(CacheConfig::from(config)));
    let fetcher = CachedFetcher::new(cache.clone(), source);
    let id = fixtures::sample_seller_id(seller).to_string();

    for attempt in 1..=repeat.max(1) {
        let start = Instant::now();
        let profile: Profile = fetcher
            .get_or_fetch(&id)
            .await
            .context("Failed to load profile")?;
        println!(
            "   {} #{} {} ({} active listings) in {:?}",
            "✓".green(),
            attempt,
            profile.display_name,
            profile.active_listings,
            start.elapsed()
        );
    }

    println!("\n{}", "📋 Cache stats (JSON):".yellow().bold());
    println!("{}", serde_json::to_string_pretty(&cache.stats())?);

    Ok(())
}

/// Price history through the cache
async fn cmd_chart(source: Source, config: &SyncConfig, make: &str, model: &str) -> Result<()> {
    let slug = ChartAggregate::slug(make, model);
    println!("{} {}", "📈 Price history:".cyan().bold(), slug);

    let cache = Arc::new(TypedCache::with_config(CacheConfig::from(config)));
    let fetcher = CachedFetcher::new(cache, source);

    let chart: ChartAggregate = fetcher
        .get_or_fetch(&slug)
        .await
        .with_context(|| format!("No price history for {make} {model}"))?;

    for point in &chart.points {
        println!(
            "   {} {:>12} ({} listings)",
            point.date,
            format_price(point.median_cents),
            point.sample_size
        );
    }
    if let Some(latest) = chart.latest_median() {
        println!("\n   {} {}", "Latest median:".green().bold(), format_price(latest));
    }

    Ok(())
}

fn format_price(cents: u64) -> String {
    let euros = cents / 100;
    let mut digits = euros.to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        grouped = format!(",{tail}{grouped}");
    }
    format!("€{digits}{grouped}")
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    match secs {
        s if s >= 86_400 => format!("{}d {}h", s / 86_400, (s % 86_400) / 3_600),
        s if s >= 3_600 => format!("{}h {}m", s / 3_600, (s % 3_600) / 60),
        s if s >= 60 => format!("{}m {}s", s / 60, s % 60),
        _ => format!("{:.1}s", remaining.as_secs_f64()),
    }
}
