//! iNaturalist command-line tool
//!
//! Search taxa and observations, download photos into the local image cache
//! and maintain that cache.

use clap::{Args, Parser, Subcommand};
use inat_api_client::{HistogramInterval, PhotoSize};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;
mod progress;

use context::Context;

/// Query iNaturalist and manage the local photo cache
#[derive(Parser)]
#[command(name = "inat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (default: ./inat.toml, then the user config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up taxa
    Taxa {
        #[command(subcommand)]
        command: TaxaCommand,
    },

    /// Search and count observations
    Observations {
        #[command(subcommand)]
        command: ObservationsCommand,
    },

    /// Download photos into the cache
    Images {
        #[command(subcommand)]
        command: ImagesCommand,
    },

    /// Inspect or clean the image cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Show effective settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum TaxaCommand {
    /// Search taxa by name
    Search {
        /// Name query
        query: String,

        /// Restrict to one rank, e.g. species
        #[arg(short, long)]
        rank: Option<String>,

        /// Results to fetch (max 200)
        #[arg(short = 'n', long, default_value = "30")]
        per_page: u32,
    },

    /// Show a single taxon
    Show {
        /// Taxon ID
        id: u64,

        /// Also list its ancestors
        #[arg(short, long)]
        ancestors: bool,
    },

    /// Complete a partial name
    Autocomplete {
        /// Partial name
        query: String,

        /// Suggestions to fetch
        #[arg(short = 'n', long, default_value = "10")]
        per_page: u32,
    },
}

/// Point and radius filter
#[derive(Args, Debug, Clone, Copy)]
pub struct LocationArgs {
    /// Latitude
    #[arg(long, requires_all = ["lng", "radius"], allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, requires_all = ["lat", "radius"], allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Radius in km
    #[arg(long, requires_all = ["lat", "lng"])]
    pub radius: Option<f64>,
}

#[derive(Subcommand)]
enum ObservationsCommand {
    /// Search observations
    Search {
        /// Taxon ID
        #[arg(long)]
        taxon_id: Option<u64>,

        /// Place ID
        #[arg(long)]
        place_id: Option<u64>,

        #[command(flatten)]
        location: LocationArgs,

        /// research, needs_id or casual
        #[arg(short, long)]
        quality_grade: Option<String>,

        /// Only observations with photos
        #[arg(long)]
        photos: bool,

        /// Page size (max 200)
        #[arg(short = 'n', long, default_value = "30")]
        per_page: u32,

        /// Pages to fetch
        #[arg(long, default_value = "1")]
        max_pages: u32,
    },

    /// Count matching observations
    Count {
        /// Taxon ID
        #[arg(long)]
        taxon_id: Option<u64>,

        /// Place ID
        #[arg(long)]
        place_id: Option<u64>,
    },

    /// Observation tallies per species
    SpeciesCounts {
        /// Place ID
        #[arg(long)]
        place_id: Option<u64>,

        #[command(flatten)]
        location: LocationArgs,

        /// Species to list (max 200)
        #[arg(short = 'n', long, default_value = "20")]
        per_page: u32,
    },

    /// Users with the most identifications
    Identifiers {
        #[command(flatten)]
        filter: UserFilterArgs,
    },

    /// Users with the most observations
    Observers {
        #[command(flatten)]
        filter: UserFilterArgs,
    },

    /// Observation counts over time
    Histogram {
        /// year, month, week, day, hour, month_of_year or week_of_year
        #[arg(short, long, default_value = "month")]
        interval: HistogramInterval,

        /// Taxon ID
        #[arg(long)]
        taxon_id: Option<u64>,

        /// Place ID
        #[arg(long)]
        place_id: Option<u64>,
    },
}

/// Filters for the per-user rankings
#[derive(Args, Debug, Clone, Copy)]
pub struct UserFilterArgs {
    /// Taxon ID
    #[arg(long)]
    pub taxon_id: Option<u64>,

    /// Place ID
    #[arg(long)]
    pub place_id: Option<u64>,

    /// Users to list (max 200)
    #[arg(short = 'n', long, default_value = "10")]
    pub per_page: u32,
}

#[derive(Subcommand)]
enum ImagesCommand {
    /// Download research-grade photos of a taxon
    Species {
        /// Taxon ID
        taxon_id: u64,

        /// Photo size: square, thumb, small, medium, large, original
        #[arg(short, long, default_value = "medium")]
        size: PhotoSize,

        /// Maximum photos
        #[arg(short, long, default_value = "10")]
        max: usize,
    },

    /// Download the photos of one observation
    Observation {
        /// Observation ID
        id: u64,

        /// Photo size: square, thumb, small, medium, large, original
        #[arg(short, long, default_value = "medium")]
        size: PhotoSize,
    },

    /// Download arbitrary image URLs
    Fetch {
        /// Image URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Refetch even when cached
        #[arg(short, long)]
        force: bool,
    },

    /// Show remote size and cache state of an image
    Info {
        /// Image URL
        url: String,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show cache size and age
    Stats,

    /// Remove cached images
    Evict {
        /// Remove images older than this many days
        /// (default: cache.max_age_days from settings, else everything)
        #[arg(long)]
        max_age_days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings
    Show,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("inat=debug,inat_api_client=debug,inat_core=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("inat=info,inat_api_client=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(cli.config.as_deref(), cli.json)?;

    match cli.command {
        Commands::Taxa { command } => match command {
            TaxaCommand::Search {
                query,
                rank,
                per_page,
            } => commands::taxa::search(&ctx, &query, rank, per_page),
            TaxaCommand::Show { id, ancestors } => commands::taxa::show(&ctx, id, ancestors),
            TaxaCommand::Autocomplete { query, per_page } => {
                commands::taxa::autocomplete(&ctx, &query, per_page)
            }
        },
        Commands::Observations { command } => match command {
            ObservationsCommand::Search {
                taxon_id,
                place_id,
                location,
                quality_grade,
                photos,
                per_page,
                max_pages,
            } => commands::observations::search(
                &ctx,
                &commands::observations::SearchArgs {
                    taxon_id,
                    place_id,
                    location,
                    quality_grade,
                    photos,
                    per_page,
                    max_pages,
                },
            ),
            ObservationsCommand::Count { taxon_id, place_id } => {
                commands::observations::count(&ctx, taxon_id, place_id)
            }
            ObservationsCommand::SpeciesCounts {
                place_id,
                location,
                per_page,
            } => commands::observations::species_counts(&ctx, place_id, location, per_page),
            ObservationsCommand::Identifiers { filter } => {
                commands::observations::identifiers(&ctx, filter)
            }
            ObservationsCommand::Observers { filter } => {
                commands::observations::observers(&ctx, filter)
            }
            ObservationsCommand::Histogram {
                interval,
                taxon_id,
                place_id,
            } => commands::observations::histogram(&ctx, interval, taxon_id, place_id),
        },
        Commands::Images { command } => match command {
            ImagesCommand::Species {
                taxon_id,
                size,
                max,
            } => commands::images::species(&ctx, taxon_id, size, max),
            ImagesCommand::Observation { id, size } => commands::images::observation(&ctx, id, size),
            ImagesCommand::Fetch { urls, force } => commands::images::fetch(&ctx, &urls, force),
            ImagesCommand::Info { url } => commands::images::info(&ctx, &url),
        },
        Commands::Cache { command } => match command {
            CacheCommand::Stats => commands::cache::stats(&ctx),
            CacheCommand::Evict { max_age_days } => commands::cache::evict(&ctx, max_age_days),
        },
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config::show(&ctx),
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
