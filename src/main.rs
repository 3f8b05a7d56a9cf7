mod extract;
mod geocode;
mod input;
mod pipeline;
mod settings;
mod standardize;
mod table;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use geocode::{CoordinateResolver, GeocodeCache, NominatimClient};
use settings::Settings;

#[derive(Parser)]
#[command(name = "school_mapper", about = "Normalize and geocode exchange partner school records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the raw snapshot and geocode every record
    Run {
        /// Raw records JSON (default: configured input_path)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output CSV table (default: configured output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max records to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Skip the geocoding stage, leave coordinates empty
        #[arg(long)]
        no_geocode: bool,
    },
    /// Re-resolve records still missing coordinates with expanded queries
    Retry {
        /// Table to update in place (default: configured output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max records to retry (default: all unresolved)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show table and cache statistics
    Stats,
    /// Partner schools overview table
    Overview {
        /// Filter by region (e.g. 歐洲)
        #[arg(short, long)]
        region: Option<String>,
        /// Filter by country substring (matches Chinese or English form)
        #[arg(short, long)]
        country: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run { input, output, limit, no_geocode } => {
            let input = input.unwrap_or_else(|| settings.input_path.clone());
            let output = output.unwrap_or_else(|| settings.output_path.clone());
            let resolver = build_resolver(&settings, settings.request_delay(), settings.timeout())?;
            println!("Processing {} -> {}", input.display(), output.display());
            let summary = pipeline::run(
                &input,
                &output,
                &resolver,
                !no_geocode,
                limit,
                settings.checkpoint_every,
            )?;
            summary.print();
            Ok(())
        }
        Commands::Retry { output, limit } => {
            let output = output.unwrap_or_else(|| settings.output_path.clone());
            if !output.exists() {
                println!("No table at {}. Run 'run' first.", output.display());
                return Ok(());
            }
            let resolver =
                build_resolver(&settings, settings.retry_delay(), settings.retry_timeout())?;
            println!("Retrying unresolved records in {}", output.display());
            let stats = pipeline::run_retry(&output, &resolver, limit, settings.checkpoint_every)?;
            stats.print();
            Ok(())
        }
        Commands::Stats => {
            if !settings.output_path.exists() {
                println!("No table at {}. Run 'run' first.", settings.output_path.display());
                return Ok(());
            }
            let records = table::read_table(&settings.output_path)?;
            let geocoded = records.iter().filter(|r| !r.missing_coordinates()).count();
            let named = records.iter().filter(|r| r.name_en.is_some()).count();
            println!("Records:       {}", records.len());
            println!("Geocoded:      {}", geocoded);
            println!("Unresolved:    {}", records.len() - geocoded);
            println!("English names: {}", named);

            let mut by_region: BTreeMap<&str, usize> = BTreeMap::new();
            for r in &records {
                *by_region.entry(r.region.as_str()).or_default() += 1;
            }
            println!("\nBy region:");
            for (region, count) in by_region {
                println!("  {:<4} {:>5}", region, count);
            }

            if settings.cache_path.exists() {
                let cache = GeocodeCache::open(&settings.cache_path)?;
                let s = cache.stats()?;
                println!("\nCache: {} found, {} not found", s.found, s.not_found);
            }
            Ok(())
        }
        Commands::Overview { region, country, limit } => {
            if !settings.output_path.exists() {
                println!("No table at {}. Run 'run' first.", settings.output_path.display());
                return Ok(());
            }
            let records = table::read_table(&settings.output_path)?;
            let rows: Vec<_> = records
                .iter()
                .filter(|r| region.as_deref().map_or(true, |want| r.region == want))
                .filter(|r| {
                    country.as_deref().map_or(true, |want| {
                        r.country.contains(want) || r.country_en.contains(want)
                    })
                })
                .take(limit)
                .collect();
            if rows.is_empty() {
                println!("No matching records.");
                return Ok(());
            }

            // Compact, readable table
            println!(
                "{:>4} | {:<28} | {:<10} | {:<4} | {:>8} | {:>9} | {:<16}",
                "#", "School", "Country", "Reg", "Lat", "Lon", "Colleges"
            );
            println!("{}", "-".repeat(98));

            for r in &rows {
                let name = truncate(r.preferred_name(), 28);
                let colleges = truncate(r.colleges.as_deref().unwrap_or("-"), 16);
                let lat = r.latitude.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".into());
                let lon = r.longitude.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".into());

                println!(
                    "{:>4} | {:<28} | {:<10} | {:<4} | {:>8} | {:>9} | {:<16}",
                    r.id,
                    name,
                    truncate(&r.country, 10),
                    r.region,
                    lat,
                    lon,
                    colleges
                );
            }

            println!("\n{} records shown", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_resolver(
    settings: &Settings,
    delay: Duration,
    timeout: Duration,
) -> anyhow::Result<CoordinateResolver<NominatimClient>> {
    let cache = GeocodeCache::open(&settings.cache_path)?;
    let client =
        NominatimClient::new(&settings.nominatim_url, &settings.user_agent, delay, timeout)?;
    Ok(CoordinateResolver::new(cache, client))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
