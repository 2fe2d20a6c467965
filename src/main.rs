mod index;
mod infobox;
mod pipeline;
mod ratings;
mod text;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use config::Config;
use tracing::warn;

const USER_AGENT: &str = concat!("disney_scraper/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(
    name = "disney_scraper",
    about = "Scrape Walt Disney film infoboxes from Wikipedia, enriched with OMDb ratings"
)]
struct Cli {
    /// Output JSON file
    #[arg(short, long, default_value = "WaltDisneyDataset.json")]
    output: PathBuf,
    /// Max index entries to process (default: all)
    #[arg(short = 'n', long)]
    limit: Option<usize>,
    /// Skip the OMDb lookup and record null scores
    #[arg(long)]
    skip_ratings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let credentials = load_credentials();
    if credentials.is_empty() && !cli.skip_ratings {
        warn!("No OMDB_* credentials in the environment; ratings lookups will likely fail");
    }

    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let mut refs = index::fetch_index(&client).await?;
    if let Some(limit) = cli.limit {
        refs.truncate(limit);
    }

    println!("Processing {} index entries...", refs.len());
    let (records, stats) = pipeline::run(&client, refs, &credentials, cli.skip_ratings).await?;
    pipeline::write_dataset(&cli.output, &records)?;

    stats.print();
    println!("Wrote {} records to {}", records.len(), cli.output.display());

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("Done in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

/// OMDb credentials from `OMDB_*` environment variables, as an opaque list
/// of query parameters (e.g. `OMDB_APIKEY=xyz` becomes `apikey=xyz`).
fn load_credentials() -> Vec<(String, String)> {
    let settings = Config::builder()
        .add_source(config::Environment::with_prefix("OMDB"))
        .build()
        .unwrap_or_default();

    let mut credentials: Vec<(String, String)> = settings
        .try_deserialize::<HashMap<String, String>>()
        .unwrap_or_default()
        .into_iter()
        .collect();
    credentials.sort();
    credentials
}
