//! Aggregator: drives the per-movie loop and writes the dataset.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::index::MovieRef;
use crate::infobox::{self, FetchError, Infobox};
use crate::ratings::{self, Ratings};

/// One flattened movie: Title first, one key per infobox label in row order,
/// then the two scores. Insertion order is serialization order.
pub type MovieRecord = serde_json::Map<String, Value>;

pub struct RunStats {
    pub indexed: usize,
    pub skipped_no_url: usize,
    pub no_infobox: usize,
    pub records: usize,
}

impl RunStats {
    pub fn print(&self) {
        println!(
            "Indexed {} films: {} records, {} without usable infobox, {} with no link.",
            self.indexed, self.records, self.no_infobox, self.skipped_no_url
        );
    }
}

/// Process index entries in order: skip linkless refs, fetch each infobox,
/// enrich with ratings, collect records. Per-movie failures are logged and
/// skipped; only the caller's index fetch is fatal.
pub async fn run(
    client: &Client,
    refs: Vec<MovieRef>,
    credentials: &[(String, String)],
    skip_ratings: bool,
) -> Result<(Vec<MovieRecord>, RunStats)> {
    let mut stats = RunStats {
        indexed: refs.len(),
        skipped_no_url: 0,
        no_infobox: 0,
        records: 0,
    };

    let pb = ProgressBar::new(refs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut records = Vec::new();
    for movie in refs {
        if let Some(record) =
            process_movie(client, movie, credentials, skip_ratings, &mut stats).await
        {
            records.push(record);
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    stats.records = records.len();
    Ok((records, stats))
}

/// One movie: skip linkless refs, fetch and flatten the infobox, enrich.
/// `None` means no record; the reason is counted in `stats`.
async fn process_movie(
    client: &Client,
    movie: MovieRef,
    credentials: &[(String, String)],
    skip_ratings: bool,
    stats: &mut RunStats,
) -> Option<MovieRecord> {
    let Some(url) = movie.url else {
        stats.skipped_no_url += 1;
        return None;
    };

    let infobox = usable_infobox(infobox::fetch_infobox(client, &url).await, &url, stats)?;
    let Some(title) = infobox.title() else {
        stats.no_infobox += 1;
        warn!("Infobox at {} has no title cell", url);
        return None;
    };

    let ratings = if skip_ratings {
        None
    } else {
        ratings::fetch_ratings(client, credentials, &title).await
    };

    Some(build_record(&title, &infobox, ratings))
}

/// Fold a detail-page fetch outcome into the stats. HTTP failures and pages
/// without an infobox both mean "no record for this movie".
fn usable_infobox(
    outcome: Result<Option<Infobox>, FetchError>,
    url: &str,
    stats: &mut RunStats,
) -> Option<Infobox> {
    match outcome {
        Ok(Some(infobox)) => Some(infobox),
        Ok(None) => {
            stats.no_infobox += 1;
            debug!("No infobox at {}", url);
            None
        }
        Err(e) => {
            stats.no_infobox += 1;
            warn!("Skipping {}: {}", url, e);
            None
        }
    }
}

/// Flatten one infobox plus its ratings into a record. A repeated label
/// overwrites its earlier entry, so the last row wins.
pub fn build_record(title: &str, infobox: &Infobox, ratings: Option<Ratings>) -> MovieRecord {
    let mut record = MovieRecord::new();
    record.insert("Title".into(), Value::String(title.to_string()));

    for label in infobox.labels() {
        match infobox.value(&label) {
            Ok(value) => {
                record.insert(label, value.into());
            }
            // Unreachable for labels() output, but keep the record well-formed
            Err(e) => debug!("{}", e),
        }
    }

    let scores = ratings.unwrap_or(Ratings {
        imdb_score: None,
        metascore: None,
    });
    record.insert("ImdbScore".into(), opt_string(scores.imdb_score));
    record.insert("Metascore".into(), opt_string(scores.metascore));
    record
}

fn opt_string(s: Option<String>) -> Value {
    s.map(Value::String).unwrap_or(Value::Null)
}

/// Serialize the full dataset as pretty JSON (2-space indent, non-ASCII kept
/// as-is) and move it over the target in one rename, so an interrupted run
/// never touches an existing output file.
pub fn write_dataset(path: &Path, records: &[MovieRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move output to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn fantasia() -> Infobox {
        let html = std::fs::read_to_string("tests/fixtures/fantasia.html").unwrap();
        Infobox::parse(&html).unwrap()
    }

    fn empty_stats() -> RunStats {
        RunStats {
            indexed: 0,
            skipped_no_url: 0,
            no_infobox: 0,
            records: 0,
        }
    }

    #[tokio::test]
    async fn refs_without_urls_produce_no_records() {
        let client = Client::new();
        let refs = vec![
            MovieRef {
                title: None,
                url: None,
            },
            MovieRef {
                title: None,
                url: None,
            },
        ];
        // No network: every ref is skipped before any fetch
        let (records, stats) = run(&client, refs, &[], true).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.skipped_no_url, 2);
        assert_eq!(stats.records, 0);
    }

    #[test]
    fn http_failure_means_no_record_and_is_counted() {
        let mut stats = empty_stats();
        let outcome = Err(FetchError::Status(StatusCode::NOT_FOUND));
        assert!(usable_infobox(outcome, "https://en.wikipedia.org/wiki/Missing", &mut stats).is_none());
        assert_eq!(stats.no_infobox, 1);
    }

    #[test]
    fn page_without_infobox_means_no_record_and_is_counted() {
        let mut stats = empty_stats();
        assert!(usable_infobox(Ok(None), "https://en.wikipedia.org/wiki/Plain", &mut stats).is_none());
        assert_eq!(stats.no_infobox, 1);
    }

    #[test]
    fn record_matches_the_worked_example() {
        let infobox = fantasia();
        let ratings = Some(Ratings {
            imdb_score: Some("7.7".into()),
            metascore: Some("96".into()),
        });
        let record = build_record("Fantasia", &infobox, ratings);
        assert_eq!(
            Value::Object(record),
            json!({
                "Title": "Fantasia",
                "Directed By": "Ben Sharpsteen",
                "Produced By": ["Walt Disney", "Ben Sharpsteen"],
                "Running Time": "126 minutes",
                "Country": "United States",
                "ImdbScore": "7.7",
                "Metascore": "96",
            })
        );
    }

    #[test]
    fn failed_enrichment_records_null_scores() {
        let record = build_record("Fantasia", &fantasia(), None);
        assert_eq!(record["ImdbScore"], Value::Null);
        assert_eq!(record["Metascore"], Value::Null);
    }

    #[test]
    fn keys_serialize_in_insertion_order() {
        let record = build_record("Fantasia", &fantasia(), None);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&"Title"));
        assert_eq!(&keys[keys.len() - 2..], ["ImdbScore", "Metascore"]);
    }

    #[test]
    fn record_has_exactly_title_labels_and_scores() {
        let infobox = fantasia();
        let record = build_record("Fantasia", &infobox, None);
        assert_eq!(record.len(), infobox.labels().len() + 3);
    }

    #[test]
    fn dataset_write_is_pretty_printed_and_atomic() {
        let dir = std::env::temp_dir().join("disney_scraper_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dataset.json");

        let record = build_record("Fantasia", &fantasia(), None);
        write_dataset(&path, &[record]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[\n  {\n    \"Title\": \"Fantasia\""));
        assert!(!dir.join("dataset.tmp").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
