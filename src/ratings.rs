//! Ratings enricher: OMDb lookup keyed by exact film title.

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

const OMDB_URL: &str = "http://www.omdbapi.com/";

/// Scores for one film. `None` covers both a missing field and the service's
/// literal "N/A", so callers see a single absent sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ratings {
    pub imdb_score: Option<String>,
    pub metascore: Option<String>,
}

/// Query OMDb with the configured credentials plus `t=<title>`. Any
/// transport or decode failure is folded to `None`; the caller records null
/// scores and moves on. Title matching is exact on the service side, so a
/// disambiguated Wikipedia title may simply find nothing.
pub async fn fetch_ratings(
    client: &Client,
    credentials: &[(String, String)],
    title: &str,
) -> Option<Ratings> {
    let result = client
        .get(OMDB_URL)
        .query(credentials)
        .query(&[("t", title)])
        .send()
        .await;

    match result {
        Ok(resp) => match resp.json::<Value>().await {
            Ok(body) => Some(extract_scores(&body)),
            Err(e) => {
                warn!("Bad ratings response for {:?}: {}", title, e);
                None
            }
        },
        Err(e) => {
            warn!("Ratings request failed for {:?}: {}", title, e);
            None
        }
    }
}

/// Pull `imdbRating` and `Metascore` out of an OMDb response body.
pub fn extract_scores(body: &Value) -> Ratings {
    Ratings {
        imdb_score: score_field(body, "imdbRating"),
        metascore: score_field(body, "Metascore"),
    }
}

fn score_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| *s != "N/A")
        .map(str::to_string)
}
