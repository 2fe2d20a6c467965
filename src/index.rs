//! Index fetcher: the Wikipedia list page of Walt Disney Pictures films.
//!
//! Every sortable wikitable on the page lists films as italicized links;
//! each link yields one [`MovieRef`].

use std::sync::LazyLock;

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::info;
use url::Url;

const INDEX_URL: &str = "https://en.wikipedia.org/wiki/List_of_Walt_Disney_Pictures_films";
const BASE_URL: &str = "https://en.wikipedia.org";

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable.sortable").unwrap());
static ITALIC_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("i").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// One film row from the index: the link's title attribute and its href
/// resolved against the site base. Both are `None` when either attribute is
/// missing or the href does not resolve; such entries are skipped downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRef {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Fetch the film index page. Failure here is fatal for the whole run.
pub async fn fetch_index(client: &Client) -> Result<Vec<MovieRef>> {
    info!("Fetching film index: {}", INDEX_URL);
    let html = client
        .get(INDEX_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .context("Failed to fetch the film index page")?;

    let refs = parse_index(&html);
    info!("Index entries found: {}", refs.len());
    Ok(refs)
}

/// Extract every italicized link inside every sortable wikitable, in document
/// order. Extraction failures are per-link, never per-page.
pub fn parse_index(html: &str) -> Vec<MovieRef> {
    let doc = Html::parse_document(html);
    let mut refs = Vec::new();
    for table in doc.select(&TABLE_SEL) {
        for italic in table.select(&ITALIC_SEL) {
            for link in italic.select(&LINK_SEL) {
                refs.push(parse_link(link));
            }
        }
    }
    refs
}

fn parse_link(link: ElementRef<'_>) -> MovieRef {
    let title = link.value().attr("title");
    let url = link.value().attr("href").and_then(|href| {
        let base = Url::parse(BASE_URL).ok()?;
        base.join(href).ok().map(|u| u.to_string())
    });

    match (title, url) {
        (Some(title), Some(url)) => MovieRef {
            title: Some(title.to_string()),
            url: Some(url),
        },
        _ => MovieRef {
            title: None,
            url: None,
        },
    }
}
