//! Infobox extractor and attribute mapper for film detail pages.
//!
//! A film page carries at most one `table.infobox.vevent`; its rows pair a
//! `th.infobox-label` with a `td.infobox-data`. Text is extracted with
//! citation superscripts and inline spans skipped, so values carry no
//! footnote markers, and non-breaking spaces are folded to plain spaces.

use std::sync::LazyLock;

use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use thiserror::Error;

use crate::text::{collapse_ws, normalize_label};

static INFOBOX_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.infobox.vevent").unwrap());
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th.infobox-above.summary").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th.infobox-label").unwrap());
static DATA_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.infobox-data").unwrap());

/// Fetching a detail page failed. Transport errors and non-success statuses
/// are distinct from the "page has no infobox" case, which is `Ok(None)`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// The requested label has no row in this infobox.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("label {0:?} not found in infobox")]
pub struct LabelNotFound(pub String);

/// One attribute cell: a lone text fragment, or the ordered fragment list
/// when the cell holds several sub-items (e.g. multiple writers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Single(String),
    Many(Vec<String>),
}

impl From<AttrValue> for serde_json::Value {
    fn from(v: AttrValue) -> Self {
        match v {
            AttrValue::Single(s) => serde_json::Value::String(s),
            AttrValue::Many(items) => items.into_iter().collect(),
        }
    }
}

/// An owned page parse scoped to the film's infobox table. All lookups run
/// against the first `table.infobox.vevent` in the document.
pub struct Infobox {
    doc: Html,
}

/// Fetch a film page and locate its infobox. `Ok(None)` means the page has
/// no infobox (expected for some index entries); HTTP failures are explicit
/// errors so the caller can tell the two apart.
pub async fn fetch_infobox(client: &Client, url: &str) -> Result<Option<Infobox>, FetchError> {
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }
    let html = resp.text().await?;
    Ok(Infobox::parse(&html))
}

impl Infobox {
    /// Parse a full page document; `None` when it has no infobox table.
    pub fn parse(html: &str) -> Option<Self> {
        let doc = Html::parse_document(html);
        doc.select(&INFOBOX_SEL).next()?;
        Some(Infobox { doc })
    }

    fn table(&self) -> Option<ElementRef<'_>> {
        // Present by construction; parse() verified it
        self.doc.select(&INFOBOX_SEL).next()
    }

    /// The film title from the infobox header cell.
    pub fn title(&self) -> Option<String> {
        let cell = self.table()?.select(&TITLE_SEL).next()?;
        let text = cell_fragments(cell).join(" ");
        let text = collapse_ws(&text);
        (!text.is_empty()).then_some(text)
    }

    /// Normalized label of every attribute row, in row order. Duplicates are
    /// preserved; the caller's merge into a record keeps the last value.
    pub fn labels(&self) -> Vec<String> {
        let Some(table) = self.table() else {
            return Vec::new();
        };
        table
            .select(&ROW_SEL)
            .filter_map(|row| row.select(&LABEL_SEL).next())
            .map(|cell| normalize_label(&cell_fragments(cell).join(" ")))
            .collect()
    }

    /// Value of the row whose normalized label equals `label` exactly. When
    /// the label recurs, the last matching row wins, mirroring the merge
    /// order of `labels()`. A label with no row is an explicit error, never
    /// a stale value.
    pub fn value(&self, label: &str) -> Result<AttrValue, LabelNotFound> {
        let mut found = None;
        let table = self
            .table()
            .ok_or_else(|| LabelNotFound(label.to_string()))?;
        for row in table.select(&ROW_SEL) {
            let Some(cell) = row.select(&LABEL_SEL).next() else {
                continue;
            };
            if normalize_label(&cell_fragments(cell).join(" ")) == label {
                let fragments = row
                    .select(&DATA_SEL)
                    .next()
                    .map(cell_fragments)
                    .unwrap_or_default();
                found = Some(fragments);
            }
        }

        let mut fragments = found.ok_or_else(|| LabelNotFound(label.to_string()))?;
        if fragments.len() == 1 {
            Ok(AttrValue::Single(fragments.remove(0)))
        } else {
            Ok(AttrValue::Many(fragments))
        }
    }
}

/// Trimmed, non-empty text fragments of a cell, in document order, skipping
/// `sup` and `span` subtrees and replacing non-breaking spaces.
fn cell_fragments(cell: ElementRef<'_>) -> Vec<String> {
    let mut out = Vec::new();
    collect_text(cell, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut Vec<String>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.replace('\u{a0}', " ");
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            Node::Element(tag) if tag.name() == "sup" || tag.name() == "span" => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}
