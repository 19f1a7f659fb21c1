//! HTML parsing for recall listing and detail pages
//!
//! The rules here are coupled to the page structure of the recall site.
//! Layout drift shows up as entries with missing fields, which the extractor
//! rejects one at a time.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

static ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li.product-item"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("a.product-link"));
static MAKER: LazyLock<Selector> = LazyLock::new(|| selector("p.product-maker"));
static DESC_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("div.product-desc div.product-desc-item"));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector("p.product-date time"));
static DETAIL_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li.product-desc-item"));
static CARAC: LazyLock<Selector> = LazyLock::new(|| selector("span.carac"));
static VAL: LazyLock<Selector> = LazyLock::new(|| selector("span.val"));

/// Label of the detail-page item holding the sales area
const SALES_AREA_LABEL: &str = "zone géographique de vente";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Raw fields of one listing entry, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: Option<String>,
    /// Absolute detail-page URL
    pub link: Option<String>,
    pub maker: Option<String>,
    /// "Risques" text without its label
    pub risks: Option<String>,
    /// "Motif" text without its label
    pub reason: Option<String>,
    /// Publication timestamp as printed (`datetime` attribute or element text)
    pub date_text: Option<String>,
}

/// Collapse whitespace runs into single spaces and trim
#[must_use]
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = normalize_ws(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Drop a leading "Label :" from a description item
fn strip_label(text: &str) -> String {
    match text.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Parse every `li.product-item` of a listing page, in page order
#[must_use]
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);

    document
        .select(&ITEM)
        .map(|item| {
            let mut entry = ListingEntry::default();

            if let Some(title) = item.select(&TITLE).next() {
                entry.title = element_text(title);
                entry.link = title
                    .value()
                    .attr("href")
                    .and_then(|href| base.join(href.trim()).ok())
                    .map(|url| url.to_string());
            }

            entry.maker = item.select(&MAKER).next().and_then(element_text);

            for (idx, desc) in item.select(&DESC_ITEM).enumerate() {
                let Some(text) = element_text(desc) else {
                    continue;
                };
                let lowered = text.to_lowercase();
                if lowered.starts_with("risque") {
                    entry.risks = Some(strip_label(&text));
                } else if lowered.starts_with("motif") {
                    entry.reason = Some(strip_label(&text));
                } else if idx == 0 && entry.risks.is_none() {
                    entry.risks = Some(text);
                } else if idx == 1 && entry.reason.is_none() {
                    entry.reason = Some(text);
                }
            }

            entry.date_text = item.select(&DATE).next().and_then(|time| {
                time.value()
                    .attr("datetime")
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .or_else(|| element_text(time))
            });

            entry
        })
        .collect()
}

/// Read the sales area ("Zone géographique de vente") from a detail page
#[must_use]
pub fn parse_sales_area(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    document.select(&DETAIL_ITEM).find_map(|item| {
        let label = item.select(&CARAC).next().and_then(element_text)?;
        if !label.to_lowercase().contains(SALES_AREA_LABEL) {
            return None;
        }
        item.select(&VAL).next().and_then(element_text)
    })
}
