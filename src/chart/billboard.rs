use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::ChartEntry;
use crate::normalize::{collapse_whitespace, normalize_billboard_artists};

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub struct BillboardFetcher {
    client: Client,
    url: String,
}

impl BillboardFetcher {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn fetch(&self) -> Result<Vec<ChartEntry>> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::ChartFetch(format!(
                "Failed to retrieve {}: HTTP {}",
                self.url,
                response.status()
            )));
        }

        let html = response.text().await?;
        let entries = parse_chart(&html)?;
        tracing::info!("Parsed {} Billboard chart rows", entries.len());
        Ok(entries)
    }
}

/// Extracts (title, credit) pairs in page order. The credit is the first
/// `span.c-label` that follows the row's `h3.c-title`.
pub fn parse_chart(html: &str) -> Result<Vec<ChartEntry>> {
    let document = Html::parse_document(html);
    let row_selector = selector(".o-chart-results-list-row-container")?;
    let title_selector = selector("h3.c-title")?;

    let mut entries = Vec::new();
    for row in document.select(&row_selector) {
        let Some(title) = row.select(&title_selector).next() else {
            continue;
        };
        let Some(label) = label_after(row, title) else {
            tracing::debug!("Chart row without artist label, skipping");
            continue;
        };

        let track_name = collapse_whitespace(&stripped_text(title));
        if track_name.is_empty() {
            continue;
        }
        entries.push(ChartEntry::new(
            track_name,
            normalize_billboard_artists(&stripped_text(label)),
        ));
    }

    Ok(entries)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| AppError::ChartFetch(format!("Invalid CSS selector '{}': {:?}", css, e)))
}

fn label_after<'a>(row: ElementRef<'a>, title: ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.descendants()
        .skip_while(|node| node.id() != title.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "span" && el.value().classes().any(|c| c == "c-label"))
}

fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
          <div class="o-chart-results-list-row-container">
            <ul><li>
              <span class="c-label">1</span>
              <h3 class="c-title">
                Last Night
              </h3>
              <span class="c-label"> Morgan Wallen </span>
            </li></ul>
          </div>
          <div class="o-chart-results-list-row-container">
            <ul><li>
              <h3 class="c-title">Creepin'</h3>
              <span class="c-label">Metro Boomin, The Weeknd &amp; 21 Savage</span>
            </li></ul>
          </div>
          <div class="o-chart-results-list-row-container">
            <ul><li><h3 class="c-title">Unsigned</h3></li></ul>
          </div>
          <div class="o-chart-results-list-row-container">
            <ul><li>
              <h3 class="c-title">Ella Baila Sola</h3>
              <span class="c-label">Eslabon Armado X Peso Pluma</span>
            </li></ul>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_rows_in_page_order() {
        let entries = parse_chart(SAMPLE).unwrap();

        assert_eq!(
            entries,
            vec![
                ChartEntry::new("Last Night", "Morgan Wallen"),
                ChartEntry::new("Creepin'", "Metro Boomin, The Weeknd, 21 Savage"),
                ChartEntry::new("Ella Baila Sola", "Eslabon Armado, Peso Pluma"),
            ]
        );
    }

    #[test]
    fn page_without_rows_yields_nothing() {
        assert!(parse_chart("<html><body><p>Access denied</p></body></html>")
            .unwrap()
            .is_empty());
    }
}
