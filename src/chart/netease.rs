use std::time::Duration;

use scraper::{Html, Selector};
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::ChartEntry;
use crate::normalize::{clean_track_title, normalize_netease_artists};

/// The Netease toplist fills its table from script, so the page is rendered
/// by a headless browser and the resulting DOM is parsed.
pub struct NeteaseFetcher {
    url: String,
    browser_command: String,
    browser_args: Vec<String>,
    timeout: Duration,
}

impl NeteaseFetcher {
    pub fn new(
        url: impl Into<String>,
        browser_command: impl Into<String>,
        browser_args: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            url: url.into(),
            browser_command: browser_command.into(),
            browser_args,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn fetch(&self) -> Result<Vec<ChartEntry>> {
        let html = self.render().await?;
        let entries = parse_toplist(&html)?;
        if entries.is_empty() {
            tracing::warn!("Rendered Netease page contained no chart rows");
        } else {
            tracing::info!("Parsed {} Netease chart rows", entries.len());
        }
        Ok(entries)
    }

    async fn render(&self) -> Result<String> {
        tracing::debug!("Rendering {} with {}", self.url, self.browser_command);
        let child = Command::new(&self.browser_command)
            .args(&self.browser_args)
            .arg(&self.url)
            .kill_on_drop(true)
            .output();

        // Dropping the timed-out future kills the browser.
        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AppError::ChartFetch(format!(
                    "Browser '{}' did not finish within {}s",
                    self.browser_command,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                AppError::ChartFetch(format!(
                    "Failed to start browser '{}': {}",
                    self.browser_command, e
                ))
            })?;

        if !output.status.success() {
            return Err(AppError::ChartFetch(format!(
                "Browser exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Rows of the rendered `m-table`: title from the second column, artist
/// credit from the fourth.
pub fn parse_toplist(html: &str) -> Result<Vec<ChartEntry>> {
    let document = Html::parse_document(html);
    let row_selector = selector("table.m-table tbody tr")?;
    let title_selector = selector("td:nth-child(2) span a b")?;
    let artist_selector = selector("td:nth-child(4) div span")?;

    let mut entries = Vec::new();
    for row in document.select(&row_selector) {
        let Some(raw_title) = row
            .select(&title_selector)
            .next()
            .and_then(|b| b.value().attr("title"))
        else {
            continue;
        };

        let track_name = clean_track_title(raw_title);
        if track_name.is_empty() {
            tracing::debug!("Title '{}' has nothing left after cleanup, skipping", raw_title);
            continue;
        }

        let raw_artists = row
            .select(&artist_selector)
            .next()
            .and_then(|span| span.value().attr("title"))
            .unwrap_or_default();

        entries.push(ChartEntry::new(track_name, normalize_netease_artists(raw_artists)));
    }

    Ok(entries)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| AppError::ChartFetch(format!("Invalid CSS selector '{}': {:?}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, artists: &str) -> String {
        format!(
            r#"<tr>
                 <td><span class="num">1</span></td>
                 <td><div class="f-cb"><div class="tt"><div class="ttc">
                   <span class="txt"><a href="/song?id=1"><b title="{title}">{title}</b></a></span>
                 </div></div></div></td>
                 <td><span class="u-dur">03:20</span></td>
                 <td><div class="text" title="{artists}"><span title="{artists}">{artists}</span></div></td>
               </tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><table class="m-table m-table-rank"><thead><tr><th></th></tr></thead>
               <tbody>{}</tbody></table></body></html>"#,
            rows.concat()
        )
    }

    #[test]
    fn parses_rendered_toplist() {
        let html = page(&[
            row("Lemon (Live)", "米津玄師/Kenshi Yonezu"),
            row("Faded -", "Alan Walker"),
            row("晴天", "周杰伦"),
        ]);

        let entries = parse_toplist(&html).unwrap();

        assert_eq!(
            entries,
            vec![
                ChartEntry::new("Lemon", "Kenshi Yonezu"),
                ChartEntry::new("Faded", "Alan Walker"),
            ]
        );
    }

    #[test]
    fn missing_artist_becomes_empty_credit() {
        let html = page(&[r#"<tr><td>1</td><td><span><a><b title="Monsters">Monsters</b></a></span></td></tr>"#
            .to_string()]);

        let entries = parse_toplist(&html).unwrap();

        assert_eq!(entries, vec![ChartEntry::new("Monsters", "")]);
        assert!(entries[0].artists().is_empty());
    }

    #[tokio::test]
    async fn missing_browser_is_a_fetch_error() {
        let fetcher = NeteaseFetcher::new(
            "https://music.163.com/discover/toplist?id=2809513713",
            "hit-charts-no-such-browser",
            Vec::new(),
            30,
        );

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, AppError::ChartFetch(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_browser_times_out() {
        // The page URL lands in the script's positional arguments and is ignored.
        let fetcher = NeteaseFetcher::new(
            "https://music.163.com/discover/toplist?id=2809513713",
            "sh",
            vec!["-c".to_string(), "sleep 30".to_string(), "sh".to_string()],
            1,
        );

        let started = std::time::Instant::now();
        let err = fetcher.fetch().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            AppError::ChartFetch(message) => assert!(message.contains("did not finish")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
