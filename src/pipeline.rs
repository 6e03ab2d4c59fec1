//! Stage orchestration. Every stage opens its own store handle and closes it
//! before returning, whether or not the stage succeeded.

use crate::catalog::{resolve_artists, resolve_tracks, retain_resolved, Catalog, ResolveReport};
use crate::chart;
use crate::config::Config;
use crate::db::Repository;
use crate::enrich::{self, EnrichReport};
use crate::error::{AppError, Result};
use crate::export;
use crate::link::{self, LinkReport};
use crate::models::{ChartEntry, Market};
use crate::report::MarketReport;

/// Closes `repo`, preferring the stage's own error over a close failure.
async fn finish<T>(repo: Repository, outcome: Result<T>) -> Result<T> {
    let closed = repo.close().await;
    let value = outcome?;
    closed?;
    Ok(value)
}

pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn chart_entries(&self, market: Market) -> Result<Vec<ChartEntry>> {
        chart::read_chart(&self.config.data_file(market.chart_file()))
    }

    /// Scrapes the market's chart and writes it to the chart CSV.
    pub async fn fetch(&self, market: Market) -> Result<usize> {
        let entries = chart::fetch_chart(market, self.config).await?;
        let path = self.config.data_file(market.chart_file());
        chart::write_chart(&path, &entries)?;
        tracing::info!("Saved {} {} chart rows to {}", entries.len(), market, path.display());
        Ok(entries.len())
    }

    /// Resolves the chart's artists and titles, then writes the rows whose
    /// title resolved to the resolved-chart CSV.
    pub async fn resolve<C: Catalog>(
        &self,
        market: Market,
        catalog: &C,
    ) -> Result<(ResolveReport, ResolveReport)> {
        let entries = self.chart_entries(market)?;
        let repo = Repository::open(&self.config.db_path).await?;

        let outcome = async {
            let artists = resolve_artists(&repo, catalog, &entries).await?;
            tracing::info!(
                "{} artists: {} distinct, {} inserted, {} already stored, {} not found, {} failed",
                market,
                artists.candidates,
                artists.inserted,
                artists.already_stored,
                artists.unresolved,
                artists.failed
            );

            let tracks = resolve_tracks(&repo, catalog, &entries).await?;
            tracing::info!(
                "{} tracks: {} distinct, {} inserted, {} already stored, {} not found, {} failed",
                market,
                tracks.candidates,
                tracks.inserted,
                tracks.already_stored,
                tracks.unresolved,
                tracks.failed
            );

            let resolved = retain_resolved(&repo, &entries).await?;
            chart::write_chart(
                &self.config.data_file(market.resolved_chart_file()),
                &resolved,
            )?;
            tracing::info!(
                "{} of {} {} chart rows matched the catalog",
                resolved.len(),
                entries.len(),
                market
            );

            Ok::<_, AppError>((artists, tracks))
        }
        .await;

        finish(repo, outcome).await
    }

    pub async fn link(&self, market: Market) -> Result<LinkReport> {
        let entries = self.chart_entries(market)?;
        let repo = Repository::open(&self.config.db_path).await?;

        let outcome = link::link_market(&repo, market, &entries).await;
        if let Ok(report) = &outcome {
            tracing::info!(
                "Linked {} {} entries ({} songs and {} artists not found)",
                report.inserted,
                market,
                report.missing_songs,
                report.missing_artists
            );
        }

        finish(repo, outcome).await
    }

    pub async fn enrich<C: Catalog>(&self, catalog: &C) -> Result<(EnrichReport, EnrichReport)> {
        let repo = Repository::open(&self.config.db_path).await?;

        let outcome = async {
            let info = enrich::enrich_track_info(&repo, catalog).await?;
            tracing::info!(
                "Track info: {} of {} songs updated, {} left for a later run",
                info.updated,
                info.candidates,
                info.skipped
            );

            let features = enrich::enrich_audio_features(&repo, catalog).await?;
            tracing::info!(
                "Audio features: {} of {} songs updated, {} left for a later run",
                features.updated,
                features.candidates,
                features.skipped
            );

            Ok::<_, AppError>((info, features))
        }
        .await;

        finish(repo, outcome).await
    }

    pub async fn export(&self, market: Market) -> Result<usize> {
        let repo = Repository::open(&self.config.db_path).await?;
        let path = self.config.data_file(market.analysis_file());
        let outcome = export::export_market(&repo, market, &path).await;
        finish(repo, outcome).await
    }

    pub async fn report(&self, market: Market) -> Result<MarketReport> {
        let repo = Repository::open(&self.config.db_path).await?;

        let outcome = async {
            let rows = repo.market_analysis(market).await?;
            let diversity = repo.market_diversity(market).await?;
            Ok::<_, AppError>(MarketReport::build(market, &rows, diversity))
        }
        .await;

        finish(repo, outcome).await
    }

    /// Fetch, resolve and link for one market. A failure here leaves the
    /// other market untouched.
    async fn chart_stages<C: Catalog>(&self, market: Market, catalog: &C) -> Result<()> {
        self.fetch(market).await?;
        self.resolve(market, catalog).await?;
        self.link(market).await?;
        Ok(())
    }

    /// The whole pipeline: chart stages per market, enrichment, then the
    /// export of every market whose chart stages succeeded.
    pub async fn run<C: Catalog>(&self, catalog: &C) -> Result<()> {
        let mut linked = Vec::new();
        let mut failed = Vec::new();
        for market in Market::ALL {
            match self.chart_stages(market, catalog).await {
                Ok(()) => linked.push(market),
                Err(e) => {
                    tracing::error!("Skipping {} market: {}", market, e);
                    failed.push(market);
                }
            }
        }

        self.enrich(catalog).await?;

        for market in linked {
            if let Err(e) = self.export(market).await {
                tracing::error!("Export of {} market failed: {}", market, e);
                failed.push(market);
            }
        }

        let repo = Repository::open(&self.config.db_path).await?;
        let totals = async {
            let artists = repo.count_artists().await?;
            let songs = repo.count_songs().await?;
            Ok::<_, AppError>((artists, songs))
        }
        .await;
        let (artists, songs) = finish(repo, totals).await?;
        tracing::info!("Store holds {} artists and {} songs", artists, songs);

        if !failed.is_empty() {
            let names: Vec<String> = failed.iter().map(Market::to_string).collect();
            return Err(anyhow::anyhow!("Pipeline incomplete for: {}", names.join(", ")).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::FakeCatalog;
    use crate::models::{FeatureReading, TrackDetails};

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::from_toml_str("").unwrap();
        config.db_path = dir.join("charts.db").to_string_lossy().to_string();
        config.data_dir = dir.to_string_lossy().to_string();
        config
    }

    #[test]
    fn offline_stages_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        chart::write_chart(
            &config.data_file(Market::Us.chart_file()),
            &[
                ChartEntry::new("Flowers", "Miley Cyrus"),
                ChartEntry::new("Creepin'", "Metro Boomin, The Weeknd"),
                ChartEntry::new("Obscure B-Side", "Nobody"),
            ],
        )
        .unwrap();

        let catalog = FakeCatalog::default()
            .with_artist("Miley Cyrus", "a-miley")
            .with_artist("Metro Boomin", "a-metro")
            .with_artist("The Weeknd", "a-weeknd")
            .with_track("Flowers", "t-flowers")
            .with_track("Creepin'", "t-creepin")
            .with_details(
                "t-flowers",
                TrackDetails {
                    album_id: Some("alb".into()),
                    release_date: Some("2023-03-10".into()),
                    popularity: Some(90),
                },
            )
            .with_features(
                "t-flowers",
                FeatureReading {
                    danceability: Some(0.7),
                    ..Default::default()
                },
            );

        let pipeline = Pipeline::new(&config);
        tokio_test::block_on(async {
            let (artists, tracks) = pipeline.resolve(Market::Us, &catalog).await.unwrap();
            assert_eq!(artists.inserted, 3);
            assert_eq!(tracks.inserted, 2);

            let resolved = chart::read_chart(&config.data_file(Market::Us.resolved_chart_file())).unwrap();
            assert_eq!(resolved.len(), 2);

            let linked = pipeline.link(Market::Us).await.unwrap();
            assert_eq!(linked.inserted, 3);
            assert_eq!(linked.missing_songs, 1);

            let (info, features) = pipeline.enrich(&catalog).await.unwrap();
            assert_eq!(info.updated, 1);
            assert_eq!(features.updated, 1);

            assert_eq!(pipeline.export(Market::Us).await.unwrap(), 2);
            assert!(config.data_file(Market::Us.analysis_file()).exists());

            let report = pipeline.report(Market::Us).await.unwrap();
            assert_eq!(report.diversity.distinct_artists, 3);
            assert_eq!(report.diversity.distinct_songs, 2);
            assert_eq!(report.release_years.get(&2023), Some(&1));
        });
    }

    /// Serves `body` to every request on a local port and returns the page URL.
    async fn serve_page(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/charts/hot-100/", addr)
    }

    #[tokio::test]
    async fn failed_market_does_not_stop_the_other() {
        const BILLBOARD_PAGE: &str = r#"<html><body>
            <div class="o-chart-results-list-row-container"><ul><li>
              <h3 class="c-title">Last Night</h3>
              <span class="c-label">Morgan Wallen</span>
            </li></ul></div>
        </body></html>"#;

        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.billboard_url = serve_page(BILLBOARD_PAGE).await;
        config.browser_command = "hit-charts-no-such-browser".to_string();

        let catalog = FakeCatalog::default()
            .with_artist("Morgan Wallen", "a-wallen")
            .with_track("Last Night", "t-last-night");

        let result = Pipeline::new(&config).run(&catalog).await;

        assert!(result.is_err());
        assert!(catalog.calls() > 0);
        assert!(!config.data_file(Market::China.chart_file()).exists());
        assert!(!config.data_file(Market::China.analysis_file()).exists());

        let mut reader = csv::Reader::from_path(config.data_file(Market::Us.analysis_file())).unwrap();
        let rows: Vec<crate::models::MarketAnalysisRow> =
            reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].track_name, "Last Night");
        assert_eq!(rows[0].artist_names, "Morgan Wallen");
    }

    #[tokio::test]
    async fn link_without_chart_file_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        assert!(Pipeline::new(&config).link(Market::China).await.is_err());
    }
}
