use std::path::Path;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Market, AUDIO_FEATURE_NAMES};

const LEADING_COLUMNS: [&str; 4] = ["track_name", "artist_names", "popularity_score", "release_date"];

/// Writes the market's analysis view to `path` and returns the row count.
pub async fn export_market(repo: &Repository, market: Market, path: &Path) -> Result<usize> {
    let rows = repo.market_analysis(market).await?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    // serialize() only emits the header with the first record.
    if rows.is_empty() {
        writer.write_record(LEADING_COLUMNS.iter().chain(AUDIO_FEATURE_NAMES.iter()))?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Exported {} {} songs to {}", rows.len(), market, path.display());
    Ok(rows.len())
}
