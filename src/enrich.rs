//! Back-fills catalog attributes onto songs that are still missing them.
//!
//! Each pass selects only rows whose watched column is NULL, so re-running a
//! pass only touches what an earlier run left unfinished.

use crate::catalog::Catalog;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{AudioFeatures, TrackInfo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub candidates: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Album id, release date and popularity; a song is only updated when the
/// catalog returns all three.
pub async fn enrich_track_info<C: Catalog>(repo: &Repository, catalog: &C) -> Result<EnrichReport> {
    let song_ids = repo.songs_missing_track_info().await?;
    let mut report = EnrichReport {
        candidates: song_ids.len(),
        ..Default::default()
    };

    for song_id in song_ids {
        let details = match catalog.track_details(&song_id).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Track info request for {} failed: {}", song_id, e);
                None
            }
        };

        match details.and_then(TrackInfo::from_details) {
            Some(info) => {
                repo.update_track_info(song_id, info).await?;
                report.updated += 1;
            }
            None => {
                tracing::debug!("Incomplete track info for {}, leaving it for a later run", song_id);
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

pub async fn enrich_audio_features<C: Catalog>(
    repo: &Repository,
    catalog: &C,
) -> Result<EnrichReport> {
    let song_ids = repo.songs_missing_audio_features().await?;
    let mut report = EnrichReport {
        candidates: song_ids.len(),
        ..Default::default()
    };

    for song_id in song_ids {
        let reading = match catalog.audio_features(&song_id).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!("Audio feature request for {} failed: {}", song_id, e);
                None
            }
        };

        match reading {
            Some(reading) => {
                let features = AudioFeatures::from_reading(&reading);
                repo.update_audio_features(song_id, features).await?;
                report.updated += 1;
            }
            None => report.skipped += 1,
        }
    }

    Ok(report)
}
