use crate::db::Repository;
use crate::error::Result;
use crate::models::{ChartEntry, Market};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub inserted: usize,
    pub missing_songs: usize,
    pub missing_artists: usize,
}

/// Records one market entry per (song, credited artist) pair found in the
/// store. Rows or credits that never resolved are skipped.
pub async fn link_market(
    repo: &Repository,
    market: Market,
    entries: &[ChartEntry],
) -> Result<LinkReport> {
    let mut report = LinkReport::default();

    for entry in entries {
        let Some(song_id) = repo.find_song_id(&entry.track_name).await? else {
            tracing::warn!("Song '{}' not found in the Songs table", entry.track_name);
            report.missing_songs += 1;
            continue;
        };

        for artist_name in entry.artists() {
            match repo.find_artist_id(&artist_name).await? {
                Some(artist_id) => {
                    repo.insert_market_entry(market, song_id.clone(), artist_id)
                        .await?;
                    report.inserted += 1;
                }
                None => {
                    tracing::warn!(
                        "Artist '{}' of '{}' not found in the Artists table",
                        artist_name,
                        entry.track_name
                    );
                    report.missing_artists += 1;
                }
            }
        }
    }

    Ok(report)
}
