use std::collections::{BTreeSet, HashSet};

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Artist, ChartEntry};

use super::Catalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Distinct names considered after deduplication.
    pub candidates: usize,
    /// Names already present in the store, not looked up again.
    pub already_stored: usize,
    pub inserted: usize,
    pub unresolved: usize,
    pub failed: usize,
}

/// Looks up every distinct credited artist of `entries` and stores the hits.
pub async fn resolve_artists<C: Catalog>(
    repo: &Repository,
    catalog: &C,
    entries: &[ChartEntry],
) -> Result<ResolveReport> {
    let names: BTreeSet<String> = entries.iter().flat_map(ChartEntry::artists).collect();
    let mut report = ResolveReport {
        candidates: names.len(),
        ..Default::default()
    };

    for name in names {
        if repo.find_artist_id(&name).await?.is_some() {
            report.already_stored += 1;
            continue;
        }

        match catalog.search_artist(&name).await {
            Ok(Some(id)) => {
                tracing::debug!("Artist '{}' has the ID: {}", name, id);
                if repo.upsert_artist(Artist { id, name }).await? {
                    report.inserted += 1;
                }
            }
            Ok(None) => {
                tracing::warn!("No artist found for '{}'", name);
                report.unresolved += 1;
            }
            Err(e) => {
                tracing::warn!("Artist lookup for '{}' failed: {}", name, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Looks up every distinct chart title and stores the hits under that title.
pub async fn resolve_tracks<C: Catalog>(
    repo: &Repository,
    catalog: &C,
    entries: &[ChartEntry],
) -> Result<ResolveReport> {
    let mut seen = HashSet::new();
    let titles: Vec<&str> = entries
        .iter()
        .map(|e| e.track_name.as_str())
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .collect();
    let mut report = ResolveReport {
        candidates: titles.len(),
        ..Default::default()
    };

    for title in titles {
        if repo.find_song_id(title).await?.is_some() {
            report.already_stored += 1;
            continue;
        }

        match catalog.search_track(title).await {
            Ok(Some(id)) => {
                if repo.upsert_song(id, title.to_string()).await? {
                    report.inserted += 1;
                }
            }
            Ok(None) => {
                tracing::warn!("No track found for '{}'", title);
                report.unresolved += 1;
            }
            Err(e) => {
                tracing::warn!("Track lookup for '{}' failed: {}", title, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Chart rows whose title matches a stored song, in chart order.
pub async fn retain_resolved(repo: &Repository, entries: &[ChartEntry]) -> Result<Vec<ChartEntry>> {
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        if repo.find_song_id(&entry.track_name).await?.is_some() {
            kept.push(entry.clone());
        }
    }
    Ok(kept)
}
