use serde::{Deserialize, Serialize};

use crate::normalize::split_artists;

/// One row of a scraped chart, in on-page rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEntry {
    #[serde(rename = "Track_name")]
    pub track_name: String,
    /// Comma separated once normalized, e.g. `"SZA, Phoebe Bridgers"`.
    #[serde(rename = "Artist_name", default)]
    pub artist_name: String,
}

impl ChartEntry {
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
        }
    }

    pub fn artists(&self) -> Vec<String> {
        split_artists(&self.artist_name)
    }
}
