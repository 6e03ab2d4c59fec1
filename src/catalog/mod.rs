mod resolver;
mod spotify;

pub use resolver::{resolve_artists, resolve_tracks, retain_resolved, ResolveReport};
pub use spotify::SpotifyClient;

use crate::error::Result;
use crate::models::{FeatureReading, TrackDetails};

/// The external music catalog the pipeline resolves and enriches against.
pub trait Catalog {
    /// Identifier of the top artist hit for `name`, if any.
    async fn search_artist(&self, name: &str) -> Result<Option<String>>;

    /// Identifier of the top track hit for `title`, if any.
    async fn search_track(&self, title: &str) -> Result<Option<String>>;

    /// `None` when the catalog does not answer successfully.
    async fn track_details(&self, track_id: &str) -> Result<Option<TrackDetails>>;

    /// `None` when the catalog does not answer successfully.
    async fn audio_features(&self, track_id: &str) -> Result<Option<FeatureReading>>;
}
