mod chart;
mod market;
mod song;

pub use chart::ChartEntry;
pub use market::Market;
pub use song::{
    Artist, AudioFeatures, FeatureReading, MarketAnalysisRow, TrackDetails, TrackInfo,
    AUDIO_FEATURE_NAMES,
};

#[cfg(test)]
pub use song::{complete_release_date, Song};
