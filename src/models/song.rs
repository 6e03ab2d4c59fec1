use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const AUDIO_FEATURE_NAMES: [&str; 8] = [
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: String,
    pub track_name: String,
    pub album_id: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub popularity_score: Option<i64>,
    pub audio_features: Option<AudioFeatures>,
}

/// Track attributes as returned by the catalog; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackDetails {
    pub album_id: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<u32>,
}

/// Track attributes ready to be written; only built when all are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub album_id: String,
    pub release_date: NaiveDate,
    pub popularity: u32,
}

impl TrackInfo {
    pub fn from_details(details: TrackDetails) -> Option<Self> {
        let album_id = details.album_id.filter(|id| !id.is_empty())?;
        let release_date = complete_release_date(details.release_date.as_deref()?)?;
        let popularity = details.popularity?;
        Some(Self {
            album_id,
            release_date,
            popularity,
        })
    }
}

/// Audio descriptors as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeatureReading {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
}

impl AudioFeatures {
    /// Absent descriptors become 0.0, so a missing value reads as a genuine zero afterwards.
    pub fn from_reading(reading: &FeatureReading) -> Self {
        Self {
            danceability: reading.danceability.unwrap_or(0.0),
            energy: reading.energy.unwrap_or(0.0),
            loudness: reading.loudness.unwrap_or(0.0),
            speechiness: reading.speechiness.unwrap_or(0.0),
            acousticness: reading.acousticness.unwrap_or(0.0),
            instrumentalness: reading.instrumentalness.unwrap_or(0.0),
            liveness: reading.liveness.unwrap_or(0.0),
            valence: reading.valence.unwrap_or(0.0),
        }
    }
}

/// One exported row of a market's analysis view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysisRow {
    pub track_name: String,
    pub artist_names: String,
    pub popularity_score: Option<i64>,
    pub release_date: Option<String>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
}

impl MarketAnalysisRow {
    pub fn release_date(&self) -> Option<NaiveDate> {
        self.release_date.as_deref().and_then(complete_release_date)
    }

    pub fn features(&self) -> [Option<f64>; 8] {
        [
            self.danceability,
            self.energy,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
        ]
    }
}

/// Parses a catalog release date. Year-only and year-month precision are
/// completed to the first day of the period.
pub fn complete_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let mut parts = raw.splitn(2, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_dates_default_to_first_day() {
        assert_eq!(
            complete_release_date("1957"),
            NaiveDate::from_ymd_opt(1957, 1, 1)
        );
        assert_eq!(
            complete_release_date("2023-06"),
            NaiveDate::from_ymd_opt(2023, 6, 1)
        );
        assert_eq!(
            complete_release_date("2023-06-14"),
            NaiveDate::from_ymd_opt(2023, 6, 14)
        );
        assert_eq!(complete_release_date("not a date"), None);
        assert_eq!(complete_release_date("2023-13"), None);
    }

    #[test]
    fn track_info_requires_every_field() {
        let complete = TrackDetails {
            album_id: Some("album".to_string()),
            release_date: Some("2022".to_string()),
            popularity: Some(0),
        };
        let info = TrackInfo::from_details(complete.clone()).unwrap();
        assert_eq!(info.popularity, 0);
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());

        let no_popularity = TrackDetails {
            popularity: None,
            ..complete.clone()
        };
        assert!(TrackInfo::from_details(no_popularity).is_none());

        let no_album = TrackDetails {
            album_id: None,
            ..complete
        };
        assert!(TrackInfo::from_details(no_album).is_none());
    }

    #[test]
    fn missing_features_default_to_zero() {
        let reading = FeatureReading {
            danceability: Some(0.7),
            loudness: Some(-5.2),
            ..Default::default()
        };
        let features = AudioFeatures::from_reading(&reading);
        assert_eq!(features.danceability, 0.7);
        assert_eq!(features.loudness, -5.2);
        assert_eq!(features.energy, 0.0);
        assert_eq!(features.valence, 0.0);
    }
}
