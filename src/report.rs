//! Market comparison figures: release years, release seasons, popularity
//! scores, audio feature averages and artist diversity.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;

use crate::db::MarketDiversity;
use crate::models::{Market, MarketAnalysisRow, AUDIO_FEATURE_NAMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketReport {
    pub market: Market,
    pub songs: usize,
    pub diversity: MarketDiversity,
    pub release_years: BTreeMap<i32, usize>,
    pub release_seasons: BTreeMap<Season, usize>,
    pub popularity_scores: BTreeMap<i64, usize>,
    /// Averages in `AUDIO_FEATURE_NAMES` order; `None` when no row has a value.
    pub feature_averages: [Option<f64>; 8],
}

impl MarketReport {
    pub fn build(market: Market, rows: &[MarketAnalysisRow], diversity: MarketDiversity) -> Self {
        let mut release_years = BTreeMap::new();
        let mut release_seasons = BTreeMap::new();
        for date in rows.iter().filter_map(MarketAnalysisRow::release_date) {
            *release_years.entry(date.year()).or_insert(0) += 1;
            if let Some(season) = Season::from_month(date.month()) {
                *release_seasons.entry(season).or_insert(0) += 1;
            }
        }

        let mut popularity_scores = BTreeMap::new();
        for score in rows.iter().filter_map(|row| row.popularity_score) {
            *popularity_scores.entry(score).or_insert(0) += 1;
        }

        let mut sums = [0.0; 8];
        let mut counts = [0usize; 8];
        for row in rows {
            for (i, value) in row.features().iter().enumerate() {
                if let Some(value) = value {
                    sums[i] += value;
                    counts[i] += 1;
                }
            }
        }
        let mut feature_averages = [None; 8];
        for i in 0..8 {
            if counts[i] > 0 {
                feature_averages[i] = Some(sums[i] / counts[i] as f64);
            }
        }

        Self {
            market,
            songs: rows.len(),
            diversity,
            release_years,
            release_seasons,
            popularity_scores,
            feature_averages,
        }
    }
}

impl fmt::Display for MarketReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} market", self.market)?;
        writeln!(f, "  songs exported:   {}", self.songs)?;
        writeln!(f, "  distinct artists: {}", self.diversity.distinct_artists)?;
        writeln!(f, "  distinct songs:   {}", self.diversity.distinct_songs)?;

        writeln!(f, "  release years:")?;
        for (year, count) in &self.release_years {
            writeln!(f, "    {}: {}", year, count)?;
        }

        writeln!(f, "  release seasons:")?;
        for (season, count) in &self.release_seasons {
            writeln!(f, "    {}: {}", season, count)?;
        }

        writeln!(f, "  popularity scores:")?;
        for (score, count) in &self.popularity_scores {
            writeln!(f, "    {}: {}", score, count)?;
        }

        writeln!(f, "  audio feature averages:")?;
        for (name, average) in AUDIO_FEATURE_NAMES.iter().zip(self.feature_averages) {
            match average {
                Some(avg) => writeln!(f, "    {:<16} {:.3}", name, avg)?,
                None => writeln!(f, "    {:<16} n/a", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        release_date: Option<&str>,
        popularity_score: Option<i64>,
        danceability: Option<f64>,
    ) -> MarketAnalysisRow {
        MarketAnalysisRow {
            track_name: "t".into(),
            artist_names: "a".into(),
            popularity_score,
            release_date: release_date.map(str::to_string),
            danceability,
            energy: None,
            loudness: danceability.map(|_| -6.0),
            speechiness: None,
            acousticness: None,
            instrumentalness: None,
            liveness: None,
            valence: None,
        }
    }

    #[test]
    fn seasons_follow_calendar_quarters() {
        assert_eq!(Season::from_month(12), Some(Season::Winter));
        assert_eq!(Season::from_month(2), Some(Season::Winter));
        assert_eq!(Season::from_month(5), Some(Season::Spring));
        assert_eq!(Season::from_month(8), Some(Season::Summer));
        assert_eq!(Season::from_month(11), Some(Season::Fall));
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn counts_years_seasons_and_averages() {
        let rows = vec![
            row(Some("2023-04-21"), Some(82), Some(0.5)),
            row(Some("2023"), Some(82), Some(0.7)),
            row(Some("1964-07-01"), Some(40), None),
            row(None, None, None),
        ];
        let diversity = MarketDiversity {
            distinct_artists: 3,
            distinct_songs: 4,
        };

        let report = MarketReport::build(Market::Us, &rows, diversity);

        assert_eq!(report.songs, 4);
        assert_eq!(report.release_years.get(&2023), Some(&2));
        assert_eq!(report.release_years.get(&1964), Some(&1));
        // "2023" completes to January 1st.
        assert_eq!(report.release_seasons.get(&Season::Winter), Some(&1));
        assert_eq!(report.release_seasons.get(&Season::Spring), Some(&1));
        assert_eq!(report.release_seasons.get(&Season::Summer), Some(&1));
        assert_eq!(report.release_seasons.get(&Season::Fall), None);

        assert_eq!(report.popularity_scores.get(&82), Some(&2));
        assert_eq!(report.popularity_scores.get(&40), Some(&1));
        assert_eq!(report.popularity_scores.values().sum::<usize>(), 3);

        let danceability = report.feature_averages[0].unwrap();
        assert!((danceability - 0.6).abs() < 1e-9);
        assert_eq!(report.feature_averages[1], None);
        assert_eq!(report.feature_averages[2], Some(-6.0));

        let text = report.to_string();
        assert!(text.starts_with("US market"));
        assert!(text.contains("distinct artists: 3"));
        assert!(text.contains("popularity scores:\n    40: 1\n    82: 2"));
    }
}
