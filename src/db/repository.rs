use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Artist, AudioFeatures, Market, MarketAnalysisRow, TrackInfo};
#[cfg(test)]
use crate::models::{complete_release_date, Song};

use super::schema::{SCHEMA, SONG_COLUMNS};

/// Counts shown by the market report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarketDiversity {
    pub distinct_artists: i64,
    pub distinct_songs: i64,
}

/// Handle on the project database. Each pipeline stage opens one and closes
/// it when the stage ends.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        let repository = Self { conn };
        let added = repository.migrate().await?;
        if added > 0 {
            tracing::info!("Added {} enrichment columns to Songs", added);
        }
        Ok(repository)
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    /// Adds whichever enrichment columns the Songs table is still missing.
    /// Returns how many were added; a second call adds none.
    pub async fn migrate(&self) -> Result<usize> {
        let added = self
            .conn
            .call(|conn| {
                let existing: Vec<String> = {
                    let mut stmt = conn.prepare("PRAGMA table_info(Songs)")?;
                    let names = stmt
                        .query_map([], |row| row.get::<_, String>(1))?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    names
                };

                let tx = conn.transaction()?;
                let mut added = 0;
                for (column, sql_type) in SONG_COLUMNS {
                    if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                        continue;
                    }
                    tx.execute_batch(&format!(
                        "ALTER TABLE Songs ADD COLUMN {} {};",
                        column, sql_type
                    ))?;
                    added += 1;
                }
                tx.commit()?;
                Ok(added)
            })
            .await?;
        Ok(added)
    }

    // Artist operations

    /// Inserts the artist unless its id is already stored; an existing row is
    /// kept unchanged. Returns whether a row was inserted.
    pub async fn upsert_artist(&self, artist: Artist) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO Artists (artist_id, artist_name) VALUES (?1, ?2)
                     ON CONFLICT(artist_id) DO NOTHING",
                    params![artist.id, artist.name],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn find_artist_id(&self, name: &str) -> Result<Option<String>> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| {
                let id = conn
                    .query_row(
                        "SELECT artist_id FROM Artists WHERE artist_name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn count_artists(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM Artists").await
    }

    // Song operations

    /// Same conflict policy as `upsert_artist`.
    pub async fn upsert_song(&self, song_id: String, track_name: String) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO Songs (song_id, track_name) VALUES (?1, ?2)
                     ON CONFLICT(song_id) DO NOTHING",
                    params![song_id, track_name],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn find_song_id(&self, track_name: &str) -> Result<Option<String>> {
        let track_name = track_name.to_string();
        let id = self
            .conn
            .call(move |conn| {
                let id = conn
                    .query_row(
                        "SELECT song_id FROM Songs WHERE track_name = ?1",
                        params![track_name],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        let song_id = song_id.to_string();
        let song = self
            .conn
            .call(move |conn| {
                let song = conn
                    .query_row(
                        "SELECT song_id, track_name, album_id, release_date, popularity_score,
                                danceability, energy, loudness, speechiness, acousticness,
                                instrumentalness, liveness, valence
                         FROM Songs WHERE song_id = ?1",
                        params![song_id],
                        song_from_row,
                    )
                    .optional()?;
                Ok(song)
            })
            .await?;
        Ok(song)
    }

    pub async fn count_songs(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM Songs").await
    }

    pub async fn songs_missing_track_info(&self) -> Result<Vec<String>> {
        self.song_ids("SELECT song_id FROM Songs WHERE album_id IS NULL ORDER BY rowid")
            .await
    }

    pub async fn songs_missing_audio_features(&self) -> Result<Vec<String>> {
        self.song_ids("SELECT song_id FROM Songs WHERE danceability IS NULL ORDER BY rowid")
            .await
    }

    pub async fn update_track_info(&self, song_id: String, info: TrackInfo) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE Songs SET album_id = ?1, release_date = ?2, popularity_score = ?3
                     WHERE song_id = ?4",
                    params![
                        info.album_id,
                        info.release_date.format("%Y-%m-%d").to_string(),
                        info.popularity,
                        song_id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn update_audio_features(
        &self,
        song_id: String,
        features: AudioFeatures,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE Songs
                     SET danceability = ?1, energy = ?2, loudness = ?3, speechiness = ?4,
                         acousticness = ?5, instrumentalness = ?6, liveness = ?7, valence = ?8
                     WHERE song_id = ?9",
                    params![
                        features.danceability,
                        features.energy,
                        features.loudness,
                        features.speechiness,
                        features.acousticness,
                        features.instrumentalness,
                        features.liveness,
                        features.valence,
                        song_id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Market entry operations

    /// Plain insert: re-running a link stage records the pair again.
    pub async fn insert_market_entry(
        &self,
        market: Market,
        song_id: String,
        artist_id: String,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO {} (song_id, artist_id) VALUES (?1, ?2)",
                        market.table()
                    ),
                    params![song_id, artist_id],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn market_entries(&self, market: Market) -> Result<Vec<(String, String)>> {
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT song_id, artist_id FROM {} ORDER BY {}",
                    market.table(),
                    market.entry_id_column()
                ))?;
                let entries = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await?;
        Ok(entries)
    }

    pub async fn market_diversity(&self, market: Market) -> Result<MarketDiversity> {
        let diversity = self
            .conn
            .call(move |conn| {
                let diversity = conn.query_row(
                    &format!(
                        "SELECT COUNT(DISTINCT artist_id), COUNT(DISTINCT song_id) FROM {}",
                        market.table()
                    ),
                    [],
                    |row| {
                        Ok(MarketDiversity {
                            distinct_artists: row.get(0)?,
                            distinct_songs: row.get(1)?,
                        })
                    },
                )?;
                Ok(diversity)
            })
            .await?;
        Ok(diversity)
    }

    /// One row per song charted in the market, co-credited artists joined
    /// into `artist_names`. Rows follow first chart appearance.
    pub async fn market_analysis(&self, market: Market) -> Result<Vec<MarketAnalysisRow>> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT s.track_name,
                              GROUP_CONCAT(a.artist_name, ', ') AS artist_names,
                              s.popularity_score, s.release_date,
                              s.danceability, s.energy, s.loudness, s.speechiness,
                              s.acousticness, s.instrumentalness, s.liveness, s.valence
                       FROM Songs s
                       JOIN (SELECT song_id, artist_id, MIN({entry_id}) AS first_entry
                             FROM {table}
                             GROUP BY song_id, artist_id) m ON s.song_id = m.song_id
                       JOIN Artists a ON m.artist_id = a.artist_id
                       GROUP BY s.song_id
                       ORDER BY MIN(m.first_entry)"#,
                    entry_id = market.entry_id_column(),
                    table = market.table(),
                ))?;
                let rows = stmt
                    .query_map([], analysis_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn song_ids(&self, sql: &'static str) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql)?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    async fn count(&self, sql: &'static str) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    let danceability: Option<f64> = row.get(5)?;
    let audio_features = match danceability {
        Some(danceability) => Some(AudioFeatures {
            danceability,
            energy: row.get::<_, Option<f64>>(6)?.unwrap_or_default(),
            loudness: row.get::<_, Option<f64>>(7)?.unwrap_or_default(),
            speechiness: row.get::<_, Option<f64>>(8)?.unwrap_or_default(),
            acousticness: row.get::<_, Option<f64>>(9)?.unwrap_or_default(),
            instrumentalness: row.get::<_, Option<f64>>(10)?.unwrap_or_default(),
            liveness: row.get::<_, Option<f64>>(11)?.unwrap_or_default(),
            valence: row.get::<_, Option<f64>>(12)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Song {
        id: row.get(0)?,
        track_name: row.get(1)?,
        album_id: row.get(2)?,
        release_date: row
            .get::<_, Option<String>>(3)?
            .and_then(|s| complete_release_date(&s)),
        popularity_score: row.get(4)?,
        audio_features,
    })
}

fn analysis_from_row(row: &Row) -> rusqlite::Result<MarketAnalysisRow> {
    Ok(MarketAnalysisRow {
        track_name: row.get(0)?,
        artist_names: row.get(1)?,
        popularity_score: row.get(2)?,
        release_date: row.get(3)?,
        danceability: row.get(4)?,
        energy: row.get(5)?,
        loudness: row.get(6)?,
        speechiness: row.get(7)?,
        acousticness: row.get(8)?,
        instrumentalness: row.get(9)?,
        liveness: row.get(10)?,
        valence: row.get(11)?,
    })
}
