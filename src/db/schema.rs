pub const SCHEMA: &str = r#"
-- artists table
CREATE TABLE IF NOT EXISTS Artists (
    artist_id TEXT PRIMARY KEY,
    artist_name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_artists_name ON Artists(artist_name);

-- songs table (enrichment columns are added by SONG_COLUMNS)
CREATE TABLE IF NOT EXISTS Songs (
    song_id TEXT PRIMARY KEY,
    track_name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_track_name ON Songs(track_name);

-- US_Market table
CREATE TABLE IF NOT EXISTS US_Market (
    us_entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    song_id TEXT NOT NULL,
    artist_id TEXT NOT NULL,
    FOREIGN KEY (song_id) REFERENCES Songs(song_id),
    FOREIGN KEY (artist_id) REFERENCES Artists(artist_id)
);

-- China_Market table
CREATE TABLE IF NOT EXISTS China_Market (
    CHN_entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    song_id TEXT NOT NULL,
    artist_id TEXT NOT NULL,
    FOREIGN KEY (song_id) REFERENCES Songs(song_id),
    FOREIGN KEY (artist_id) REFERENCES Artists(artist_id)
);
"#;

/// Optional Songs columns, added only when missing from the live table.
pub const SONG_COLUMNS: &[(&str, &str)] = &[
    ("album_id", "TEXT"),
    ("release_date", "TEXT"),
    ("popularity_score", "INTEGER"),
    ("danceability", "REAL"),
    ("energy", "REAL"),
    ("loudness", "REAL"),
    ("speechiness", "REAL"),
    ("acousticness", "REAL"),
    ("instrumentalness", "REAL"),
    ("liveness", "REAL"),
    ("valence", "REAL"),
];
