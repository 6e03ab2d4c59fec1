use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Us,
    China,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Us, Market::China];

    /// Junction table recording this market's (song, artist) entries.
    pub fn table(self) -> &'static str {
        match self {
            Market::Us => "US_Market",
            Market::China => "China_Market",
        }
    }

    pub fn entry_id_column(self) -> &'static str {
        match self {
            Market::Us => "us_entry_id",
            Market::China => "CHN_entry_id",
        }
    }

    pub fn chart_file(self) -> &'static str {
        match self {
            Market::Us => "billboard_year_end_hot_100.csv",
            Market::China => "netease_music_toplist.csv",
        }
    }

    /// Chart rows whose title matched a stored song.
    pub fn resolved_chart_file(self) -> &'static str {
        match self {
            Market::Us => "billboard_year_end_hot_100_resolved.csv",
            Market::China => "netease_music_toplist_resolved.csv",
        }
    }

    pub fn analysis_file(self) -> &'static str {
        match self {
            Market::Us => "us_market_analysis.csv",
            Market::China => "china_market_analysis.csv",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Us => write!(f, "US"),
            Market::China => write!(f, "China"),
        }
    }
}

impl FromStr for Market {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "us" | "usa" | "billboard" => Ok(Market::Us),
            "china" | "cn" | "netease" => Ok(Market::China),
            other => Err(AppError::Config(format!("unknown market '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_market_aliases() {
        assert_eq!("US".parse::<Market>().unwrap(), Market::Us);
        assert_eq!("netease".parse::<Market>().unwrap(), Market::China);
        assert!("uk".parse::<Market>().is_err());
    }

    #[test]
    fn markets_use_distinct_tables() {
        assert_ne!(Market::Us.table(), Market::China.table());
        assert_eq!(Market::China.entry_id_column(), "CHN_entry_id");
    }
}
