mod billboard;
mod netease;

use std::path::Path;

pub use billboard::BillboardFetcher;
pub use netease::NeteaseFetcher;

use crate::config::Config;
use crate::error::Result;
use crate::models::{ChartEntry, Market};

/// Retrieves the market's current chart, already normalized.
pub async fn fetch_chart(market: Market, config: &Config) -> Result<Vec<ChartEntry>> {
    match market {
        Market::Us => {
            BillboardFetcher::new(&config.billboard_url, config.request_timeout_secs)?
                .fetch()
                .await
        }
        Market::China => {
            NeteaseFetcher::new(
                &config.netease_url,
                &config.browser_command,
                config.browser_args.clone(),
                config.request_timeout_secs,
            )
            .fetch()
            .await
        }
    }
}

pub fn write_chart(path: &Path, entries: &[ChartEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_chart(path: &Path) -> Result<Vec<ChartEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let entries = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ChartEntry>, _>>()?;
    Ok(entries)
}
