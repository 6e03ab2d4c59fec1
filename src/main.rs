use std::process::ExitCode;

mod catalog;
mod chart;
mod config;
mod db;
mod enrich;
mod error;
mod export;
mod link;
mod models;
mod normalize;
mod pipeline;
mod report;

use catalog::SpotifyClient;
use config::Config;
use error::{AppError, Result};
use models::Market;
use pipeline::Pipeline;

const USAGE: &str = "\
Usage: hit-charts [COMMAND]

Commands:
  run                 Fetch, resolve, link, enrich and export both markets (default)
  fetch <us|china>    Scrape the market's chart into its chart CSV
  resolve <us|china>  Resolve the chart's artists and tracks against the catalog
  link <us|china>     Record the chart's song/artist entries for the market
  enrich              Back-fill track info and audio features
  export <us|china>   Write the market analysis CSV
  stats <us|china>    Print the market report";

enum Command {
    Run,
    Fetch(Market),
    Resolve(Market),
    Link(Market),
    Enrich,
    Export(Market),
    Stats(Market),
}

fn parse_args(args: &[String]) -> Result<Command> {
    let market = |index: usize| -> Result<Market> {
        args.get(index)
            .ok_or_else(|| AppError::Config("missing market argument".to_string()))?
            .parse()
    };

    match args.get(1).map(String::as_str) {
        None | Some("run") => Ok(Command::Run),
        Some("fetch") => Ok(Command::Fetch(market(2)?)),
        Some("resolve") => Ok(Command::Resolve(market(2)?)),
        Some("link") => Ok(Command::Link(market(2)?)),
        Some("enrich") => Ok(Command::Enrich),
        Some("export") => Ok(Command::Export(market(2)?)),
        Some("stats") => Ok(Command::Stats(market(2)?)),
        Some(other) => Err(AppError::Config(format!("unknown command '{}'", other))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging (stage progress by default, RUST_LOG to adjust)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Credentials may live in a local .env file
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = Config::load()?;
    let pipeline = Pipeline::new(&config);

    match command {
        Command::Run => {
            let spotify = SpotifyClient::connect(&config.catalog()?).await?;
            pipeline.run(&spotify).await?;
            println!("Pipeline finished, analysis files in {}", config.data_dir);
        }
        Command::Fetch(market) => {
            let count = pipeline.fetch(market).await?;
            println!("Fetched {} {} chart rows", count, market);
        }
        Command::Resolve(market) => {
            let spotify = SpotifyClient::connect(&config.catalog()?).await?;
            let (artists, tracks) = pipeline.resolve(market, &spotify).await?;
            println!(
                "Resolved {} new artists and {} new tracks for {}",
                artists.inserted, tracks.inserted, market
            );
        }
        Command::Link(market) => {
            let report = pipeline.link(market).await?;
            println!("Linked {} {} entries", report.inserted, market);
        }
        Command::Enrich => {
            let spotify = SpotifyClient::connect(&config.catalog()?).await?;
            let (info, features) = pipeline.enrich(&spotify).await?;
            println!(
                "Enriched track info for {} songs and audio features for {} songs",
                info.updated, features.updated
            );
        }
        Command::Export(market) => {
            let count = pipeline.export(market).await?;
            println!(
                "Exported {} songs to {}",
                count,
                config.data_file(market.analysis_file()).display()
            );
        }
        Command::Stats(market) => {
            let report = pipeline.report(market).await?;
            print!("{}", report);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("hit-charts")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_arguments_runs_everything() {
        assert!(matches!(parse_args(&args(&[])), Ok(Command::Run)));
        assert!(matches!(parse_args(&args(&["run"])), Ok(Command::Run)));
    }

    #[test]
    fn stage_commands_take_a_market() {
        assert!(matches!(
            parse_args(&args(&["fetch", "china"])),
            Ok(Command::Fetch(Market::China))
        ));
        assert!(matches!(
            parse_args(&args(&["export", "us"])),
            Ok(Command::Export(Market::Us))
        ));
        assert!(matches!(parse_args(&args(&["enrich"])), Ok(Command::Enrich)));
        assert!(parse_args(&args(&["link"])).is_err());
        assert!(parse_args(&args(&["link", "mars"])).is_err());
        assert!(parse_args(&args(&["scrape"])).is_err());
    }
}
