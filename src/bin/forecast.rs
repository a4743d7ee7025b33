//! Command-line access to the forecasting pipeline, sharing configuration
//! and artifacts with the server.
//!
//! ```sh
//! cargo run --bin forecast -- train --ticker MSFT --epochs 20
//! cargo run --bin forecast -- predict --days 10
//! cargo run --bin forecast -- history --ticker MSFT --period 6mo --csv data/MSFT.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use stockcast::application::{ForecastService, ForecastSettings};
use stockcast::config::Config;
use stockcast::domain::market::Period;
use stockcast::infrastructure::csv_data::write_bars;
use stockcast::infrastructure::observability::Metrics;
use stockcast::infrastructure::{ArtifactStore, ProviderFactory};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Train and query the LSTM price forecaster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download history and fit a fresh model
    Train {
        /// Ticker to train on (default: DEFAULT_TICKER)
        #[arg(long)]
        ticker: Option<String>,

        /// Window length in trading days (default: DEFAULT_TIME_STEP)
        #[arg(long)]
        time_step: Option<usize>,

        /// Training epochs (default: DEFAULT_EPOCHS)
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Roll the trained model forward
    Predict {
        /// Calendar days to forecast (default: DEFAULT_FORECAST_DAYS)
        #[arg(long)]
        days: Option<usize>,
    },
    /// Print or export daily bars
    History {
        #[arg(long, default_value = "AAPL")]
        ticker: String,

        /// Look-back period such as 60d, 6mo, 1y, ytd or max
        #[arg(long, default_value = "1y")]
        period: String,

        /// Write bars to this CSV file instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let service = Arc::new(ForecastService::new(
        ProviderFactory::create_provider(&config.provider),
        ArtifactStore::new(config.model.model_dir.clone()),
        ForecastSettings::from(&config.model),
        Metrics::new()?,
    ));

    match cli.command {
        Commands::Train {
            ticker,
            time_step,
            epochs,
        } => {
            let request = service.train_request(ticker, time_step, epochs);
            let outcome = service.train(request).await?;
            println!(
                "Trained {} (run {}) on {} windows of {}",
                outcome.manifest.ticker,
                outcome.manifest.run_id,
                outcome.manifest.training_pairs,
                outcome.manifest.time_step
            );
            for (epoch, loss) in outcome.report.loss_history.iter().enumerate() {
                let val = outcome.report.val_loss_history.get(epoch);
                match val {
                    Some(val) => println!("epoch {:>3}  loss {:.6}  val_loss {:.6}", epoch + 1, loss, val),
                    None => println!("epoch {:>3}  loss {:.6}", epoch + 1, loss),
                }
            }
        }
        Commands::Predict { days } => {
            let days = days.unwrap_or(service.settings().default_forecast_days);
            let forecast = service.predict(days).await?;
            println!("{:<12} {:>12}", "date", "price");
            for (date, price) in forecast.points() {
                println!("{:<12} {:>12.2}", date.format("%Y-%m-%d"), price);
            }
        }
        Commands::History {
            ticker,
            period,
            csv,
        } => {
            let period = Period::from_str(&period)?;
            let series = service.history(&ticker, period).await?;
            match csv {
                Some(path) => {
                    write_bars(&path, series.bars())?;
                    info!("Wrote {} bars for {} to {:?}", series.len(), series.ticker(), path);
                }
                None => {
                    println!(
                        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}",
                        "date", "open", "high", "low", "close", "volume"
                    );
                    for bar in series.bars() {
                        println!(
                            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}",
                            bar.date.format("%Y-%m-%d"),
                            bar.open,
                            bar.high,
                            bar.low,
                            bar.close,
                            bar.volume
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
