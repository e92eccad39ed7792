//! basin_risk - command line front end for the basin flood risk engine.
//!
//! Every subcommand prints its result as JSON on stdout; logs go to stderr.

use basin_risk_service::config::{self, Config};
use basin_risk_service::engine::BasinEngine;
use basin_risk_service::ingest::open_meteo::OpenMeteoClient;
use basin_risk_service::logging::{self, DataSource, LogLevel};
use basin_risk_service::simulation::SimulationInputs;
use basin_risk_service::verify;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;

#[derive(Parser)]
#[command(name = "basin_risk", version, about = "River basin flood risk engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Footprints of the loaded elevation tiles
    Coverage,
    /// Distributed runoff, discharge and risk for current (or simulated) conditions
    Predict {
        /// Simulated basin rain in mm
        #[arg(long)]
        rain: Option<f64>,
        /// Simulated soil moisture fraction (0-1)
        #[arg(long)]
        soil: Option<f64>,
        /// Simulated 5-day antecedent rain in mm
        #[arg(long)]
        antecedent: Option<f64>,
        /// Upstream reservoir release in cusecs
        #[arg(long)]
        release: Option<f64>,
    },
    /// Flood stage at a point
    Check {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Basin discharge in cusecs
        #[arg(long, default_value_t = 0.0)]
        discharge: f64,
    },
    /// 12-hour outlook; synthetic storm when --rain is given
    Forecast {
        /// Peak rain of the synthetic storm in mm
        #[arg(long)]
        rain: Option<f64>,
    },
    /// Report which datasets loaded and whether the weather source answers
    Verify,
}

fn load_configuration() -> Result<Config, Box<dyn Error>> {
    let path = config::config_path_from_env();
    if !path.exists() {
        logging::info(
            DataSource::System,
            None,
            &format!("{} not found; using calibrated defaults", path.display()),
        );
        return Ok(Config::default());
    }
    let config = config::load_config(&path)?;
    logging::info(DataSource::System, None, &format!("Loaded configuration from {}", path.display()));
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    logging::init_logger(LogLevel::Info, None, false);
    let config = load_configuration()?;
    logging::init_logger(
        LogLevel::from_name(&config.logging.level),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let weather = OpenMeteoClient::new(config.weather.clone())?;
    let engine = BasinEngine::from_config(config, weather);

    match cli.command {
        Command::Coverage => print_json(&engine.coverage()),
        Command::Predict {
            rain,
            soil,
            antecedent,
            release,
        } => {
            let inputs = SimulationInputs {
                rain_mm: rain,
                soil_moisture: soil,
                antecedent_rain_mm: antecedent,
                release_cusecs: release,
            };
            print_json(&engine.predict(&inputs))
        }
        Command::Check { lat, lon, discharge } => print_json(&engine.check_location(lat, lon, discharge)),
        Command::Forecast { rain } => print_json(&engine.forecast(rain)),
        Command::Verify => {
            let report = verify::run_readiness_check(&engine);
            verify::print_summary(&report);
            print_json(&report)
        }
    }
}
