//! CLV Predictor - Main Entry Point
//!
//! Reads one JSON record from stdin, prints the predicted lifetime value.
//!
//! ```text
//! echo '{"Recency":30,"Frequency":5,"Cluster":0,"AvgOrderValue":100.0,"DaysActive":60,"Quantity":20}' \
//!     | clv-predictor
//! ```

use std::io::Read;
use std::process::ExitCode;

use clv_predictor::api::commands;
use clv_predictor::constants::{APP_NAME, APP_VERSION};
use clv_predictor::logic::inference;
use clv_predictor::ServiceConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = ServiceConfig::from_env();
    let service = match inference::init(&config) {
        Ok(service) => service,
        Err(e) => {
            log::error!("Model load failed: {}", e);
            eprintln!("Cannot start {}: {}", APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("Failed to read input: {}", e);
        return ExitCode::FAILURE;
    }

    match commands::predict_clv_str(service, &input) {
        Ok(response) => {
            println!("Predicted Customer Lifetime Value: {}", response.display);
            if response.clamped_negative {
                println!("(model output was negative, {:.6} in log space; shown as zero)", response.log_prediction);
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
