use mqtt_hwmon_temp::configuration::Configuration;
use mqtt_hwmon_temp::hwmon;
use mqtt_hwmon_temp::publisher::Publisher;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use log::info;
use std::error::Error;

const DEFAULT_CONFIG_PATH: &str = "/etc/mqtt-hwmon-temp.conf";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => path.as_str(),
        None => DEFAULT_CONFIG_PATH,
    };

    let config = Configuration::load(config_path).expect("Failed to load configuration");

    let _logger = init_logging(&config).expect("Failed to initialize logging");

    let readings = hwmon::scan(&config.sensors);
    if readings.is_empty() {
        info!("No matching temperature labels found. Nothing will be published.");
        return;
    }

    Publisher::new(config).run(readings).await;
}

/// Builds the logger before the pipeline runs: a size-rotated file when one
/// is configured, stderr otherwise.
///
/// The returned handle must stay alive until the process exits, dropping it
/// flushes and closes the file writer.
fn init_logging(config: &Configuration) -> Result<Option<LoggerHandle>, Box<dyn Error>> {
    let Some(file) = &config.log.file else {
        stderrlog::new()
            .module(module_path!())
            .verbosity(config.log_verbosity)
            .init()?;
        return Ok(None);
    };

    let handle = Logger::try_with_str(level(config.log_verbosity))?
        .log_to_file(FileSpec::try_from(file.clone())?)
        .append()
        .rotate(
            Criterion::Size(config.log.max_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.log.backups),
        )
        .format(flexi_logger::detailed_format)
        .start()?;

    Ok(Some(handle))
}

fn level(verbosity: usize) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}
