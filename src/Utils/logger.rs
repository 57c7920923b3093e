use crate::numerical::interpolation::errors::{SplineError, SplineResult};
use log::{LevelFilter, info};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

/// Level filter from the name used in task documents.
///
/// `None` means the default level (info); "off" and "none" switch logging off.
pub fn parse_loglevel(loglevel: Option<&str>) -> SplineResult<LevelFilter> {
    let Some(level) = loglevel else {
        return Ok(LevelFilter::Info);
    };
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(SplineError::Config(format!(
            "loglevel must be trace, debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// Installs a terminal logger and, if `log_file` is given, a file logger with the same
/// level. A logger that is already installed is left in place.
pub fn init_logger(loglevel: Option<&str>, log_file: Option<&str>) -> SplineResult<()> {
    let level = parse_loglevel(loglevel)?;
    if level == LevelFilter::Off {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(name) = log_file {
        let file = File::create(name)
            .map_err(|e| SplineError::Config(format!("cannot create log file '{}': {}", name, e)))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    match CombinedLogger::init(loggers) {
        Ok(()) => {
            info!("logging started with level {}", level);
            Ok(())
        }
        // somebody else owns the global logger
        Err(_) => Ok(()),
    }
}
