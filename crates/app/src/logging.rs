use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::path::Path;

/// Logs to stderr, and to `log_file` as well when one is given.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let config = config();

    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![TermLogger::new(level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto)];

    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        loggers.push(WriteLogger::new(level, config, file));
    }

    CombinedLogger::init(loggers).context("failed to install logger")?;
    Ok(())
}

// GPU and windowing crates are chatty at debug level.
fn config() -> Config {
    ConfigBuilder::new()
        .add_filter_ignore_str("wgpu")
        .add_filter_ignore_str("naga")
        .add_filter_ignore_str("winit")
        .build()
}
