use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pdf-editor")]
#[command(about = "View PDFs, add text and whiteout, save a copy")]
pub struct Args {
    /// PDF to open at startup.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Initial zoom, overriding the saved preference.
    #[arg(long, value_name = "SCALE")]
    pub zoom: Option<f32>,

    #[arg(long, value_name = "LEVEL", default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// Also write log records to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
