use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rawdev_rs::image_pipeline::white_balance::PresetTable;
use rawdev_rs::image_pipeline::{
    ConfigStore, Configuration, JsonConfigStore, RawConverter, StaticLensDatabase,
};
use rawdev_rs::logger;

use tracing::{info, warn};

/// Develops a camera raw file into an RGB TIFF.
#[derive(Parser)]
#[command(name = "rawdev", version)]
struct Args {
    /// Raw file to develop
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// TIFF file to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// JSON configuration; defaults are used when absent
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON lens database enabling lens correction
    #[arg(long, value_name = "FILE")]
    lens_db: Option<PathBuf>,

    /// JSON white balance preset table
    #[arg(long, value_name = "FILE")]
    presets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init();

    let config = match &args.config {
        Some(path) => JsonConfigStore::new(path)
            .load()
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => Configuration::default(),
    };
    info!(
        interpolation = ?config.interpolation,
        depth = ?config.output_depth,
        compression = ?config.tiff.compression,
        "Configuration loaded"
    );

    let mut converter = RawConverter::new(config);

    if let Some(path) = &args.presets {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading presets {}", path.display()))?;
        converter = converter.with_presets(PresetTable::from_json(&json)?);
    }
    if let Some(path) = &args.lens_db {
        let database = StaticLensDatabase::load(path)
            .with_context(|| format!("loading lens database {}", path.display()))?;
        converter = converter.with_lens_database(Arc::new(database));
    }

    let report = converter
        .convert_file(&args.input, &args.output)
        .with_context(|| format!("converting {}", args.input.display()))?;

    for warning in &report.warnings {
        warn!("{}", warning);
    }
    report.timings.log_summary();
    info!(
        width = report.width,
        height = report.height,
        output = %args.output.display(),
        "Conversion successful"
    );

    Ok(())
}
