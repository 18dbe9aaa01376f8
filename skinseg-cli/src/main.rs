mod args;
mod config;
mod dataset;
mod detector;
mod input;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};
use skinseg_utils::{configure_telemetry, init_logging};

use crate::{
    args::BuildArgs,
    config::{apply_cli_overrides, load_settings},
    dataset::DatasetBuilder,
    detector::build_face_detector,
    input::load_vocabulary,
};

/// Split whose class folders define the vocabulary.
const VOCABULARY_SPLIT: &str = "train";

fn main() -> Result<()> {
    let args = BuildArgs::parse();
    init_logging(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    })?;

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure the worker pool")?;
    }

    let dataset = &settings.dataset;
    anyhow::ensure!(
        !dataset.splits.is_empty(),
        "no splits selected; pass --splits or set dataset.splits"
    );
    let vocabulary = load_vocabulary(&dataset.input_root.join(VOCABULARY_SPLIT))?;
    info!(
        "Classes ({}): {}",
        vocabulary.len(),
        vocabulary.names().join(", ")
    );

    let detector = build_face_detector(&settings)?;
    let builder = DatasetBuilder::new(&settings, detector.as_deref(), vocabulary);
    let report = builder.run(&dataset.splits)?;

    info!(
        "Done: {} accepted, {} skipped, {} write failures, {} label failures -> {}",
        report.accepted(),
        report.skipped(),
        report.write_failures(),
        report.label_failures(),
        builder.layout().root().display()
    );
    if report.write_failures() > 0 {
        warn!(
            "{} sample(s) could not be written; see the warnings above",
            report.write_failures()
        );
    }

    if let Some(path) = args.report.as_ref() {
        report.write_json(path)?;
        info!("Wrote run report to {}", path.display());
    }

    if report.label_failures() > 0 {
        anyhow::bail!(
            "{} label mask(s) violated the class range; the dataset is incomplete",
            report.label_failures()
        );
    }
    Ok(())
}
