//! Dataset generation: per split, per image, extract, encode, persist.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use skinseg_core::{
    ClassVocabulary, FaceDetector, LabelMask, RegionPolicy, SamplePipeline, SkinSample,
    encode_label,
};
use skinseg_utils::{
    OutputOptions, class_color, colorize_label_mask, config::AppSettings, render_region_preview,
    save_label_mask, save_rgb_image, timing_guard, write_class_list,
};

use crate::{
    input::{SampleEntry, collect_split, resolve_name_collisions},
    report::{RunReport, SampleOutcome, SplitReport},
};

/// Where generated files go under the output root.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self, split: &str) -> PathBuf {
        self.root.join("images").join(split)
    }

    pub fn masks_dir(&self, split: &str) -> PathBuf {
        self.root.join("masks").join(split)
    }

    pub fn previews_dir(&self, split: &str) -> PathBuf {
        self.root.join("previews").join(split)
    }

    /// Colorized label masks, next to the overlays.
    pub fn label_previews_dir(&self, split: &str) -> PathBuf {
        self.previews_dir(split).join("labels")
    }

    pub fn classes_file(&self) -> PathBuf {
        self.root.join("classes.txt")
    }

    /// Create every output directory up front.
    pub fn prepare(&self, splits: &[String], previews: bool) -> Result<()> {
        for split in splits {
            let mut dirs = vec![self.images_dir(split), self.masks_dir(split)];
            if previews {
                dirs.push(self.label_previews_dir(split));
            }
            for dir in dirs {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
        }
        Ok(())
    }
}

/// Builds the segmentation dataset for one run.
pub struct DatasetBuilder<'d> {
    pipeline: SamplePipeline<'d>,
    vocabulary: ClassVocabulary,
    layout: DatasetLayout,
    input_root: PathBuf,
    extensions: Vec<String>,
    output: OutputOptions,
    previews: bool,
    preview_alpha: f32,
}

impl<'d> DatasetBuilder<'d> {
    pub fn new(
        settings: &AppSettings,
        detector: Option<&'d dyn FaceDetector>,
        vocabulary: ClassVocabulary,
    ) -> Self {
        let dataset = &settings.dataset;
        Self {
            pipeline: SamplePipeline::new(
                detector,
                RegionPolicy::from(settings.region),
                &settings.skin,
            ),
            vocabulary,
            layout: DatasetLayout::new(&dataset.output_root),
            input_root: dataset.input_root.clone(),
            extensions: dataset.extensions.clone(),
            output: OutputOptions {
                jpeg_quality: dataset.jpeg_quality,
            },
            previews: dataset.previews,
            preview_alpha: dataset.preview_alpha,
        }
    }

    pub fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Process every split in order and return the counts.
    pub fn run(&self, splits: &[String]) -> Result<RunReport> {
        let _guard = timing_guard("skinseg_cli::build_dataset", log::Level::Info);
        self.layout.prepare(splits, self.previews)?;
        write_class_list(self.vocabulary.names(), &self.layout.classes_file())?;
        info!(
            "Wrote {} classes to {}",
            self.vocabulary.len(),
            self.layout.classes_file().display()
        );

        let reports = splits
            .iter()
            .map(|split| self.process_split(split))
            .collect();

        Ok(RunReport {
            input_root: self.input_root.display().to_string(),
            output_root: self.layout.root().display().to_string(),
            classes: self.vocabulary.names().to_vec(),
            splits: reports,
        })
    }

    /// Process one split. Individual failures are counted, never propagated.
    pub fn process_split(&self, split: &str) -> SplitReport {
        let split_dir = self.input_root.join(split);
        if !split_dir.is_dir() {
            warn!("Split folder {} is missing; skipping", split_dir.display());
            return SplitReport::missing(split);
        }

        let _guard = timing_guard(format!("split {split}"), log::Level::Info);
        let mut entries = collect_split(&split_dir, &self.vocabulary, &self.extensions);
        let mut report = SplitReport::new(split);

        let collisions = resolve_name_collisions(&mut entries);
        for (stem, sources) in &collisions {
            warn!(
                "{split}: stem '{stem}' is shared by {}; writing them as <class>__{stem}_<ext>",
                sources.join(", ")
            );
        }
        report.name_collisions = collisions.into_keys().collect();

        info!("{split}: processing {} image(s)", entries.len());
        let outcomes: Vec<SampleOutcome> = entries
            .par_iter()
            .map(|entry| self.process_entry(entry, split))
            .collect();
        for outcome in &outcomes {
            report.record(outcome);
        }

        info!(
            "{split}: {} accepted, {} skipped, {} write failures, {} label failures",
            report.accepted,
            report.skipped_total(),
            report.write_failures,
            report.label_failures
        );
        report
    }

    fn process_entry(&self, entry: &SampleEntry, split: &str) -> SampleOutcome {
        let sample = match self.pipeline.process_path(&entry.path) {
            Ok(sample) => sample,
            Err(reason) => {
                debug!("Skipping {}: {reason}", entry.path.display());
                return SampleOutcome::Skipped(reason.kind());
            }
        };

        let label = match encode_label(&sample.mask, entry.class_id, self.vocabulary.len()) {
            Ok(label) => label,
            Err(err) => {
                error!(
                    "Label mask for {} ({}) is invalid: {err}",
                    entry.path.display(),
                    entry.class_name
                );
                return SampleOutcome::LabelInvalid;
            }
        };

        match self.persist(entry, split, &sample, &label) {
            Ok(()) => {
                debug!(
                    "{} -> {} ({:.1}% skin)",
                    entry.path.display(),
                    entry.class_name,
                    sample.skin_ratio * 100.0
                );
                SampleOutcome::Accepted
            }
            Err(err) => {
                warn!("Failed to write outputs for {}: {err:#}", entry.path.display());
                SampleOutcome::WriteFailed
            }
        }
    }

    fn persist(
        &self,
        entry: &SampleEntry,
        split: &str,
        sample: &SkinSample,
        label: &LabelMask,
    ) -> Result<()> {
        let image_path = self.layout.images_dir(split).join(entry.output_image_name());
        save_rgb_image(&sample.skin_image, &image_path, &self.output)?;

        let mask_name = entry.output_mask_name();
        let mask_path = self.layout.masks_dir(split).join(&mask_name);
        save_label_mask(label.as_image(), &mask_path)?;

        if self.previews {
            let preview = render_region_preview(
                &sample.image,
                sample.region.as_tuple(),
                &sample.mask,
                class_color(entry.class_id),
                self.preview_alpha,
            );
            let preview_path = self.layout.previews_dir(split).join(&mask_name);
            save_rgb_image(&preview, &preview_path, &self.output)?;

            let colorized = colorize_label_mask(label.as_image());
            let colorized_path = self.layout.label_previews_dir(split).join(&mask_name);
            save_rgb_image(&colorized, &colorized_path, &self.output)?;
        }
        Ok(())
    }
}
