//! Discovering classes and source images in the input tree.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use skinseg_core::ClassVocabulary;
use walkdir::WalkDir;

/// One source image and the class it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub path: PathBuf,
    pub class_name: String,
    pub class_id: u8,
    /// Replacement output stem, set when the source stem is not unique in its split.
    pub output_stem: Option<String>,
}

impl SampleEntry {
    pub fn new(path: PathBuf, class_name: impl Into<String>, class_id: u8) -> Self {
        Self {
            path,
            class_name: class_name.into(),
            class_id,
            output_stem: None,
        }
    }

    /// Source file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Source file stem.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// Stem shared by the written skin image, mask and previews.
    pub fn output_stem(&self) -> String {
        self.output_stem
            .clone()
            .unwrap_or_else(|| self.file_stem())
    }

    /// File name of the written skin image; keeps the source extension.
    pub fn output_image_name(&self) -> String {
        match (&self.output_stem, self.extension()) {
            (None, _) => self.file_name(),
            (Some(stem), Some(ext)) => format!("{stem}.{ext}"),
            (Some(stem), None) => stem.clone(),
        }
    }

    /// File name of the written label mask.
    pub fn output_mask_name(&self) -> String {
        format!("{}.png", self.output_stem())
    }
}

/// Class names from the sub-directories of `split_dir`, sorted.
pub fn discover_class_names(split_dir: &Path) -> Result<Vec<String>> {
    anyhow::ensure!(
        split_dir.is_dir(),
        "class directory root {} does not exist",
        split_dir.display()
    );
    let mut names = Vec::new();
    for entry in fs::read_dir(split_dir)
        .with_context(|| format!("failed to list {}", split_dir.display()))?
    {
        let entry = entry.with_context(|| format!("failed to list {}", split_dir.display()))?;
        if entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Build the run's vocabulary from the class folders of `split_dir`.
pub fn load_vocabulary(split_dir: &Path) -> Result<ClassVocabulary> {
    let names = discover_class_names(split_dir)?;
    ClassVocabulary::new(names)
        .with_context(|| format!("no usable class folders in {}", split_dir.display()))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Images directly inside `dir` whose extension is in `extensions`, sorted.
pub fn collect_images(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if has_extension(entry.path(), extensions) {
            images.push(entry.path().to_path_buf());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }
    images.sort();
    images
}

/// Every image of one split, class by class in vocabulary order.
///
/// Missing class folders are logged and skipped. Folders that are not part of
/// the vocabulary are ignored with a warning.
pub fn collect_split(
    split_dir: &Path,
    vocabulary: &ClassVocabulary,
    extensions: &[String],
) -> Vec<SampleEntry> {
    let mut entries = Vec::new();
    for (class_id, class_name) in vocabulary.iter() {
        let class_dir = split_dir.join(class_name);
        if !class_dir.is_dir() {
            warn!(
                "Class folder {} is missing; skipping",
                class_dir.display()
            );
            continue;
        }
        entries.extend(
            collect_images(&class_dir, extensions)
                .into_iter()
                .map(|path| SampleEntry::new(path, class_name, class_id)),
        );
    }

    if let Ok(present) = discover_class_names(split_dir) {
        for unknown in present
            .iter()
            .filter(|name| vocabulary.id_of(name).is_none())
        {
            warn!(
                "Ignoring {} in {}: not a known class",
                unknown,
                split_dir.display()
            );
        }
    }

    entries
}

/// Give every entry whose stem is not unique in the split its own output stem.
///
/// Outputs are flattened per split and masks are always `<stem>.png`, so
/// `dry/a.jpg`, `dry/a.png` and `oily/a.jpg` would otherwise write the same
/// mask. Each of them becomes `<class>__<stem>_<ext>` instead. Returns the
/// shared stems with the sources that claimed them, in entry order.
pub fn resolve_name_collisions(entries: &mut [SampleEntry]) -> BTreeMap<String, Vec<String>> {
    let mut owners: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate() {
        owners.entry(entry.file_stem()).or_default().push(index);
    }
    owners.retain(|_, indices| indices.len() > 1);

    let mut collisions = BTreeMap::new();
    for (stem, indices) in owners {
        let mut sources = Vec::with_capacity(indices.len());
        for index in indices {
            let entry = &mut entries[index];
            let suffix = entry
                .extension()
                .map(|ext| format!("_{ext}"))
                .unwrap_or_default();
            entry.output_stem = Some(format!("{}__{stem}{suffix}", entry.class_name));
            sources.push(format!("{}/{}", entry.class_name, entry.file_name()));
        }
        collisions.insert(stem, sources);
    }
    collisions
}
