//! Class vocabulary and label mask encoding.
//!
//! Label id 0 is background; the classes of a [`ClassVocabulary`] take ids
//! `1..=N` in vocabulary order. Ids are stored in an 8-bit mask, so a
//! vocabulary holds at most 255 classes.

use std::collections::HashSet;

use image::{GrayImage, Luma};
use thiserror::Error;

/// Label written for pixels outside the skin mask.
pub const BACKGROUND: u8 = 0;
/// Largest vocabulary an 8-bit label mask can address.
pub const MAX_CLASSES: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("class vocabulary is empty")]
    Empty,
    #[error("class name at position {0} is blank")]
    BlankName(usize),
    #[error("class '{0}' appears more than once")]
    Duplicate(String),
    #[error("{0} classes exceed the 255 an 8-bit label mask can hold")]
    TooMany(usize),
}

/// Ordered, duplicate-free list of class names fixed for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: Vec<String>,
}

impl ClassVocabulary {
    pub fn new<I, S>(names: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(VocabularyError::Empty);
        }
        if names.len() > MAX_CLASSES {
            return Err(VocabularyError::TooMany(names.len()));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(VocabularyError::BlankName(index));
            }
            if !seen.insert(name.as_str()) {
                return Err(VocabularyError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Number of classes, `N`.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`; construction rejects empty vocabularies.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Label id (1-based) for `name`.
    pub fn id_of(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| (index + 1) as u8)
    }

    /// Class name for a label id; `None` for background and unknown ids.
    pub fn name_of(&self, id: u8) -> Option<&str> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| ((index + 1) as u8, name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("class id {class_id} is outside 1..={vocabulary_len}")]
    ClassIdOutOfRange { class_id: u8, vocabulary_len: usize },
    #[error("label mask holds value {max}, above the vocabulary size {vocabulary_len}")]
    ValueOutOfRange { max: u8, vocabulary_len: usize },
}

/// Single-channel mask of label ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    mask: GrayImage,
    class_id: u8,
}

impl LabelMask {
    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }

    pub fn into_image(self) -> GrayImage {
        self.mask
    }

    /// The class painted on foreground pixels.
    pub fn class_id(&self) -> u8 {
        self.class_id
    }

    /// Highest id present; [`BACKGROUND`] when the mask has no foreground.
    pub fn max_value(&self) -> u8 {
        max_value(&self.mask)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }
}

fn max_value(mask: &GrayImage) -> u8 {
    mask.as_raw().iter().copied().max().unwrap_or(BACKGROUND)
}

/// Paint every foreground pixel of `binary_mask` with `class_id`.
///
/// The result is checked against the vocabulary size before it is returned;
/// an out-of-range value means the caller mixed up ids and must not be
/// written out.
pub fn encode_label(
    binary_mask: &GrayImage,
    class_id: u8,
    vocabulary_len: usize,
) -> Result<LabelMask, LabelError> {
    if class_id == BACKGROUND || class_id as usize > vocabulary_len {
        return Err(LabelError::ClassIdOutOfRange {
            class_id,
            vocabulary_len,
        });
    }

    let mut mask = GrayImage::new(binary_mask.width(), binary_mask.height());
    for (out, value) in mask.pixels_mut().zip(binary_mask.pixels()) {
        if value[0] > 0 {
            *out = Luma([class_id]);
        }
    }

    let max = max_value(&mask);
    if max as usize > vocabulary_len {
        return Err(LabelError::ValueOutOfRange {
            max,
            vocabulary_len,
        });
    }

    Ok(LabelMask { mask, class_id })
}
