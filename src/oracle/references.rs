//! Few-shot reference images.
//!
//! Up to four labeled examples of known gate states can sit in a reference
//! directory. Every file is optional: missing or unreadable files are logged
//! and skipped, and an empty set means zero-shot classification.

use std::path::Path;

use crate::util::{read_bytes_with_limit, MAX_IMAGE_SIZE};

/// Known reference file names and the label shown to the oracle before each.
pub const REFERENCE_FILES: &[(&str, &str)] = &[
    ("closed_day.jpg", "Example - CLOSED gate (daytime):"),
    ("closed_night.jpg", "Example - CLOSED gate (nighttime):"),
    ("open_day.jpg", "Example - OPEN gate (daytime):"),
    ("open_night.jpg", "Example - OPEN gate (nighttime):"),
];

/// A labeled example image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub file_name: String,
    pub label: String,
    pub data: Vec<u8>,
}

impl ReferenceImage {
    pub fn new(file_name: impl Into<String>, label: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            label: label.into(),
            data,
        }
    }
}

/// The reference images loaded at startup, in [`REFERENCE_FILES`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    images: Vec<ReferenceImage>,
}

impl ReferenceSet {
    /// An empty set (zero-shot mode).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_images(images: Vec<ReferenceImage>) -> Self {
        Self { images }
    }

    /// Load whichever known reference files exist in `dir`.
    pub fn load(dir: &Path) -> Self {
        if !dir.is_dir() {
            tracing::info!(
                dir = %dir.display(),
                "reference directory not found, running in zero-shot mode"
            );
            return Self::empty();
        }

        let mut images = Vec::new();
        for (file_name, label) in REFERENCE_FILES {
            let path = dir.join(file_name);
            if !path.exists() {
                tracing::debug!(file = file_name, "reference image not found (optional)");
                continue;
            }

            match read_bytes_with_limit(&path, MAX_IMAGE_SIZE) {
                Ok(data) => {
                    tracing::info!(file = file_name, bytes = data.len(), "loaded reference image");
                    images.push(ReferenceImage::new(*file_name, *label, data));
                }
                Err(e) => {
                    tracing::warn!(file = file_name, error = %e, "failed to load reference image");
                }
            }
        }

        if images.is_empty() {
            tracing::info!("no reference images found, running in zero-shot mode");
        } else {
            tracing::info!(count = images.len(), "few-shot mode enabled");
        }

        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceImage> {
        self.images.iter()
    }

    /// File names of the loaded images.
    pub fn file_names(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.file_name.as_str()).collect()
    }
}
