//! Frame sources.
//!
//! A frame is the (already cropped) JPEG bytes sent to the oracle, plus an
//! optional reference to a full-resolution snapshot the caller persisted.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{GateWatchError, Result};
use crate::util::{read_bytes_with_limit, MAX_IMAGE_SIZE};

/// One captured camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes for the oracle.
    pub image: Vec<u8>,
    /// Where the caller stored the full frame, if anywhere.
    pub snapshot_ref: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            snapshot_ref: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_snapshot(mut self, snapshot_ref: impl Into<String>) -> Self {
        self.snapshot_ref = Some(snapshot_ref.into());
        self
    }
}

/// Fallible frame producer. Called once per oracle call.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Result<Frame>;
}

impl<T: FrameSource + ?Sized> FrameSource for &T {
    fn capture(&self) -> Result<Frame> {
        (**self).capture()
    }
}

/// Reads frames from image files, one file per capture.
///
/// Files are consumed in order; once the list is exhausted the last file is
/// read again. Each frame's snapshot reference is its path.
#[derive(Debug)]
pub struct FileFrameSource {
    paths: Vec<PathBuf>,
    next: Mutex<usize>,
}

impl FileFrameSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: Mutex::new(0),
        }
    }

    fn next_path(&self) -> Result<&PathBuf> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| GateWatchError::capture("frame source lock poisoned"))?;
        let last = self
            .paths
            .len()
            .checked_sub(1)
            .ok_or_else(|| GateWatchError::capture("no frame files configured"))?;
        let index = (*next).min(last);
        *next += 1;
        Ok(&self.paths[index])
    }
}

impl FrameSource for FileFrameSource {
    fn capture(&self) -> Result<Frame> {
        let path = self.next_path()?;
        let image = read_bytes_with_limit(path, MAX_IMAGE_SIZE)
            .map_err(|e| GateWatchError::capture(format!("failed to read frame: {}", e)))?;
        if image.is_empty() {
            return Err(GateWatchError::capture(format!(
                "empty frame file {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), bytes = image.len(), "captured frame");
        Ok(Frame::new(image).with_snapshot(path.display().to_string()))
    }
}

/// Plays back a fixed list of captures, then fails.
#[derive(Debug, Default)]
pub struct ScriptedFrameSource {
    frames: Mutex<Vec<std::result::Result<Frame, String>>>,
}

impl ScriptedFrameSource {
    /// `Ok` entries are returned as frames, `Err` entries as capture errors.
    pub fn new(mut frames: Vec<std::result::Result<Frame, String>>) -> Self {
        frames.reverse();
        Self {
            frames: Mutex::new(frames),
        }
    }

    /// A source that returns the same image `count` times.
    pub fn repeat(image: &[u8], count: usize) -> Self {
        Self::new((0..count).map(|_| Ok(Frame::new(image.to_vec()))).collect())
    }

    pub fn remaining(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl FrameSource for ScriptedFrameSource {
    fn capture(&self) -> Result<Frame> {
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| GateWatchError::capture("frame source lock poisoned"))?;
        match frames.pop() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(message)) => Err(GateWatchError::capture(message)),
            None => Err(GateWatchError::capture("no more frames")),
        }
    }
}
