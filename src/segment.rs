//! File-rollover bookkeeping for segmented logging.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Derives the name of a freshly opened segment:
/// `<folder>/TDMS_<YYYYMMDD-HHMMSS>.tdms`, local clock, taken at open
/// time.
pub fn segment_path(folder: &Path) -> PathBuf {
    folder.join(format!(
        "TDMS_{}.tdms",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Rollover controller: the running samples-per-channel counter of the
/// current segment plus the operator threshold, and nothing else; the
/// file handle lives with the persistence collaborator.
///
/// The threshold cell is shared with the control surface and re-read at
/// every block boundary, so an operator change mid-run takes effect at
/// the next block.
#[derive(Debug, Clone)]
pub struct Segmentation {
    samples_logged: u64,
    max_samples_per_file: Arc<AtomicU64>,
}

impl Segmentation {
    pub fn new(max_samples_per_file: Arc<AtomicU64>) -> Self {
        Segmentation {
            samples_logged: 0,
            max_samples_per_file,
        }
    }

    /// Samples per channel logged into the current segment so far.
    pub fn samples_in_current_file(&self) -> u64 {
        self.samples_logged
    }

    /// A new segment began outside the rollover path (session start).
    pub fn reset(&mut self) {
        self.samples_logged = 0;
    }

    /// Accounts one logged block of `block_size` samples per channel.
    /// Returns `true` when the threshold was reached: the caller must
    /// close the current segment and open a fresh one. A threshold
    /// smaller than the block size rolls over after every block,
    /// degenerate but valid.
    pub fn on_block_logged(&mut self, block_size: u64) -> bool {
        self.samples_logged += block_size;
        if self.samples_logged >= self.max_samples_per_file.load(Ordering::Relaxed) {
            self.samples_logged = 0;
            true
        } else {
            false
        }
    }
}
