//! Directory size sampling for stall detection.

use std::io;
use std::path::Path;

/// Source of directory size samples, in kilobytes.
pub trait SizeSampler: Send + Sync {
    fn sample_kb(&self, dir: &Path) -> io::Result<u64>;
}

/// Walks the directory tree and sums regular-file sizes, rounding each file
/// up to a whole kilobyte (so small writes still move the total).
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkDirSampler;

impl SizeSampler for WalkDirSampler {
    fn sample_kb(&self, dir: &Path) -> io::Result<u64> {
        // The root must exist; entries vanishing mid-walk (renamed partials) are skipped.
        dir.metadata()?;
        let total = walkdir::WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len().div_ceil(1024))
            .sum();
        Ok(total)
    }
}
