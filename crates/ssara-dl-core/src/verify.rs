//! Post-download verification: expected listing vs. the working directory.

use std::path::Path;

use crate::listing::ExpectedFileSet;

/// Expected basenames with no matching entry in `dir`, in listing order.
pub fn missing_files(dir: &Path, expected: &ExpectedFileSet) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !dir.join(name).exists())
        .map(str::to_string)
        .collect()
}
