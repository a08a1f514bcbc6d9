//! Best-effort source line lookup for rendered frames

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Caches file contents so repeated frames in the same file read it once.
///
/// Files are read relative to the current directory, as recorded by `file!()`.
/// Unreadable files are cached as missing so output stays stable.
#[derive(Debug, Default)]
pub struct LineCache {
    files: Mutex<HashMap<String, Option<Arc<Vec<String>>>>>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trimmed text of `line` (1-based) in `file`, if it can be read
    pub fn line(&self, file: &str, line: u32) -> Option<String> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        let lines = self.lines(file)?;
        lines
            .get(index)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    fn lines(&self, file: &str) -> Option<Arc<Vec<String>>> {
        let mut files = match self.files.lock() {
            Ok(files) => files,
            Err(poisoned) => poisoned.into_inner(),
        };

        files
            .entry(file.to_string())
            .or_insert_with(|| Self::read(Path::new(file)))
            .clone()
    }

    fn read(path: &Path) -> Option<Arc<Vec<String>>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(Arc::new(content.lines().map(str::to_string).collect())),
            Err(e) => {
                tracing::trace!(
                    path = %path.display(),
                    error = %e,
                    "Source file unavailable for traceback"
                );
                None
            }
        }
    }

    /// Forget every cached file
    pub fn clear(&self) {
        if let Ok(mut files) = self.files.lock() {
            files.clear();
        }
    }
}
