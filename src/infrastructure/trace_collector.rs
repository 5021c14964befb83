use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct TraceCollector;

impl TraceCollector {
    /// Resolve explicit trace files and `*.json` files found under `dirs`.
    /// Returns sorted, de-duplicated paths.
    pub fn collect(files: &[PathBuf], dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = files.to_vec();

        for dir in dirs {
            if !dir.is_dir() {
                anyhow::bail!("Trace directory not found: {}", dir.display());
            }
            Self::collect_json_recursive(dir, &mut paths)?;
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn collect_json_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") {
            return Ok(());
        }

        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_json_recursive(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                out.push(path);
            }
        }
        Ok(())
    }
}
