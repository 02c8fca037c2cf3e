/* src/cli/core/src/build/sources.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::{DirEntry, WalkDir};

use crate::config::SeverConfig;

const SKIPPED_DIRS: [&str; 3] = ["node_modules", "target", "dist"];

fn is_skipped_dir(entry: &DirEntry, out_dir: &Path) -> bool {
  if !entry.file_type().is_dir() || entry.depth() == 0 {
    return false;
  }
  let name = entry.file_name().to_string_lossy();
  name.starts_with('.') || SKIPPED_DIRS.iter().any(|d| *d == name) || entry.path() == out_dir
}

/// Source modules under `src_dir` with an accepted extension, sorted.
pub fn collect_sources(config: &SeverConfig, base_dir: &Path) -> Result<Vec<PathBuf>> {
  let src_dir = config.src_dir(base_dir);
  if !src_dir.is_dir() {
    bail!("source directory not found: {}", src_dir.display());
  }
  let out_dir = config.out_dir(base_dir);

  let mut files = Vec::new();
  for entry in WalkDir::new(&src_dir).into_iter().filter_entry(|e| !is_skipped_dir(e, &out_dir)) {
    let entry = entry.with_context(|| format!("failed to walk {}", src_dir.display()))?;
    if entry.file_type().is_file() && config.accepts_extension(entry.path()) {
      files.push(entry.into_path());
    }
  }
  files.sort();
  Ok(files)
}
