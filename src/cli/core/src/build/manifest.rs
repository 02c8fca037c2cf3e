/* src/cli/core/src/build/manifest.rs */

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sever_compiler::{BoundaryKind, RouteEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoute {
  pub kind: BoundaryKind,
  pub route: String,
  pub name: String,
  pub module: String,
}

impl ManifestRoute {
  pub fn new(entry: &RouteEntry, module: &str) -> Self {
    Self {
      kind: entry.kind,
      route: entry.route.clone(),
      name: entry.name.clone(),
      module: module.to_string(),
    }
  }
}

/// `routes.json`: what a server host needs to know about the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
  pub project: String,
  pub minify: bool,
  pub expose_error_stacks: bool,
  pub routes: Vec<ManifestRoute>,
}

impl BuildManifest {
  pub fn write(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
  }

  pub fn read(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }
}
