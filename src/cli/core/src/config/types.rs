/* src/cli/core/src/config/types.rs */

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::Deserialize;
use sever_compiler::{CompileOptions, DEFAULT_RUNTIME_MODULE, Target};

#[derive(Debug, Clone, Deserialize)]
pub struct SeverConfig {
  pub project: ProjectConfig,
  #[serde(default)]
  pub build: BuildSection,
  #[serde(default)]
  pub server: ServerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
  /// Project root, relative to the directory holding `sever.toml`.
  #[serde(default = "default_root")]
  pub root: String,
  #[serde(default = "default_src_dir")]
  pub src_dir: String,
  #[serde(default = "default_out_dir")]
  pub out_dir: String,
  #[serde(default)]
  pub minify: bool,
  #[serde(default = "default_runtime_module")]
  pub runtime_module: String,
  pub server_runtime_module: Option<String>,
  /// Import sources the sweep never removes.
  #[serde(default)]
  pub keep_imports: Vec<String>,
  /// File extensions compiled by `sever build`. The compiler reads plain
  /// JavaScript only, so TypeScript or JSX sources must be stripped by an
  /// earlier step before their extension is listed here.
  #[serde(default = "default_extensions")]
  pub extensions: Vec<String>,
}

impl Default for BuildSection {
  fn default() -> Self {
    Self {
      root: default_root(),
      src_dir: default_src_dir(),
      out_dir: default_out_dir(),
      minify: false,
      runtime_module: default_runtime_module(),
      server_runtime_module: None,
      keep_imports: Vec::new(),
      extensions: default_extensions(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
  /// Unset means "on for development builds".
  pub expose_error_stacks: Option<bool>,
}

fn default_root() -> String {
  ".".to_string()
}

fn default_src_dir() -> String {
  "src".to_string()
}

fn default_out_dir() -> String {
  ".sever/output".to_string()
}

fn default_runtime_module() -> String {
  DEFAULT_RUNTIME_MODULE.to_string()
}

fn default_extensions() -> Vec<String> {
  ["js", "mjs"].iter().map(ToString::to_string).collect()
}

impl SeverConfig {
  pub fn validate(&self) -> Result<()> {
    if self.build.extensions.is_empty() {
      bail!("build.extensions must not be empty");
    }
    if self.build.runtime_module.trim().is_empty() {
      bail!("build.runtime_module must not be empty");
    }
    Ok(())
  }

  pub fn root_dir(&self, base_dir: &Path) -> PathBuf {
    base_dir.join(&self.build.root)
  }

  pub fn src_dir(&self, base_dir: &Path) -> PathBuf {
    self.root_dir(base_dir).join(&self.build.src_dir)
  }

  pub fn out_dir(&self, base_dir: &Path) -> PathBuf {
    self.root_dir(base_dir).join(&self.build.out_dir)
  }

  /// Stack exposure for the server runtime; development builds expose stacks
  /// unless configured otherwise.
  pub fn expose_error_stacks(&self) -> bool {
    self.server.expose_error_stacks.unwrap_or(!self.build.minify)
  }

  pub fn compile_options(&self, path: &str, target: Target) -> CompileOptions {
    CompileOptions {
      path: path.to_string(),
      target,
      minify: self.build.minify,
      runtime_module: self.build.runtime_module.clone(),
      server_runtime_module: self.build.server_runtime_module.clone(),
      keep_imports: self.build.keep_imports.clone(),
    }
  }

  pub fn accepts_extension(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|ext| self.build.extensions.iter().any(|allowed| allowed == ext))
  }
}
