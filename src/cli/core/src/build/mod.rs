/* src/cli/core/src/build/mod.rs */

mod manifest;
mod sources;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use sever_compiler::{
  CompileOutput, ROUTE_PREFIX, RouteEntry, SPLIT_MODULE_PREFIX, Target, compile,
  is_server_module, needs_transform, stub_server_module,
};
use tracing::{debug, info};

use crate::config::SeverConfig;
use crate::ui;

pub use manifest::{BuildManifest, ManifestRoute};
pub use sources::collect_sources;

pub const ROUTES_FILE: &str = "routes.json";
pub const SPLIT_MANIFEST_FILE: &str = "split-manifest.json";
const SPLIT_DIR: &str = "_split";

/// Both builds of one source module.
#[derive(Debug)]
pub struct ModuleArtifacts {
  /// Path relative to the project root, forward slashes.
  pub path: String,
  pub client: CompileOutput,
  pub server: CompileOutput,
  pub transformed: bool,
}

#[derive(Debug, Default)]
pub struct BuildReport {
  pub modules: usize,
  pub transformed: usize,
  pub routes: usize,
  pub splits: usize,
}

pub fn relative_path(root: &Path, file: &Path) -> String {
  let rel = file.strip_prefix(root).unwrap_or(file);
  rel.to_string_lossy().replace('\\', "/")
}

/// Compiles one module for both targets. Server-only modules (`*.server$.*`)
/// get an export stub on the client side.
pub fn compile_module(config: &SeverConfig, root: &Path, file: &Path) -> Result<ModuleArtifacts> {
  let source =
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
  let path = relative_path(root, file);

  let server = compile(&source, &config.compile_options(&path, Target::Server))?;
  let client = if is_server_module(&path) {
    CompileOutput { code: stub_server_module(&source, &path)?, ..Default::default() }
  } else {
    compile(&source, &config.compile_options(&path, Target::Client))?
  };

  if !is_server_module(&path) && client.routes != server.routes {
    bail!("{path}: client and server builds disagree on boundary routes");
  }
  Ok(ModuleArtifacts { transformed: needs_transform(&source), path, client, server })
}

/// `virtual:sever-split:/_m/app/lazy/0/render` -> `_split/app/lazy/0/render.js`
pub fn split_file_name(id: &str) -> String {
  let route = id.strip_prefix(SPLIT_MODULE_PREFIX).unwrap_or(id);
  let route = route.strip_prefix(ROUTE_PREFIX).unwrap_or(route).trim_start_matches('/');
  format!("{SPLIT_DIR}/{route}.js")
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn write_target(
  out_dir: &Path,
  target: Target,
  module: &ModuleArtifacts,
  output: &CompileOutput,
  splits: &mut BTreeMap<String, String>,
) -> Result<()> {
  let dir = out_dir.join(match target {
    Target::Client => "client",
    Target::Server => "server",
  });
  write_file(&dir.join(&module.path), &output.code)?;
  for (id, code) in &output.split_modules {
    let file = split_file_name(id);
    write_file(&dir.join(&file), code)?;
    splits.insert(id.clone(), file);
  }
  Ok(())
}

/// Compiles every source module in parallel and writes client, server and
/// split artifacts plus the route manifests under `out_dir`.
pub fn run_build(config: &SeverConfig, base_dir: &Path) -> Result<BuildReport> {
  let root = config.root_dir(base_dir);
  let out_dir = config.out_dir(base_dir);

  ui::step(1, 3, "collecting sources");
  let files = collect_sources(config, base_dir)?;
  ui::detail(&format!("{} modules under {}", files.len(), config.build.src_dir));

  ui::step(2, 3, "compiling");
  let mut modules: Vec<ModuleArtifacts> = files
    .par_iter()
    .map(|file| compile_module(config, &root, file))
    .collect::<Result<Vec<_>>>()?;
  modules.sort_by(|a, b| a.path.cmp(&b.path));

  ui::step(3, 3, "writing artifacts");
  let mut client_splits = BTreeMap::new();
  let mut server_splits = BTreeMap::new();
  let mut routes: Vec<ManifestRoute> = Vec::new();
  for module in &modules {
    write_target(&out_dir, Target::Client, module, &module.client, &mut client_splits)?;
    write_target(&out_dir, Target::Server, module, &module.server, &mut server_splits)?;
    routes.extend(module.server.routes.iter().map(|r| ManifestRoute::new(r, &module.path)));
    debug!(module = %module.path, routes = module.server.routes.len(), "wrote module");
  }

  let manifest = BuildManifest {
    project: config.project.name.clone(),
    minify: config.build.minify,
    expose_error_stacks: config.expose_error_stacks(),
    routes,
  };
  manifest.write(&out_dir.join(ROUTES_FILE))?;
  let split_manifest = serde_json::json!({ "client": client_splits, "server": server_splits });
  write_file(&out_dir.join(SPLIT_MANIFEST_FILE), &serde_json::to_string_pretty(&split_manifest)?)?;

  let report = BuildReport {
    modules: modules.len(),
    transformed: modules.iter().filter(|m| m.transformed).count(),
    routes: manifest.routes.len(),
    splits: server_splits.len(),
  };
  info!(
    modules = report.modules,
    transformed = report.transformed,
    routes = report.routes,
    splits = report.splits,
    "build finished"
  );
  Ok(report)
}

/// Route entries of every module, compiled for the client target only.
pub fn list_routes(config: &SeverConfig, base_dir: &Path) -> Result<Vec<(String, RouteEntry)>> {
  let root = config.root_dir(base_dir);
  let files: Vec<PathBuf> = collect_sources(config, base_dir)?;
  let per_module = files
    .par_iter()
    .map(|file| -> Result<Vec<(String, RouteEntry)>> {
      let path = relative_path(&root, file);
      let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
      let target = if is_server_module(&path) { Target::Server } else { Target::Client };
      let output = compile(&source, &config.compile_options(&path, target))?;
      Ok(output.routes.into_iter().map(|r| (path.clone(), r)).collect())
    })
    .collect::<Result<Vec<_>>>()?;
  let mut routes: Vec<_> = per_module.into_iter().flatten().collect();
  routes.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.ordinal.cmp(&b.1.ordinal)));
  Ok(routes)
}

#[cfg(test)]
mod tests;
