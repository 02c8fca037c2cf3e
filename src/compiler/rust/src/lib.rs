/* src/compiler/rust/src/lib.rs */

pub mod analysis;
pub mod errors;
mod extract;
pub mod route;
mod split;
pub mod stub;
pub mod syntax;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{Candidates, Sweeper};
use crate::extract::Extractor;
use crate::syntax::ast::{Module, Stmt};
use crate::syntax::{parse_module, print_module};

// Re-exports for ergonomic use
pub use errors::CompileError;
pub use route::{ROUTE_PREFIX, RouteIdentity, normalize_module_id};
pub use stub::{is_server_module, stub_server_module};

/// Virtual module prefix for split-off modules; host loaders route ids with
/// this prefix back into [`CompileOutput::split_modules`].
pub const SPLIT_MODULE_PREFIX: &str = "virtual:sever-split:";

/// Marker identifiers recognized in source.
pub const MARKERS: [&str; 3] = ["fetch$", "secret$", "split$"];

pub const DEFAULT_RUNTIME_MODULE: &str = "sever";

pub fn is_split_module_id(id: &str) -> bool {
  id.starts_with(SPLIT_MODULE_PREFIX)
}

/// Fast-path predicate: modules mentioning no marker are returned untouched.
pub fn needs_transform(source: &str) -> bool {
  MARKERS.iter().any(|m| source.contains(m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
  Client,
  Server,
}

impl std::str::FromStr for Target {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "client" => Ok(Self::Client),
      "server" => Ok(Self::Server),
      other => Err(format!("unknown target `{other}` (expected `client` or `server`)")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
  Fetch,
  Secret,
  Split,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
  pub kind: BoundaryKind,
  pub ordinal: usize,
  pub route: String,
  pub name: String,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
  /// Module path relative to the project root.
  pub path: String,
  pub target: Target,
  pub minify: bool,
  pub runtime_module: String,
  /// Defaults to `<runtime_module>/server`.
  pub server_runtime_module: Option<String>,
  pub keep_imports: Vec<String>,
}

impl CompileOptions {
  pub fn new(path: impl Into<String>, target: Target) -> Self {
    Self {
      path: path.into(),
      target,
      minify: false,
      runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
      server_runtime_module: None,
      keep_imports: Vec::new(),
    }
  }

  pub fn minify(mut self, minify: bool) -> Self {
    self.minify = minify;
    self
  }

  pub fn server_runtime_module(&self) -> String {
    self.server_runtime_module.clone().unwrap_or_else(|| format!("{}/server", self.runtime_module))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
  pub code: String,
  /// Virtual module id -> source.
  pub split_modules: BTreeMap<String, String>,
  pub routes: Vec<RouteEntry>,
}

/// A host-supplied syntax pass, run on the parsed module before boundary
/// extraction.
pub trait ModulePass: Send + Sync {
  fn name(&self) -> &str;
  fn run(&self, module: &mut Module, options: &CompileOptions);
}

#[derive(Default)]
pub struct Compiler {
  passes: Vec<Box<dyn ModulePass>>,
}

impl Compiler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pass(mut self, pass: Box<dyn ModulePass>) -> Self {
    self.passes.push(pass);
    self
  }

  pub fn compile(&self, source: &str, opts: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let path = normalize_module_id(&opts.path);
    if !needs_transform(source) {
      return Ok(CompileOutput { code: source.to_string(), ..Default::default() });
    }

    let mut module = parse_module(source).map_err(|e| CompileError::syntax(&path, e))?;
    for pass in &self.passes {
      debug!(pass = pass.name(), path = %path, "running host pass");
      pass.run(&mut module, opts);
    }

    let candidates = Candidates::baseline(&module);
    let extraction = Extractor::new(opts, &path, &module).run(&mut module)?;

    // Split modules start from the rewritten module before it is swept, so
    // declarations only the hoisted body uses are still present.
    let mut split_modules = BTreeMap::new();
    for record in &extraction.splits {
      let mut split_module = split::emit_split_module(&module, record, opts);
      if opts.target == Target::Server {
        retarget_runtime_imports(&mut split_module, opts);
      }
      split_modules.insert(record.id.clone(), print_module(&split_module));
    }

    let sweeper = Sweeper { target: opts.target, keep_imports: &opts.keep_imports, candidates };
    let removed = sweeper.run(&mut module);
    if opts.target == Target::Server {
      retarget_runtime_imports(&mut module, opts);
    }

    debug!(
      path = %path,
      target = ?opts.target,
      routes = extraction.routes.len(),
      splits = split_modules.len(),
      removed,
      "compiled module"
    );
    Ok(CompileOutput { code: print_module(&module), split_modules, routes: extraction.routes })
  }
}

/// Compiles one module with no host passes.
pub fn compile(source: &str, opts: &CompileOptions) -> Result<CompileOutput, CompileError> {
  Compiler::new().compile(source, opts)
}

/// Points imports of the runtime module at its server entry.
fn retarget_runtime_imports(module: &mut Module, opts: &CompileOptions) {
  let server = opts.server_runtime_module();
  for stmt in &mut module.body {
    if let Stmt::Import(import) = stmt {
      if import.source == opts.runtime_module {
        import.source = server.clone();
      }
    }
  }
}

#[cfg(test)]
mod tests;
