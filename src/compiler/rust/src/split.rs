/* src/compiler/rust/src/split.rs */

use tracing::debug;

use crate::CompileOptions;
use crate::analysis::{Candidates, Sweeper};
use crate::extract::SplitRecord;
use crate::syntax::ast::{Decl, Module, Stmt};

/// Builds the standalone module for one split boundary.
///
/// The module starts from every import and declaration of the rewritten
/// origin module, exports the hoisted function as its default, and is then
/// swept with every binding eligible for removal, so only what the hoisted
/// function actually reaches survives.
pub(crate) fn emit_split_module(origin: &Module, record: &SplitRecord, opts: &CompileOptions) -> Module {
  let mut body: Vec<Stmt> = origin
    .body
    .iter()
    .filter_map(|stmt| match stmt {
      Stmt::Import(_) => Some(stmt.clone()),
      Stmt::Var(decl) | Stmt::ExportDecl(Decl::Var(decl)) => Some(Stmt::Var(decl.clone())),
      Stmt::Function(f) | Stmt::ExportDecl(Decl::Function(f)) => Some(Stmt::Function(f.clone())),
      Stmt::ExportDefaultFn(f) if f.id.is_some() => Some(Stmt::Function(f.clone())),
      _ => None,
    })
    .collect();
  body.push(Stmt::ExportDefaultExpr(record.payload.clone()));

  let mut module = Module { body };
  let sweeper =
    Sweeper { target: opts.target, keep_imports: &opts.keep_imports, candidates: Candidates::All };
  let removed = sweeper.run(&mut module);
  debug!(id = %record.id, removed, "emitted split module");
  module
}
