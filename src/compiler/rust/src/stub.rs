/* src/compiler/rust/src/stub.rs */

// Client-side stand-ins for server-only modules (`*.server$.*`).

use crate::errors::CompileError;
use crate::route::normalize_module_id;
use crate::syntax::ast::*;
use crate::syntax::{parse_module, print_module};

/// Marker in a file name that flags a module as server-only.
pub const SERVER_MODULE_MARKER: &str = ".server$.";

pub fn is_server_module(path: &str) -> bool {
  let normalized = normalize_module_id(path);
  let file = normalized.rsplit('/').next().unwrap_or(&normalized);
  file.contains(SERVER_MODULE_MARKER)
}

/// Replaces every export of a server-only module with `undefined` so client
/// bundles can import it without receiving its body.
pub fn stub_server_module(source: &str, path: &str) -> Result<String, CompileError> {
  let module = parse_module(source).map_err(|e| CompileError::syntax(path, e))?;

  let mut names: Vec<String> = Vec::new();
  let mut has_default = false;
  for stmt in &module.body {
    match stmt {
      Stmt::ExportDecl(Decl::Var(decl)) => {
        for d in &decl.decls {
          names.extend(d.id.bindings());
        }
      }
      Stmt::ExportDecl(Decl::Function(f)) => names.extend(f.id.clone()),
      Stmt::ExportDefaultExpr(_) | Stmt::ExportDefaultFn(_) => has_default = true,
      Stmt::ExportNamed { specifiers, .. } => {
        for spec in specifiers {
          if spec.exported == "default" {
            has_default = true;
          } else {
            names.push(spec.exported.clone());
          }
        }
      }
      Stmt::ExportAll { exported: Some(name), .. } => names.push(name.clone()),
      Stmt::ExportAll { exported: None, source } => {
        return Err(CompileError::UnsupportedExport {
          path: path.to_string(),
          module: source.clone(),
        });
      }
      _ => {}
    }
  }

  let mut body = Vec::new();
  let mut renamed = Vec::new();
  for (i, name) in names.iter().enumerate() {
    if names[..i].contains(name) {
      continue;
    }
    if is_plain_identifier(name) {
      body.push(Stmt::ExportDecl(Decl::Var(undefined_const(name))));
    } else {
      let local = format!("$$stub{i}");
      body.push(Stmt::Var(undefined_const(&local)));
      renamed.push(ExportSpecifier { local, exported: name.clone() });
    }
  }
  if !renamed.is_empty() {
    body.push(Stmt::ExportNamed { specifiers: renamed, source: None });
  }
  if has_default {
    body.push(Stmt::ExportDefaultExpr(Expr::undefined()));
  }
  Ok(print_module(&Module { body }))
}

fn undefined_const(name: &str) -> VarDecl {
  VarDecl {
    kind: VarKind::Const,
    decls: vec![Declarator { id: Pat::Ident(name.to_string()), init: Some(Expr::undefined()) }],
  }
}

fn is_plain_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
    && chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
}
