/* src/compiler/rust/src/analysis/scope.rs */

use std::collections::HashSet;

use crate::syntax::ast::{ForHead, ForInit, Pat, Stmt, VarKind};

pub(crate) type Scope = HashSet<String>;

/// Lexical declarations (`let`, `const`, function declarations) made directly
/// in a statement list.
pub(crate) fn block_scope(stmts: &[Stmt]) -> Scope {
  let mut scope = Scope::new();
  for stmt in stmts {
    match stmt {
      Stmt::Var(decl) if decl.kind != VarKind::Var => {
        for d in &decl.decls {
          scope.extend(d.id.bindings());
        }
      }
      Stmt::Function(f) => {
        if let Some(id) = &f.id {
          scope.insert(id.clone());
        }
      }
      _ => {}
    }
  }
  scope
}

/// `var` declarations hoisted out of nested statements, stopping at functions.
pub(crate) fn hoisted_vars(stmts: &[Stmt], out: &mut Scope) {
  for stmt in stmts {
    hoisted_in_stmt(stmt, out);
  }
}

fn hoisted_in_stmt(stmt: &Stmt, out: &mut Scope) {
  match stmt {
    Stmt::Var(decl) if decl.kind == VarKind::Var => {
      for d in &decl.decls {
        out.extend(d.id.bindings());
      }
    }
    Stmt::Block(body) => hoisted_vars(body, out),
    Stmt::If { cons, alt, .. } => {
      hoisted_in_stmt(cons, out);
      if let Some(alt) = alt {
        hoisted_in_stmt(alt, out);
      }
    }
    Stmt::For { init, body, .. } => {
      if let Some(ForInit::Var(decl)) = init {
        if decl.kind == VarKind::Var {
          for d in &decl.decls {
            out.extend(d.id.bindings());
          }
        }
      }
      hoisted_in_stmt(body, out);
    }
    Stmt::ForIn { head, body, .. } | Stmt::ForOf { head, body, .. } => {
      if let ForHead::Var(VarKind::Var, pat) = head {
        out.extend(pat.bindings());
      }
      hoisted_in_stmt(body, out);
    }
    Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
      hoisted_in_stmt(body, out);
    }
    Stmt::Try { block, handler, finalizer } => {
      hoisted_vars(block, out);
      if let Some(handler) = handler {
        hoisted_vars(&handler.body, out);
      }
      if let Some(finalizer) = finalizer {
        hoisted_vars(finalizer, out);
      }
    }
    Stmt::Switch { cases, .. } => {
      for case in cases {
        hoisted_vars(&case.body, out);
      }
    }
    _ => {}
  }
}

/// Everything a function body can see as local: parameters, hoisted vars and
/// top-level lexical declarations of the body.
pub(crate) fn function_scope(id: Option<&str>, params: &[Pat], body: &[Stmt]) -> Scope {
  let mut scope = block_scope(body);
  hoisted_vars(body, &mut scope);
  for param in params {
    scope.extend(param.bindings());
  }
  if let Some(id) = id {
    scope.insert(id.to_string());
  }
  scope
}

pub(crate) fn for_head_scope(head: &ForHead) -> Scope {
  match head {
    ForHead::Var(VarKind::Let | VarKind::Const, pat) => pat.bindings().into_iter().collect(),
    _ => Scope::new(),
  }
}

pub(crate) fn for_init_scope(init: Option<&ForInit>) -> Scope {
  match init {
    Some(ForInit::Var(decl)) if decl.kind != VarKind::Var => {
      decl.decls.iter().flat_map(|d| d.id.bindings()).collect()
    }
    _ => Scope::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::parse_module;

  #[test]
  fn function_scope_collects_params_vars_and_lexicals() {
    let module =
      parse_module("function f(a, { b }) { const c = 1; if (x) { var d = 2; let e = 3; } function g() {} }")
        .unwrap();
    let Stmt::Function(f) = &module.body[0] else { panic!("expected function") };
    let scope = function_scope(f.id.as_deref(), &f.params, &f.body);
    for name in ["f", "a", "b", "c", "d", "g"] {
      assert!(scope.contains(name), "missing {name}");
    }
    assert!(!scope.contains("e"));
  }
}
