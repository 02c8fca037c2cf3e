/* src/compiler/rust/src/analysis/sweep.rs */

// Dead-code sweeper: drops unreferenced top-level bindings until a pass
// removes nothing.

use std::collections::HashSet;

use tracing::debug;

use super::refs::{ReferenceSet, collect_references};
use crate::Target;
use crate::syntax::ast::*;

/// Bindings the sweeper is allowed to remove.
#[derive(Debug, Clone)]
pub enum Candidates {
  /// Names referenced before rewriting plus every import binding. Code the
  /// author never used is left alone.
  Only(HashSet<String>),
  /// Every top-level binding; used for split modules.
  All,
}

impl Candidates {
  /// Baseline for a module about to be rewritten.
  pub fn baseline(module: &Module) -> Self {
    let mut names = collect_references(module).referenced_names();
    for stmt in &module.body {
      if let Stmt::Import(import) = stmt {
        names.extend(import.specifiers.iter().map(|s| s.local().to_string()));
      }
    }
    Self::Only(names)
  }

  fn allows(&self, name: &str) -> bool {
    match self {
      Self::Only(names) => names.contains(name),
      Self::All => true,
    }
  }
}

pub struct Sweeper<'a> {
  pub target: Target,
  /// Module specifiers whose imports are reduced to side-effect imports
  /// instead of being dropped on client builds.
  pub keep_imports: &'a [String],
  pub candidates: Candidates,
}

impl Sweeper<'_> {
  /// Sweeps to a fixpoint and returns the total number of removed bindings.
  pub fn run(&self, module: &mut Module) -> usize {
    let mut total = 0;
    let mut passes = 0;
    loop {
      let refs = collect_references(module);
      let removed = self.pass(module, &refs);
      passes += 1;
      total += removed;
      if removed == 0 {
        break;
      }
    }
    debug!(passes, removed = total, "sweep reached fixpoint");
    total
  }

  fn removable(&self, name: &str, refs: &ReferenceSet) -> bool {
    self.candidates.allows(name) && !refs.is_referenced(name)
  }

  /// One pass over the top level; returns how many bindings it removed.
  pub fn pass(&self, module: &mut Module, refs: &ReferenceSet) -> usize {
    let mut removed = 0;
    let body = std::mem::take(&mut module.body);
    for mut stmt in body {
      let keep = match &mut stmt {
        Stmt::Import(import) => self.sweep_import(import, refs, &mut removed),
        Stmt::Var(decl) => {
          decl.decls.retain_mut(|d| {
            let (empty, count) = self.prune(&mut d.id, refs);
            removed += count;
            !empty
          });
          !decl.decls.is_empty()
        }
        Stmt::Function(f) => match &f.id {
          Some(id) if self.removable(id, refs) => {
            removed += 1;
            false
          }
          _ => true,
        },
        _ => true,
      };
      if keep {
        module.body.push(stmt);
      }
    }
    removed
  }

  fn sweep_import(&self, import: &mut ImportDecl, refs: &ReferenceSet, removed: &mut usize) -> bool {
    if import.side_effect_only || import.specifiers.is_empty() {
      return true;
    }
    let before = import.specifiers.len();
    import.specifiers.retain(|s| !self.removable(s.local(), refs));
    let dropped = before - import.specifiers.len();
    *removed += dropped;
    if dropped == 0 || !import.specifiers.is_empty() {
      return true;
    }
    // Server builds keep the import for its side effects.
    if self.target == Target::Server || self.keep_imports.iter().any(|k| *k == import.source) {
      import.side_effect_only = true;
      return true;
    }
    false
  }

  /// Prunes unreferenced bindings out of a declaring pattern. Returns whether
  /// the pattern binds nothing anymore and how many bindings were removed.
  fn prune(&self, pat: &mut Pat, refs: &ReferenceSet) -> (bool, usize) {
    match pat {
      Pat::Ident(name) => {
        if self.removable(name, refs) {
          (true, 1)
        } else {
          (false, 0)
        }
      }
      Pat::Assign(target, _) => self.prune(target, refs),
      Pat::Rest(inner) => self.prune(inner, refs),
      Pat::Expr(_) => (false, 0),
      Pat::Array(elems) => {
        let mut count = 0;
        for slot in elems.iter_mut() {
          if let Some(elem) = slot {
            let (empty, n) = self.prune(elem, refs);
            count += n;
            if empty {
              *slot = None;
            }
          }
        }
        while matches!(elems.last(), Some(None)) {
          elems.pop();
        }
        (elems.is_empty(), count)
      }
      Pat::Object(props) => {
        // A surviving rest element depends on its siblings being listed.
        let rest_kept = props.iter().any(|p| match p {
          ObjectPatProp::Rest(rest) => rest.bindings().iter().any(|n| !self.removable(n, refs)),
          ObjectPatProp::KeyValue { .. } => false,
        });
        if rest_kept {
          let mut count = 0;
          for prop in props.iter_mut() {
            if let ObjectPatProp::KeyValue { value, .. } = prop {
              count += self.prune_nested_only(value, refs);
            }
          }
          return (false, count);
        }
        let mut count = 0;
        props.retain_mut(|prop| {
          let target = match prop {
            ObjectPatProp::KeyValue { value, .. } => value,
            ObjectPatProp::Rest(rest) => rest,
          };
          let (empty, n) = self.prune(target, refs);
          count += n;
          !empty
        });
        (props.is_empty(), count)
      }
    }
  }

  /// Prunes inside nested patterns without removing the property itself.
  fn prune_nested_only(&self, pat: &mut Pat, refs: &ReferenceSet) -> usize {
    match pat {
      Pat::Array(_) | Pat::Object(_) => {
        let (empty, count) = self.prune(pat, refs);
        if empty {
          *pat = Pat::Object(Vec::new());
        }
        count
      }
      Pat::Assign(target, _) => self.prune_nested_only(target, refs),
      _ => 0,
    }
  }
}
