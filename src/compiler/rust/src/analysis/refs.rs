/* src/compiler/rust/src/analysis/refs.rs */

// Scope-aware reference walker. Reports every identifier read or written
// that does not resolve to a binding declared inside the walked code.

use std::collections::{HashMap, HashSet};

use super::scope::{Scope, block_scope, for_head_scope, for_init_scope, function_scope};
use crate::syntax::ast::*;

pub(crate) trait RefSink {
  fn reference(&mut self, name: &str);
}

pub(crate) struct Walker<'s, S: RefSink> {
  sink: &'s mut S,
  scopes: Vec<Scope>,
}

impl<'s, S: RefSink> Walker<'s, S> {
  pub(crate) fn new(sink: &'s mut S) -> Self {
    Self { sink, scopes: Vec::new() }
  }

  fn with_scope(&mut self, scope: Scope, f: impl FnOnce(&mut Self)) {
    self.scopes.push(scope);
    f(self);
    self.scopes.pop();
  }

  fn ident(&mut self, name: &str) {
    if !self.scopes.iter().any(|s| s.contains(name)) {
      self.sink.reference(name);
    }
  }

  pub(crate) fn stmts(&mut self, stmts: &[Stmt]) {
    for stmt in stmts {
      self.stmt(stmt);
    }
  }

  fn block(&mut self, stmts: &[Stmt]) {
    self.with_scope(block_scope(stmts), |w| w.stmts(stmts));
  }

  pub(crate) fn stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Import(_) | Stmt::ExportAll { .. } => {}
      Stmt::ExportNamed { specifiers, source: None } => {
        for spec in specifiers {
          self.ident(&spec.local);
        }
      }
      Stmt::ExportNamed { .. } => {}
      Stmt::ExportDecl(Decl::Var(decl)) | Stmt::Var(decl) => self.var_decl(decl),
      Stmt::ExportDecl(Decl::Function(f)) | Stmt::ExportDefaultFn(f) | Stmt::Function(f) => {
        self.function(f)
      }
      Stmt::ExportDefaultExpr(expr) | Stmt::Expr(expr) | Stmt::Throw(expr) => self.expr(expr),
      Stmt::Block(body) => self.block(body),
      Stmt::If { test, cons, alt } => {
        self.expr(test);
        self.stmt(cons);
        if let Some(alt) = alt {
          self.stmt(alt);
        }
      }
      Stmt::For { init, test, update, body } => {
        self.with_scope(for_init_scope(init.as_ref()), |w| {
          match init {
            Some(ForInit::Var(decl)) => w.var_decl(decl),
            Some(ForInit::Expr(expr)) => w.expr(expr),
            None => {}
          }
          if let Some(test) = test {
            w.expr(test);
          }
          if let Some(update) = update {
            w.expr(update);
          }
          w.stmt(body);
        });
      }
      Stmt::ForIn { head, right, body } | Stmt::ForOf { head, right, body, .. } => {
        self.with_scope(for_head_scope(head), |w| {
          match head {
            ForHead::Var(_, pat) => w.binding_pat(pat),
            ForHead::Pat(pat) => w.target_pat(pat),
          }
          w.expr(right);
          w.stmt(body);
        });
      }
      Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
        self.expr(test);
        self.stmt(body);
      }
      Stmt::Return(arg) => {
        if let Some(arg) = arg {
          self.expr(arg);
        }
      }
      Stmt::Try { block, handler, finalizer } => {
        self.block(block);
        if let Some(handler) = handler {
          let mut scope = block_scope(&handler.body);
          if let Some(param) = &handler.param {
            scope.extend(param.bindings());
          }
          self.with_scope(scope, |w| {
            if let Some(param) = &handler.param {
              w.binding_pat(param);
            }
            w.stmts(&handler.body);
          });
        }
        if let Some(finalizer) = finalizer {
          self.block(finalizer);
        }
      }
      Stmt::Labeled { body, .. } => self.stmt(body),
      Stmt::Switch { discriminant, cases } => {
        self.expr(discriminant);
        let all: Vec<Stmt> = cases.iter().flat_map(|c| c.body.iter().cloned()).collect();
        self.with_scope(block_scope(&all), |w| {
          for case in cases {
            if let Some(test) = &case.test {
              w.expr(test);
            }
            w.stmts(&case.body);
          }
        });
      }
      Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => {}
    }
  }

  pub(crate) fn var_decl(&mut self, decl: &VarDecl) {
    for d in &decl.decls {
      self.declarator(d);
    }
  }

  pub(crate) fn declarator(&mut self, d: &Declarator) {
    self.binding_pat(&d.id);
    if let Some(init) = &d.init {
      self.expr(init);
    }
  }

  /// Walks the expressions inside a declaring pattern (defaults, computed keys).
  fn binding_pat(&mut self, pat: &Pat) {
    match pat {
      Pat::Ident(_) => {}
      Pat::Object(props) => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue { key, value, .. } => {
              self.prop_key(key);
              self.binding_pat(value);
            }
            ObjectPatProp::Rest(rest) => self.binding_pat(rest),
          }
        }
      }
      Pat::Array(elems) => {
        for elem in elems.iter().flatten() {
          self.binding_pat(elem);
        }
      }
      Pat::Assign(target, default) => {
        self.binding_pat(target);
        self.expr(default);
      }
      Pat::Rest(inner) => self.binding_pat(inner),
      Pat::Expr(expr) => self.expr(expr),
    }
  }

  /// Assignment targets: identifiers here are writes and count as references.
  fn target_pat(&mut self, pat: &Pat) {
    match pat {
      Pat::Ident(name) => self.ident(name),
      Pat::Object(props) => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue { key, value, .. } => {
              self.prop_key(key);
              self.target_pat(value);
            }
            ObjectPatProp::Rest(rest) => self.target_pat(rest),
          }
        }
      }
      Pat::Array(elems) => {
        for elem in elems.iter().flatten() {
          self.target_pat(elem);
        }
      }
      Pat::Assign(target, default) => {
        self.target_pat(target);
        self.expr(default);
      }
      Pat::Rest(inner) => self.target_pat(inner),
      Pat::Expr(expr) => self.expr(expr),
    }
  }

  fn prop_key(&mut self, key: &PropKey) {
    if let PropKey::Computed(expr) = key {
      self.expr(expr);
    }
  }

  pub(crate) fn function(&mut self, f: &Function) {
    let scope = function_scope(f.id.as_deref(), &f.params, &f.body);
    self.with_scope(scope, |w| {
      for param in &f.params {
        w.binding_pat(param);
      }
      w.stmts(&f.body);
    });
  }

  fn arrow(&mut self, arrow: &Arrow) {
    let scope = match &arrow.body {
      ArrowBody::Block(body) => function_scope(None, &arrow.params, body),
      ArrowBody::Expr(_) => arrow.params.iter().flat_map(Pat::bindings).collect(),
    };
    self.with_scope(scope, |w| {
      for param in &arrow.params {
        w.binding_pat(param);
      }
      match &arrow.body {
        ArrowBody::Block(body) => w.stmts(body),
        ArrowBody::Expr(expr) => w.expr(expr),
      }
    });
  }

  pub(crate) fn expr(&mut self, expr: &Expr) {
    match expr {
      Expr::Ident(name) => self.ident(name),
      Expr::This
      | Expr::Null
      | Expr::Bool(_)
      | Expr::Num(_)
      | Expr::Str(_)
      | Expr::Regex(_)
      | Expr::Meta(..) => {}
      Expr::Template(tpl) => {
        if let Some(tag) = &tpl.tag {
          self.expr(tag);
        }
        for e in &tpl.exprs {
          self.expr(e);
        }
      }
      Expr::Array(elems) => {
        for e in elems.iter().flatten() {
          self.expr(e);
        }
      }
      Expr::Object(props) => {
        for prop in props {
          match prop {
            Prop::KeyValue(key, value) => {
              self.prop_key(key);
              self.expr(value);
            }
            Prop::Shorthand(name) => self.ident(name),
            Prop::Method { key, func, .. } => {
              self.prop_key(key);
              self.function(func);
            }
            Prop::Spread(e) => self.expr(e),
          }
        }
      }
      Expr::Function(f) => self.function(f),
      Expr::Arrow(arrow) => self.arrow(arrow),
      Expr::Unary { arg, .. }
      | Expr::Update { arg, .. }
      | Expr::Spread(arg)
      | Expr::Await(arg)
      | Expr::Import(arg)
      | Expr::Paren(arg) => self.expr(arg),
      Expr::Binary { left, right, .. } => {
        self.expr(left);
        self.expr(right);
      }
      Expr::Assign { target, value, .. } => {
        self.target_pat(target);
        self.expr(value);
      }
      Expr::Cond { test, cons, alt } => {
        self.expr(test);
        self.expr(cons);
        self.expr(alt);
      }
      Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
        self.expr(callee);
        for arg in args {
          self.expr(arg);
        }
      }
      Expr::Member { object, prop, .. } => {
        self.expr(object);
        if let MemberProp::Computed(inner) = prop {
          self.expr(inner);
        }
      }
      Expr::Seq(exprs) => {
        for e in exprs {
          self.expr(e);
        }
      }
      Expr::Yield { arg, .. } => {
        if let Some(arg) = arg {
          self.expr(arg);
        }
      }
    }
  }
}

/// Names an expression reads or writes without declaring them itself.
pub(crate) fn free_identifiers(expr: &Expr) -> Vec<String> {
  struct Collect(Vec<String>);
  impl RefSink for Collect {
    fn reference(&mut self, name: &str) {
      if !self.0.iter().any(|n| n == name) {
        self.0.push(name.to_string());
      }
    }
  }
  let mut sink = Collect(Vec::new());
  Walker::new(&mut sink).expr(expr);
  sink.0
}

/// Reference counts for the module's top-level bindings.
#[derive(Debug, Default, Clone)]
pub struct ReferenceSet {
  counts: HashMap<String, usize>,
}

impl ReferenceSet {
  pub fn count(&self, name: &str) -> usize {
    self.counts.get(name).copied().unwrap_or(0)
  }

  pub fn is_referenced(&self, name: &str) -> bool {
    self.count(name) > 0
  }

  pub fn referenced_names(&self) -> HashSet<String> {
    self.counts.iter().filter(|(_, c)| **c > 0).map(|(n, _)| n.clone()).collect()
  }
}

struct TopLevelSink<'a> {
  top: &'a HashSet<String>,
  owner: Vec<String>,
  counts: HashMap<String, usize>,
}

impl RefSink for TopLevelSink<'_> {
  fn reference(&mut self, name: &str) {
    if self.top.contains(name) && !self.owner.iter().any(|o| o == name) {
      *self.counts.entry(name.to_string()).or_default() += 1;
    }
  }
}

/// Counts how often each top-level binding is referenced. A declaration
/// referring to its own bindings does not keep itself alive.
pub fn collect_references(module: &Module) -> ReferenceSet {
  let top: HashSet<String> = module.top_level_bindings().into_iter().collect();
  let mut sink = TopLevelSink { top: &top, owner: Vec::new(), counts: HashMap::new() };

  for stmt in &module.body {
    match stmt {
      Stmt::Var(decl) => {
        for d in &decl.decls {
          sink.owner = d.id.bindings();
          Walker::new(&mut sink).declarator(d);
        }
      }
      Stmt::Function(f) => {
        sink.owner = f.id.iter().cloned().collect();
        Walker::new(&mut sink).function(f);
      }
      other => {
        sink.owner.clear();
        Walker::new(&mut sink).stmt(other);
      }
    }
  }
  ReferenceSet { counts: sink.counts }
}
