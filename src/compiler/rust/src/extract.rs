/* src/compiler/rust/src/extract.rs */

// Boundary extraction: finds marker calls, assigns ordinals in document
// order and rewrites each call site for the target environment. Generated
// statements are inserted before the top-level statement that contained the
// boundary.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::analysis::{Scope, block_scope, for_head_scope, for_init_scope, free_identifiers, function_scope};
use crate::errors::CompileError;
use crate::route::RouteIdentity;
use crate::syntax::Span;
use crate::syntax::ast::*;
use crate::{BoundaryKind, CompileOptions, RouteEntry, SPLIT_MODULE_PREFIX, Target};

type R<T = ()> = Result<T, CompileError>;

pub(crate) const CTX_BINDING: &str = "$$ctx";

/// A split boundary waiting for its standalone module.
#[derive(Debug, Clone)]
pub(crate) struct SplitRecord {
  pub id: String,
  pub route: RouteIdentity,
  pub payload: Expr,
}

#[derive(Debug, Default)]
pub(crate) struct Extraction {
  pub routes: Vec<RouteEntry>,
  pub splits: Vec<SplitRecord>,
}

enum Marker {
  Boundary(BoundaryKind),
  Unsupported,
}

pub(crate) struct Extractor<'a> {
  opts: &'a CompileOptions,
  path: &'a str,
  /// Local import name -> imported name, for imports of the runtime module.
  runtime_imports: HashMap<String, String>,
  fetch_ordinal: usize,
  split_ordinal: usize,
  names: Vec<Option<String>>,
  scopes: Vec<Scope>,
  /// Marker identifiers whose member accesses become `$$ctx` accesses.
  receivers: Vec<String>,
  pending: Vec<Stmt>,
  out: Extraction,
}

impl<'a> Extractor<'a> {
  pub(crate) fn new(opts: &'a CompileOptions, path: &'a str, module: &Module) -> Self {
    let mut runtime_imports = HashMap::new();
    for stmt in &module.body {
      let Stmt::Import(import) = stmt else { continue };
      if import.source != opts.runtime_module {
        continue;
      }
      for spec in &import.specifiers {
        if let ImportSpecifier::Named { imported, local } = spec {
          runtime_imports.insert(local.clone(), imported.clone());
        }
      }
    }
    Self {
      opts,
      path,
      runtime_imports,
      fetch_ordinal: 0,
      split_ordinal: 0,
      names: Vec::new(),
      scopes: Vec::new(),
      receivers: Vec::new(),
      pending: Vec::new(),
      out: Extraction::default(),
    }
  }

  pub(crate) fn run(mut self, module: &mut Module) -> R<Extraction> {
    let body = std::mem::take(&mut module.body);
    for mut stmt in body {
      self.stmt(&mut stmt)?;
      module.body.append(&mut self.pending);
      module.body.push(stmt);
    }
    debug!(
      path = self.path,
      fetch = self.fetch_ordinal,
      split = self.split_ordinal,
      "boundary extraction finished"
    );
    Ok(self.out)
  }

  fn is_local(&self, name: &str) -> bool {
    self.scopes.iter().any(|s| s.contains(name))
  }

  fn classify(&self, name: &str) -> Option<Marker> {
    let imported = self.runtime_imports.get(name).map(String::as_str);
    match imported.unwrap_or(name) {
      "fetch$" => Some(Marker::Boundary(BoundaryKind::Fetch)),
      "secret$" => Some(Marker::Boundary(BoundaryKind::Secret)),
      "split$" => Some(Marker::Boundary(BoundaryKind::Split)),
      other if imported.is_some() && other.ends_with('$') => Some(Marker::Unsupported),
      _ => None,
    }
  }

  fn current_name(&self) -> Option<String> {
    self.names.last().cloned().flatten()
  }

  // -- statements -----------------------------------------------------------

  fn stmts(&mut self, stmts: &mut [Stmt]) -> R {
    for stmt in stmts {
      self.stmt(stmt)?;
    }
    Ok(())
  }

  fn scoped<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> R<T>) -> R<T> {
    self.scopes.push(scope);
    let result = f(self);
    self.scopes.pop();
    result
  }

  fn block(&mut self, stmts: &mut [Stmt]) -> R {
    let scope = block_scope(stmts);
    self.scoped(scope, |s| s.stmts(stmts))
  }

  fn stmt(&mut self, stmt: &mut Stmt) -> R {
    match stmt {
      Stmt::Import(_)
      | Stmt::ExportNamed { .. }
      | Stmt::ExportAll { .. }
      | Stmt::Break(_)
      | Stmt::Continue(_)
      | Stmt::Empty => Ok(()),
      Stmt::Var(decl) | Stmt::ExportDecl(Decl::Var(decl)) => self.var_decl(decl),
      Stmt::Function(f) | Stmt::ExportDecl(Decl::Function(f)) | Stmt::ExportDefaultFn(f) => {
        let name = f.id.clone();
        self.names.push(name);
        let result = self.function(f);
        self.names.pop();
        result
      }
      Stmt::ExportDefaultExpr(e) | Stmt::Expr(e) | Stmt::Throw(e) => self.expr(e),
      Stmt::Return(arg) => match arg {
        Some(arg) => self.expr(arg),
        None => Ok(()),
      },
      Stmt::Block(body) => self.block(body),
      Stmt::If { test, cons, alt } => {
        self.expr(test)?;
        self.stmt(cons)?;
        match alt {
          Some(alt) => self.stmt(alt),
          None => Ok(()),
        }
      }
      Stmt::For { init, test, update, body } => {
        let scope = for_init_scope(init.as_ref());
        self.scoped(scope, |s| {
          match init {
            Some(ForInit::Var(decl)) => s.var_decl(decl)?,
            Some(ForInit::Expr(e)) => s.expr(e)?,
            None => {}
          }
          if let Some(test) = test {
            s.expr(test)?;
          }
          if let Some(update) = update {
            s.expr(update)?;
          }
          s.stmt(body)
        })
      }
      Stmt::ForIn { head, right, body } | Stmt::ForOf { head, right, body, .. } => {
        let scope = for_head_scope(head);
        self.scoped(scope, |s| {
          match head {
            ForHead::Var(_, pat) | ForHead::Pat(pat) => s.pat(pat)?,
          }
          s.expr(right)?;
          s.stmt(body)
        })
      }
      Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
        self.expr(test)?;
        self.stmt(body)
      }
      Stmt::Try { block, handler, finalizer } => {
        self.block(block)?;
        if let Some(handler) = handler {
          let mut scope = block_scope(&handler.body);
          if let Some(param) = &handler.param {
            scope.extend(param.bindings());
          }
          self.scoped(scope, |s| {
            if let Some(param) = &mut handler.param {
              s.pat(param)?;
            }
            s.stmts(&mut handler.body)
          })?;
        }
        match finalizer {
          Some(finalizer) => self.block(finalizer),
          None => Ok(()),
        }
      }
      Stmt::Labeled { body, .. } => self.stmt(body),
      Stmt::Switch { discriminant, cases } => {
        self.expr(discriminant)?;
        let mut scope = Scope::new();
        for case in cases.iter() {
          scope.extend(block_scope(&case.body));
        }
        self.scoped(scope, |s| {
          for case in cases.iter_mut() {
            if let Some(test) = &mut case.test {
              s.expr(test)?;
            }
            s.stmts(&mut case.body)?;
          }
          Ok(())
        })
      }
    }
  }

  fn var_decl(&mut self, decl: &mut VarDecl) -> R {
    for d in &mut decl.decls {
      self.names.push(d.id.naming_hint().map(str::to_string));
      let result = self.declarator(d);
      self.names.pop();
      result?;
    }
    Ok(())
  }

  fn declarator(&mut self, d: &mut Declarator) -> R {
    self.pat(&mut d.id)?;
    match &mut d.init {
      Some(init) => self.expr(init),
      None => Ok(()),
    }
  }

  fn pat(&mut self, pat: &mut Pat) -> R {
    match pat {
      Pat::Ident(_) => Ok(()),
      Pat::Object(props) => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue { key, value, .. } => {
              self.prop_key(key)?;
              self.pat(value)?;
            }
            ObjectPatProp::Rest(rest) => self.pat(rest)?,
          }
        }
        Ok(())
      }
      Pat::Array(elems) => {
        for elem in elems.iter_mut().flatten() {
          self.pat(elem)?;
        }
        Ok(())
      }
      Pat::Assign(target, default) => {
        self.pat(target)?;
        self.expr(default)
      }
      Pat::Rest(inner) => self.pat(inner),
      Pat::Expr(expr) => self.expr(expr),
    }
  }

  fn prop_key(&mut self, key: &mut PropKey) -> R {
    match key {
      PropKey::Computed(expr) => self.expr(expr),
      _ => Ok(()),
    }
  }

  fn function(&mut self, f: &mut Function) -> R {
    let scope = function_scope(f.id.as_deref(), &f.params, &f.body);
    self.scoped(scope, |s| {
      for param in &mut f.params {
        s.pat(param)?;
      }
      s.stmts(&mut f.body)
    })
  }

  fn arrow(&mut self, arrow: &mut Arrow) -> R {
    let scope = match &arrow.body {
      ArrowBody::Block(body) => function_scope(None, &arrow.params, body),
      ArrowBody::Expr(_) => arrow.params.iter().flat_map(Pat::bindings).collect(),
    };
    self.scoped(scope, |s| {
      for param in &mut arrow.params {
        s.pat(param)?;
      }
      match &mut arrow.body {
        ArrowBody::Block(body) => s.stmts(body),
        ArrowBody::Expr(expr) => s.expr(expr),
      }
    })
  }

  // -- expressions ----------------------------------------------------------

  /// Detects a boundary call at `expr`, failing on unsupported markers.
  fn boundary_at(&self, expr: &Expr) -> R<Option<(BoundaryKind, String, Span)>> {
    let Expr::Call { callee, span, .. } = expr else { return Ok(None) };
    let Expr::Ident(name) = callee.as_ref() else { return Ok(None) };
    if self.is_local(name) {
      return Ok(None);
    }
    match self.classify(name) {
      Some(Marker::Boundary(kind)) => Ok(Some((kind, name.clone(), *span))),
      Some(Marker::Unsupported) => Err(CompileError::UnsupportedMarker {
        path: self.path.to_string(),
        span: *span,
        marker: name.clone(),
      }),
      None => Ok(None),
    }
  }

  fn expr(&mut self, expr: &mut Expr) -> R {
    if let Some((kind, marker, span)) = self.boundary_at(expr)? {
      let Expr::Call { args, .. } = expr else { return Ok(()) };
      let args = std::mem::take(args);
      *expr = self.boundary(kind, &marker, args, span)?;
      return Ok(());
    }

    match expr {
      Expr::Ident(_)
      | Expr::This
      | Expr::Null
      | Expr::Bool(_)
      | Expr::Num(_)
      | Expr::Str(_)
      | Expr::Regex(_)
      | Expr::Meta(..) => Ok(()),
      Expr::Template(tpl) => {
        if let Some(tag) = &mut tpl.tag {
          self.expr(tag)?;
        }
        for e in &mut tpl.exprs {
          self.expr(e)?;
        }
        Ok(())
      }
      Expr::Array(elems) => {
        for e in elems.iter_mut().flatten() {
          self.expr(e)?;
        }
        Ok(())
      }
      Expr::Object(props) => {
        for prop in props {
          match prop {
            Prop::KeyValue(key, value) => {
              self.prop_key(key)?;
              self.names.push(key.naming_hint());
              let result = self.expr(value);
              self.names.pop();
              result?;
            }
            Prop::Shorthand(_) => {}
            Prop::Method { key, func, .. } => {
              self.prop_key(key)?;
              self.function(func)?;
            }
            Prop::Spread(e) => self.expr(e)?,
          }
        }
        Ok(())
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
        self.expr(left)?;
        self.expr(right)
      }
      Expr::Assign { target, value, .. } => {
        self.pat(target)?;
        self.expr(value)
      }
      Expr::Cond { test, cons, alt } => {
        self.expr(test)?;
        self.expr(cons)?;
        self.expr(alt)
      }
      Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
        self.expr(callee)?;
        for arg in args {
          self.expr(arg)?;
        }
        Ok(())
      }
      Expr::Member { object, prop, .. } => {
        let receiver = matches!(
          object.as_ref(),
          Expr::Ident(name) if self.receivers.iter().any(|r| r == name) && !self.is_local(name)
        );
        if receiver {
          **object = Expr::ident(CTX_BINDING);
        } else {
          self.expr(object)?;
        }
        match prop {
          MemberProp::Computed(inner) => self.expr(inner),
          _ => Ok(()),
        }
      }
      Expr::Seq(exprs) => {
        for e in exprs {
          self.expr(e)?;
        }
        Ok(())
      }
      Expr::Yield { arg, .. } => match arg {
        Some(arg) => self.expr(arg),
        None => Ok(()),
      },
    }
  }

  // -- boundaries -----------------------------------------------------------

  fn invalid_payload(&self, marker: &str, span: Span, expected: &'static str) -> CompileError {
    CompileError::InvalidPayload {
      path: self.path.to_string(),
      span,
      marker: marker.to_string(),
      expected,
    }
  }

  /// Names the payload reads from enclosing function scopes.
  fn captured_locals(&self, payload: &Expr) -> Vec<String> {
    free_identifiers(payload).into_iter().filter(|name| self.is_local(name)).collect()
  }

  fn boundary(&mut self, kind: BoundaryKind, marker: &str, args: Vec<Expr>, span: Span) -> R<Expr> {
    match kind {
      BoundaryKind::Fetch => self.fetch_boundary(marker, args, span),
      BoundaryKind::Secret => self.secret_boundary(marker, args, span),
      BoundaryKind::Split => self.split_boundary(marker, args, span),
    }
  }

  fn fetch_boundary(&mut self, marker: &str, mut args: Vec<Expr>, span: Span) -> R<Expr> {
    let ordinal = self.fetch_ordinal;
    self.fetch_ordinal += 1;
    let name = self.current_name();

    if args.is_empty() {
      return Err(self.invalid_payload(marker, span, "a function literal"));
    }
    let mut payload = unwrap_parens(args.remove(0));
    if !payload.is_function_like() {
      return Err(self.invalid_payload(marker, span, "a function literal"));
    }
    let mut options = if args.is_empty() { Expr::undefined() } else { args.remove(0) };

    self.receivers.push(marker.to_string());
    let visited = self.expr(&mut payload);
    self.receivers.pop();
    visited?;
    self.expr(&mut options)?;

    for captured in self.captured_locals(&payload) {
      warn!(
        path = self.path,
        line = span.line,
        variable = %captured,
        "fetch$ payload reads a variable from an enclosing function; it will be undefined on the server"
      );
    }

    let route = RouteIdentity::new(self.path, ordinal, self.opts.minify, name.as_deref());
    let route_path = route.path();
    let binding = format!("$$fetch{ordinal}");
    let runtime = Expr::ident(marker);

    match self.opts.target {
      Target::Server => {
        let handler = handler_function(payload, ordinal);
        let create = Expr::call(
          Expr::member(runtime.clone(), "createHandler"),
          vec![handler, Expr::string(&route_path), options],
        );
        self.pending.push(const_decl(&binding, create));
        self.pending.push(Stmt::Expr(Expr::call(
          Expr::member(runtime, "registerHandler"),
          vec![Expr::string(&route_path), Expr::ident(&binding)],
        )));
      }
      Target::Client => {
        let create = Expr::call(
          Expr::member(runtime, "createFetcher"),
          vec![Expr::string(&route_path), options],
        );
        self.pending.push(const_decl(&binding, create));
      }
    }

    debug!(route = %route_path, "extracted fetch$ boundary");
    self.out.routes.push(RouteEntry {
      kind: BoundaryKind::Fetch,
      ordinal,
      route: route_path,
      name: route.name.clone(),
    });
    Ok(Expr::ident(binding))
  }

  fn secret_boundary(&mut self, marker: &str, mut args: Vec<Expr>, span: Span) -> R<Expr> {
    if args.is_empty() {
      return Err(self.invalid_payload(marker, span, "a value"));
    }
    let mut value = args.remove(0);
    match self.opts.target {
      Target::Server => {
        self.expr(&mut value)?;
        Ok(value)
      }
      Target::Client => Ok(Expr::undefined()),
    }
  }

  fn split_boundary(&mut self, marker: &str, mut args: Vec<Expr>, span: Span) -> R<Expr> {
    let ordinal = self.split_ordinal;
    self.split_ordinal += 1;
    let name = self.current_name();

    if args.is_empty() {
      return Err(self.invalid_payload(marker, span, "a function literal"));
    }
    let mut payload = unwrap_parens(args.remove(0));
    if !payload.is_function_like() {
      return Err(self.invalid_payload(marker, span, "a function literal"));
    }
    self.expr(&mut payload)?;

    if let Some(captured) = self.captured_locals(&payload).into_iter().next() {
      return Err(CompileError::ClosureCapture { path: self.path.to_string(), span, name: captured });
    }

    let route = RouteIdentity::new(self.path, ordinal, self.opts.minify, name.as_deref());
    let id = format!("{SPLIT_MODULE_PREFIX}{}", route.path());
    let binding = format!("$$split{ordinal}");
    self.pending.push(const_decl(&binding, split_wrapper(&id)));

    debug!(id = %id, "extracted split$ boundary");
    self.out.routes.push(RouteEntry {
      kind: BoundaryKind::Split,
      ordinal,
      route: route.path(),
      name: route.name.clone(),
    });
    self.out.splits.push(SplitRecord { id, route, payload });
    Ok(Expr::ident(binding))
  }
}

fn unwrap_parens(expr: Expr) -> Expr {
  match expr {
    Expr::Paren(inner) => unwrap_parens(*inner),
    other => other,
  }
}

fn const_decl(name: &str, init: Expr) -> Stmt {
  Stmt::Var(VarDecl {
    kind: VarKind::Const,
    decls: vec![Declarator { id: Pat::Ident(name.to_string()), init: Some(init) }],
  })
}

/// `async function $$fetchHandlerN(...) { const $$ctx = this; ... }`
///
/// Function payloads keep their generator flag, and a named function
/// expression gets its own name rebound to the handler so self-calls resolve.
fn handler_function(payload: Expr, ordinal: usize) -> Expr {
  let handler_id = format!("$$fetchHandler{ordinal}");
  let (params, mut body, self_name, is_async, is_generator) = match payload {
    Expr::Arrow(arrow) => {
      let body = match arrow.body {
        ArrowBody::Block(stmts) => stmts,
        ArrowBody::Expr(expr) => vec![Stmt::Return(Some(*expr))],
      };
      (arrow.params, body, None, true, false)
    }
    Expr::Function(f) => {
      // A sync generator stays sync; turning it async changes what callers iterate.
      let is_async = f.is_async || !f.is_generator;
      (f.params, f.body, f.id, is_async, f.is_generator)
    }
    other => (Vec::new(), vec![Stmt::Return(Some(other))], None, true, false),
  };

  let mut prologue = vec![const_decl(CTX_BINDING, Expr::This)];
  if let Some(name) = self_name {
    // A parameter with the same name already shadows the function's own name.
    let shadowed = params.iter().any(|p| p.bindings().contains(&name));
    if !shadowed && name != CTX_BINDING {
      prologue.push(const_decl(&name, Expr::ident(handler_id.clone())));
    }
  }
  body.splice(0..0, prologue);

  Expr::Function(Function { id: Some(handler_id), params, body, is_async, is_generator })
}

/// `(...args) => import("<id>").then((m) => m.default(...args))`
fn split_wrapper(id: &str) -> Expr {
  let args = || Expr::Spread(Box::new(Expr::ident("args")));
  let invoke = Expr::Arrow(Arrow {
    params: vec![Pat::Ident("m".into())],
    body: ArrowBody::Expr(Box::new(Expr::call(
      Expr::member(Expr::ident("m"), "default"),
      vec![args()],
    ))),
    is_async: false,
  });
  let load = Expr::call(
    Expr::member(Expr::Import(Box::new(Expr::string(id))), "then"),
    vec![invoke],
  );
  Expr::Arrow(Arrow {
    params: vec![Pat::Rest(Box::new(Pat::Ident("args".into())))],
    body: ArrowBody::Expr(Box::new(load)),
    is_async: false,
  })
}
