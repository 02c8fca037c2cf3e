/* src/compiler/rust/src/syntax/printer.rs */

use super::ast::*;
use super::quote;
use super::token::{is_ident_part, is_ident_start};

const INLINE_OBJECT_LIMIT: usize = 80;

pub fn print_module(module: &Module) -> String {
  let mut printer = Printer { indent: 0 };
  let mut out = String::new();
  for stmt in &module.body {
    out.push_str(&printer.stmt(stmt));
    out.push('\n');
  }
  out
}

fn precedence(expr: &Expr) -> u8 {
  match expr {
    Expr::Seq(_) => 1,
    Expr::Yield { .. } | Expr::Arrow(_) | Expr::Assign { .. } | Expr::Spread(_) => 2,
    Expr::Cond { .. } => 3,
    Expr::Binary { op, .. } => binary_precedence(op),
    Expr::Unary { .. } | Expr::Await(_) => 16,
    Expr::Update { prefix: true, .. } => 16,
    Expr::Update { prefix: false, .. } => 17,
    Expr::Call { .. } | Expr::New { .. } => 18,
    Expr::Member { .. } | Expr::Template(Template { tag: Some(_), .. }) => 19,
    _ => 20,
  }
}

fn binary_precedence(op: &str) -> u8 {
  match op {
    "??" => 4,
    "||" => 5,
    "&&" => 6,
    "|" => 7,
    "^" => 8,
    "&" => 9,
    "==" | "!=" | "===" | "!==" => 10,
    "<" | ">" | "<=" | ">=" | "in" | "instanceof" => 11,
    "<<" | ">>" | ">>>" => 12,
    "+" | "-" => 13,
    "*" | "/" | "%" => 14,
    _ => 15,
  }
}

fn is_identifier_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(is_ident_start) && chars.all(is_ident_part)
}

/// `??` cannot be mixed with `||`/`&&` without parentheses.
fn mixes_coalescing(parent: &str, child: &Expr) -> bool {
  let Expr::Binary { op, .. } = child else { return false };
  match parent {
    "??" => matches!(*op, "||" | "&&"),
    "||" | "&&" => *op == "??",
    _ => false,
  }
}

struct Printer {
  indent: usize,
}

impl Printer {
  fn pad(&self) -> String {
    "  ".repeat(self.indent)
  }

  // -- statements -----------------------------------------------------------

  fn block(&mut self, stmts: &[Stmt]) -> String {
    if stmts.is_empty() {
      return "{}".into();
    }
    self.indent += 1;
    let mut out = String::from("{\n");
    for stmt in stmts {
      out.push_str(&self.pad());
      out.push_str(&self.stmt(stmt));
      out.push('\n');
    }
    self.indent -= 1;
    out.push_str(&self.pad());
    out.push('}');
    out
  }

  /// Control-flow bodies are always braced.
  fn body(&mut self, stmt: &Stmt) -> String {
    match stmt {
      Stmt::Block(stmts) => self.block(stmts),
      other => self.block(std::slice::from_ref(other)),
    }
  }

  fn stmt(&mut self, stmt: &Stmt) -> String {
    match stmt {
      Stmt::Import(import) => self.import(import),
      Stmt::ExportNamed { specifiers, source } => {
        let names: Vec<String> = specifiers
          .iter()
          .map(|s| {
            let local = module_export_name(&s.local);
            if s.local == s.exported {
              local
            } else {
              format!("{local} as {}", module_export_name(&s.exported))
            }
          })
          .collect();
        let list = if names.is_empty() { "{}".to_string() } else { format!("{{ {} }}", names.join(", ")) };
        match source {
          Some(source) => format!("export {list} from {};", quote(source)),
          None => format!("export {list};"),
        }
      }
      Stmt::ExportAll { exported, source } => match exported {
        Some(name) => format!("export * as {} from {};", module_export_name(name), quote(source)),
        None => format!("export * from {};", quote(source)),
      },
      Stmt::ExportDecl(Decl::Var(decl)) => format!("export {};", self.var_decl(decl)),
      Stmt::ExportDecl(Decl::Function(f)) => format!("export {}", self.function(f)),
      Stmt::ExportDefaultExpr(expr) => format!("export default {};", self.expr(expr, 2)),
      Stmt::ExportDefaultFn(f) => format!("export default {}", self.function(f)),
      Stmt::Var(decl) => format!("{};", self.var_decl(decl)),
      Stmt::Function(f) => self.function(f),
      Stmt::Expr(expr) => {
        let text = self.expr(expr, 0);
        if text.starts_with('{') || text.starts_with("function") || text.starts_with("async function")
        {
          format!("({text});")
        } else {
          format!("{text};")
        }
      }
      Stmt::Block(stmts) => self.block(stmts),
      Stmt::If { test, cons, alt } => {
        let mut out = format!("if ({}) {}", self.expr(test, 0), self.body(cons));
        if let Some(alt) = alt {
          out.push_str(" else ");
          match alt.as_ref() {
            nested @ Stmt::If { .. } => out.push_str(&self.stmt(nested)),
            other => out.push_str(&self.body(other)),
          }
        }
        out
      }
      Stmt::For { init, test, update, body } => {
        let init = match init {
          Some(ForInit::Var(decl)) => self.var_decl(decl),
          Some(ForInit::Expr(expr)) => self.expr(expr, 0),
          None => String::new(),
        };
        let test = test.as_ref().map(|e| format!(" {}", self.expr(e, 0))).unwrap_or_default();
        let update = update.as_ref().map(|e| format!(" {}", self.expr(e, 0))).unwrap_or_default();
        format!("for ({init};{test};{update}) {}", self.body(body))
      }
      Stmt::ForIn { head, right, body } => {
        format!("for ({} in {}) {}", self.for_head(head), self.expr(right, 0), self.body(body))
      }
      Stmt::ForOf { head, right, body, is_await } => format!(
        "for{} ({} of {}) {}",
        if *is_await { " await" } else { "" },
        self.for_head(head),
        self.expr(right, 2),
        self.body(body)
      ),
      Stmt::While { test, body } => format!("while ({}) {}", self.expr(test, 0), self.body(body)),
      Stmt::DoWhile { body, test } => {
        format!("do {} while ({});", self.body(body), self.expr(test, 0))
      }
      Stmt::Return(None) => "return;".into(),
      Stmt::Return(Some(arg)) => format!("return {};", self.expr(arg, 0)),
      Stmt::Throw(arg) => format!("throw {};", self.expr(arg, 0)),
      Stmt::Try { block, handler, finalizer } => {
        let mut out = format!("try {}", self.block(block));
        if let Some(handler) = handler {
          match &handler.param {
            Some(param) => {
              out.push_str(&format!(" catch ({}) {}", self.pat(param), self.block(&handler.body)));
            }
            None => out.push_str(&format!(" catch {}", self.block(&handler.body))),
          }
        }
        if let Some(finalizer) = finalizer {
          out.push_str(&format!(" finally {}", self.block(finalizer)));
        }
        out
      }
      Stmt::Break(label) => match label {
        Some(label) => format!("break {label};"),
        None => "break;".into(),
      },
      Stmt::Continue(label) => match label {
        Some(label) => format!("continue {label};"),
        None => "continue;".into(),
      },
      Stmt::Labeled { label, body } => format!("{label}: {}", self.stmt(body)),
      Stmt::Switch { discriminant, cases } => {
        let mut out = format!("switch ({}) {{\n", self.expr(discriminant, 0));
        self.indent += 1;
        for case in cases {
          out.push_str(&self.pad());
          match &case.test {
            Some(test) => out.push_str(&format!("case {}:\n", self.expr(test, 0))),
            None => out.push_str("default:\n"),
          }
          self.indent += 1;
          for stmt in &case.body {
            out.push_str(&self.pad());
            out.push_str(&self.stmt(stmt));
            out.push('\n');
          }
          self.indent -= 1;
        }
        self.indent -= 1;
        out.push_str(&self.pad());
        out.push('}');
        out
      }
      Stmt::Empty => ";".into(),
    }
  }

  fn import(&mut self, import: &ImportDecl) -> String {
    if import.specifiers.is_empty() {
      return format!("import {};", quote(&import.source));
    }
    let mut parts = Vec::new();
    let mut named = Vec::new();
    for spec in &import.specifiers {
      match spec {
        ImportSpecifier::Default(local) => parts.push(local.clone()),
        ImportSpecifier::Namespace(local) => parts.push(format!("* as {local}")),
        ImportSpecifier::Named { imported, local } if imported == local => named.push(local.clone()),
        ImportSpecifier::Named { imported, local } => {
          named.push(format!("{} as {local}", module_export_name(imported)));
        }
      }
    }
    if !named.is_empty() {
      parts.push(format!("{{ {} }}", named.join(", ")));
    }
    format!("import {} from {};", parts.join(", "), quote(&import.source))
  }

  fn for_head(&mut self, head: &ForHead) -> String {
    match head {
      ForHead::Var(kind, pat) => format!("{} {}", kind.as_str(), self.pat(pat)),
      ForHead::Pat(pat) => self.pat(pat),
    }
  }

  fn var_decl(&mut self, decl: &VarDecl) -> String {
    let decls: Vec<String> = decl
      .decls
      .iter()
      .map(|d| match &d.init {
        Some(init) => format!("{} = {}", self.pat(&d.id), self.expr(init, 2)),
        None => self.pat(&d.id),
      })
      .collect();
    format!("{} {}", decl.kind.as_str(), decls.join(", "))
  }

  fn function(&mut self, f: &Function) -> String {
    let mut out = String::new();
    if f.is_async {
      out.push_str("async ");
    }
    out.push_str("function");
    if f.is_generator {
      out.push('*');
    }
    if let Some(id) = &f.id {
      out.push(' ');
      out.push_str(id);
    }
    out.push_str(&format!("({}) {}", self.params(&f.params), self.block(&f.body)));
    out
  }

  fn params(&mut self, params: &[Pat]) -> String {
    params.iter().map(|p| self.pat(p)).collect::<Vec<_>>().join(", ")
  }

  // -- patterns -------------------------------------------------------------

  fn pat(&mut self, pat: &Pat) -> String {
    match pat {
      Pat::Ident(name) => name.clone(),
      Pat::Object(props) => {
        if props.is_empty() {
          return "{}".into();
        }
        let parts: Vec<String> = props
          .iter()
          .map(|prop| match prop {
            ObjectPatProp::KeyValue { value, shorthand: true, .. } => self.pat(value),
            ObjectPatProp::KeyValue { key, value, .. } => {
              format!("{}: {}", self.prop_key(key), self.pat(value))
            }
            ObjectPatProp::Rest(rest) => format!("...{}", self.pat(rest)),
          })
          .collect();
        format!("{{ {} }}", parts.join(", "))
      }
      Pat::Array(elems) => {
        let parts: Vec<String> =
          elems.iter().map(|e| e.as_ref().map(|p| self.pat(p)).unwrap_or_default()).collect();
        let mut inner = parts.join(", ");
        if matches!(elems.last(), Some(None)) {
          inner.push(',');
        }
        format!("[{inner}]")
      }
      Pat::Assign(target, default) => format!("{} = {}", self.pat(target), self.expr(default, 2)),
      Pat::Rest(inner) => format!("...{}", self.pat(inner)),
      Pat::Expr(expr) => self.expr(expr, 18),
    }
  }

  fn prop_key(&mut self, key: &PropKey) -> String {
    match key {
      PropKey::Ident(name) | PropKey::Str(name) | PropKey::Num(name) => name.clone(),
      PropKey::Computed(expr) => format!("[{}]", self.expr(expr, 2)),
    }
  }

  // -- expressions ----------------------------------------------------------

  fn expr(&mut self, expr: &Expr, min: u8) -> String {
    let text = self.expr_inner(expr);
    if precedence(expr) < min { format!("({text})") } else { text }
  }

  fn args(&mut self, args: &[Expr]) -> String {
    args.iter().map(|a| self.expr(a, 2)).collect::<Vec<_>>().join(", ")
  }

  fn expr_inner(&mut self, expr: &Expr) -> String {
    match expr {
      Expr::Ident(name) => name.clone(),
      Expr::This => "this".into(),
      Expr::Null => "null".into(),
      Expr::Bool(b) => b.to_string(),
      Expr::Num(raw) | Expr::Str(raw) | Expr::Regex(raw) => raw.clone(),
      Expr::Template(tpl) => {
        let mut out = match &tpl.tag {
          Some(tag) => self.expr(tag, 19),
          None => String::new(),
        };
        out.push('`');
        for (i, quasi) in tpl.quasis.iter().enumerate() {
          out.push_str(quasi);
          if let Some(sub) = tpl.exprs.get(i) {
            out.push_str(&format!("${{{}}}", self.expr(sub, 0)));
          }
        }
        out.push('`');
        out
      }
      Expr::Array(elems) => {
        let parts: Vec<String> =
          elems.iter().map(|e| e.as_ref().map(|e| self.expr(e, 2)).unwrap_or_default()).collect();
        let mut inner = parts.join(", ");
        if matches!(elems.last(), Some(None)) {
          inner.push(',');
        }
        format!("[{inner}]")
      }
      Expr::Object(props) => self.object(props),
      Expr::Function(f) => self.function(f),
      Expr::Arrow(arrow) => {
        let head = format!(
          "{}({}) =>",
          if arrow.is_async { "async " } else { "" },
          self.params(&arrow.params)
        );
        match &arrow.body {
          ArrowBody::Block(stmts) => format!("{head} {}", self.block(stmts)),
          ArrowBody::Expr(body) => {
            let text = self.expr(body, 2);
            if text.starts_with('{') { format!("{head} ({text})") } else { format!("{head} {text}") }
          }
        }
      }
      Expr::Unary { op, arg } => {
        let text = self.expr(arg, 16);
        if op.chars().all(char::is_alphabetic) {
          format!("{op} {text}")
        } else if (*op == "-" || *op == "+") && text.starts_with(*op) {
          format!("{op} {text}")
        } else {
          format!("{op}{text}")
        }
      }
      Expr::Update { op, prefix: true, arg } => format!("{op}{}", self.expr(arg, 16)),
      Expr::Update { op, prefix: false, arg } => format!("{}{op}", self.expr(arg, 18)),
      Expr::Binary { op, left, right } => {
        let prec = binary_precedence(op);
        let (left_min, right_min) = if *op == "**" { (17, prec) } else { (prec, prec + 1) };
        let left_text = if mixes_coalescing(op, left) {
          format!("({})", self.expr(left, 0))
        } else {
          self.expr(left, left_min)
        };
        let right_text = if mixes_coalescing(op, right) {
          format!("({})", self.expr(right, 0))
        } else {
          self.expr(right, right_min)
        };
        format!("{left_text} {op} {right_text}")
      }
      Expr::Assign { op, target, value } => {
        format!("{} {op} {}", self.pat(target), self.expr(value, 2))
      }
      Expr::Cond { test, cons, alt } => {
        format!("{} ? {} : {}", self.expr(test, 4), self.expr(cons, 2), self.expr(alt, 2))
      }
      Expr::Call { callee, args, optional, .. } => {
        let callee = self.expr(callee, 18);
        let args = self.args(args);
        if *optional { format!("{callee}?.({args})") } else { format!("{callee}({args})") }
      }
      Expr::New { callee, args } => format!("new {}({})", self.expr(callee, 19), self.args(args)),
      Expr::Member { object, prop, optional } => {
        let mut out = match object.as_ref() {
          Expr::Num(_) => format!("({})", self.expr_inner(object)),
          other => self.expr(other, 18),
        };
        match prop {
          MemberProp::Ident(name) => {
            out.push_str(if *optional { "?." } else { "." });
            out.push_str(name);
          }
          MemberProp::Private(name) => {
            out.push_str(if *optional { "?.#" } else { ".#" });
            out.push_str(name);
          }
          MemberProp::Computed(inner) => {
            if *optional {
              out.push_str("?.");
            }
            out.push_str(&format!("[{}]", self.expr(inner, 0)));
          }
        }
        out
      }
      Expr::Seq(exprs) => exprs.iter().map(|e| self.expr(e, 2)).collect::<Vec<_>>().join(", "),
      Expr::Spread(arg) => format!("...{}", self.expr(arg, 2)),
      Expr::Await(arg) => format!("await {}", self.expr(arg, 16)),
      Expr::Yield { arg, delegate } => {
        let star = if *delegate { "*" } else { "" };
        match arg {
          Some(arg) => format!("yield{star} {}", self.expr(arg, 2)),
          None => format!("yield{star}"),
        }
      }
      Expr::Import(arg) => format!("import({})", self.expr(arg, 2)),
      Expr::Meta(object, prop) => format!("{object}.{prop}"),
      Expr::Paren(inner) => format!("({})", self.expr(inner, 0)),
    }
  }

  fn object(&mut self, props: &[Prop]) -> String {
    if props.is_empty() {
      return "{}".into();
    }
    self.indent += 1;
    let parts: Vec<String> = props.iter().map(|p| self.prop(p)).collect();
    let pad = self.pad();
    self.indent -= 1;

    let inline_len: usize = parts.iter().map(|p| p.len() + 2).sum();
    if inline_len <= INLINE_OBJECT_LIMIT && parts.iter().all(|p| !p.contains('\n')) {
      return format!("{{ {} }}", parts.join(", "));
    }
    let mut out = String::from("{\n");
    for part in &parts {
      out.push_str(&pad);
      out.push_str(part);
      out.push_str(",\n");
    }
    out.push_str(&self.pad());
    out.push('}');
    out
  }

  fn prop(&mut self, prop: &Prop) -> String {
    match prop {
      Prop::KeyValue(key, value) => format!("{}: {}", self.prop_key(key), self.expr(value, 2)),
      Prop::Shorthand(name) => name.clone(),
      Prop::Spread(expr) => format!("...{}", self.expr(expr, 2)),
      Prop::Method { key, kind, func } => {
        let prefix = match kind {
          MethodKind::Get => "get ",
          MethodKind::Set => "set ",
          MethodKind::Method if func.is_async && func.is_generator => "async *",
          MethodKind::Method if func.is_async => "async ",
          MethodKind::Method if func.is_generator => "*",
          MethodKind::Method => "",
        };
        format!(
          "{prefix}{}({}) {}",
          self.prop_key(key),
          self.params(&func.params),
          self.block(&func.body)
        )
      }
    }
  }
}

fn module_export_name(name: &str) -> String {
  if is_identifier_name(name) { name.to_string() } else { quote(name) }
}
