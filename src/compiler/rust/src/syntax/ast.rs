/* src/compiler/rust/src/syntax/ast.rs */

use super::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
  pub specifiers: Vec<ImportSpecifier>,
  pub source: String,
  /// `import 'x'` carries no bindings and is never swept.
  pub side_effect_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
  Default(String),
  Namespace(String),
  Named { imported: String, local: String },
}

impl ImportSpecifier {
  pub fn local(&self) -> &str {
    match self {
      Self::Default(local) | Self::Namespace(local) => local,
      Self::Named { local, .. } => local,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
  pub local: String,
  pub exported: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
  Var,
  Let,
  Const,
}

impl VarKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Var => "var",
      Self::Let => "let",
      Self::Const => "const",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
  pub kind: VarKind,
  pub decls: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
  pub id: Pat,
  pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub id: Option<String>,
  pub params: Vec<Pat>,
  pub body: Vec<Stmt>,
  pub is_async: bool,
  pub is_generator: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
  Expr(Box<Expr>),
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
  pub params: Vec<Pat>,
  pub body: ArrowBody,
  pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
  Var(VarDecl),
  Function(Function),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
  Var(VarDecl),
  Expr(Expr),
}

/// Left side of `for (x in y)` / `for (x of y)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
  Var(VarKind, Pat),
  Pat(Pat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
  pub test: Option<Expr>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
  pub param: Option<Pat>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Import(ImportDecl),
  ExportNamed { specifiers: Vec<ExportSpecifier>, source: Option<String> },
  ExportAll { exported: Option<String>, source: String },
  ExportDecl(Decl),
  ExportDefaultExpr(Expr),
  ExportDefaultFn(Function),
  Var(VarDecl),
  Function(Function),
  Expr(Expr),
  Block(Vec<Stmt>),
  If { test: Expr, cons: Box<Stmt>, alt: Option<Box<Stmt>> },
  For { init: Option<ForInit>, test: Option<Expr>, update: Option<Expr>, body: Box<Stmt> },
  ForIn { head: ForHead, right: Expr, body: Box<Stmt> },
  ForOf { head: ForHead, right: Expr, body: Box<Stmt>, is_await: bool },
  While { test: Expr, body: Box<Stmt> },
  DoWhile { body: Box<Stmt>, test: Expr },
  Return(Option<Expr>),
  Throw(Expr),
  Try { block: Vec<Stmt>, handler: Option<CatchClause>, finalizer: Option<Vec<Stmt>> },
  Break(Option<String>),
  Continue(Option<String>),
  Labeled { label: String, body: Box<Stmt> },
  Switch { discriminant: Expr, cases: Vec<SwitchCase> },
  Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
  Ident(String),
  Object(Vec<ObjectPatProp>),
  /// `None` entries are holes: `[, b]`.
  Array(Vec<Option<Pat>>),
  Assign(Box<Pat>, Box<Expr>),
  Rest(Box<Pat>),
  /// Assignment targets such as `a.b` in `[a.b] = x`.
  Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPatProp {
  KeyValue { key: PropKey, value: Pat, shorthand: bool },
  Rest(Pat),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
  Ident(String),
  Str(String),
  Num(String),
  Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
  Method,
  Get,
  Set,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
  KeyValue(PropKey, Expr),
  Shorthand(String),
  Method { key: PropKey, kind: MethodKind, func: Function },
  Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
  Ident(String),
  Private(String),
  Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
  pub tag: Option<Box<Expr>>,
  pub quasis: Vec<String>,
  pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Ident(String),
  This,
  Null,
  Bool(bool),
  Num(String),
  /// Raw literal, quotes included.
  Str(String),
  Regex(String),
  Template(Template),
  Array(Vec<Option<Expr>>),
  Object(Vec<Prop>),
  Function(Function),
  Arrow(Arrow),
  Unary { op: &'static str, arg: Box<Expr> },
  Update { op: &'static str, prefix: bool, arg: Box<Expr> },
  Binary { op: &'static str, left: Box<Expr>, right: Box<Expr> },
  Assign { op: &'static str, target: Box<Pat>, value: Box<Expr> },
  Cond { test: Box<Expr>, cons: Box<Expr>, alt: Box<Expr> },
  Call { callee: Box<Expr>, args: Vec<Expr>, optional: bool, span: Span },
  New { callee: Box<Expr>, args: Vec<Expr> },
  Member { object: Box<Expr>, prop: MemberProp, optional: bool },
  Seq(Vec<Expr>),
  Spread(Box<Expr>),
  Await(Box<Expr>),
  Yield { arg: Option<Box<Expr>>, delegate: bool },
  /// Dynamic `import(x)`.
  Import(Box<Expr>),
  /// `import.meta` / `new.target`.
  Meta(&'static str, &'static str),
  Paren(Box<Expr>),
}

impl Expr {
  pub fn ident(name: impl Into<String>) -> Self {
    Self::Ident(name.into())
  }

  pub fn undefined() -> Self {
    Self::Ident("undefined".into())
  }

  pub fn member(object: Expr, prop: &str) -> Self {
    Self::Member { object: Box::new(object), prop: MemberProp::Ident(prop.into()), optional: false }
  }

  pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
    Self::Call { callee: Box::new(callee), args, optional: false, span: Span::default() }
  }

  /// Quoted string literal from arbitrary text.
  pub fn string(value: &str) -> Self {
    Self::Str(super::quote(value))
  }

  pub fn is_function_like(&self) -> bool {
    match self {
      Self::Function(_) | Self::Arrow(_) => true,
      Self::Paren(inner) => inner.is_function_like(),
      _ => false,
    }
  }
}

impl Function {
  pub fn expression(params: Vec<Pat>, body: Vec<Stmt>) -> Self {
    Self { id: None, params, body, is_async: false, is_generator: false }
  }
}

impl Module {
  /// Local names bound at the top level by imports and declarations.
  pub fn top_level_bindings(&self) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &self.body {
      match stmt {
        Stmt::Import(import) => {
          names.extend(import.specifiers.iter().map(|s| s.local().to_string()));
        }
        Stmt::Var(decl) | Stmt::ExportDecl(Decl::Var(decl)) => {
          for d in &decl.decls {
            d.id.collect_bindings(&mut names);
          }
        }
        Stmt::Function(f) | Stmt::ExportDecl(Decl::Function(f)) | Stmt::ExportDefaultFn(f) => {
          if let Some(id) = &f.id {
            names.push(id.clone());
          }
        }
        _ => {}
      }
    }
    names
  }
}

impl Pat {
  pub fn collect_bindings(&self, out: &mut Vec<String>) {
    match self {
      Self::Ident(name) => out.push(name.clone()),
      Self::Object(props) => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue { value, .. } => value.collect_bindings(out),
            ObjectPatProp::Rest(p) => p.collect_bindings(out),
          }
        }
      }
      Self::Array(elems) => {
        for elem in elems.iter().flatten() {
          elem.collect_bindings(out);
        }
      }
      Self::Assign(p, _) | Self::Rest(p) => p.collect_bindings(out),
      Self::Expr(_) => {}
    }
  }

  pub fn bindings(&self) -> Vec<String> {
    let mut out = Vec::new();
    self.collect_bindings(&mut out);
    out
  }

  /// The name used for generated handlers: the identifier itself, or the
  /// first element of an array pattern.
  pub fn naming_hint(&self) -> Option<&str> {
    match self {
      Self::Ident(name) => Some(name),
      Self::Array(elems) => elems.first().and_then(|e| e.as_ref()).and_then(Pat::naming_hint),
      Self::Assign(p, _) => p.naming_hint(),
      _ => None,
    }
  }
}

impl PropKey {
  pub fn naming_hint(&self) -> Option<String> {
    match self {
      Self::Ident(name) => Some(name.clone()),
      Self::Str(raw) => super::unquote(raw),
      _ => None,
    }
  }
}
