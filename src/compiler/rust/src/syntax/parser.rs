/* src/compiler/rust/src/syntax/parser.rs */

// Recursive-descent parser for the ES module subset the compiler accepts.
// Binary operators use precedence climbing; arrow functions are detected by
// speculatively parsing a parameter list and backtracking on failure.

use super::ast::*;
use super::token::{Token, TokenKind, tokenize};
use super::{Span, SyntaxError, unquote};

type PResult<T> = Result<T, SyntaxError>;

const RESERVED: &[&str] = &[
  "break",
  "case",
  "catch",
  "class",
  "const",
  "continue",
  "debugger",
  "default",
  "delete",
  "do",
  "else",
  "enum",
  "export",
  "extends",
  "false",
  "finally",
  "for",
  "function",
  "if",
  "import",
  "in",
  "instanceof",
  "new",
  "null",
  "return",
  "super",
  "switch",
  "this",
  "throw",
  "true",
  "try",
  "typeof",
  "var",
  "void",
  "while",
  "with",
];

pub fn parse_module(source: &str) -> PResult<Module> {
  let mut parser = Parser::new(source)?;
  let mut body = Vec::new();
  while !parser.at_eof() {
    body.push(parser.parse_module_item()?);
  }
  Ok(Module { body })
}

pub fn parse_expression(source: &str) -> PResult<Expr> {
  let mut parser = Parser::new(source)?;
  let expr = parser.parse_expression()?;
  if !parser.at_eof() {
    return Err(parser.unexpected());
  }
  Ok(expr)
}

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  no_in: bool,
}

fn describe(kind: &TokenKind) -> String {
  match kind {
    TokenKind::Word(w) => format!("`{w}`"),
    TokenKind::Punct(p) => format!("`{p}`"),
    TokenKind::Num(n) => format!("number `{n}`"),
    TokenKind::Str(s) => format!("string {s}"),
    TokenKind::Template(_) => "template literal".into(),
    TokenKind::Regex(r) => format!("regex `{r}`"),
    TokenKind::Eof => "end of input".into(),
  }
}

fn binary_op(kind: &TokenKind, no_in: bool) -> Option<(&'static str, u8)> {
  match kind {
    TokenKind::Punct(p) => {
      let prec = match *p {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" | "===" | "!==" => 7,
        "<" | ">" | "<=" | ">=" => 8,
        "<<" | ">>" | ">>>" => 9,
        "+" | "-" => 10,
        "*" | "/" | "%" => 11,
        "**" => 12,
        _ => return None,
      };
      Some((*p, prec))
    }
    TokenKind::Word(w) if w == "instanceof" => Some(("instanceof", 8)),
    TokenKind::Word(w) if w == "in" && !no_in => Some(("in", 8)),
    _ => None,
  }
}

fn assign_op(kind: &TokenKind) -> Option<&'static str> {
  match kind {
    TokenKind::Punct(
      p @ ("=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" | "<<=" | ">>=" | ">>>=" | "&=" | "|="
      | "^=" | "&&=" | "||=" | "??="),
    ) => Some(*p),
    _ => None,
  }
}

impl Parser {
  fn new(source: &str) -> PResult<Self> {
    Ok(Self { tokens: tokenize(source)?, pos: 0, no_in: false })
  }

  // -- token helpers --------------------------------------------------------

  fn peek(&self) -> &Token {
    &self.tokens[self.pos.min(self.tokens.len() - 1)]
  }

  fn peek_at(&self, offset: usize) -> &Token {
    &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) -> Token {
    let token = self.peek().clone();
    if self.pos < self.tokens.len() - 1 {
      self.pos += 1;
    }
    token
  }

  fn at_eof(&self) -> bool {
    matches!(self.peek().kind, TokenKind::Eof)
  }

  fn at_punct(&self, p: &str) -> bool {
    matches!(&self.peek().kind, TokenKind::Punct(q) if *q == p)
  }

  fn punct_at(&self, offset: usize, p: &str) -> bool {
    matches!(&self.peek_at(offset).kind, TokenKind::Punct(q) if *q == p)
  }

  fn at_word(&self, w: &str) -> bool {
    matches!(&self.peek().kind, TokenKind::Word(x) if x == w)
  }

  fn word_at(&self, offset: usize, w: &str) -> bool {
    matches!(&self.peek_at(offset).kind, TokenKind::Word(x) if x == w)
  }

  fn eat_punct(&mut self, p: &str) -> bool {
    if self.at_punct(p) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn eat_word(&mut self, w: &str) -> bool {
    if self.at_word(w) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn expect_punct(&mut self, p: &str) -> PResult<()> {
    if self.eat_punct(p) {
      Ok(())
    } else {
      Err(self.error(format!("expected `{p}`, found {}", describe(&self.peek().kind))))
    }
  }

  fn expect_word(&mut self, w: &str) -> PResult<()> {
    if self.eat_word(w) {
      Ok(())
    } else {
      Err(self.error(format!("expected `{w}`, found {}", describe(&self.peek().kind))))
    }
  }

  fn error(&self, message: impl Into<String>) -> SyntaxError {
    SyntaxError { message: message.into(), span: self.peek().span }
  }

  fn unexpected(&self) -> SyntaxError {
    self.error(format!("unexpected {}", describe(&self.peek().kind)))
  }

  fn binding_ident(&mut self) -> PResult<String> {
    match &self.peek().kind {
      TokenKind::Word(w) if !RESERVED.contains(&w.as_str()) => {
        let name = w.clone();
        self.advance();
        Ok(name)
      }
      TokenKind::Word(w) if w == "class" => Err(self.error("classes are not supported")),
      _ => Err(self.error(format!("expected identifier, found {}", describe(&self.peek().kind)))),
    }
  }

  /// Any word, including keywords (property names, export names).
  fn name(&mut self) -> PResult<String> {
    match &self.peek().kind {
      TokenKind::Word(w) => {
        let name = w.clone();
        self.advance();
        Ok(name)
      }
      _ => Err(self.error(format!("expected name, found {}", describe(&self.peek().kind)))),
    }
  }

  fn module_name(&mut self) -> PResult<String> {
    if let TokenKind::Str(raw) = &self.peek().kind {
      let raw = raw.clone();
      self.advance();
      return unquote(&raw).ok_or_else(|| self.error("malformed string literal"));
    }
    self.name()
  }

  fn string_literal(&mut self) -> PResult<String> {
    match &self.peek().kind {
      TokenKind::Str(raw) => {
        let raw = raw.clone();
        self.advance();
        unquote(&raw).ok_or_else(|| self.error("malformed string literal"))
      }
      _ => Err(self.error(format!("expected string, found {}", describe(&self.peek().kind)))),
    }
  }

  fn consume_semicolon(&mut self) -> PResult<()> {
    if self.eat_punct(";") || self.at_punct("}") || self.at_eof() || self.peek().newline_before {
      return Ok(());
    }
    Err(self.error(format!("expected `;`, found {}", describe(&self.peek().kind))))
  }

  fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
    let saved = std::mem::replace(&mut self.no_in, false);
    let result = f(self);
    self.no_in = saved;
    result
  }

  fn at_async_function(&self) -> bool {
    self.at_word("async") && self.word_at(1, "function") && !self.peek_at(1).newline_before
  }

  // -- module items ---------------------------------------------------------

  fn parse_module_item(&mut self) -> PResult<Stmt> {
    if self.at_word("import") && !self.punct_at(1, "(") && !self.punct_at(1, ".") {
      return self.parse_import();
    }
    if self.at_word("export") {
      return self.parse_export();
    }
    self.parse_statement()
  }

  fn parse_import(&mut self) -> PResult<Stmt> {
    self.expect_word("import")?;
    if matches!(self.peek().kind, TokenKind::Str(_)) {
      let source = self.string_literal()?;
      self.consume_semicolon()?;
      return Ok(Stmt::Import(ImportDecl { specifiers: Vec::new(), source, side_effect_only: true }));
    }

    let mut specifiers = Vec::new();
    if matches!(self.peek().kind, TokenKind::Word(_)) {
      specifiers.push(ImportSpecifier::Default(self.binding_ident()?));
      if !self.eat_punct(",") {
        return self.finish_import(specifiers);
      }
    }
    if self.eat_punct("*") {
      self.expect_word("as")?;
      specifiers.push(ImportSpecifier::Namespace(self.binding_ident()?));
    } else if self.eat_punct("{") {
      while !self.eat_punct("}") {
        let imported = self.module_name()?;
        let local = if self.eat_word("as") { self.binding_ident()? } else { imported.clone() };
        specifiers.push(ImportSpecifier::Named { imported, local });
        if !self.at_punct("}") {
          self.expect_punct(",")?;
        }
      }
    } else {
      return Err(self.unexpected());
    }
    self.finish_import(specifiers)
  }

  fn finish_import(&mut self, specifiers: Vec<ImportSpecifier>) -> PResult<Stmt> {
    self.expect_word("from")?;
    let source = self.string_literal()?;
    self.consume_semicolon()?;
    Ok(Stmt::Import(ImportDecl { specifiers, source, side_effect_only: false }))
  }

  fn parse_export(&mut self) -> PResult<Stmt> {
    self.expect_word("export")?;

    if self.eat_word("default") {
      if self.at_word("function") || self.at_async_function() {
        return Ok(Stmt::ExportDefaultFn(self.parse_function()?));
      }
      if self.at_word("class") {
        return Err(self.error("classes are not supported"));
      }
      let expr = self.parse_assign()?;
      self.consume_semicolon()?;
      return Ok(Stmt::ExportDefaultExpr(expr));
    }

    if self.eat_punct("*") {
      let exported = if self.eat_word("as") { Some(self.module_name()?) } else { None };
      self.expect_word("from")?;
      let source = self.string_literal()?;
      self.consume_semicolon()?;
      return Ok(Stmt::ExportAll { exported, source });
    }

    if self.eat_punct("{") {
      let mut specifiers = Vec::new();
      while !self.eat_punct("}") {
        let local = self.module_name()?;
        let exported = if self.eat_word("as") { self.module_name()? } else { local.clone() };
        specifiers.push(ExportSpecifier { local, exported });
        if !self.at_punct("}") {
          self.expect_punct(",")?;
        }
      }
      let source = if self.eat_word("from") { Some(self.string_literal()?) } else { None };
      self.consume_semicolon()?;
      return Ok(Stmt::ExportNamed { specifiers, source });
    }

    if let Some(kind) = self.var_kind() {
      self.advance();
      let decl = self.parse_var_decl(kind)?;
      self.consume_semicolon()?;
      return Ok(Stmt::ExportDecl(Decl::Var(decl)));
    }
    if self.at_word("function") || self.at_async_function() {
      return Ok(Stmt::ExportDecl(Decl::Function(self.parse_function()?)));
    }
    if self.at_word("class") {
      return Err(self.error("classes are not supported"));
    }
    Err(self.unexpected())
  }

  // -- statements -----------------------------------------------------------

  fn var_kind(&self) -> Option<VarKind> {
    match &self.peek().kind {
      TokenKind::Word(w) if w == "var" => Some(VarKind::Var),
      TokenKind::Word(w) if w == "const" => Some(VarKind::Const),
      TokenKind::Word(w) if w == "let" => {
        let next = &self.peek_at(1).kind;
        let binds = matches!(next, TokenKind::Word(_))
          || matches!(next, TokenKind::Punct("[") | TokenKind::Punct("{"));
        binds.then_some(VarKind::Let)
      }
      _ => None,
    }
  }

  fn parse_statement(&mut self) -> PResult<Stmt> {
    if let Some(kind) = self.var_kind() {
      self.advance();
      let decl = self.parse_var_decl(kind)?;
      self.consume_semicolon()?;
      return Ok(Stmt::Var(decl));
    }
    if self.at_punct("{") {
      return Ok(Stmt::Block(self.parse_block()?));
    }
    if self.eat_punct(";") {
      return Ok(Stmt::Empty);
    }
    if self.at_word("function") || self.at_async_function() {
      return Ok(Stmt::Function(self.parse_function()?));
    }

    let TokenKind::Word(word) = &self.peek().kind else {
      return self.parse_expression_statement();
    };
    match word.as_str() {
      "if" => self.parse_if(),
      "for" => self.parse_for(),
      "while" => {
        self.advance();
        let test = self.parse_paren_expression()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { test, body })
      }
      "do" => {
        self.advance();
        let body = Box::new(self.parse_statement()?);
        self.expect_word("while")?;
        let test = self.parse_paren_expression()?;
        self.eat_punct(";");
        Ok(Stmt::DoWhile { body, test })
      }
      "return" => {
        self.advance();
        let arg = if self.at_punct(";")
          || self.at_punct("}")
          || self.at_eof()
          || self.peek().newline_before
        {
          None
        } else {
          Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Stmt::Return(arg))
      }
      "throw" => {
        self.advance();
        if self.peek().newline_before {
          return Err(self.error("illegal newline after throw"));
        }
        let arg = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Throw(arg))
      }
      "try" => self.parse_try(),
      "switch" => self.parse_switch(),
      "break" | "continue" => {
        let is_break = word == "break";
        self.advance();
        let label = match &self.peek().kind {
          TokenKind::Word(w) if !self.peek().newline_before && !RESERVED.contains(&w.as_str()) => {
            let label = w.clone();
            self.advance();
            Some(label)
          }
          _ => None,
        };
        self.consume_semicolon()?;
        Ok(if is_break { Stmt::Break(label) } else { Stmt::Continue(label) })
      }
      "class" => Err(self.error("classes are not supported")),
      "import" if !self.punct_at(1, "(") && !self.punct_at(1, ".") => {
        Err(self.error("import declarations may only appear at the top level"))
      }
      "export" => Err(self.error("export declarations may only appear at the top level")),
      w if !RESERVED.contains(&w) && self.punct_at(1, ":") => {
        let label = w.to_string();
        self.advance();
        self.advance();
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::Labeled { label, body })
      }
      _ => self.parse_expression_statement(),
    }
  }

  fn parse_expression_statement(&mut self) -> PResult<Stmt> {
    let expr = self.parse_expression()?;
    self.consume_semicolon()?;
    Ok(Stmt::Expr(expr))
  }

  fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
    self.expect_punct("{")?;
    let mut body = Vec::new();
    while !self.eat_punct("}") {
      if self.at_eof() {
        return Err(self.error("expected `}`, found end of input"));
      }
      body.push(self.parse_statement()?);
    }
    Ok(body)
  }

  fn parse_paren_expression(&mut self) -> PResult<Expr> {
    self.expect_punct("(")?;
    let expr = self.with_in(Self::parse_expression)?;
    self.expect_punct(")")?;
    Ok(expr)
  }

  fn parse_if(&mut self) -> PResult<Stmt> {
    self.expect_word("if")?;
    let test = self.parse_paren_expression()?;
    let cons = Box::new(self.parse_statement()?);
    let alt = if self.eat_word("else") { Some(Box::new(self.parse_statement()?)) } else { None };
    Ok(Stmt::If { test, cons, alt })
  }

  fn parse_for(&mut self) -> PResult<Stmt> {
    self.expect_word("for")?;
    let is_await = self.eat_word("await");
    self.expect_punct("(")?;

    let mut init = None;
    if !self.at_punct(";") {
      if let Some(kind) = self.var_kind() {
        self.advance();
        let id = self.parse_binding_pattern()?;
        if let Some(stmt) = self.parse_for_in_of(ForHead::Var(kind, id.clone()), is_await)? {
          return Ok(stmt);
        }
        self.no_in = true;
        let decls = self.parse_for_declarators(id);
        self.no_in = false;
        init = Some(ForInit::Var(VarDecl { kind, decls: decls? }));
      } else {
        self.no_in = true;
        let expr = self.parse_expression();
        self.no_in = false;
        let expr = expr?;
        if self.at_word("of") || self.at_word("in") {
          let target = expr_to_pat(expr).map_err(|m| self.error(m))?;
          if let Some(stmt) = self.parse_for_in_of(ForHead::Pat(target), is_await)? {
            return Ok(stmt);
          }
          return Err(self.unexpected());
        }
        init = Some(ForInit::Expr(expr));
      }
    }

    self.expect_punct(";")?;
    let test = if self.at_punct(";") { None } else { Some(self.parse_expression()?) };
    self.expect_punct(";")?;
    let update = if self.at_punct(")") { None } else { Some(self.parse_expression()?) };
    self.expect_punct(")")?;
    let body = Box::new(self.parse_statement()?);
    Ok(Stmt::For { init, test, update, body })
  }

  fn parse_for_declarators(&mut self, first: Pat) -> PResult<Vec<Declarator>> {
    let init = if self.eat_punct("=") { Some(self.parse_assign()?) } else { None };
    let mut decls = vec![Declarator { id: first, init }];
    while self.eat_punct(",") {
      let id = self.parse_binding_pattern()?;
      let init = if self.eat_punct("=") { Some(self.parse_assign()?) } else { None };
      decls.push(Declarator { id, init });
    }
    Ok(decls)
  }

  fn parse_for_in_of(&mut self, head: ForHead, is_await: bool) -> PResult<Option<Stmt>> {
    if self.eat_word("of") {
      let right = self.parse_assign()?;
      self.expect_punct(")")?;
      let body = Box::new(self.parse_statement()?);
      return Ok(Some(Stmt::ForOf { head, right, body, is_await }));
    }
    if self.eat_word("in") {
      let right = self.parse_expression()?;
      self.expect_punct(")")?;
      let body = Box::new(self.parse_statement()?);
      return Ok(Some(Stmt::ForIn { head, right, body }));
    }
    Ok(None)
  }

  fn parse_try(&mut self) -> PResult<Stmt> {
    self.expect_word("try")?;
    let block = self.parse_block()?;
    let handler = if self.eat_word("catch") {
      let param = if self.eat_punct("(") {
        let param = self.parse_binding_pattern()?;
        self.expect_punct(")")?;
        Some(param)
      } else {
        None
      };
      Some(CatchClause { param, body: self.parse_block()? })
    } else {
      None
    };
    let finalizer = if self.eat_word("finally") { Some(self.parse_block()?) } else { None };
    if handler.is_none() && finalizer.is_none() {
      return Err(self.error("expected `catch` or `finally`"));
    }
    Ok(Stmt::Try { block, handler, finalizer })
  }

  fn parse_switch(&mut self) -> PResult<Stmt> {
    self.expect_word("switch")?;
    let discriminant = self.parse_paren_expression()?;
    self.expect_punct("{")?;
    let mut cases = Vec::new();
    while !self.eat_punct("}") {
      let test = if self.eat_word("case") {
        Some(self.parse_expression()?)
      } else {
        self.expect_word("default")?;
        None
      };
      self.expect_punct(":")?;
      let mut body = Vec::new();
      while !self.at_word("case") && !self.at_word("default") && !self.at_punct("}") {
        if self.at_eof() {
          return Err(self.error("expected `}`, found end of input"));
        }
        body.push(self.parse_statement()?);
      }
      cases.push(SwitchCase { test, body });
    }
    Ok(Stmt::Switch { discriminant, cases })
  }

  fn parse_var_decl(&mut self, kind: VarKind) -> PResult<VarDecl> {
    let mut decls = Vec::new();
    loop {
      let id = self.parse_binding_pattern()?;
      let init = if self.eat_punct("=") { Some(self.parse_assign()?) } else { None };
      decls.push(Declarator { id, init });
      if !self.eat_punct(",") {
        break;
      }
    }
    Ok(VarDecl { kind, decls })
  }

  // -- patterns -------------------------------------------------------------

  fn parse_binding_pattern(&mut self) -> PResult<Pat> {
    if self.eat_punct("[") {
      let mut elems = Vec::new();
      while !self.eat_punct("]") {
        if self.eat_punct(",") {
          elems.push(None);
          continue;
        }
        if self.eat_punct("...") {
          elems.push(Some(Pat::Rest(Box::new(self.parse_binding_pattern()?))));
        } else {
          elems.push(Some(self.parse_binding_element()?));
        }
        if !self.at_punct("]") {
          self.expect_punct(",")?;
        }
      }
      return Ok(Pat::Array(elems));
    }

    if self.eat_punct("{") {
      let mut props = Vec::new();
      while !self.eat_punct("}") {
        if self.eat_punct("...") {
          props.push(ObjectPatProp::Rest(Pat::Ident(self.binding_ident()?)));
        } else {
          let key = self.parse_prop_key()?;
          if self.eat_punct(":") {
            let value = self.parse_binding_element()?;
            props.push(ObjectPatProp::KeyValue { key, value, shorthand: false });
          } else {
            let PropKey::Ident(name) = &key else {
              return Err(self.error("expected `:` in object pattern"));
            };
            let mut value = Pat::Ident(name.clone());
            if self.eat_punct("=") {
              value = Pat::Assign(Box::new(value), Box::new(self.parse_assign()?));
            }
            props.push(ObjectPatProp::KeyValue { key, value, shorthand: true });
          }
        }
        if !self.at_punct("}") {
          self.expect_punct(",")?;
        }
      }
      return Ok(Pat::Object(props));
    }

    Ok(Pat::Ident(self.binding_ident()?))
  }

  fn parse_binding_element(&mut self) -> PResult<Pat> {
    let pat = self.parse_binding_pattern()?;
    if self.eat_punct("=") {
      let default = self.with_in(Self::parse_assign)?;
      return Ok(Pat::Assign(Box::new(pat), Box::new(default)));
    }
    Ok(pat)
  }

  fn parse_params(&mut self) -> PResult<Vec<Pat>> {
    self.expect_punct("(")?;
    let mut params = Vec::new();
    while !self.eat_punct(")") {
      if self.eat_punct("...") {
        params.push(Pat::Rest(Box::new(self.parse_binding_pattern()?)));
      } else {
        params.push(self.parse_binding_element()?);
      }
      if !self.at_punct(")") {
        self.expect_punct(",")?;
      }
    }
    Ok(params)
  }

  // -- functions ------------------------------------------------------------

  fn parse_function(&mut self) -> PResult<Function> {
    let is_async = self.eat_word("async");
    self.expect_word("function")?;
    let is_generator = self.eat_punct("*");
    let id = if self.at_punct("(") { None } else { Some(self.binding_ident()?) };
    let params = self.parse_params()?;
    let body = self.parse_function_body()?;
    Ok(Function { id, params, body, is_async, is_generator })
  }

  fn parse_function_body(&mut self) -> PResult<Vec<Stmt>> {
    self.with_in(Self::parse_block)
  }

  /// Returns `Some` when the upcoming tokens form an arrow function.
  fn try_arrow(&mut self) -> PResult<Option<Expr>> {
    let start = self.pos;
    let is_async = self.at_word("async")
      && !self.peek_at(1).newline_before
      && (matches!(self.peek_at(1).kind, TokenKind::Word(_)) || self.punct_at(1, "("));
    if is_async {
      self.advance();
    }

    let params = match &self.peek().kind {
      TokenKind::Word(w) if !RESERVED.contains(&w.as_str()) && self.punct_at(1, "=>") => {
        vec![Pat::Ident(self.binding_ident()?)]
      }
      TokenKind::Punct("(") => match self.parse_params() {
        Ok(params) if self.at_punct("=>") && !self.peek().newline_before => params,
        _ => {
          self.pos = start;
          return Ok(None);
        }
      },
      _ => {
        self.pos = start;
        return Ok(None);
      }
    };

    self.expect_punct("=>")?;
    let body = if self.at_punct("{") {
      ArrowBody::Block(self.parse_function_body()?)
    } else {
      ArrowBody::Expr(Box::new(self.parse_assign()?))
    };
    Ok(Some(Expr::Arrow(Arrow { params, body, is_async })))
  }

  // -- expressions ----------------------------------------------------------

  fn parse_expression(&mut self) -> PResult<Expr> {
    let first = self.parse_assign()?;
    if !self.at_punct(",") {
      return Ok(first);
    }
    let mut exprs = vec![first];
    while self.eat_punct(",") {
      exprs.push(self.parse_assign()?);
    }
    Ok(Expr::Seq(exprs))
  }

  fn parse_assign(&mut self) -> PResult<Expr> {
    if let Some(arrow) = self.try_arrow()? {
      return Ok(arrow);
    }
    if self.at_word("yield") {
      self.advance();
      let delegate = self.eat_punct("*");
      let ends = self.at_punct(")")
        || self.at_punct("]")
        || self.at_punct("}")
        || self.at_punct(",")
        || self.at_punct(";")
        || self.at_punct(":")
        || self.at_eof()
        || self.peek().newline_before;
      let arg = if ends && !delegate { None } else { Some(Box::new(self.parse_assign()?)) };
      return Ok(Expr::Yield { arg, delegate });
    }

    let left = self.parse_conditional()?;
    let Some(op) = assign_op(&self.peek().kind) else {
      return Ok(left);
    };
    let target = if op == "=" {
      expr_to_pat(left).map_err(|m| self.error(m))?
    } else {
      match left {
        Expr::Ident(_) | Expr::Member { .. } => Pat::Expr(Box::new(left)),
        _ => return Err(self.error("invalid assignment target")),
      }
    };
    self.advance();
    let value = self.parse_assign()?;
    Ok(Expr::Assign { op, target: Box::new(target), value: Box::new(value) })
  }

  fn parse_conditional(&mut self) -> PResult<Expr> {
    let test = self.parse_binary(0)?;
    if !self.eat_punct("?") {
      return Ok(test);
    }
    let cons = self.with_in(Self::parse_assign)?;
    self.expect_punct(":")?;
    let alt = self.parse_assign()?;
    Ok(Expr::Cond { test: Box::new(test), cons: Box::new(cons), alt: Box::new(alt) })
  }

  fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
    let mut left = self.parse_unary()?;
    while let Some((op, prec)) = binary_op(&self.peek().kind, self.no_in) {
      if prec <= min_prec {
        break;
      }
      self.advance();
      // `**` is right-associative
      let right = if op == "**" { self.parse_binary(prec - 1)? } else { self.parse_binary(prec)? };
      left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
    }
    Ok(left)
  }

  fn parse_unary(&mut self) -> PResult<Expr> {
    let op: Option<&'static str> = match &self.peek().kind {
      TokenKind::Punct(p @ ("!" | "~" | "+" | "-")) => Some(*p),
      TokenKind::Word(w) => match w.as_str() {
        "typeof" => Some("typeof"),
        "void" => Some("void"),
        "delete" => Some("delete"),
        _ => None,
      },
      _ => None,
    };
    if let Some(op) = op {
      self.advance();
      let arg = self.parse_unary()?;
      return Ok(Expr::Unary { op, arg: Box::new(arg) });
    }
    if self.at_word("await") {
      self.advance();
      return Ok(Expr::Await(Box::new(self.parse_unary()?)));
    }
    if let TokenKind::Punct(op @ ("++" | "--")) = self.peek().kind {
      self.advance();
      let arg = self.parse_unary()?;
      return Ok(Expr::Update { op, prefix: true, arg: Box::new(arg) });
    }

    let expr = self.parse_call_member()?;
    if let TokenKind::Punct(op @ ("++" | "--")) = self.peek().kind {
      if !self.peek().newline_before {
        self.advance();
        return Ok(Expr::Update { op, prefix: false, arg: Box::new(expr) });
      }
    }
    Ok(expr)
  }

  fn parse_call_member(&mut self) -> PResult<Expr> {
    let span = self.peek().span;
    let mut expr = if self.at_word("new") { self.parse_new()? } else { self.parse_primary()? };
    loop {
      if self.eat_punct(".") {
        expr = Expr::Member { object: Box::new(expr), prop: self.parse_member_name()?, optional: false };
      } else if self.eat_punct("?.") {
        if self.at_punct("(") {
          let args = self.parse_arguments()?;
          expr = Expr::Call { callee: Box::new(expr), args, optional: true, span };
        } else if self.eat_punct("[") {
          let prop = self.with_in(Self::parse_expression)?;
          self.expect_punct("]")?;
          expr = Expr::Member {
            object: Box::new(expr),
            prop: MemberProp::Computed(Box::new(prop)),
            optional: true,
          };
        } else {
          expr = Expr::Member { object: Box::new(expr), prop: self.parse_member_name()?, optional: true };
        }
      } else if self.eat_punct("[") {
        let prop = self.with_in(Self::parse_expression)?;
        self.expect_punct("]")?;
        expr = Expr::Member {
          object: Box::new(expr),
          prop: MemberProp::Computed(Box::new(prop)),
          optional: false,
        };
      } else if self.at_punct("(") {
        let args = self.parse_arguments()?;
        expr = Expr::Call { callee: Box::new(expr), args, optional: false, span };
      } else if matches!(self.peek().kind, TokenKind::Template(_)) {
        expr = self.parse_template(Some(Box::new(expr)))?;
      } else {
        return Ok(expr);
      }
    }
  }

  fn parse_member_name(&mut self) -> PResult<MemberProp> {
    if self.eat_punct("#") {
      return Ok(MemberProp::Private(self.name()?));
    }
    Ok(MemberProp::Ident(self.name()?))
  }

  fn parse_new(&mut self) -> PResult<Expr> {
    self.expect_word("new")?;
    if self.eat_punct(".") {
      self.expect_word("target")?;
      return Ok(Expr::Meta("new", "target"));
    }
    let mut callee = if self.at_word("new") { self.parse_new()? } else { self.parse_primary()? };
    loop {
      if self.eat_punct(".") {
        callee =
          Expr::Member { object: Box::new(callee), prop: self.parse_member_name()?, optional: false };
      } else if self.eat_punct("[") {
        let prop = self.with_in(Self::parse_expression)?;
        self.expect_punct("]")?;
        callee = Expr::Member {
          object: Box::new(callee),
          prop: MemberProp::Computed(Box::new(prop)),
          optional: false,
        };
      } else {
        break;
      }
    }
    let args = if self.at_punct("(") { self.parse_arguments()? } else { Vec::new() };
    Ok(Expr::New { callee: Box::new(callee), args })
  }

  fn parse_arguments(&mut self) -> PResult<Vec<Expr>> {
    self.with_in(|p| {
      p.expect_punct("(")?;
      let mut args = Vec::new();
      while !p.eat_punct(")") {
        if p.eat_punct("...") {
          args.push(Expr::Spread(Box::new(p.parse_assign()?)));
        } else {
          args.push(p.parse_assign()?);
        }
        if !p.at_punct(")") {
          p.expect_punct(",")?;
        }
      }
      Ok(args)
    })
  }

  fn parse_primary(&mut self) -> PResult<Expr> {
    let token = self.peek().clone();
    match token.kind {
      TokenKind::Word(ref w) => match w.as_str() {
        "function" => Ok(Expr::Function(self.parse_function()?)),
        "async" if self.at_async_function() => Ok(Expr::Function(self.parse_function()?)),
        "this" => {
          self.advance();
          Ok(Expr::This)
        }
        "null" => {
          self.advance();
          Ok(Expr::Null)
        }
        "true" | "false" => {
          self.advance();
          Ok(Expr::Bool(w == "true"))
        }
        "import" => {
          self.advance();
          if self.eat_punct(".") {
            self.expect_word("meta")?;
            return Ok(Expr::Meta("import", "meta"));
          }
          self.expect_punct("(")?;
          let arg = self.with_in(Self::parse_assign)?;
          self.expect_punct(")")?;
          Ok(Expr::Import(Box::new(arg)))
        }
        "class" => Err(self.error("classes are not supported")),
        w if RESERVED.contains(&w) => Err(self.unexpected()),
        _ => {
          self.advance();
          Ok(Expr::Ident(w.clone()))
        }
      },
      TokenKind::Num(n) => {
        self.advance();
        Ok(Expr::Num(n))
      }
      TokenKind::Str(s) => {
        self.advance();
        Ok(Expr::Str(s))
      }
      TokenKind::Regex(r) => {
        self.advance();
        Ok(Expr::Regex(r))
      }
      TokenKind::Template(_) => self.parse_template(None),
      TokenKind::Punct("(") => {
        self.advance();
        let inner = self.with_in(Self::parse_expression)?;
        self.expect_punct(")")?;
        Ok(Expr::Paren(Box::new(inner)))
      }
      TokenKind::Punct("[") => self.parse_array_literal(),
      TokenKind::Punct("{") => self.parse_object_literal(),
      TokenKind::Punct("<") => Err(self.error("JSX is not supported")),
      _ => Err(self.unexpected()),
    }
  }

  fn parse_template(&mut self, tag: Option<Box<Expr>>) -> PResult<Expr> {
    let token = self.advance();
    let TokenKind::Template(tpl) = token.kind else {
      return Err(SyntaxError { message: "expected template literal".into(), span: token.span });
    };
    let mut exprs = Vec::with_capacity(tpl.exprs.len());
    for (source, span) in &tpl.exprs {
      let expr = parse_expression(source).map_err(|e| SyntaxError {
        message: e.message,
        span: Span {
          line: span.line + e.span.line - 1,
          column: if e.span.line == 1 { span.column + e.span.column - 1 } else { e.span.column },
        },
      })?;
      exprs.push(expr);
    }
    Ok(Expr::Template(Template { tag, quasis: tpl.quasis, exprs }))
  }

  fn parse_array_literal(&mut self) -> PResult<Expr> {
    self.with_in(|p| {
      p.expect_punct("[")?;
      let mut elems = Vec::new();
      while !p.eat_punct("]") {
        if p.eat_punct(",") {
          elems.push(None);
          continue;
        }
        if p.eat_punct("...") {
          elems.push(Some(Expr::Spread(Box::new(p.parse_assign()?))));
        } else {
          elems.push(Some(p.parse_assign()?));
        }
        if !p.at_punct("]") {
          p.expect_punct(",")?;
        }
      }
      Ok(Expr::Array(elems))
    })
  }

  fn parse_object_literal(&mut self) -> PResult<Expr> {
    self.with_in(|p| {
      p.expect_punct("{")?;
      let mut props = Vec::new();
      while !p.eat_punct("}") {
        props.push(p.parse_prop()?);
        if !p.at_punct("}") {
          p.expect_punct(",")?;
        }
      }
      Ok(Expr::Object(props))
    })
  }

  /// True when the word at the cursor is a modifier rather than a key.
  fn at_modifier(&self, word: &str) -> bool {
    self.at_word(word)
      && !self.peek_at(1).newline_before
      && !matches!(
        self.peek_at(1).kind,
        TokenKind::Punct("," | ":" | "(" | "}" | "=")
      )
  }

  fn parse_prop(&mut self) -> PResult<Prop> {
    if self.eat_punct("...") {
      return Ok(Prop::Spread(self.parse_assign()?));
    }

    let mut is_async = false;
    let mut kind = MethodKind::Method;
    if self.at_modifier("async") {
      self.advance();
      is_async = true;
    } else if self.at_modifier("get") {
      self.advance();
      kind = MethodKind::Get;
    } else if self.at_modifier("set") {
      self.advance();
      kind = MethodKind::Set;
    }
    let is_generator = self.eat_punct("*");
    let key = self.parse_prop_key()?;

    if self.at_punct("(") || is_async || is_generator || kind != MethodKind::Method {
      let params = self.parse_params()?;
      let body = self.parse_function_body()?;
      let func = Function { id: None, params, body, is_async, is_generator };
      return Ok(Prop::Method { key, kind, func });
    }
    if self.eat_punct(":") {
      return Ok(Prop::KeyValue(key, self.parse_assign()?));
    }
    let PropKey::Ident(name) = key else {
      return Err(self.error("expected `:` after property key"));
    };
    if self.eat_punct("=") {
      // Cover grammar for `({ a = 1 } = obj)`; only valid as a pattern.
      let default = self.parse_assign()?;
      let value = Expr::Assign {
        op: "=",
        target: Box::new(Pat::Ident(name.clone())),
        value: Box::new(default),
      };
      return Ok(Prop::KeyValue(PropKey::Ident(name), value));
    }
    Ok(Prop::Shorthand(name))
  }

  fn parse_prop_key(&mut self) -> PResult<PropKey> {
    let token = self.advance();
    match token.kind {
      TokenKind::Word(w) => Ok(PropKey::Ident(w)),
      TokenKind::Str(s) => Ok(PropKey::Str(s)),
      TokenKind::Num(n) => Ok(PropKey::Num(n)),
      TokenKind::Punct("[") => {
        let expr = self.with_in(Self::parse_assign)?;
        self.expect_punct("]")?;
        Ok(PropKey::Computed(Box::new(expr)))
      }
      other => Err(SyntaxError {
        message: format!("expected property key, found {}", describe(&other)),
        span: token.span,
      }),
    }
  }
}

/// Reinterprets an expression parsed ahead of `=` or `of` as a pattern.
fn expr_to_pat(expr: Expr) -> Result<Pat, String> {
  match expr {
    Expr::Ident(name) => Ok(Pat::Ident(name)),
    Expr::Member { .. } => Ok(Pat::Expr(Box::new(expr))),
    Expr::Paren(inner) => match *inner {
      e @ (Expr::Ident(_) | Expr::Member { .. }) => expr_to_pat(e),
      _ => Err("invalid assignment target".into()),
    },
    Expr::Assign { op: "=", target, value } => Ok(Pat::Assign(target, value)),
    Expr::Array(elems) => {
      let mut out = Vec::with_capacity(elems.len());
      for elem in elems {
        out.push(match elem {
          None => None,
          Some(Expr::Spread(inner)) => Some(Pat::Rest(Box::new(expr_to_pat(*inner)?))),
          Some(e) => Some(expr_to_pat(e)?),
        });
      }
      Ok(Pat::Array(out))
    }
    Expr::Object(props) => {
      let mut out = Vec::with_capacity(props.len());
      for prop in props {
        out.push(match prop {
          Prop::Shorthand(name) => ObjectPatProp::KeyValue {
            key: PropKey::Ident(name.clone()),
            value: Pat::Ident(name),
            shorthand: true,
          },
          Prop::KeyValue(key, value) => {
            let shorthand = matches!(
              (&key, &value),
              (PropKey::Ident(k), Expr::Assign { op: "=", target, .. })
                if matches!(target.as_ref(), Pat::Ident(t) if t == k)
            );
            ObjectPatProp::KeyValue { key, value: expr_to_pat(value)?, shorthand }
          }
          Prop::Spread(inner) => ObjectPatProp::Rest(expr_to_pat(inner)?),
          Prop::Method { .. } => return Err("invalid destructuring target".into()),
        });
      }
      Ok(Pat::Object(out))
    }
    _ => Err("invalid assignment target".into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn first_stmt(source: &str) -> Stmt {
    parse_module(source).unwrap().body.remove(0)
  }

  #[test]
  fn parse_imports() {
    let module =
      parse_module("import a, { b as c, d } from 'm';\nimport * as ns from \"n\"\nimport 'side'").unwrap();
    assert_eq!(module.body.len(), 3);
    let Stmt::Import(first) = &module.body[0] else { panic!("expected import") };
    assert_eq!(first.source, "m");
    let locals: Vec<_> = first.specifiers.iter().map(ImportSpecifier::local).collect();
    assert_eq!(locals, vec!["a", "c", "d"]);
    let Stmt::Import(side) = &module.body[2] else { panic!("expected import") };
    assert!(side.side_effect_only);
  }

  #[test]
  fn parse_marker_call_with_arrow() {
    let stmt = first_stmt("const load = fetch$(async (id) => db.get(id), { method: 'GET' });");
    let Stmt::Var(decl) = stmt else { panic!("expected var") };
    let Some(Expr::Call { callee, args, .. }) = &decl.decls[0].init else { panic!("expected call") };
    assert_eq!(**callee, Expr::ident("fetch$"));
    assert_eq!(args.len(), 2);
    assert!(matches!(&args[0], Expr::Arrow(a) if a.is_async && a.params.len() == 1));
  }

  #[test]
  fn parse_destructuring_declaration() {
    let stmt = first_stmt("const [a, , { b, c: [d] = [] }, ...rest] = value;");
    let Stmt::Var(decl) = stmt else { panic!("expected var") };
    assert_eq!(decl.decls[0].id.bindings(), vec!["a", "b", "d", "rest"]);
  }

  #[test]
  fn parenthesized_expression_is_not_an_arrow() {
    let stmt = first_stmt("(a, b);");
    assert!(matches!(stmt, Stmt::Expr(Expr::Paren(_))));
  }

  #[test]
  fn binary_precedence() {
    let expr = parse_expression("a + b * c ** d ** e").unwrap();
    let Expr::Binary { op: "+", right, .. } = expr else { panic!("expected +") };
    let Expr::Binary { op: "*", right, .. } = *right else { panic!("expected *") };
    let Expr::Binary { op: "**", right, .. } = *right else { panic!("expected **") };
    assert!(matches!(*right, Expr::Binary { op: "**", .. }));
  }

  #[test]
  fn asi_after_return() {
    let stmt = first_stmt("function f() { return\n1 }");
    let Stmt::Function(f) = stmt else { panic!("expected function") };
    assert_eq!(f.body[0], Stmt::Return(None));
  }

  #[test]
  fn for_in_of_heads() {
    assert!(matches!(first_stmt("for (const x of xs) {}"), Stmt::ForOf { .. }));
    assert!(matches!(first_stmt("for (k in obj) {}"), Stmt::ForIn { .. }));
    assert!(matches!(first_stmt("for (let i = 0; i < n; i++) {}"), Stmt::For { .. }));
  }

  #[test]
  fn object_destructuring_assignment() {
    let stmt = first_stmt("({ a, b = 2 } = obj);");
    let Stmt::Expr(Expr::Paren(inner)) = stmt else { panic!("expected paren") };
    let Expr::Assign { target, .. } = *inner else { panic!("expected assign") };
    assert_eq!(target.bindings(), vec!["a", "b"]);
  }

  #[test]
  fn classes_are_rejected() {
    let err = parse_module("class A {}").unwrap_err();
    assert!(err.message.contains("classes"));
    assert_eq!(err.span, Span { line: 1, column: 1 });
  }

  #[test]
  fn jsx_is_rejected() {
    let err = parse_module("const el = <div />;").unwrap_err();
    assert!(err.message.contains("JSX"));
  }

  #[test]
  fn template_substitution_is_parsed() {
    let expr = parse_expression("`a${b.c}d`").unwrap();
    let Expr::Template(tpl) = expr else { panic!("expected template") };
    assert_eq!(tpl.exprs[0], Expr::member(Expr::ident("b"), "c"));
  }
}
