/* src/compiler/rust/src/syntax/token.rs */

use super::{Span, SyntaxError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
  /// Identifiers and keywords alike; the parser decides by context.
  Word(String),
  Num(String),
  /// Raw string literal, quotes included.
  Str(String),
  Template(TemplateToken),
  Regex(String),
  Punct(&'static str),
  Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TemplateToken {
  pub quasis: Vec<String>,
  pub exprs: Vec<(String, Span)>,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
  pub kind: TokenKind,
  pub span: Span,
  pub newline_before: bool,
}

// Longest first: the lexer takes the first match.
const PUNCTUATORS: &[&str] = &[
  ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=",
  "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
  "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
  "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

const REGEX_PREFIX_WORDS: &[&str] = &[
  "return",
  "typeof",
  "instanceof",
  "in",
  "of",
  "new",
  "delete",
  "void",
  "throw",
  "case",
  "do",
  "else",
  "yield",
  "await",
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
  Lexer::new(source).run()
}

pub(crate) fn is_ident_start(c: char) -> bool {
  c == '$' || c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_part(c: char) -> bool {
  is_ident_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

const HEADER_WORDS: &[&str] = &["if", "while", "for", "with"];

/// A `/` starts a regex literal unless the previous token ends an operand.
/// `closes_header` is set when the previous `)` ends an `if`/`while`/`for`/
/// `with` head, where a statement (and so a regex) may follow.
fn regex_allowed(prev: Option<&Token>, closes_header: bool) -> bool {
  match prev.map(|t| &t.kind) {
    None => true,
    Some(TokenKind::Punct(")")) => closes_header,
    Some(TokenKind::Punct(p)) => !matches!(*p, "]" | "++" | "--"),
    Some(TokenKind::Word(w)) => REGEX_PREFIX_WORDS.contains(&w.as_str()),
    Some(_) => false,
  }
}

fn is_word(token: Option<&Token>, words: &[&str]) -> bool {
  matches!(token.map(|t| &t.kind), Some(TokenKind::Word(w)) if words.contains(&w.as_str()))
}

/// Whether a `(` about to be pushed opens a statement head.
fn opens_header(tokens: &[Token]) -> bool {
  let n = tokens.len();
  let last = n.checked_sub(1).and_then(|i| tokens.get(i));
  if is_word(last, HEADER_WORDS) {
    return true;
  }
  // `for await (...)`
  is_word(last, &["await"]) && is_word(n.checked_sub(2).and_then(|i| tokens.get(i)), &["for"])
}

struct Lexer {
  chars: Vec<char>,
  pos: usize,
  line: usize,
  column: usize,
}

impl Lexer {
  fn new(source: &str) -> Self {
    Self { chars: source.chars().collect(), pos: 0, line: 1, column: 1 }
  }

  fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens: Vec<Token> = Vec::new();
    // One entry per open `(`: whether it opened a statement head.
    let mut parens: Vec<bool> = Vec::new();
    let mut closes_header = false;
    self.skip_hashbang();
    loop {
      let newline_before = self.skip_trivia()?;
      let span = self.span();
      let Some(c) = self.peek() else {
        tokens.push(Token { kind: TokenKind::Eof, span, newline_before });
        break;
      };
      let kind = if is_ident_start(c) || c == '\\' {
        TokenKind::Word(self.read_word())
      } else if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
      {
        TokenKind::Num(self.read_number())
      } else if c == '\'' || c == '"' {
        TokenKind::Str(self.read_string(c)?)
      } else if c == '`' {
        TokenKind::Template(self.read_template()?)
      } else if c == '/' && regex_allowed(tokens.last(), closes_header) {
        TokenKind::Regex(self.read_regex()?)
      } else {
        TokenKind::Punct(self.read_punct()?)
      };
      closes_header = false;
      match kind {
        TokenKind::Punct("(") => parens.push(opens_header(&tokens)),
        TokenKind::Punct(")") => closes_header = parens.pop().unwrap_or(false),
        _ => {}
      }
      tokens.push(Token { kind, span, newline_before });
    }
    Ok(tokens)
  }

  fn span(&self) -> Span {
    Span { line: self.line, column: self.column }
  }

  fn error(&self, message: impl Into<String>) -> SyntaxError {
    SyntaxError { message: message.into(), span: self.span() }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.chars.get(self.pos + offset).copied()
  }

  fn advance(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    if c == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }

  fn slice(&self, start: usize) -> String {
    self.chars[start..self.pos].iter().collect()
  }

  fn skip_hashbang(&mut self) {
    if self.peek() == Some('#') && self.peek_at(1) == Some('!') {
      while let Some(c) = self.peek() {
        if c == '\n' {
          break;
        }
        self.advance();
      }
    }
  }

  /// Skips whitespace and comments; reports whether a line break was crossed.
  fn skip_trivia(&mut self) -> Result<bool, SyntaxError> {
    let mut newline = false;
    loop {
      match self.peek() {
        Some(c) if c == '\n' || c == '\u{2028}' || c == '\u{2029}' => {
          newline = true;
          self.advance();
        }
        Some(c) if c.is_whitespace() || c == '\u{feff}' => {
          self.advance();
        }
        Some('/') if self.peek_at(1) == Some('/') => {
          while let Some(c) = self.peek() {
            if c == '\n' {
              break;
            }
            self.advance();
          }
        }
        Some('/') if self.peek_at(1) == Some('*') => {
          let start = self.span();
          self.advance();
          self.advance();
          loop {
            match self.advance() {
              Some('*') if self.peek() == Some('/') => {
                self.advance();
                break;
              }
              Some('\n') => newline = true,
              Some(_) => {}
              None => {
                return Err(SyntaxError { message: "unterminated comment".into(), span: start });
              }
            }
          }
        }
        _ => return Ok(newline),
      }
    }
  }

  fn read_word(&mut self) -> String {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if is_ident_part(c) || c == '\\' {
        self.advance();
      } else {
        break;
      }
    }
    self.slice(start)
  }

  fn read_number(&mut self) -> String {
    let start = self.pos;
    let radix_prefix = self.peek() == Some('0')
      && self.peek_at(1).is_some_and(|c| matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B'));
    if radix_prefix {
      self.advance();
      self.advance();
      while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
        self.advance();
      }
    } else {
      while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
        self.advance();
      }
      if self.peek() == Some('.') {
        self.advance();
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
          self.advance();
        }
      }
      if matches!(self.peek(), Some('e' | 'E')) {
        self.advance();
        if matches!(self.peek(), Some('+' | '-')) {
          self.advance();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
          self.advance();
        }
      }
    }
    if self.peek() == Some('n') {
      self.advance();
    }
    self.slice(start)
  }

  fn read_string(&mut self, quote: char) -> Result<String, SyntaxError> {
    let start = self.pos;
    let start_span = self.span();
    self.advance();
    loop {
      match self.advance() {
        Some(c) if c == quote => break,
        Some('\\') => {
          self.advance();
        }
        Some('\n') | None => {
          return Err(SyntaxError { message: "unterminated string literal".into(), span: start_span });
        }
        Some(_) => {}
      }
    }
    Ok(self.slice(start))
  }

  fn read_template(&mut self) -> Result<TemplateToken, SyntaxError> {
    let start_span = self.span();
    self.advance();
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut quasi = String::new();
    loop {
      match self.peek() {
        None => {
          return Err(SyntaxError {
            message: "unterminated template literal".into(),
            span: start_span,
          });
        }
        Some('`') => {
          self.advance();
          quasis.push(quasi);
          break;
        }
        Some('\\') => {
          quasi.push('\\');
          self.advance();
          if let Some(c) = self.advance() {
            quasi.push(c);
          }
        }
        Some('$') if self.peek_at(1) == Some('{') => {
          self.advance();
          self.advance();
          quasis.push(std::mem::take(&mut quasi));
          exprs.push(self.read_substitution()?);
        }
        Some(c) => {
          quasi.push(c);
          self.advance();
        }
      }
    }
    Ok(TemplateToken { quasis, exprs })
  }

  /// Reads the source of a `${ ... }` substitution, consuming the closing brace.
  fn read_substitution(&mut self) -> Result<(String, Span), SyntaxError> {
    let span = self.span();
    let start = self.pos;
    let mut depth = 1usize;
    loop {
      match self.peek() {
        None => return Err(SyntaxError { message: "unterminated template substitution".into(), span }),
        Some('{') => {
          depth += 1;
          self.advance();
        }
        Some('}') => {
          depth -= 1;
          if depth == 0 {
            let source = self.slice(start);
            self.advance();
            return Ok((source, span));
          }
          self.advance();
        }
        Some(q @ ('\'' | '"')) => {
          self.read_string(q)?;
        }
        Some('`') => {
          self.read_template()?;
        }
        Some('/') if matches!(self.peek_at(1), Some('/' | '*')) => {
          self.skip_trivia()?;
        }
        Some(_) => {
          self.advance();
        }
      }
    }
  }

  fn read_regex(&mut self) -> Result<String, SyntaxError> {
    let start = self.pos;
    let start_span = self.span();
    self.advance();
    let mut in_class = false;
    loop {
      match self.advance() {
        Some('\\') => {
          self.advance();
        }
        Some('[') => in_class = true,
        Some(']') => in_class = false,
        Some('/') if !in_class => break,
        Some('\n') | None => {
          return Err(SyntaxError { message: "unterminated regular expression".into(), span: start_span });
        }
        Some(_) => {}
      }
    }
    while self.peek().is_some_and(is_ident_part) {
      self.advance();
    }
    Ok(self.slice(start))
  }

  fn read_punct(&mut self) -> Result<&'static str, SyntaxError> {
    for &p in PUNCTUATORS {
      let matches = p.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c));
      if !matches {
        continue;
      }
      // `a?.5:b` is a conditional, not optional chaining
      if p == "?." && self.peek_at(2).is_some_and(|c| c.is_ascii_digit()) {
        continue;
      }
      for _ in 0..p.len() {
        self.advance();
      }
      return Ok(p);
    }
    Err(self.error(format!("unexpected character {:?}", self.peek().unwrap_or('\0'))))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn tokenize_empty_source() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
  }

  #[test]
  fn tokenize_marker_call() {
    let tokens = kinds("fetch$(() => 1)");
    assert_eq!(tokens[0], TokenKind::Word("fetch$".into()));
    assert_eq!(tokens[1], TokenKind::Punct("("));
    assert_eq!(tokens[4], TokenKind::Punct("=>"));
    assert_eq!(tokens[5], TokenKind::Num("1".into()));
  }

  #[test]
  fn tokenize_longest_punctuator() {
    let tokens = kinds("a >>>= b ?? c");
    assert_eq!(tokens[1], TokenKind::Punct(">>>="));
    assert_eq!(tokens[3], TokenKind::Punct("??"));
  }

  #[test]
  fn optional_chain_before_digit_is_conditional() {
    let tokens = kinds("a?.5:b");
    assert_eq!(tokens[1], TokenKind::Punct("?"));
    assert_eq!(tokens[2], TokenKind::Num(".5".into()));
  }

  #[test]
  fn strings_keep_their_quotes() {
    let tokens = kinds(r#"'it\'s' "x""#);
    assert_eq!(tokens[0], TokenKind::Str(r"'it\'s'".into()));
    assert_eq!(tokens[1], TokenKind::Str(r#""x""#.into()));
  }

  #[test]
  fn regex_versus_division() {
    let tokens = kinds("x = a / b; y = /ab+c/gi");
    assert_eq!(tokens[3], TokenKind::Punct("/"));
    assert_eq!(tokens[8], TokenKind::Regex("/ab+c/gi".into()));

    let tokens = kinds("if (x) /re/g.test(s); (a) / b; while (f(y)) /z/.exec(w)");
    assert_eq!(tokens[4], TokenKind::Regex("/re/g".into()));
    assert_eq!(tokens[14], TokenKind::Punct("/"));
    assert_eq!(tokens[24], TokenKind::Regex("/z/".into()));
  }

  #[test]
  fn template_substitutions_are_captured() {
    let tokens = kinds("`a${b + `c${d}`}e`");
    let TokenKind::Template(tpl) = &tokens[0] else { panic!("expected template") };
    assert_eq!(tpl.quasis, vec!["a".to_string(), "e".to_string()]);
    assert_eq!(tpl.exprs[0].0, "b + `c${d}`");
  }

  #[test]
  fn newline_flag_tracks_line_breaks() {
    let tokens = tokenize("a\n/* x\n */ b c").unwrap();
    assert!(!tokens[0].newline_before);
    assert!(tokens[1].newline_before);
    assert!(!tokens[2].newline_before);
    assert_eq!(tokens[1].span, Span { line: 3, column: 5 });
  }

  #[test]
  fn unterminated_string_reports_position() {
    let err = tokenize("const a = 'oops\n").unwrap_err();
    assert_eq!(err.span, Span { line: 1, column: 11 });
  }
}
