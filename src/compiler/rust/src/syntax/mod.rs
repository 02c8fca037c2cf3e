/* src/compiler/rust/src/syntax/mod.rs */

pub mod ast;
mod parser;
mod printer;
mod token;

use std::fmt;

pub use parser::{parse_expression, parse_module};
pub use printer::print_module;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
  pub line: usize,
  pub column: usize,
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
  pub message: String,
  pub span: Span,
}

impl fmt::Display for SyntaxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} at {}", self.message, self.span)
  }
}

impl std::error::Error for SyntaxError {}

/// Double-quoted string literal for generated code.
pub fn quote(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

/// Cooked value of a raw string literal; `None` when it is not a plain literal.
pub fn unquote(raw: &str) -> Option<String> {
  let mut chars = raw.chars();
  let quote = chars.next()?;
  if !(quote == '\'' || quote == '"') || !raw.ends_with(quote) || raw.len() < 2 {
    return None;
  }
  let inner = &raw[1..raw.len() - 1];
  let mut out = String::with_capacity(inner.len());
  let mut iter = inner.chars();
  while let Some(c) = iter.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match iter.next()? {
      'n' => out.push('\n'),
      'r' => out.push('\r'),
      't' => out.push('\t'),
      'b' => out.push('\u{8}'),
      'f' => out.push('\u{c}'),
      'v' => out.push('\u{b}'),
      '0' => out.push('\0'),
      '\n' => {}
      other => out.push(other),
    }
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quote_escapes_control_characters() {
    assert_eq!(quote("a\"b\\c\n"), r#""a\"b\\c\n""#);
  }

  #[test]
  fn unquote_handles_both_quote_styles() {
    assert_eq!(unquote("'it\\'s'").as_deref(), Some("it's"));
    assert_eq!(unquote("\"x\\ny\"").as_deref(), Some("x\ny"));
    assert_eq!(unquote("plain"), None);
  }
}
