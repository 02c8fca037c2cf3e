/* src/compiler/rust/src/errors.rs */

use thiserror::Error;

use crate::syntax::{Span, SyntaxError};

/// Fatal compile errors; no partial output is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
  #[error("{path}:{span}: {message}")]
  Syntax { path: String, span: Span, message: String },

  #[error("{path}:{span}: unsupported boundary marker `{marker}`")]
  UnsupportedMarker { path: String, span: Span, marker: String },

  #[error("{path}:{span}: `{marker}` expects {expected}")]
  InvalidPayload { path: String, span: Span, marker: String, expected: &'static str },

  #[error(
    "{path}:{span}: split function captures `{name}` from its enclosing scope; \
     move it inside the function or import it at module level"
  )]
  ClosureCapture { path: String, span: Span, name: String },

  #[error("{path}: `export * from '{module}'` cannot be stubbed for client builds")]
  UnsupportedExport { path: String, module: String },
}

impl CompileError {
  pub(crate) fn syntax(path: &str, err: SyntaxError) -> Self {
    Self::Syntax { path: path.to_string(), span: err.span, message: err.message }
  }

  pub fn path(&self) -> &str {
    match self {
      Self::Syntax { path, .. }
      | Self::UnsupportedMarker { path, .. }
      | Self::InvalidPayload { path, .. }
      | Self::ClosureCapture { path, .. }
      | Self::UnsupportedExport { path, .. } => path,
    }
  }
}
