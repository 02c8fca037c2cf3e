/* src/compiler/rust/src/route.rs */

// Route identities shared by client and server builds of the same module.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Every boundary route lives under this prefix.
pub const ROUTE_PREFIX: &str = "/_m";

/// Name segment used when no enclosing declaration supplies one.
pub const FALLBACK_NAME: &str = "fn";

const DIGEST_BYTES: usize = 5;

/// Strips query strings, normalizes separators and drops a leading `./` or `/`.
pub fn normalize_module_id(id: &str) -> String {
  let without_query = id.split(['?', '#']).next().unwrap_or(id);
  let mut normalized = without_query.replace('\\', "/");
  while let Some(rest) = normalized.strip_prefix("./") {
    normalized = rest.to_string();
  }
  normalized.trim_start_matches('/').to_string()
}

/// Module path without its final extension: `app/root.tsx` -> `app/root`.
fn strip_extension(path: &str) -> &str {
  let file_start = path.rfind('/').map_or(0, |i| i + 1);
  match path[file_start..].rfind('.') {
    Some(dot) if dot > 0 => &path[..file_start + dot],
    _ => path,
  }
}

/// Development slug: `<path without extension>/<ordinal>`.
pub fn readable_slug(path: &str, ordinal: usize) -> String {
  format!("{}/{ordinal}", strip_extension(&normalize_module_id(path)))
}

/// 10 hex characters of SHA-256 over the readable slug.
pub fn digest_slug(path: &str, ordinal: usize) -> String {
  let mut hasher = Sha256::new();
  hasher.update(readable_slug(path, ordinal).as_bytes());
  let result = hasher.finalize();
  hex::encode(&result[..DIGEST_BYTES])
}

pub fn synthesize(path: &str, ordinal: usize, minify: bool) -> String {
  if minify { digest_slug(path, ordinal) } else { readable_slug(path, ordinal) }
}

/// A fully resolved boundary route: `<prefix>/<slug>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteIdentity {
  pub slug: String,
  pub name: String,
}

impl RouteIdentity {
  pub fn new(path: &str, ordinal: usize, minify: bool, name: Option<&str>) -> Self {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(FALLBACK_NAME);
    Self { slug: synthesize(path, ordinal, minify), name: name.to_string() }
  }

  pub fn path(&self) -> String {
    format!("{ROUTE_PREFIX}/{}/{}", self.slug, self.name)
  }
}

impl std::fmt::Display for RouteIdentity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.path())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn readable_route_matches_module_layout() {
    let route = RouteIdentity::new("app/root.tsx", 0, false, None);
    assert_eq!(route.path(), "/_m/app/root/0/fn");
    let named = RouteIdentity::new("app/root.tsx", 1, false, Some("loadUser"));
    assert_eq!(named.path(), "/_m/app/root/1/loadUser");
  }

  #[test]
  fn digest_slug_is_ten_hex_chars() {
    let slug = digest_slug("app/root.tsx", 0);
    assert_eq!(slug.len(), 10);
    assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn digest_is_stable_and_ordinal_sensitive() {
    assert_eq!(digest_slug("app/root.tsx", 0), digest_slug("app/root.tsx", 0));
    assert_ne!(digest_slug("app/root.tsx", 0), digest_slug("app/root.tsx", 1));
  }

  #[test]
  fn windows_separators_normalize() {
    assert_eq!(readable_slug("app\\routes\\index.ts", 2), "app/routes/index/2");
    assert_eq!(digest_slug("app\\root.tsx", 0), digest_slug("app/root.tsx", 0));
  }

  #[test]
  fn normalize_strips_query_and_leading_dot() {
    assert_eq!(normalize_module_id("./src/a.ts?v=123"), "src/a.ts");
    assert_eq!(normalize_module_id("/src/a.ts"), "src/a.ts");
  }

  #[test]
  fn dotfiles_keep_their_name() {
    assert_eq!(readable_slug(".env", 0), ".env/0");
    assert_eq!(readable_slug("lib/noext", 0), "lib/noext/0");
  }
}
