/* src/cli/core/src/config/tests/mod.rs */

use std::path::Path;

use sever_compiler::Target;

use super::*;

#[test]
fn parse_minimal_config() {
  let config: SeverConfig = toml::from_str(
    r#"
[project]
name = "my-app"
"#,
  )
  .unwrap();
  assert_eq!(config.project.name, "my-app");
  assert_eq!(config.build.root, ".");
  assert_eq!(config.build.src_dir, "src");
  assert_eq!(config.build.out_dir, ".sever/output");
  assert_eq!(config.build.runtime_module, "sever");
  assert!(!config.build.minify);
  assert!(config.build.keep_imports.is_empty());
  assert!(config.expose_error_stacks());
  assert!(config.accepts_extension(Path::new("a/b.mjs")));
  assert!(!config.accepts_extension(Path::new("a/b.ts")));
  assert!(!config.accepts_extension(Path::new("a/b.jsx")));
}

#[test]
fn parse_full_config() {
  let config: SeverConfig = toml::from_str(
    r#"
[project]
name = "full-app"

[build]
root = "web"
src_dir = "app"
out_dir = "dist"
minify = true
runtime_module = "@acme/sever"
server_runtime_module = "@acme/sever/node"
keep_imports = ["./instrument"]
extensions = ["ts"]

[server]
expose_error_stacks = true
"#,
  )
  .unwrap();
  assert_eq!(config.build.root, "web");
  assert!(config.build.minify);
  assert!(config.expose_error_stacks());

  let opts = config.compile_options("app/page.ts", Target::Server);
  assert_eq!(opts.server_runtime_module(), "@acme/sever/node");
  assert_eq!(opts.keep_imports, vec!["./instrument".to_string()]);
  assert!(opts.minify);

  assert_eq!(config.src_dir(Path::new("/p")), Path::new("/p/web/app"));
  assert!(config.accepts_extension(Path::new("a/b.ts")));
  assert!(!config.accepts_extension(Path::new("a/b.tsx")));
}

#[test]
fn minified_builds_hide_stacks_by_default() {
  let config: SeverConfig =
    toml::from_str("[project]\nname = \"x\"\n[build]\nminify = true\n").unwrap();
  assert!(!config.expose_error_stacks());
}

#[test]
fn config_is_found_walking_upward() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(tmp.path().join(CONFIG_FILE), "[project]\nname = \"walk\"\n").unwrap();
  let nested = tmp.path().join("src/app/deep");
  std::fs::create_dir_all(&nested).unwrap();

  let found = find_sever_config(&nested).unwrap();
  assert_eq!(found, tmp.path().canonicalize().unwrap().join(CONFIG_FILE));
  assert_eq!(load_sever_config(&found).unwrap().project.name, "walk");
}

#[test]
fn missing_config_is_an_error() {
  let tmp = tempfile::tempdir().unwrap();
  match find_sever_config(tmp.path()) {
    Err(err) => assert!(err.to_string().contains("sever.toml not found")),
    Ok(found) => assert!(!found.starts_with(tmp.path().canonicalize().unwrap())),
  }
}

#[test]
fn empty_extensions_are_rejected() {
  let tmp = tempfile::tempdir().unwrap();
  let path = tmp.path().join(CONFIG_FILE);
  std::fs::write(&path, "[project]\nname = \"x\"\n[build]\nextensions = []\n").unwrap();
  let err = load_sever_config(&path).unwrap_err();
  assert!(err.to_string().contains("build.extensions"));
}
