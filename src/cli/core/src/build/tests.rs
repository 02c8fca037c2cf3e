/* src/cli/core/src/build/tests.rs */

use std::path::Path;

use sever_compiler::BoundaryKind;

use super::*;

const PAGE: &str = r#"import { fetch$, split$ } from "sever";
import { db } from "./db.server$";

export const loadUser = fetch$(async (id) => db.user(id));

export const chart = split$((data) => data.length);
"#;

const DB: &str = "export const db = { user: (id) => ({ id }) };\n";

fn project(minify: bool) -> (tempfile::TempDir, SeverConfig) {
  let tmp = tempfile::tempdir().unwrap();
  let src = tmp.path().join("src/app");
  std::fs::create_dir_all(&src).unwrap();
  std::fs::write(src.join("page.js"), PAGE).unwrap();
  std::fs::write(src.join("db.server$.js"), DB).unwrap();
  std::fs::write(src.join("notes.md"), "not a module").unwrap();
  std::fs::create_dir_all(tmp.path().join("src/node_modules/x")).unwrap();
  std::fs::write(tmp.path().join("src/node_modules/x/index.js"), "fetch$()").unwrap();

  let config: SeverConfig = toml::from_str(&format!(
    "[project]\nname = \"demo\"\n[build]\nminify = {minify}\n"
  ))
  .unwrap();
  (tmp, config)
}

fn read(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap()
}

#[test]
fn sources_skip_dependencies_and_foreign_files() {
  let (tmp, config) = project(false);
  let files = collect_sources(&config, tmp.path()).unwrap();
  let names: Vec<String> = files.iter().map(|f| relative_path(tmp.path(), f)).collect();
  assert_eq!(names, vec!["src/app/db.server$.js", "src/app/page.js"]);
}

#[test]
fn build_writes_both_targets_and_manifests() {
  let (tmp, config) = project(false);
  let report = run_build(&config, tmp.path()).unwrap();
  assert_eq!(report.modules, 2);
  assert_eq!(report.transformed, 1);
  assert_eq!(report.routes, 2);
  assert_eq!(report.splits, 1);

  let out = tmp.path().join(".sever/output");
  let client = read(&out.join("client/src/app/page.js"));
  let server = read(&out.join("server/src/app/page.js"));
  assert!(client.contains("fetch$.createFetcher(\"/_m/src/app/page/0/loadUser\""));
  assert!(!client.contains("db.user"));
  assert!(server.contains("fetch$.registerHandler(\"/_m/src/app/page/0/loadUser\""));
  assert!(server.contains("from \"sever/server\""));

  let stub = read(&out.join("client/src/app/db.server$.js"));
  assert_eq!(stub, "export const db = undefined;\n");

  let split = read(&out.join("client/_split/src/app/page/0/chart.js"));
  assert!(split.contains("export default (data) => data.length"));

  let manifest = BuildManifest::read(&out.join(ROUTES_FILE)).unwrap();
  assert_eq!(manifest.project, "demo");
  assert!(manifest.expose_error_stacks);
  let kinds: Vec<BoundaryKind> = manifest.routes.iter().map(|r| r.kind).collect();
  assert_eq!(kinds, vec![BoundaryKind::Fetch, BoundaryKind::Split]);
  assert!(manifest.routes.iter().all(|r| r.module == "src/app/page.js"));

  let splits: serde_json::Value = serde_json::from_str(&read(&out.join(SPLIT_MANIFEST_FILE))).unwrap();
  assert_eq!(
    splits["client"]["virtual:sever-split:/_m/src/app/page/0/chart"],
    "_split/src/app/page/0/chart.js"
  );
}

#[test]
fn minified_routes_are_stable_digests() {
  let (tmp, config) = project(true);
  let first = list_routes(&config, tmp.path()).unwrap();
  let second = list_routes(&config, tmp.path()).unwrap();
  assert_eq!(first, second);
  assert_eq!(first.len(), 2);
  for (_, entry) in &first {
    let slug = entry.route.trim_start_matches("/_m/").split('/').next().unwrap();
    assert_eq!(slug.len(), 10);
    assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
  }
}

#[test]
fn compile_errors_abort_the_build() {
  let (tmp, config) = project(false);
  std::fs::write(tmp.path().join("src/app/bad.js"), "export const x = fetch$(42);\n").unwrap();
  let err = run_build(&config, tmp.path()).unwrap_err();
  assert!(err.to_string().contains("src/app/bad.js"));
}

#[test]
fn typed_sources_are_left_out_by_default() {
  let (tmp, config) = project(false);
  let typed = "import { fetch$ } from \"sever\";\nexport const f = fetch$(async (id: string): Promise<number> => 1);\n";
  std::fs::write(tmp.path().join("src/app/typed.ts"), typed).unwrap();
  std::fs::write(tmp.path().join("src/app/view.tsx"), "export const v = <div />;\n").unwrap();
  let report = run_build(&config, tmp.path()).unwrap();
  assert_eq!(report.modules, 2);
  assert!(!tmp.path().join(".sever/output/client/src/app/typed.ts").exists());
}

#[test]
fn split_files_mirror_route_paths() {
  assert_eq!(split_file_name("virtual:sever-split:/_m/a1b2c3d4e5/render"), "_split/a1b2c3d4e5/render.js");
}
