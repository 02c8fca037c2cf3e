/* src/compiler/rust/src/tests/boundaries.rs */

use super::*;

const ROOT: &str = "import { fetch$ } from 'sever';\nexport default fetch$(async () => 1);\nregister(fetch$(() => 2));\n";

// -- route identity --

#[test]
fn unnamed_fetch_routes_follow_document_order() {
  let out = client("app/root.tsx", ROOT);
  assert_eq!(route_paths(&out), ["/_m/app/root/0/fn", "/_m/app/root/1/fn"]);
  assert!(out.routes.iter().all(|r| r.kind == BoundaryKind::Fetch));
}

#[test]
fn client_and_server_agree_on_routes() {
  let source = "import { fetch$ } from 'sever';\nexport const loadUser = fetch$(async (id) => db.user(id));\nconst api = { save: fetch$((u) => db.save(u)) };\nfunction wrap() { return fetch$(() => 3); }\n";
  for minify in [false, true] {
    let c = compile(source, &CompileOptions::new("app/users.ts", Target::Client).minify(minify)).unwrap();
    let s = compile(source, &CompileOptions::new("app/users.ts", Target::Server).minify(minify)).unwrap();
    assert_eq!(c.routes, s.routes);
  }
  let names: Vec<_> = client("app/users.ts", source).routes.into_iter().map(|r| r.name).collect();
  assert_eq!(names, ["loadUser", "save", "wrap"]);
}

#[test]
fn minified_routes_use_digest_slugs() {
  let opts = CompileOptions::new("app/root.tsx", Target::Client).minify(true);
  let first = compile(ROOT, &opts).unwrap();
  let second = compile(ROOT, &opts).unwrap();
  assert_eq!(first.routes, second.routes);

  for entry in &first.routes {
    let slug = entry.route.strip_prefix("/_m/").and_then(|r| r.strip_suffix("/fn")).unwrap();
    assert_eq!(slug.len(), 10);
    assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
  }
  assert_ne!(first.routes[0].route, first.routes[1].route);
}

#[test]
fn array_destructuring_names_the_route() {
  let source = "import { fetch$ } from 'sever';\nconst [load] = [fetch$(() => 1)];\n";
  assert_eq!(route_paths(&client("a.js", source)), ["/_m/a/0/load"]);
}

// -- fetch$ --

#[test]
fn server_build_registers_a_handler() {
  let source = "import { fetch$ } from 'sever';\nexport const hello = fetch$(async (name) => `hi ${name}`);\n";
  let out = server("app/hello.js", source);
  assert_eq!(
    out.code,
    "import { fetch$ } from \"sever/server\";\nconst $$fetch0 = fetch$.createHandler(async function $$fetchHandler0(name) {\n  const $$ctx = this;\n  return `hi ${name}`;\n}, \"/_m/app/hello/0/hello\", undefined);\nfetch$.registerHandler(\"/_m/app/hello/0/hello\", $$fetch0);\nexport const hello = $$fetch0;\n"
  );
}

#[test]
fn client_build_swaps_body_for_fetcher() {
  let source = "import { fetch$ } from 'sever';\nimport { db } from './db.server$.js';\nexport const getUser = fetch$(async (id) => db.find(id), { method: 'GET' });\n";
  let out = client("app/user.js", source);
  assert_eq!(
    out.code,
    "import { fetch$ } from \"sever\";\nconst $$fetch0 = fetch$.createFetcher(\"/_m/app/user/0/getUser\", { method: 'GET' });\nexport const getUser = $$fetch0;\n"
  );
}

#[test]
fn marker_member_access_becomes_request_context() {
  let source = "import { fetch$ } from 'sever';\nexport const whoami = fetch$(() => fetch$.request.headers.get('cookie'));\n";
  let out = server("app/me.js", source);
  assert!(out.code.contains("return $$ctx.request.headers.get('cookie');"));
  assert!(!out.code.contains("fetch$.request"));
}

#[test]
fn named_payload_can_call_itself() {
  let source = "import { fetch$ } from 'sever';\nexport const load = fetch$(async function load(n) { return n > 0 ? load(n - 1) : 0; });\n";
  let out = server("app/count.js", source);
  assert!(out.code.contains(
    "async function $$fetchHandler0(n) {\n  const $$ctx = this;\n  const load = $$fetchHandler0;\n  return n > 0 ? load(n - 1) : 0;\n}"
  ));
}

#[test]
fn parameter_shadowing_the_payload_name_needs_no_rebinding() {
  let source = "import { fetch$ } from 'sever';\nexport const f = fetch$(function f(f) { return f; });\n";
  let out = server("app/f.js", source);
  assert!(out.code.contains("async function $$fetchHandler0(f) {\n  const $$ctx = this;\n  return f;\n}"));
}

#[test]
fn generator_payloads_stay_generators() {
  let source = "import { fetch$ } from 'sever';\nexport const ticks = fetch$(async function* () { yield 1; });\nexport const sync = fetch$(function* () { yield 2; });\n";
  let out = server("app/gen.js", source);
  assert!(out.code.contains("async function* $$fetchHandler0() {"));
  assert!(out.code.contains("function* $$fetchHandler1() {"));
  assert!(!out.code.contains("async function* $$fetchHandler1"));
}

#[test]
fn renamed_marker_import_is_recognized() {
  let source = "import { fetch$ as rpc } from 'sever';\nexport const ping = rpc(() => 'pong');\n";
  let out = client("ping.js", source);
  assert!(out.code.contains("rpc.createFetcher(\"/_m/ping/0/ping\", undefined)"));
}

#[test]
fn shadowed_marker_is_left_alone() {
  let source = "import { fetch$ } from 'sever';\nfunction local(fetch$) { return fetch$(() => 1); }\nexport const a = fetch$(() => 2);\n";
  let out = client("a.js", source);
  assert_eq!(route_paths(&out), ["/_m/a/0/a"]);
  assert!(out.code.contains("return fetch$(() => 1);"));
}

#[test]
fn fetch_payload_must_be_a_function() {
  let err = compile("import { fetch$ } from 'sever';\nfetch$(42);\n", &CompileOptions::new("a.js", Target::Client))
    .unwrap_err();
  assert!(matches!(err, CompileError::InvalidPayload { ref marker, .. } if marker == "fetch$"));
}

#[test]
fn unknown_runtime_marker_is_rejected() {
  let source = "import { fetch$, cache$ } from 'sever';\nexport const x = cache$(() => 1);\n";
  let err = compile(source, &CompileOptions::new("a.js", Target::Server)).unwrap_err();
  match err {
    CompileError::UnsupportedMarker { marker, span, .. } => {
      assert_eq!(marker, "cache$");
      assert_eq!(span.line, 2);
    }
    other => panic!("unexpected error: {other}"),
  }
}

// -- secret$ --

#[test]
fn secrets_never_reach_the_client() {
  let source = "import { fetch$, secret$ } from 'sever';\nconst apiKey = secret$('sk-live-123');\nexport const charge = fetch$(async (amount) => pay(apiKey, amount));\n";
  let c = client("app/pay.js", source);
  assert!(!c.code.contains("sk-live-123"));
  assert!(!c.code.contains("apiKey"));
  assert!(!c.code.contains("secret$"));

  let s = server("app/pay.js", source);
  assert!(s.code.contains("const apiKey = 'sk-live-123';"));
  assert!(s.code.contains("return pay(apiKey, amount);"));
}

#[test]
fn secret_without_value_is_invalid() {
  let err = compile("import { secret$ } from 'sever';\nconst k = secret$();\n", &CompileOptions::new("a.js", Target::Server))
    .unwrap_err();
  assert!(matches!(err, CompileError::InvalidPayload { expected: "a value", .. }));
}

// -- sweep --

#[test]
fn recompiling_output_removes_nothing_more() {
  let source = "import { fetch$ } from 'sever';\nimport { db } from './db';\nimport './polyfill';\nconst helper = (x) => db.get(x);\nconst keep = 1;\nexport const load = fetch$((x) => helper(x));\n";
  let once = client("app/load.js", source);
  assert!(once.code.contains("import \"./polyfill\";"));
  assert!(once.code.contains("const keep = 1;"));
  assert!(!once.code.contains("helper"));
  assert!(!once.code.contains("./db"));

  let module = parse_module(&once.code).unwrap();
  let mut swept = module.clone();
  let sweeper = Sweeper { target: Target::Client, keep_imports: &[], candidates: Candidates::All };
  sweeper.run(&mut swept);
  let mut again = swept.clone();
  assert_eq!(sweeper.run(&mut again), 0);
  assert_eq!(print_module(&again), print_module(&swept));
}

#[test]
fn server_build_keeps_import_side_effects() {
  let source = "import { split$ } from 'sever';\nimport { heavy } from './heavy';\nexport const render = split$(() => heavy());\n";
  let out = server("a.js", source);
  assert!(out.code.contains("import \"./heavy\";"));
  assert!(!out.code.contains("{ heavy }"));
}

#[test]
fn keep_imports_preserves_module_evaluation() {
  let source = "import { fetch$ } from 'sever';\nimport { setup } from './instrument';\nexport const a = fetch$(() => setup());\n";
  let mut opts = CompileOptions::new("a.js", Target::Client);
  opts.keep_imports = vec!["./instrument".into()];
  let out = compile(source, &opts).unwrap();
  assert!(out.code.contains("import \"./instrument\";"));
  assert!(!out.code.contains("setup"));
}
