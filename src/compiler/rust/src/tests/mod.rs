/* src/compiler/rust/src/tests/mod.rs */

use super::*;

mod boundaries;

fn client(path: &str, source: &str) -> CompileOutput {
  compile(source, &CompileOptions::new(path, Target::Client)).unwrap()
}

fn server(path: &str, source: &str) -> CompileOutput {
  compile(source, &CompileOptions::new(path, Target::Server)).unwrap()
}

fn route_paths(out: &CompileOutput) -> Vec<&str> {
  out.routes.iter().map(|r| r.route.as_str()).collect()
}

#[test]
fn target_parses_from_cli_strings() {
  assert_eq!("client".parse::<Target>(), Ok(Target::Client));
  assert_eq!("server".parse::<Target>(), Ok(Target::Server));
  assert!("edge".parse::<Target>().is_err());
}

#[test]
fn server_runtime_module_defaults_to_server_entry() {
  let opts = CompileOptions::new("a.js", Target::Server);
  assert_eq!(opts.server_runtime_module(), "sever/server");
}

#[test]
fn split_ids_are_recognized() {
  assert!(is_split_module_id("virtual:sever-split:/_m/app/0/fn"));
  assert!(!is_split_module_id("/_m/app/0/fn"));
}

#[test]
fn fast_path_returns_source_untouched() {
  let source = "const  a = 1  // no markers\n";
  let out = client("a.js", source);
  assert_eq!(out.code, source);
  assert!(out.split_modules.is_empty());
  assert!(out.routes.is_empty());
}

#[test]
fn syntax_errors_carry_module_path() {
  let err = compile("const x = fetch$(", &CompileOptions::new("./app/bad.js", Target::Client)).unwrap_err();
  assert!(matches!(err, CompileError::Syntax { .. }));
  assert_eq!(err.path(), "app/bad.js");
}

// -- host passes --

struct InjectBanner;

impl ModulePass for InjectBanner {
  fn name(&self) -> &str {
    "inject-banner"
  }

  fn run(&self, module: &mut Module, _options: &CompileOptions) {
    module.body.insert(
      1,
      Stmt::Var(syntax::ast::VarDecl {
        kind: syntax::ast::VarKind::Const,
        decls: vec![syntax::ast::Declarator {
          id: syntax::ast::Pat::Ident("banner".into()),
          init: Some(syntax::ast::Expr::string("built")),
        }],
      }),
    );
  }
}

#[test]
fn host_passes_run_before_extraction() {
  let source = "import { fetch$ } from 'sever';\nexport const ping = fetch$(() => banner);\n";
  let opts = CompileOptions::new("app/ping.js", Target::Server);
  let out = Compiler::new().pass(Box::new(InjectBanner)).compile(source, &opts).unwrap();
  assert!(out.code.starts_with("import { fetch$ } from \"sever/server\";\nconst banner = \"built\";\n"));
  assert!(out.code.contains("return banner;"));
}
