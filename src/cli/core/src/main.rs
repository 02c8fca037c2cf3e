/* src/cli/core/src/main.rs */

mod build;
mod config;
mod ui;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sever_compiler::{BoundaryKind, Target, compile, normalize_module_id};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE, SeverConfig, find_sever_config, load_sever_config};

#[derive(Parser)]
#[command(name = "sever", about = "Boundary-extraction compiler for client/server modules")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compile one module for a target and print the result
  Compile {
    /// Module to compile
    file: PathBuf,
    /// `client` or `server`
    #[arg(short, long, default_value = "client")]
    target: Target,
    /// Use digest route slugs
    #[arg(long)]
    minify: bool,
    /// Project root that route paths are relative to
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Write split modules next to this file instead of listing them
    #[arg(short, long)]
    out: Option<PathBuf>,
  },
  /// Compile every module under the source directory
  Build {
    /// Path to sever.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
  /// List the boundary routes of the project
  Routes {
    /// Path to sever.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Read routes.json from the last build instead of compiling
    #[arg(long)]
    built: bool,
  },
}

/// Try to load sever.toml from cwd upward; returns None if not found
fn try_load_config() -> Option<SeverConfig> {
  let cwd = std::env::current_dir().ok()?;
  let path = find_sever_config(&cwd).ok()?;
  load_sever_config(&path).ok()
}

/// Resolve config path (explicit or auto-detected) and parse it
fn resolve_config(explicit: Option<PathBuf>) -> Result<(PathBuf, SeverConfig)> {
  let path = match explicit {
    Some(p) => p,
    None => {
      let cwd = std::env::current_dir().context("failed to get cwd")?;
      find_sever_config(&cwd)?
    }
  };
  let config = load_sever_config(&path)
    .with_context(|| format!("invalid {CONFIG_FILE} at {}", path.display()))?;
  Ok((path, config))
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sever=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_compile(
  file: &Path,
  target: Target,
  minify: bool,
  root: &Path,
  out: Option<&Path>,
) -> Result<()> {
  let source =
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
  let rel = build::relative_path(root, file);
  let mut opts = match try_load_config() {
    Some(config) => config.compile_options(&rel, target),
    None => sever_compiler::CompileOptions::new(&rel, target),
  };
  opts.minify = opts.minify || minify;
  let output = compile(&source, &opts)?;

  match out {
    Some(out) => {
      std::fs::write(out, &output.code)
        .with_context(|| format!("failed to write {}", out.display()))?;
      ui::ok(&format!("{} -> {}", normalize_module_id(&rel), out.display()));
      let dir = out.parent().unwrap_or_else(|| Path::new("."));
      for (id, code) in &output.split_modules {
        let path = dir.join(build::split_file_name(id));
        if let Some(parent) = path.parent() {
          std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, code)
          .with_context(|| format!("failed to write {}", path.display()))?;
        ui::detail(&format!("{id} -> {}", path.display()));
      }
    }
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(output.code.as_bytes())?;
      for (id, code) in &output.split_modules {
        writeln!(stdout, "\n// {id}")?;
        stdout.write_all(code.as_bytes())?;
      }
    }
  }
  Ok(())
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  match cli.command {
    Command::Compile { file, target, minify, root, out } => {
      run_compile(&file, target, minify, &root, out.as_deref())?;
    }
    Command::Build { config } => {
      let (config_path, sever_config) = resolve_config(config)?;
      let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
      ui::banner("build");
      let report = build::run_build(&sever_config, base_dir)?;
      ui::blank();
      ui::ok(&format!(
        "{} modules ({} transformed), {} routes, {} split modules",
        report.modules, report.transformed, report.routes, report.splits
      ));
      ui::arrow(&sever_config.out_dir(base_dir).display().to_string());
    }
    Command::Routes { config, built } => {
      let (config_path, sever_config) = resolve_config(config)?;
      let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
      ui::banner("routes");
      let routes: Vec<(BoundaryKind, String, String)> = if built {
        let path = sever_config.out_dir(base_dir).join(build::ROUTES_FILE);
        let manifest = build::BuildManifest::read(&path)?;
        manifest.routes.into_iter().map(|r| (r.kind, r.route, r.module)).collect()
      } else {
        build::list_routes(&sever_config, base_dir)?
          .into_iter()
          .map(|(module, entry)| (entry.kind, entry.route, module))
          .collect()
      };
      if routes.is_empty() {
        ui::warn("no boundary calls found");
      }
      for (kind, route, module) in &routes {
        let kind = match kind {
          BoundaryKind::Fetch => "fetch",
          BoundaryKind::Secret => "secret",
          BoundaryKind::Split => "split",
        };
        ui::route(kind, route, module);
      }
      ui::blank();
    }
  }
  Ok(())
}
