//! `jsr` — print the AST of a JavaScript file as JSON.
//!
//! Reads FILE (or stdin), runs [`reflect_parse`] and writes the result to
//! stdout.  Diagnostics and logs go to stderr.  The exit status is 0 on
//! success, 1 for errors in the input or the invocation, 2 for internal
//! errors and 3 when a recursion or allocation limit was hit.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use jsreflect_core::{ReflectConfig, ReflectError, ReflectOptions, reflect_parse};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Stack for the worker thread; parsing and serialization recurse once per
/// nesting level.
const REFLECT_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "jsr", version)]
#[command(about = "Print a JavaScript AST as JSON, in the shape of Reflect.parse")]
struct Cli {
    /// Script to parse; `-` or absent reads stdin
    file: Option<PathBuf>,

    /// Omit source locations
    #[arg(long)]
    no_loc: bool,

    /// Source name recorded in every location
    #[arg(long, value_name = "NAME")]
    source: Option<String>,

    /// Number of the first line
    #[arg(long, value_name = "N")]
    line: Option<u32>,

    /// Recursion limit for parsing and serialization
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// JSON file with reflect options; flags take precedence
    #[arg(long, value_name = "FILE.json")]
    config: Option<PathBuf>,

    /// Print the AST on one line
    #[arg(long)]
    compact: bool,

    /// Log filter, e.g. `debug` or `jsreflect_core=trace` (default: RUST_LOG, then `warn`)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jsr: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    let (name, source) = read_input(cli.file.as_deref())?;
    info!(input = %name, bytes = source.len(), "reflecting");

    let compact = cli.compact;
    let worker = thread::Builder::new()
        .name("jsr-reflect".into())
        .stack_size(REFLECT_STACK_SIZE)
        .spawn(move || reflect_to_json(&source, config, compact))
        .context("failed to start the reflect thread")?;
    let json = worker
        .join()
        .map_err(|_| anyhow!("reflect thread panicked"))??;

    let mut stdout = io::stdout().lock();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

/// The config file, if any, with command-line flags applied on top.
fn build_config(cli: &Cli) -> Result<ReflectConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => ReflectConfig::default(),
    };
    if cli.no_loc {
        config.loc = false;
    }
    if let Some(source) = &cli.source {
        config.source = Some(source.clone());
    }
    if let Some(line) = cli.line {
        config.line = line;
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    debug!(?config, "effective config");
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<(String, String)> {
    match file {
        Some(path) if path != Path::new("-") => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), text))
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(("<stdin>".to_owned(), text))
        }
    }
}

fn reflect_to_json(source: &str, config: ReflectConfig, compact: bool) -> Result<String> {
    let opts = ReflectOptions::from(config);
    let ast = reflect_parse(source, &opts)?;
    let json = if compact {
        serde_json::to_string(&ast)?
    } else {
        serde_json::to_string_pretty(&ast)?
    };
    Ok(json)
}

/// 1/2/3 by reflect error class; anything else is the caller's fault.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ReflectError>()
        .and_then(|e| u8::try_from(e.kind().code()).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from(["jsr", "--no-loc", "--line", "5", "--max-depth", "64", "a.js"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert!(!config.loc);
        assert_eq!(config.line, 5);
        assert_eq!(config.max_depth, 64);
        assert_eq!(cli.file.as_deref(), Some(Path::new("a.js")));
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["jsr"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config, ReflectConfig::default());
        assert!(!cli.compact);
    }

    #[test]
    fn test_compact_output() {
        let json = reflect_to_json("x;", ReflectConfig::default(), true).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.starts_with(r#"{"type":"Program""#));
    }

    #[test]
    fn test_exit_codes_follow_error_class() {
        let syntax = reflect_to_json("var;", ReflectConfig::default(), true).unwrap_err();
        assert_eq!(exit_code(&syntax), 1);
        assert_eq!(exit_code(&anyhow::Error::from(ReflectError::BadParseNode("x".into()))), 2);
        assert_eq!(exit_code(&anyhow::Error::from(ReflectError::TooMuchRecursion)), 3);
        assert_eq!(exit_code(&anyhow!("failed to read")), 1);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli::try_parse_from(["jsr", "--config", "/nonexistent/jsr.json"]).unwrap();
        assert!(build_config(&cli).is_err());
    }
}
