//! jsdoc: extract documentation from annotated JavaScript source files.
//!
//! - **stdin mode**: `jsdoc < shapes.js`
//! - **file mode**: `jsdoc -o model.json --pretty src/*.js lib/`
//!
//! The doclet model is written as JSON; diagnostics go to stderr as log events.

use anyhow::{Context, Result};
use clap::Parser;
use jsdoc::{DocletModel, Severity, Source, Symbol};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "jsdoc",
    version,
    about = "Extract a documentation model from annotated JavaScript source files"
)]
struct Cli {
    /// Input files, directories or glob patterns. If omitted, reads from stdin.
    files: Vec<String>,

    /// Write the JSON model to this file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON model
    #[arg(long)]
    pretty: bool,

    /// Include @private symbols and private inner functions
    #[arg(long)]
    private: bool,

    /// Filter symbols by role. Prefix with ! to exclude.
    /// Can be specified multiple times. E.g. --filter '!static-property'
    #[arg(long)]
    filter: Vec<String>,

    /// Exit with an error when any warning diagnostic is reported
    #[arg(long)]
    deny_warnings: bool,

    /// Log debug output to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let sources = if cli.files.is_empty() {
        vec![read_stdin()?]
    } else {
        read_files(&expand_globs(&cli.files)?)?
    };

    let mut model = jsdoc::parse_project(&sources)?;
    report_diagnostics(&model);
    filter_symbols(&mut model, cli.private, &cli.filter)?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&model)
    } else {
        serde_json::to_string(&model)
    }
    .context("failed to serialize doclet model")?;

    match &cli.output {
        Some(path) => fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    if cli.deny_warnings && model.has_warnings() {
        anyhow::bail!("warnings reported and --deny-warnings is set");
    }
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("JSDOC_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn read_stdin() -> Result<Source> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(Source::new("<stdin>", input))
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<Source>> {
    paths
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Source::new(path.to_string_lossy(), text))
        })
        .collect()
}

/// File extensions recognized as JavaScript sources.
const SUPPORTED_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

/// Expand glob patterns into a list of real file paths.
/// Also handles bare directory paths by scanning for supported file types.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        // Directories are scanned non-recursively
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            files.extend(
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|p| p.is_file() && is_supported(p)),
            );
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            tracing::warn!(pattern = %pattern, "no files matched");
        }
        files.extend(matches);
    }
    // Sort for deterministic output
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

fn report_diagnostics(model: &DocletModel) {
    for d in model.diagnostics() {
        let file = d.location.file.as_str();
        let line = d.location.line;
        match d.severity {
            Severity::Warning => tracing::warn!(file, line, kind = ?d.kind, "{}", d.message),
            Severity::Info => tracing::info!(file, line, kind = ?d.kind, "{}", d.message),
        }
    }
}

const ROLE_NAMES: &[&str] = &[
    "constructor",
    "instance-method",
    "instance-property",
    "static-method",
    "static-property",
    "free-function",
    "private-inner",
];

/// Filter symbols based on --private and --filter flags.
///
/// Private symbols are excluded unless --private is given. --filter keeps
/// symbols with any of the named roles; `!role` drops that role.
fn filter_symbols(model: &mut DocletModel, private: bool, filters: &[String]) -> Result<()> {
    for filter in filters {
        let role = filter.strip_prefix('!').unwrap_or(filter.as_str());
        if !ROLE_NAMES.contains(&role) {
            anyhow::bail!(
                "unknown role in --filter: {role} (expected one of {})",
                ROLE_NAMES.join(", ")
            );
        }
    }

    let (excluded, included): (Vec<&str>, Vec<&str>) = filters
        .iter()
        .map(String::as_str)
        .partition(|f| f.starts_with('!'));
    let excluded: Vec<&str> = excluded.iter().map(|f| &f[1..]).collect();

    model.retain(|sym: &Symbol| {
        if sym.private && !private {
            return false;
        }
        let role = sym.role.as_str();
        if excluded.contains(&role) {
            return false;
        }
        included.is_empty() || included.contains(&role)
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "/** A shape\n * @constructor */\nfunction Shape() {\n  /** Hidden */\n  function secret() {}\n}\n/** Color */\nShape.prototype.color = 'red';\n/** Helper */\nfunction helper() {}\n";

    fn names(model: &DocletModel) -> Vec<&str> {
        model.symbols().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn private_symbols_excluded_by_default() {
        let mut model = jsdoc::parse_source("a.js", SRC).unwrap();
        filter_symbols(&mut model, false, &[]).unwrap();
        assert_eq!(names(&model), vec!["Shape", "Shape#color", "helper"]);

        let mut model = jsdoc::parse_source("a.js", SRC).unwrap();
        filter_symbols(&mut model, true, &[]).unwrap();
        assert!(model.get("Shape~secret").is_some());
    }

    #[test]
    fn role_filters() {
        let mut model = jsdoc::parse_source("a.js", SRC).unwrap();
        filter_symbols(&mut model, false, &["free-function".to_string()]).unwrap();
        assert_eq!(names(&model), vec!["helper"]);

        let mut model = jsdoc::parse_source("a.js", SRC).unwrap();
        filter_symbols(&mut model, false, &["!instance-property".to_string()]).unwrap();
        assert_eq!(names(&model), vec!["Shape", "helper"]);
        assert!(model.members_of("Shape").is_empty());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut model = DocletModel::default();
        assert!(filter_symbols(&mut model, false, &["method".to_string()]).is_err());
    }

    #[test]
    fn supported_extensions() {
        assert!(is_supported(Path::new("lib/shapes.js")));
        assert!(is_supported(Path::new("mod.mjs")));
        assert!(!is_supported(Path::new("README.md")));
        assert!(!is_supported(Path::new("Makefile")));
    }
}
