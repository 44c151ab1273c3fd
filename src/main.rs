//! styleweld - CSS inliner
//!
//! Command line entry point. Inlines each given HTML file into
//! `<prefix><file name>`, or stdin into stdout when no file is given.

use styleweld::{CssInliner, InlineConfig, InlineOptions, InlineStatus, NAME, VERSION};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_OUTPUT_PREFIX: &str = "inlined.";

const USAGE: &str = "\
Usage: styleweld [OPTIONS] [FILES...]

Inlines CSS into HTML documents. Reads stdin when no files are given.

Options:
  --base-url URL         Base URL for relative stylesheet links
  --extra-css CSS        Additional CSS applied after document stylesheets
  --fragment-css FILE    Treat inputs as fragments and inline the CSS in FILE
  --keep-style-tags      Keep <style> elements in the output
  --keep-link-tags       Keep <link rel=\"stylesheet\"> elements in the output
  --no-remote            Do not load stylesheets referenced by <link>
  --skip-missing         Skip stylesheets that cannot be loaded
  --cache-size N         Cache up to N parsed stylesheets across files
  --config FILE.json     Read options from a JSON file (flags override it)
  --output-prefix P      Prefix of output file names (default \"inlined.\")
  -h, --help             Print this help
  -V, --version          Print version information

Logging is controlled with RUST_LOG.";

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    config_file: Option<PathBuf>,
    base_url: Option<String>,
    extra_css: Option<String>,
    fragment_css: Option<PathBuf>,
    keep_style_tags: bool,
    keep_link_tags: bool,
    no_remote: bool,
    skip_missing: bool,
    cache_size: Option<usize>,
    output_prefix: Option<String>,
    files: Vec<PathBuf>,
}

enum Command {
    Run(Args),
    Help,
    Version,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(args) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return;
        }
        Ok(Command::Version) => {
            println!("{} {}", NAME, VERSION);
            return;
        }
        Err(message) => {
            eprintln!("error: {}\n\n{}", message, USAGE);
            process::exit(2);
        }
    };

    if let Err(message) = run(args) {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

fn parse_args(raw: Vec<String>) -> Result<Command, String> {
    let mut args = Args::default();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| format!("missing value for `{}`", flag))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--base-url" => args.base_url = Some(value("--base-url")?),
            "--extra-css" => args.extra_css = Some(value("--extra-css")?),
            "--fragment-css" => args.fragment_css = Some(value("--fragment-css")?.into()),
            "--config" => args.config_file = Some(value("--config")?.into()),
            "--output-prefix" => args.output_prefix = Some(value("--output-prefix")?),
            "--cache-size" => {
                let raw = value("--cache-size")?;
                let size = raw
                    .parse()
                    .map_err(|_| format!("invalid cache size `{}`", raw))?;
                args.cache_size = Some(size);
            }
            "--keep-style-tags" => args.keep_style_tags = true,
            "--keep-link-tags" => args.keep_link_tags = true,
            "--no-remote" => args.no_remote = true,
            "--skip-missing" => args.skip_missing = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option `{}`", flag)),
            file => args.files.push(file.into()),
        }
    }
    Ok(Command::Run(args))
}

/// Merge the optional JSON configuration with command line flags
fn load_config(args: &Args) -> Result<InlineConfig, String> {
    let mut config = match &args.config_file {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
            InlineConfig::from_json(&json).map_err(|err| err.to_string())?
        }
        None => InlineConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(extra_css) = &args.extra_css {
        config.extra_css = Some(extra_css.clone());
    }
    if args.cache_size.is_some() {
        config.cache_size = args.cache_size;
    }
    config.keep_style_tags |= args.keep_style_tags;
    config.keep_link_tags |= args.keep_link_tags;
    config.skip_missing_stylesheets |= args.skip_missing;
    if args.no_remote {
        config.load_remote_stylesheets = false;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), String> {
    let config = load_config(&args)?;
    let options = InlineOptions::try_from(config).map_err(|err| err.to_string())?;
    let inliner = CssInliner::new(options);

    let fragment_css = match &args.fragment_css {
        Some(path) => Some(
            fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {}", path.display(), err))?,
        ),
        None => None,
    };

    if args.files.is_empty() {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .map_err(|err| format!("cannot read stdin: {}", err))?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = match &fragment_css {
            Some(css) => inliner.inline_fragment_to(&html, css, &mut out),
            None => inliner.inline_to(&html, &mut out),
        };
        result.map_err(|err| format!("{} ({})", err, InlineStatus::from(&err)))?;
        return out.flush().map_err(|err| err.to_string());
    }

    let prefix = args
        .output_prefix
        .as_deref()
        .unwrap_or(DEFAULT_OUTPUT_PREFIX);
    let mut failures = 0;
    for file in &args.files {
        match inline_file(&inliner, file, prefix, fragment_css.as_deref()) {
            Ok(output) => println!("{}: OK ({})", file.display(), output.display()),
            Err(message) => {
                failures += 1;
                eprintln!("{}: {}", file.display(), message);
            }
        }
    }
    if let Some(cache) = &inliner.get_options().cache {
        let stats = cache.stats();
        log::info!(
            "Stylesheet cache: {} entries, {} hits, {} misses",
            stats.entries,
            stats.hits,
            stats.misses
        );
    }
    if failures > 0 {
        return Err(format!("{} of {} file(s) failed", failures, args.files.len()));
    }
    Ok(())
}

/// Inline one file and return the path of the written output
fn inline_file(
    inliner: &CssInliner,
    path: &Path,
    prefix: &str,
    fragment_css: Option<&str>,
) -> Result<PathBuf, String> {
    let html = fs::read_to_string(path).map_err(|err| format!("cannot read: {}", err))?;
    let result = match fragment_css {
        Some(css) => inliner.inline_fragment(&html, css),
        None => inliner.inline(&html),
    };
    let inlined = result.map_err(|err| format!("{} ({})", err, InlineStatus::from(&err)))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| "not a file".to_string())?
        .to_string_lossy();
    let output = path.with_file_name(format!("{}{}", prefix, file_name));
    fs::write(&output, inlined)
        .map_err(|err| format!("cannot write {}: {}", output.display(), err))?;
    Ok(output)
}
