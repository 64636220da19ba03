//! epubox CLI - translates EPUB chapter documents while keeping their markup.

use anyhow::{Context, Result};
use clap::Parser;
use epubox::backends;
use epubox::config::Config;
use epubox::console::Console;
use epubox::cost::LimitType;
use epubox::processor::DocumentProcessor;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Translates an HTML/XHTML chapter, leaving markup and code untouched.
#[derive(Parser, Debug)]
#[command(name = "epubox")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTML or XHTML file to translate.
    input: PathBuf,

    /// Output file (defaults to `<name>.<target>.<ext>` next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language (overrides config).
    #[arg(long)]
    source: Option<String>,

    /// Target language (overrides config).
    #[arg(long)]
    target: Option<String>,

    /// Maximum cost of one translation request (overrides config).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    budget: Option<u64>,

    /// Unit of the budget: chars or tokens (overrides config).
    #[arg(long)]
    limit_type: Option<LimitType>,

    /// Maximum number of requests in flight (overrides config).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: Option<u64>,

    /// Run the pipeline without contacting the API.
    #[arg(long)]
    dry_run: bool,

    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let console = Console::new();

    console.section("epubox - EPUB chapter translator");

    // Load configuration
    console.step("Loading configuration...");
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    // Check if this is first run (API key not configured)
    if !args.dry_run && !config.api.is_configured() {
        let config_path = match &args.config {
            Some(path) => path.clone(),
            None => Config::config_path()?,
        };
        console.warning(&format!(
            "API key not configured. Please edit: {}",
            config_path.display()
        ));
        console.info("Set your OpenAI-compatible API key in the config file, or pass --dry-run.");
        return Ok(());
    }

    config
        .validate_with_options(!args.dry_run)
        .context("Invalid configuration")?;
    console.success("Configuration loaded");

    let source_lang = config.translation.source_language.clone();
    let target_lang = config.translation.target_language.clone();
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &target_lang));

    console.step(&format!("Reading {}", console.path(&args.input)));
    let html = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    console.success(&format!(
        "Read {} characters",
        console.count(html.chars().count())
    ));

    let translator =
        backends::from_config(&config, args.dry_run).context("Failed to create translator")?;
    if args.dry_run {
        console.info("Dry run: text is passed through unchanged");
    }

    let processor =
        DocumentProcessor::with_limit_type(config.process_options(), config.translation.limit_type);

    console.step(&format!(
        "Translating {} -> {} (budget {} {}, concurrency {})",
        source_lang,
        target_lang,
        config.translation.budget,
        config.translation.limit_type,
        config.translation.concurrency
    ));
    let started = Instant::now();
    let processed = match processor
        .process(&html, &source_lang, &target_lang, translator.as_ref())
        .await
    {
        Ok(processed) => processed,
        Err(e) => {
            console.error(&format!(
                "{} was not written: {}",
                console.path(&output),
                e
            ));
            return Err(e).context("Translation failed");
        }
    };
    console.report(&processed, started.elapsed());

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&output, &processed.html)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    console.success(&format!("Wrote {}", console.path(&output)));

    console.section("Done!");
    Ok(())
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(source) = &args.source {
        config.translation.source_language = source.clone();
    }
    if let Some(target) = &args.target {
        config.translation.target_language = target.clone();
    }
    if let Some(budget) = args.budget {
        config.translation.budget = budget as usize;
    }
    if let Some(limit_type) = args.limit_type {
        config.translation.limit_type = limit_type;
    }
    if let Some(concurrency) = args.concurrency {
        config.translation.concurrency = concurrency as usize;
    }
}

/// `chapter1.xhtml` translated to `fr` becomes `chapter1.fr.xhtml`.
fn default_output_path(input: &Path, target_lang: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{}.{}.{}", stem, target_lang, ext.to_string_lossy()),
        None => format!("{}.{}", stem, target_lang),
    };
    input.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("book/ch1.xhtml"), "fr"),
            PathBuf::from("book/ch1.fr.xhtml")
        );
        assert_eq!(
            default_output_path(Path::new("notes"), "de"),
            PathBuf::from("notes.de")
        );
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = Args::parse_from([
            "epubox",
            "in.html",
            "--target",
            "ja",
            "--budget",
            "500",
            "--limit-type",
            "tokens",
            "--concurrency",
            "2",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.translation.source_language, "en");
        assert_eq!(config.translation.target_language, "ja");
        assert_eq!(config.translation.budget, 500);
        assert_eq!(config.translation.limit_type, LimitType::Tokens);
        assert_eq!(config.translation.concurrency, 2);
    }

    #[test]
    fn test_zero_budget_is_rejected_by_parser() {
        assert!(Args::try_parse_from(["epubox", "in.html", "--budget", "0"]).is_err());
    }
}
