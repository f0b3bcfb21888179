use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Import from measurelink-core
use measurelink_core::{DebugConfig, ExtractorConfig, MeasurementExtractor, RuleSetCache};

// Import CLI utilities
use measurelink_cli::output::{self, OutputFormat};

#[derive(Parser)]
#[command(name = "measurelink")]
#[command(about = "Link measurements in parsed sentences to the words they describe")]
struct Args {
    /// Path to the sentence input (JSON array, {"sentences": [...]} or JSON Lines)
    #[arg(short, long)]
    input: String,

    /// Path to a pattern document (JSON). Uses the bundled patterns if omitted
    #[arg(short, long)]
    patterns: Option<String>,

    /// Path to engine settings (YAML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: json or jsonl
    #[arg(short = 'f', long, default_value = "json")]
    output_format: String,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Emit the simplified name-keyed projection instead of full records
    #[arg(long)]
    simplify: bool,

    /// Enable per-step timings for every sentence
    #[arg(long)]
    profile: bool,

    /// Trace traversal of tokens whose text matches this pattern (regex or
    /// substring). May be repeated.
    #[arg(long = "debug-token")]
    debug_tokens: Vec<String>,

    /// Dump intermediate stages (bound measurements, raw matches, records)
    /// for every sentence to a directory
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,

    /// Raise the default log level to debug
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose || !args.debug_tokens.is_empty());

    println!("🦀 MeasureLink");

    if !Path::new(&args.input).exists() {
        println!("⚠️  Input not found at: {}", args.input);
        println!("   Please check the file path.");
        return Ok(());
    }

    let format = OutputFormat::parse(&args.output_format)
        .ok_or_else(|| anyhow!("unknown output format '{}' (expected json or jsonl)", args.output_format))?;

    let config = ExtractorConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    let cache = RuleSetCache::new();
    let patterns = args.patterns.as_deref().map(PathBuf::from);
    let mut extractor = MeasurementExtractor::from_cache(&cache, patterns.as_deref(), config)?;
    match &args.patterns {
        Some(path) => println!("📐 Loaded patterns from: {}", path),
        None => println!("📐 Using bundled patterns"),
    }
    println!(
        "   - {} rules, fingerprint {}",
        extractor.rule_engine().rules().rule_count(),
        extractor.rule_engine().rules().fingerprint()
    );

    extractor.set_profiling(args.profile);
    if !args.debug_tokens.is_empty() {
        extractor.set_debug_config(DebugConfig::new(true, args.debug_tokens.clone()));
    }

    println!("📄 Processing: {}", args.input);
    let inputs = output::read_inputs(Path::new(&args.input))?;

    if args.dump_stages {
        println!("\n🔬 Stage dump mode");
        let mut stages = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            match extractor.extract_capture_stages(i + 1, input) {
                Ok(stage) => stages.push((i + 1, stage)),
                Err(e) => eprintln!("⚠️  Skipped {e}"),
            }
        }
        output::save_stages(&stages, &args.stages_dir)?;
        println!("\n✅ All stages dumped to: {}", args.stages_dir);
        return Ok(());
    }

    let batch = extractor.extract_batch(&inputs);
    for err in batch.errors() {
        eprintln!("⚠️  Skipped {err}");
    }

    let stats = &batch.stats;
    stats.print_summary();
    println!("✅ Extraction finished");
    println!("📊 Batch metrics:");
    println!("   - Sentences parsed: {}/{}", stats.sentences_parsed, stats.sentences_total);
    println!("   - Measurements found: {}/{}", stats.measurements_found, stats.measurements_total);
    println!("   - Measurements dropped: {}", stats.measurements_dropped);
    println!("   - Related entities: {}", stats.related_found);

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, args.simplify, format));

    let extractions: Vec<_> = batch.extractions().cloned().collect();
    output::save_results(&extractions, &output_path, format, args.simplify)?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_output_path(input: &str, simplify: bool, format: OutputFormat) -> String {
    let input_name = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let suffix = if simplify { "_simple" } else { "" };
    format!("{input_name}{suffix}_measurelink.{}", format.extension())
}
