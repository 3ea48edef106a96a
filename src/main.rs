//! Elder-interview pipeline CLI.
//!
//! Subcommands cover the three pipeline stages plus the supporting
//! checks:
//!
//! ```text
//! elder-interviews generate-personas   --count=10 --seed=42
//! elder-interviews generate-interviews --personas=personas.json --models=gpt-4o
//! elder-interviews validate-personas   --base=base.json --final=personas.json
//! elder-interviews analyze             --batch=batch.jsonl --mindmap=mindmap.json --subjects=subjects.json
//! elder-interviews interview           --mindmap=mindmap.json --subjects=subjects.json
//! ```

use anyhow::{bail, Context, Result};
use elder_interviews::analyzer::{analyze_batch_file, InterviewAnalyzer};
use elder_interviews::client::OpenAiChatClient;
use elder_interviews::config::{ApiConfig, AVAILABLE_MODELS};
use elder_interviews::generator::PersonaGenerator;
use elder_interviews::interview::DatasetRunner;
use elder_interviews::io::{self, OutputFormat};
use elder_interviews::questions::question_catalog;
use elder_interviews::repl::InterviewRepl;
use elder_interviews::validate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    init_logging(
        flag(&args, "log-level").as_deref(),
        flag(&args, "log-file").as_deref(),
    )?;

    let command = match args.iter().find(|a| !a.starts_with("--")) {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            return Ok(());
        }
    };

    match command {
        "generate-personas" => run_generate_personas(&args).await,
        "generate-interviews" => run_generate_interviews(&args).await,
        "validate-personas" => run_validate_personas(&args),
        "analyze" => run_analyze(&args).await,
        "interview" => run_interview(&args).await,
        "help" | "--help" => {
            print_usage();
            Ok(())
        }
        other => bail!("unknown command `{other}` (try `help`)"),
    }
}

fn print_usage() {
    println!("elder-interviews - synthetic Persian elder-interview pipeline");
    println!();
    println!("Commands:");
    println!("  generate-personas    Sample and complete personas");
    println!("    --count=N --model=M --mode=stats|full --seed=S --output=FILE --format=json|csv");
    println!("  generate-interviews  Run the persona x model interview sweep");
    println!("    --personas=FILE --models=A,B --output-dir=DIR --delay=SECS --format=jsonl|csv");
    println!("  validate-personas    Check base demographic fields survived completion");
    println!("    --base=FILE --final=FILE [--report=FILE]");
    println!("  analyze              Analyze a saved interview batch");
    println!("    --batch=FILE --mindmap=FILE --subjects=FILE --output-dir=DIR --model=M");
    println!("  interview            Interactive interview on the terminal");
    println!("    --mindmap=FILE --subjects=FILE --output-dir=DIR --model=M");
    println!();
    println!("Global: --log-level=LEVEL --log-file=FILE (METIS_API_KEY from env or .env)");
}

/// Look up a `--name=value` flag.
fn flag(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    args.iter()
        .find_map(|a| a.strip_prefix(&prefix).map(str::to_string))
}

fn required_flag(args: &[String], name: &str) -> Result<String> {
    flag(args, name).with_context(|| format!("missing required flag --{name}=..."))
}

fn init_logging(level: Option<&str>, log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {path}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn parse_models(args: &[String], config: &ApiConfig) -> Vec<String> {
    let models: Vec<String> = flag(args, "models")
        .or_else(|| flag(args, "model"))
        .unwrap_or_else(|| config.default_model.clone())
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();

    for model in &models {
        if !AVAILABLE_MODELS.contains(&model.as_str()) {
            warn!(model, "model is not in the known model list");
        }
    }
    models
}

async fn run_generate_personas(args: &[String]) -> Result<()> {
    let config = ApiConfig::from_env()?;
    let count: usize = flag(args, "count")
        .map(|c| c.parse().context("--count must be a number"))
        .transpose()?
        .unwrap_or(10);
    let model = flag(args, "model").unwrap_or_else(|| config.default_model.clone());
    let output = PathBuf::from(flag(args, "output").unwrap_or_else(|| "personas.json".to_string()));

    let client = OpenAiChatClient::new(config);
    let generator = PersonaGenerator::new(&client, model);

    let personas = match flag(args, "mode").as_deref() {
        Some("full") => generator.generate_full(count).await?,
        _ => {
            let mut rng = match flag(args, "seed") {
                Some(seed) => StdRng::seed_from_u64(seed.parse().context("--seed must be a number")?),
                None => StdRng::from_entropy(),
            };
            generator.generate_with_stats(count, &mut rng).await?
        }
    };

    match flag(args, "format").as_deref() {
        Some("csv") => io::save_personas_csv(&output, &personas)?,
        _ => io::save_personas_json(&output, &personas)?,
    }
    println!("Generated {} personas -> {}", personas.len(), output.display());
    Ok(())
}

async fn run_generate_interviews(args: &[String]) -> Result<()> {
    let config = ApiConfig::from_env()?;
    let personas_path = PathBuf::from(required_flag(args, "personas")?);
    let output_dir = flag(args, "output-dir").unwrap_or_else(|| "interview_results".to_string());
    let delay_secs: u64 = flag(args, "delay")
        .map(|d| d.parse().context("--delay must be seconds"))
        .transpose()?
        .unwrap_or(5);
    let format = match flag(args, "format") {
        Some(f) => OutputFormat::parse(&f)?,
        None => OutputFormat::Jsonl,
    };

    let personas = io::load_personas(&personas_path)?;
    let models = parse_models(args, &config);

    let client = OpenAiChatClient::new(config);
    let runner = DatasetRunner::new(
        &client,
        personas,
        models,
        question_catalog(),
        output_dir,
        format,
        Duration::from_secs(delay_secs),
    );

    let interactions = runner.generate().await?;
    println!("Generated {} interactions", interactions.len());
    Ok(())
}

fn run_validate_personas(args: &[String]) -> Result<()> {
    let base = PathBuf::from(required_flag(args, "base")?);
    let completed = PathBuf::from(required_flag(args, "final")?);

    let summary = validate::validate_files(&base, &completed)?;

    if let Some(report) = flag(args, "report") {
        std::fs::write(&report, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("failed to write {report}"))?;
    }

    println!(
        "{} personas, {} fields checked, {:.1}% match",
        summary.total_personas,
        summary.fields_checked.len(),
        summary.match_percentage()
    );
    if !summary.passed() {
        for m in &summary.mismatches {
            println!(
                "  {} / {}: `{}` -> `{}`",
                m.persona_id, m.field, m.base_value, m.final_value
            );
        }
        std::process::exit(1);
    }
    println!("All base fields preserved.");
    Ok(())
}

fn build_analyzer<'a>(
    args: &[String],
    client: &'a OpenAiChatClient,
    model: String,
) -> Result<InterviewAnalyzer<'a>> {
    let mindmap = io::load_json_value(Path::new(&required_flag(args, "mindmap")?))?;
    let subjects = io::load_json_value(Path::new(&required_flag(args, "subjects")?))?;
    let output_dir = flag(args, "output-dir").unwrap_or_else(|| "analysis_results".to_string());
    Ok(InterviewAnalyzer::new(
        client, model, mindmap, subjects, output_dir,
    ))
}

async fn run_analyze(args: &[String]) -> Result<()> {
    let config = ApiConfig::from_env()?;
    let batch = PathBuf::from(required_flag(args, "batch")?);
    let model = flag(args, "model").unwrap_or_else(|| config.default_model.clone());

    let client = OpenAiChatClient::new(config);
    let mut analyzer = build_analyzer(args, &client, model)?;

    let results = analyze_batch_file(&mut analyzer, &batch).await?;
    let stats = &results.processing_stats;
    println!(
        "Analyzed {}: {} ok, {} failed, {} retries",
        results.interview_id,
        stats.successful_analyses,
        stats.failed_analyses,
        stats.retry_attempts
    );
    if stats.failed_analyses > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interview(args: &[String]) -> Result<()> {
    let config = ApiConfig::from_env()?;
    let model = flag(args, "model").unwrap_or_else(|| config.default_model.clone());

    let client = OpenAiChatClient::new(config);
    let analyzer = build_analyzer(args, &client, model)?;

    let mut repl = InterviewRepl::new(analyzer);
    match repl.run().await? {
        Some(results) => println!("Session saved as {}_analysis.json", results.interview_id),
        None => println!("No answers recorded."),
    }
    Ok(())
}
