use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use docgraph_core::pipeline::{ingest_graph, install_constraints};
use docgraph_core::report::{
    ReportFormat, StoreSummary, format_store_summary, gather_report_data, generate_json_report,
    generate_stats_json, generate_text_report, save_report,
};
use docgraph_core::source::is_url;
use docgraph_core::{
    CompileOptions, Compiler, CounterIds, DocumentFormat, DocumentSource, EscapePolicy, Graph,
    GraphReport, IdSource, IngestConfig, Phase, PhaseProgressCallback, SqliteGraphStore, UuidIds,
};
use docgraph_ingest::partition_sizes;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DB_PATH: &str = "~/.config/docgraph/docgraph.db";

// Helper functions for the convert and ingest handlers

/// Expand `~` in a database path.
pub fn resolve_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Inputs from either a list file or a single `--input` argument
pub fn load_inputs_from_source(
    input: Option<&String>,
    inputs_file: Option<&PathBuf>,
) -> Result<Vec<String>> {
    if let Some(inputs_file_path) = inputs_file {
        load_inputs_from_file(inputs_file_path)
    } else if let Some(input) = input {
        parse_input_line(input)
            .map(|input| vec![input])
            .with_context(|| format!("Invalid input '{}'", input))
    } else {
        bail!("Either --input or --inputs-file must be provided")
    }
}

/// Load a newline-delimited list of files and URLs. Blank lines and lines
/// starting with `#` are ignored.
pub fn load_inputs_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read inputs file {}", path.display()))?;

    let inputs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_input_line)
        .collect();

    if inputs.is_empty() {
        bail!("No inputs found in {}", path.display());
    }

    Ok(inputs)
}

/// URLs are kept as they are; file paths get `~` expanded.
pub fn parse_input_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if is_url(line) {
        return Some(line.to_string());
    }
    Some(shellexpand::tilde(line).into_owned())
}

pub fn parse_format(raw: &str) -> Result<DocumentFormat> {
    raw.parse::<DocumentFormat>().map_err(anyhow::Error::msg)
}

pub fn parse_escape(raw: &str) -> Result<EscapePolicy> {
    match raw {
        "quote-swap" => Ok(EscapePolicy::QuoteSwap),
        "backslash" => Ok(EscapePolicy::Backslash),
        other => bail!("Unknown escape policy '{}'", other),
    }
}

/// Load every input and merge the graphs. Identifiers come from one source
/// so they stay unique across documents.
pub async fn load_graph<I: IdSource + ?Sized>(
    source: &DocumentSource,
    inputs: &[String],
    format: DocumentFormat,
    ids: &mut I,
) -> Result<Graph> {
    let mut graph = Graph::new();
    for input in inputs {
        let document = source
            .load(input, format)
            .await
            .with_context(|| format!("Failed to load {}", input))?;
        debug!("Loaded {} as {}", input, document.format());
        graph.merge(document.to_graph(ids));
    }
    Ok(graph)
}

/// Create (or reopen) the store at `path` and make sure its constraints are
/// in place. With `reset`, an existing database is deleted first.
pub async fn prepare_store(path: &Path, reset: bool) -> Result<Arc<SqliteGraphStore>> {
    if reset && SqliteGraphStore::exists(path) {
        SqliteGraphStore::remove(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    let store = Arc::new(
        SqliteGraphStore::new(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?,
    );
    install_constraints(store.clone(), None)
        .await
        .context("Failed to install uniqueness constraints")?;
    Ok(store)
}

/// Per-worker progress bars for both ingestion phases.
struct WorkerBars {
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl WorkerBars {
    fn new(workers: usize) -> Result<Self> {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} worker {prefix:>2} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> ");

        let bars = (0..workers)
            .map(|worker| {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(style.clone());
                pb.set_prefix(worker.to_string());
                pb.set_message("idle");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            })
            .collect();

        Ok(Self { multi, bars })
    }

    fn callback(&self, node_sizes: Vec<usize>, link_sizes: Vec<usize>) -> PhaseProgressCallback {
        let bars = self.bars.clone();
        Arc::new(move |phase: Phase, worker: usize, processed: usize| {
            let sizes = match phase {
                Phase::Links => &link_sizes,
                _ => &node_sizes,
            };
            if let (Some(pb), Some(len)) = (bars.get(worker), sizes.get(worker)) {
                pb.set_length(*len as u64);
                pb.set_position(processed as u64);
                pb.set_message(phase.as_str());
            }
        })
    }

    fn clear(&self) -> Result<()> {
        for pb in &self.bars {
            pb.finish_and_clear();
        }
        self.multi.clear()?;
        Ok(())
    }
}

/// Ingest `graph`, optionally drawing one progress bar per worker.
pub async fn run_ingest(
    store: Arc<SqliteGraphStore>,
    graph: Graph,
    config: &IngestConfig,
    show_progress: bool,
) -> Result<GraphReport> {
    if !show_progress || config.concurrency == 0 {
        return Ok(ingest_graph(store, graph, config, None).await?);
    }

    let node_sizes = partition_sizes(graph.nodes.len(), config.concurrency);
    let link_sizes = partition_sizes(graph.links.len(), config.concurrency);
    let bars = WorkerBars::new(config.concurrency)?;
    let callback = bars.callback(node_sizes, link_sizes);

    let result = ingest_graph(store, graph, config, Some(callback)).await;
    bars.clear()?;
    Ok(result?)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub async fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  DOCGRAPH INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let raw_path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DB_PATH);
    let force = args.get_flag("force");
    let db_path = resolve_db_path(raw_path);

    println!(
        "{} Target: {}",
        "→".blue(),
        db_path.display().to_string().bright_white()
    );
    println!();

    let mut reset = force;
    if SqliteGraphStore::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
        println!();

        if response == "y" || response == "yes" {
            reset = true;
        } else {
            println!("{} Keeping existing database", "→".blue());
            println!();
        }
    }

    if reset && SqliteGraphStore::exists(&db_path) {
        println!("{} Deleting existing database", "→".yellow().bold());
    }
    println!("{} Creating database...", "→".blue());
    let store = prepare_store(&db_path, reset).await?;
    let stats = store.stats()?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!(
        "{} Constraints: {}",
        "✓".green().bold(),
        stats.constraints.to_string().cyan()
    );
    println!();
    Ok(())
}

pub async fn handle_convert(args: &ArgMatches, quiet: bool) -> Result<()> {
    let inputs = load_inputs_from_source(
        args.get_one::<String>("input"),
        args.get_one::<PathBuf>("inputs-file"),
    )?;
    let format = parse_format(args.get_one::<String>("format").map_or("auto", |s| s.as_str()))?;
    let escape = parse_escape(
        args.get_one::<String>("escape")
            .map_or("quote-swap", |s| s.as_str()),
    )?;
    let output = args.get_one::<PathBuf>("output");

    let source = DocumentSource::new()?;
    let graph = if args.get_flag("counter-ids") {
        load_graph(&source, &inputs, format, &mut CounterIds::new()).await?
    } else {
        load_graph(&source, &inputs, format, &mut UuidIds).await?
    };
    graph.validate()?;

    let compiler = Compiler::new(CompileOptions::default().with_escape(escape));
    let mut statements = compiler.graph(&graph).join(";\n");
    if !statements.is_empty() {
        statements.push_str(";\n");
    }

    match output {
        Some(path) => {
            save_report(&statements, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{} {} nodes and {} links written to {}",
                    "✓".green().bold(),
                    graph.nodes.len(),
                    graph.links.len(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", statements),
    }
    Ok(())
}

pub async fn handle_ingest(args: &ArgMatches, quiet: bool) -> Result<()> {
    let inputs = load_inputs_from_source(
        args.get_one::<String>("input"),
        args.get_one::<PathBuf>("inputs-file"),
    )?;
    let format = parse_format(args.get_one::<String>("format").map_or("auto", |s| s.as_str()))?;
    let escape = parse_escape(
        args.get_one::<String>("escape")
            .map_or("quote-swap", |s| s.as_str()),
    )?;
    let threads = *args.get_one::<usize>("threads").unwrap_or(&10);
    let report_format = args
        .get_one::<String>("report-format")
        .and_then(|s| ReportFormat::from_str(s))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");
    let db_path = resolve_db_path(
        args.get_one::<String>("db")
            .map_or(DEFAULT_DB_PATH, String::as_str),
    );

    if threads == 0 {
        bail!("--threads must be at least 1");
    }

    if !quiet {
        println!("\n{} Ingesting {} input(s)", "→".blue().bold(), inputs.len());
        println!("Database: {}", db_path.display().to_string().bright_white());
        println!("Workers: {}\n", threads);
    }

    let source = DocumentSource::new()?;
    let graph = load_graph(&source, &inputs, format, &mut UuidIds).await?;
    graph.validate()?;

    let store = prepare_store(&db_path, false).await?;
    let config = IngestConfig::new()
        .with_concurrency(threads)
        .with_compile_options(CompileOptions::default().with_escape(escape));
    let report = run_ingest(store.clone(), graph, &config, !quiet).await?;
    let stats = store.stats()?;

    let input_label = inputs.join(", ");
    let data = gather_report_data(&input_label, format.as_str(), threads, &report, Some(&stats));
    let rendered = match report_format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => generate_json_report(&data)?,
    };

    match output {
        Some(path) => {
            save_report(&rendered, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }

    if !report.is_complete() {
        let missing = report.nodes.unprocessed() + report.links.unprocessed();
        bail!("Ingestion incomplete: {} items were not written", missing);
    }
    if !quiet {
        println!("{} Ingestion complete", "✓".green().bold());
    }
    Ok(())
}

pub fn handle_stats(args: &ArgMatches) -> Result<()> {
    let db_path = resolve_db_path(
        args.get_one::<String>("db")
            .map_or(DEFAULT_DB_PATH, String::as_str),
    );
    if !SqliteGraphStore::exists(&db_path) {
        bail!(
            "No database at {}. Run `docgraph init` first.",
            db_path.display()
        );
    }

    let store = SqliteGraphStore::new(&db_path)?;
    let stats = store.stats()?;

    match args.get_one::<String>("format").map(String::as_str) {
        Some("json") => println!("{}", generate_stats_json(&stats)?),
        _ => {
            print_divider();
            println!(
                "{} {}",
                "  STORE".bright_white().bold(),
                db_path.display().to_string().bright_white()
            );
            print_divider();
            print!("{}", format_store_summary(&StoreSummary::from(&stats)));
        }
    }
    Ok(())
}
