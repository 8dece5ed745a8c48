//! CLI binary for paper2viz.
//!
//! A thin shim over the library crate: `extract` ingests PDFs and caches
//! facts, `visualize` runs the generation pipeline over cached facts, and
//! `categories` lists the extraction table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paper2viz::{
    category_names, extract_all, generate, ingest_pdf_file, resolve_provider, FactStore, Stage,
    StageSource, VizConfig, VizProgress,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal progress observer: one spinner that tracks the current stage and
/// live character counts while the render streams.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl VizProgress for CliProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(stage.name().to_string());
    }

    fn on_stage_complete(&self, stage: Stage, source: StageSource) {
        if source == StageSource::Fallback {
            self.bar
                .println(format!("  {} {} used its deterministic fallback", cyan("◆"), stage));
        }
    }

    fn on_stream_progress(&self, chunks: usize, chars: usize) {
        self.bar
            .set_message(format!("render  {chunks} chunks, {chars} chars"));
    }

    fn on_generation_complete(&self, markup_len: usize, streamed: bool) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} chars generated{}",
            green("✔"),
            bold(&markup_len.to_string()),
            if streamed { " (streamed)" } else { "" },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract all fact categories from a paper into ./data
  paper2viz extract paper.pdf --id neurosat

  # Extract only two categories
  paper2viz extract paper.pdf --id neurosat --categories contributions,experiments

  # Visualize every cached paper
  paper2viz visualize --query "Compare training procedures across papers"

  # Visualize a subset, writing to a file
  paper2viz visualize --query "Show me all contributions" \
      --papers neurosat,g4satbench -o contributions.html

  # List the extraction categories
  paper2viz categories

ENVIRONMENT VARIABLES:
  DEEPSEEK_API_KEY   API key for the default DeepSeek provider

SETUP:
  1. Set API key:  export DEEPSEEK_API_KEY=sk-...
  2. Extract:      paper2viz extract paper.pdf --id mypaper
  3. Visualize:    paper2viz visualize --query "Show me all contributions"
"#;

/// Generate HTML visualizations of research-paper facts using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "paper2viz",
    version,
    about = "Extract structured facts from research papers and generate HTML visualizations",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Data directory for cached facts and artifacts.
    #[arg(long, global = true, env = "PAPER2VIZ_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Model identifier.
    #[arg(long, global = true, env = "PAPER2VIZ_MODEL", default_value = "deepseek-chat")]
    model: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPER2VIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "PAPER2VIZ_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a PDF and cache extracted facts.
    Extract {
        /// Local PDF file path.
        input: PathBuf,

        /// Paper id under which facts are cached. Defaults to the file stem.
        #[arg(long)]
        id: Option<String>,

        /// Comma-separated category subset. Defaults to every category.
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },

    /// Generate an HTML visualization from cached facts.
    Visualize {
        /// Free-text visualization request.
        #[arg(long)]
        query: String,

        /// Comma-separated paper ids. Defaults to every cached paper.
        #[arg(long, value_delimiter = ',')]
        papers: Vec<String>,

        /// Write HTML to this file instead of stdout. Also saved under
        /// data/visualizations/.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the metadata record as JSON to stderr.
        #[arg(long)]
        metadata: bool,
    },

    /// List the extraction categories.
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        data_dir,
        model,
        verbose,
        quiet,
    } = Cli::parse();

    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides the feedback that matters.
    let filter = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let store = FactStore::new(&data_dir);

    match command {
        Command::Extract { input, id, categories } => {
            run_extract(&store, &model, quiet, input, id, categories).await
        }
        Command::Visualize { query, papers, output, metadata } => {
            run_visualize(&store, &model, quiet, query, papers, output, metadata).await
        }
        Command::Categories => {
            for name in category_names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

async fn run_extract(
    store: &FactStore,
    model: &str,
    quiet: bool,
    input: PathBuf,
    id: Option<String>,
    categories: Vec<String>,
) -> Result<()> {
    let paper_id = id.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "paper".to_string())
    });

    let config = VizConfig::builder().model(model).build()?;
    let provider = resolve_provider(&config)?;

    let paper = ingest_pdf_file(&input, &paper_id)
        .await
        .context("Failed to ingest PDF")?;
    store.save_paper(&paper).await?;

    if !quiet {
        eprintln!(
            "{} {} ({} pages)",
            cyan("◆"),
            bold(&paper.title),
            paper.num_pages
        );
    }

    let requested: Vec<&str> = if categories.is_empty() {
        category_names()
    } else {
        categories.iter().map(String::as_str).collect()
    };

    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new(requested.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Extracting");
        Some(bar)
    };

    for &category in &requested {
        if let Some(ref bar) = bar {
            bar.set_message(category.to_string());
        }
        let facts = extract_all(&provider, &[category], &paper, &config).await?;
        for (name, items) in &facts {
            store.save_facts(&paper_id, name, items).await?;
            if let Some(ref bar) = bar {
                bar.println(format!(
                    "  {} {:<16} {}",
                    green("✓"),
                    name,
                    dim(&format!("{} items", items.len()))
                ));
            }
        }
        if let Some(ref bar) = bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    if !quiet {
        eprintln!(
            "{} cached {} categories under {}",
            green("✔"),
            requested.len(),
            bold(&store.root().join(&paper_id).display().to_string()),
        );
    }
    Ok(())
}

async fn run_visualize(
    store: &FactStore,
    model: &str,
    quiet: bool,
    query: String,
    papers: Vec<String>,
    output: Option<PathBuf>,
    print_metadata: bool,
) -> Result<()> {
    let paper_ids = if papers.is_empty() {
        store.list_papers().await?
    } else {
        papers
    };
    if paper_ids.is_empty() {
        anyhow::bail!("No cached papers found. Run `paper2viz extract` first.");
    }

    let corpus = store.load_corpus(&paper_ids).await?;

    let mut builder = VizConfig::builder().model(model);
    if !quiet {
        builder = builder.progress(CliProgress::new());
    }
    let config = builder.build()?;

    let artifact = generate(&paper_ids, &query, &corpus, &config)
        .await
        .context("Visualization generation failed")?;

    if print_metadata {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&artifact.metadata)
                .context("Failed to serialise metadata")?
        );
    }

    match output {
        Some(path) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "visualization".to_string());
            let saved = store.save_artifact(&name, &artifact.markup).await?;
            tokio::fs::copy(&saved, &path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!("{} wrote {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(artifact.markup.as_bytes())
                .context("Failed to write to stdout")?;
            if !artifact.markup.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    Ok(())
}
