mod config;
mod db;
mod emit;
mod error;
mod export;
mod model;
mod parser;
mod scanner;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Settings;
use crate::emit::{compile_corpus, CountingSink};
use crate::export::{ExportFormat, JsonLinesSink, SqlScriptSink};
use crate::scanner::SourceDocument;

#[derive(Parser)]
#[command(name = "laws_compiler", about = "Compile the Murphy's laws markdown corpus into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the corpus into a SQLite database in one transaction
    Compile {
        /// Corpus root directory (default: settings `corpus_dir`)
        corpus: Option<PathBuf>,
        /// Database file (default: settings `db_path`)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Write the import as a replayable .sql script or a .jsonl record stream
    Export {
        corpus: Option<PathBuf>,
        /// Destination file
        #[arg(short, long)]
        out: PathBuf,
        /// Output format (default: inferred from the --out extension)
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// Apply a previously exported .sql script to a database
    Apply {
        script: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Parse the corpus and report counts without writing anything
    Check { corpus: Option<PathBuf> },
    /// Show row counts of a compiled database
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    let result = match cli.command {
        Commands::Compile { corpus, db } => {
            let settings = settings.with_overrides(corpus, db);
            info!(settings = ?settings, "compiling corpus into database");
            let docs = load(&settings.corpus_dir)?;

            let conn = db::connect(&settings.db_path)
                .with_context(|| format!("opening {}", settings.db_path.display()))?;
            db::init_schema(&conn)?;

            let pb = progress_bar(docs.len())?;
            let counts = compile_corpus(&docs, db::SqliteSink::begin(&conn)?, &pb)
                .context("import rolled back")?;
            pb.finish_and_clear();
            counts.print();
            Ok(())
        }
        Commands::Export { corpus, out, format } => {
            let settings = settings.with_overrides(corpus, None);
            let format = format
                .or_else(|| ExportFormat::from_path(&out))
                .ok_or_else(|| {
                    anyhow!("cannot infer format from {}; pass --format", out.display())
                })?;
            info!(settings = ?settings, ?format, out = %out.display(), "exporting corpus");
            let docs = load(&settings.corpus_dir)?;

            let pb = progress_bar(docs.len())?;
            let counts = match format {
                ExportFormat::Sql => compile_corpus(&docs, SqlScriptSink::create(&out)?, &pb),
                ExportFormat::Jsonl => compile_corpus(&docs, JsonLinesSink::create(&out)?, &pb),
            }
            .context("export aborted")?;
            pb.finish_and_clear();
            counts.print();
            println!("Wrote {}", out.display());
            Ok(())
        }
        Commands::Apply { script, db } => {
            let settings = settings.with_overrides(None, db);
            let sql = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let conn = db::connect(&settings.db_path)
                .with_context(|| format!("opening {}", settings.db_path.display()))?;
            db::init_schema(&conn)?;
            db::apply_script(&conn, &sql)
                .with_context(|| format!("applying {}", script.display()))?;
            info!(script = %script.display(), db = %settings.db_path.display(), "script applied");
            print_stats(&db::get_stats(&conn)?);
            Ok(())
        }
        Commands::Check { corpus } => {
            let settings = settings.with_overrides(corpus, None);
            let docs = load(&settings.corpus_dir)?;
            let counts = compile_corpus(&docs, CountingSink::new(), &ProgressBar::hidden())?;
            counts.print();
            Ok(())
        }
        Commands::Stats { db } => {
            let settings = settings.with_overrides(None, db);
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            print_stats(&db::get_stats(&conn)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load(corpus: &Path) -> anyhow::Result<Vec<SourceDocument>> {
    let docs = scanner::load_corpus(corpus)
        .with_context(|| format!("scanning corpus {}", corpus.display()))?;
    info!(documents = docs.len(), corpus = %corpus.display(), "corpus loaded");
    Ok(docs)
}

fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn print_stats(s: &db::Stats) {
    println!("Categories:     {}", s.categories);
    println!("Laws:           {}", s.laws);
    println!("Category links: {}", s.category_links);
    println!("Attributions:   {}", s.attributions);
    println!("Relations:      {} ({} corollaries)", s.relations, s.corollaries);
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
