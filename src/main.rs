use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pagedoc::config::Settings;
use pagedoc::{capture, db, render, Labels};

const PREVIEW_CHARS: usize = 2000;

#[derive(Parser)]
#[command(name = "pagedoc", about = "Turn captured web pages into markdown documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one capture file to markdown
    Render {
        /// Capture JSON (title, body_text, fragments)
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a shortened preview instead of the full document
        #[arg(long)]
        preview: bool,
    },
    /// Render every capture in a directory
    Batch {
        /// Directory with *.json captures
        dir: PathBuf,
        /// Directory for the .md files
        out_dir: PathBuf,
    },
    /// Render a capture and store it in the archive
    Archive {
        input: PathBuf,
    },
    /// List archived documents
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Print an archived document
    Show {
        id: i64,
    },
    /// Show archive statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading PAGEDOC_* settings")?;
    let labels = settings.labels();

    let result = match cli.command {
        Commands::Render {
            input,
            output,
            preview,
        } => {
            let page = capture::load_capture(&input)?;
            let doc = render(&page, &labels);
            info!(
                "Rendered '{}': {} sections, {} fragments ({} inlined, {} appended, {} missing)",
                doc.title,
                doc.section_count,
                doc.fragment_count,
                doc.stats.inlined,
                doc.stats.appended,
                doc.stats.missing
            );
            match (&output, preview) {
                (_, true) => println!("{}", preview_text(&doc.markdown)),
                (None, false) => println!("{}", doc.markdown),
                (Some(_), false) => {}
            }
            if let Some(path) = output {
                write_markdown(&path, &doc.markdown)?;
                eprintln!("Saved {}", path.display());
            }
            Ok(())
        }
        Commands::Batch { dir, out_dir } => {
            let pages = capture::load_capture_dir(&dir)?;
            if pages.is_empty() {
                println!("No captures found in {}.", dir.display());
                return Ok(());
            }
            println!("Rendering {} captures...", pages.len());
            let written = render_batch(&pages, &out_dir, &labels)?;
            println!("Wrote {} documents to {}", written, out_dir.display());
            Ok(())
        }
        Commands::Archive { input } => {
            let page = capture::load_capture(&input)?;
            let doc = render(&page, &labels);
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let id = db::save_document(&conn, &page, &doc)?;
            println!(
                "Archived '{}' as #{} ({} sections, {} fragments)",
                doc.title, id, doc.section_count, doc.fragment_count
            );
            Ok(())
        }
        Commands::List { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::list_documents(&conn, limit)?;
            if rows.is_empty() {
                println!("Archive is empty. Run 'archive' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<32} | {:>4} | {:>4} | {:<19} | {:<30}",
                "#", "Title", "Sec", "Code", "Created", "URL"
            );
            println!("{}", "-".repeat(108));
            for r in &rows {
                println!(
                    "{:>4} | {:<32} | {:>4} | {:>4} | {:<19} | {:<30}",
                    r.id,
                    truncate(&r.title, 32),
                    r.section_count,
                    r.fragment_count,
                    r.created_at,
                    truncate(&r.url, 30)
                );
            }
            println!("\n{} documents", rows.len());
            Ok(())
        }
        Commands::Show { id } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            match db::fetch_document(&conn, id)? {
                Some(row) => println!("{}", row.markdown),
                None => println!("No document #{}.", id),
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Documents: {}", s.documents);
            println!("Fragments: {}", s.fragments);
            println!("Inlined:   {}", s.inlined);
            println!("Appended:  {}", s.appended);
            println!("Missing:   {}", s.missing);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn render_batch(
    pages: &[(PathBuf, pagedoc::PipelineInput)],
    out_dir: &Path,
    labels: &Labels,
) -> anyhow::Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<anyhow::Result<()>> = pages
        .par_iter()
        .map(|(path, page)| {
            let doc = render(page, labels);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".into());
            let target = out_dir.join(format!("{}.md", stem));
            let written = write_markdown(&target, &doc.markdown);
            if doc.stats.missing > 0 {
                warn!(
                    "{}: {} placeholders had no code fragment",
                    path.display(),
                    doc.stats.missing
                );
            }
            pb.inc(1);
            written
        })
        .collect();

    pb.finish_and_clear();

    let mut written = 0;
    for r in results {
        r?;
        written += 1;
    }
    Ok(written)
}

fn write_markdown(path: &Path, markdown: &str) -> anyhow::Result<()> {
    std::fs::write(path, markdown).with_context(|| format!("writing {}", path.display()))
}

fn preview_text(markdown: &str) -> String {
    if markdown.chars().count() < PREVIEW_CHARS {
        markdown.to_string()
    } else {
        let head: String = markdown.chars().take(PREVIEW_CHARS).collect();
        format!("{}\n...(gekürzt)", head)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
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
