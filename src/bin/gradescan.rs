//! CLI binary for gradescan.
//!
//! A thin shim over the library crate that maps subcommands to library
//! calls and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gradescan::{
    compute_cgpa, ingest_result_card, performance_overview, semester_summary, GeminiVision,
    GradeStore, IngestConfig,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ingest a result-card photo for a student
  gradescan ingest --owner student-42 result_card.png

  # With an explicit API key and a custom database file
  GEMINI_API_KEY=... gradescan --db grades.db ingest --owner student-42 card.jpg

  # Cumulative GPA across all recorded semesters
  gradescan cgpa --owner student-42

  # One semester in detail
  gradescan semester --owner student-42 --semester 3

  # Best/worst semester and grade distribution
  gradescan performance --owner student-42

  # Remove data
  gradescan delete --owner student-42 --semester 3
  gradescan delete --owner student-42 --all

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Google Gemini API key (required for `ingest`)
  GRADESCAN_DB     Database file path (same as --db)

SETUP:
  1. Set API key:  export GEMINI_API_KEY=...
  2. Ingest:       gradescan ingest --owner student-42 result_card.png
"#;

/// Extract grades from result-card images and compute SGPA/CGPA.
#[derive(Parser, Debug)]
#[command(
    name = "gradescan",
    version,
    about = "Extract grades from result-card images and compute SGPA/CGPA",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// SQLite database file (created if missing).
    #[arg(long, env = "GRADESCAN_DB", default_value = "gradescan.db", global = true)]
    db: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one result-card image and store its grades.
    Ingest {
        /// Path to the result-card image (PNG or JPEG).
        image: PathBuf,

        /// Owner identity the grades belong to.
        #[arg(long)]
        owner: String,

        /// Vision model ID.
        #[arg(long, env = "GRADESCAN_MODEL", default_value = "gemini-1.5-flash")]
        model: String,

        /// Retries on transient provider failures.
        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        /// Per-call API timeout in seconds.
        #[arg(long, default_value_t = 60)]
        api_timeout: u64,
    },

    /// Cumulative GPA across every recorded semester.
    Cgpa {
        #[arg(long)]
        owner: String,
    },

    /// Detailed summary of a single semester.
    Semester {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        semester: i64,
    },

    /// Best/worst semester, average SGPA, and grade distribution.
    Performance {
        #[arg(long)]
        owner: String,
    },

    /// Delete grades: one semester, one upload record, or everything.
    Delete {
        #[arg(long)]
        owner: String,

        /// Delete this semester's grades.
        #[arg(long, conflicts_with_all = ["all", "upload"])]
        semester: Option<i64>,

        /// Delete one upload audit record by id.
        #[arg(long, conflicts_with_all = ["all", "semester"])]
        upload: Option<String>,

        /// Delete all grades and upload records for the owner.
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = GradeStore::open(&cli.db)
        .await
        .with_context(|| format!("Failed to open database at {}", cli.db))?;

    match cli.command {
        Command::Ingest {
            image,
            owner,
            model,
            max_retries,
            api_timeout,
        } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read image {:?}", image))?;
            let content_type = guess_content_type(&image);
            let filename = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.display().to_string());

            let config = IngestConfig::builder()
                .model(model)
                .max_retries(max_retries)
                .api_timeout_secs(api_timeout)
                .build()
                .context("Invalid configuration")?;
            let vision = GeminiVision::new(&config).context("Vision provider not configured")?;

            let outcome =
                ingest_result_card(&store, &vision, &owner, &filename, content_type, &bytes, &config)
                    .await
                    .context("Ingestion failed")?;
            print_json(&outcome)?;
        }

        Command::Cgpa { owner } => {
            let summary = compute_cgpa(&store, &owner)
                .await
                .context("Failed to compute CGPA")?;
            print_json(&summary)?;
        }

        Command::Semester { owner, semester } => {
            match semester_summary(&store, &owner, semester)
                .await
                .context("Failed to summarize semester")?
            {
                Some(summary) => print_json(&summary)?,
                None => anyhow::bail!("No grades recorded for semester {semester}"),
            }
        }

        Command::Performance { owner } => {
            let overview = performance_overview(&store, &owner)
                .await
                .context("Failed to compute performance overview")?;
            print_json(&overview)?;
        }

        Command::Delete {
            owner,
            semester,
            upload,
            all,
        } => {
            let outcome = if all {
                store.delete_all_for_owner(&owner).await
            } else if let Some(semester) = semester {
                store.delete_semester(&owner, semester).await
            } else if let Some(upload_id) = upload {
                store.delete_upload(&owner, &upload_id).await
            } else {
                anyhow::bail!("Specify --all, --semester <N>, or --upload <ID>");
            }
            .context("Delete failed")?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialise output")?
    );
    Ok(())
}

/// Content type from the file extension; the library re-validates it.
fn guess_content_type(path: &PathBuf) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}
