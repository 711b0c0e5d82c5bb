use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use course_core::model::{CourseId, LearnerId, MaterialId};
use course_core::{MaterialOrdering, decode_course};
use services::{
    AdvanceOutcome, AppServices, Clock, CourseProgressService, HttpSourceConfig, LoadState,
};
use storage::repository::{CourseRepository, Storage};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(author, version, about = "Course progress tooling", long_about = None)]
struct Cli {
    /// SQLite database URL or path
    #[arg(long = "db", env = "COURSE_DB_URL", default_value = "sqlite://dev.sqlite3")]
    db_url: String,

    /// Learner whose enrollment is read and updated
    #[arg(long, env = "COURSE_LEARNER_ID", default_value_t = 1)]
    learner_id: u64,

    /// Keep materials in payload order instead of sorting by `order`
    #[arg(long)]
    as_received: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a course from a JSON payload file
    Seed {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the learner's progress through a stored course
    Show {
        #[arg(long)]
        course_id: u64,
    },
    /// Move the learner's cursor forward
    Advance {
        #[arg(long)]
        course_id: u64,
        /// Target material; defaults to the one after the cursor
        #[arg(long)]
        to: Option<u64>,
    },
    /// Load a course from the remote course API and print progress
    Fetch {
        #[arg(long)]
        course_id: u64,
        #[arg(long, env = "COURSE_API_URL")]
        api_url: String,
        #[arg(long, env = "COURSE_API_TOKEN", hide_env_values = true)]
        api_token: Option<String>,
    },
}

fn init_log() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("init log failed: {e}"))
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

async fn open_storage(raw_url: &str) -> anyhow::Result<Storage> {
    let db_url = normalize_sqlite_url(raw_url);
    prepare_sqlite_file(&db_url)?;
    Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))
}

async fn load_and_print(
    loader: &CourseProgressService,
    course_id: CourseId,
    learner_id: LearnerId,
) -> anyhow::Result<()> {
    loader.load(course_id, learner_id).await;
    match loader.state() {
        LoadState::Loaded(loaded) => {
            print!("{}", report::render(&loaded.progress));
            Ok(())
        }
        LoadState::Failed { error, .. } => bail!("loading course {course_id}: {error}"),
        LoadState::Idle | LoadState::Loading { .. } => {
            bail!("loading course {course_id} did not complete")
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let clock = Clock::system();
    let ordering = if cli.as_received {
        MaterialOrdering::AsReceived
    } else {
        MaterialOrdering::ByOrderField
    };
    let learner_id = LearnerId::new(cli.learner_id);
    let storage = open_storage(&cli.db_url).await?;

    match cli.command {
        Command::Seed { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let course = decode_course(&bytes)
                .with_context(|| format!("decoding {}", file.display()))?;
            storage.courses.upsert_course(&course).await?;
            tracing::info!(
                course_id = %course.id,
                lessons = course.total_lessons(),
                "course stored"
            );
            println!("stored course {} ({})", course.id, course.title);
        }
        Command::Show { course_id } => {
            let app = AppServices::new(storage, clock, ordering);
            load_and_print(&app.course_progress(), CourseId::new(course_id), learner_id).await?;
        }
        Command::Advance { course_id, to } => {
            let course_id = CourseId::new(course_id);
            let app = AppServices::new(storage, clock, ordering);
            let enrollments = app.enrollments();
            enrollments.enroll(course_id, learner_id).await?;

            let outcome = match to {
                Some(target) => {
                    enrollments
                        .advance_to(course_id, learner_id, MaterialId::new(target))
                        .await?
                }
                None => enrollments.complete_current(course_id, learner_id).await?,
            };
            match outcome {
                AdvanceOutcome::Moved { to, .. } => println!("cursor moved to material {to}"),
                AdvanceOutcome::AlreadyPast => println!("cursor is already past that material"),
                AdvanceOutcome::AtEnd => println!("course already finished"),
            }
        }
        Command::Fetch {
            course_id,
            api_url,
            api_token,
        } => {
            let config = HttpSourceConfig::new(&api_url, api_token)
                .with_context(|| format!("invalid api url: {api_url}"))?;
            let app = AppServices::new_remote(storage, clock, ordering, config);
            load_and_print(&app.course_progress(), CourseId::new(course_id), learner_id).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log()?;
    run(Cli::parse()).await
}
