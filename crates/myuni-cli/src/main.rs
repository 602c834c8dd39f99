//! `myuni`: student enrolment views and study-week calendars.
//!
//! # Usage
//!
//! ```
//! myuni degrees --student 480000000
//! myuni credits --input enrolment.json
//! myuni weeks 2024-S1C 2024-S2C
//! myuni weeks --input dates.json 2024-S1C
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use myuni_core::{
  calendar::CalendarRecords,
  credits::aggregate_credits,
  degrees::aggregate_degrees,
  enrolment::StudentRecord,
  info::student_info,
  service::{StudentService, current_year, fetch_study_weeks},
  source::{CourseCatalog, StaticCatalog},
  weeks::build_study_weeks,
};
use myuni_upstream::{
  CachedSecrets, CalendarClient, EnvSecrets, SoapCatalog, StudentApiClient,
  config::{CalendarConfig, CatalogConfig, StudentApiConfig},
  student::parse_enrolment_list,
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "myuni", version, about = "Student enrolment views and study weeks")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "myuni.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Degrees with their periods and units of study.
  Degrees(StudentArgs),
  /// Yearly and total credits per active course.
  Credits(StudentArgs),
  /// Campus, name and academic summary per active course.
  Info(StudentArgs),
  /// Study weeks for sessions such as `2024-S1C`.
  Weeks {
    /// Session keys, `{year}-{sessionId}`.
    #[arg(required = true)]
    sessions: Vec<String>,

    /// Read the calendar feed from a JSON file instead of fetching it.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
  },
}

#[derive(Args)]
struct StudentArgs {
  /// Student id to fetch from the enrolment API.
  #[arg(long, required_unless_present = "input", conflicts_with = "input")]
  student: Option<String>,

  /// Read the enrolment record from a JSON file instead.
  #[arg(long, value_name = "FILE")]
  input: Option<PathBuf>,

  /// Year whose results are withheld (default: this year).
  #[arg(long)]
  current_year: Option<i32>,
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct Settings {
  #[serde(default)]
  student:        StudentApiConfig,
  #[serde(default)]
  catalog:        CatalogConfig,
  #[serde(default)]
  calendar:       CalendarConfig,
  /// Route code → total credits. When set, used in place of the SOAP catalog.
  #[serde(default)]
  course_credits: HashMap<String, u32>,
}

fn load_settings(path: &Path) -> Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("MYUNI").separator("__"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli.config)?;

  match cli.command {
    Command::Degrees(args) => run_student(View::Degrees, args, settings).await,
    Command::Credits(args) => run_student(View::Credits, args, settings).await,
    Command::Info(args) => run_student(View::Info, args, settings).await,
    Command::Weeks { sessions, input } => run_weeks(&sessions, input.as_deref(), &settings).await,
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{out}");
  Ok(())
}

// ─── Student views ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum View {
  Degrees,
  Credits,
  Info,
}

async fn run_student(view: View, args: StudentArgs, settings: Settings) -> Result<()> {
  if settings.course_credits.is_empty() {
    let catalog = SoapCatalog::new(&settings.catalog).context("failed to build catalog client")?;
    return render_student(view, args, settings.student, catalog).await;
  }

  tracing::info!(routes = settings.course_credits.len(), "using configured course credits");
  // Route codes are upper case upstream; config keys may not be.
  let catalog: StaticCatalog = settings
    .course_credits
    .into_iter()
    .map(|(route, credits)| (route.trim().to_uppercase(), credits))
    .collect();
  render_student(view, args, settings.student, catalog).await
}

async fn render_student<C: CourseCatalog>(
  view: View,
  args: StudentArgs,
  student_config: StudentApiConfig,
  catalog: C,
) -> Result<()> {
  let year = args.current_year.unwrap_or_else(current_year);

  if let Some(path) = &args.input {
    let record = read_student_record(path)?;
    return match view {
      View::Degrees => print_json(&aggregate_degrees(&record, year)?),
      View::Credits => print_json(&aggregate_credits(&record, &catalog).await?),
      View::Info => print_json(&student_info(&record)?),
    };
  }

  let Some(student_id) = args.student.as_deref() else {
    anyhow::bail!("either --student or --input is required");
  };
  tracing::info!(student_id, ?view, "fetching enrolment");

  let source = StudentApiClient::new(student_config, CachedSecrets::new(EnvSecrets));
  let service = StudentService::new(source, catalog).with_current_year(year);
  match view {
    View::Degrees => print_json(&service.degrees(student_id).await?),
    View::Credits => print_json(&service.credits(student_id).await?),
    View::Info => print_json(&service.info(student_id).await?),
  }
}

/// A student record from a file holding either the record itself or a whole
/// enrolment list response.
fn read_student_record(path: &Path) -> Result<StudentRecord> {
  let value = read_json(path)?;
  if value.get("students").is_some() {
    parse_enrolment_list(value)?
      .with_context(|| format!("no students in {}", path.display()))
  } else {
    serde_json::from_value(value).with_context(|| format!("{} is not a student record", path.display()))
  }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
  let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

// ─── Study weeks ─────────────────────────────────────────────────────────────

async fn run_weeks(sessions: &[String], input: Option<&Path>, settings: &Settings) -> Result<()> {
  let weeks = match input {
    Some(path) => {
      let records = CalendarRecords::from_json(read_json(path)?)
        .with_context(|| format!("{} is not a calendar feed", path.display()))?;
      build_study_weeks(&records, sessions)
    }
    None => {
      let feed = CalendarClient::new(&settings.calendar).context("failed to build calendar client")?;
      fetch_study_weeks(&feed, sessions).await
    }
  };
  tracing::info!(requested = sessions.len(), built = weeks.len(), "study weeks ready");
  print_json(&weeks)
}
