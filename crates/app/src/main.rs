use std::fmt;
use std::io::{BufRead, Write};

use lms_core::model::{
    AnswerDraft, AnswerRecord, CandidateId, LearningId, LearningKey, LearningType, Question,
};
use lms_core::phase::{ScoreReport, ScoreSource};
use lms_core::time::format_offset;
use services::{AppServices, LearningProgress, PhaseHost, PhaseSessionError};
use storage::rest::ListStoreConfig;

mod config;
mod logging;

use config::Config;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCandidate { raw: String },
    InvalidLearningId { raw: String },
    InvalidType { raw: String },
    InvalidSeconds { flag: &'static str, raw: String },
    MissingCandidate,
    MissingLearningId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCandidate { raw } => write!(f, "invalid --candidate value: {raw}"),
            ArgsError::InvalidLearningId { raw } => {
                write!(f, "invalid --learning-id value: {raw:?}")
            }
            ArgsError::InvalidType { raw } => {
                write!(f, "invalid --type value (Policy, Orientation or Training): {raw}")
            }
            ArgsError::InvalidSeconds { flag, raw } => {
                write!(f, "invalid {flag} value (positive seconds): {raw}")
            }
            ArgsError::MissingCandidate => {
                write!(f, "a candidate is required (--candidate or LMS_CANDIDATE_ID)")
            }
            ArgsError::MissingLearningId => write!(f, "--learning-id is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn positive_seconds(flag: &'static str, raw: String) -> Result<f64, ArgsError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ArgsError::InvalidSeconds { flag, raw }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Assess,
    Status,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "assess" => Some(Self::Assess),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    candidate: CandidateId,
    learning: LearningKey,
    duration: f64,
    tick: f64,
}

impl Args {
    fn parse(
        config: &Config,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = config.db_url.clone();
        let mut candidate = config.candidate;
        let mut learning_type = LearningType::Training;
        let mut learning_id = None;
        let mut duration = 600.0;
        let mut tick = 0.5;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--candidate" => {
                    let value = require_value(args, "--candidate")?;
                    let parsed: u64 = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidCandidate { raw: value.clone() })?;
                    candidate = Some(CandidateId::new(parsed));
                }
                "--learning-id" => {
                    let value = require_value(args, "--learning-id")?;
                    learning_id = Some(
                        LearningId::new(value.clone())
                            .ok_or(ArgsError::InvalidLearningId { raw: value })?,
                    );
                }
                "--type" => {
                    let value = require_value(args, "--type")?;
                    learning_type = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidType { raw: value.clone() })?;
                }
                "--duration" => {
                    duration = positive_seconds("--duration", require_value(args, "--duration")?)?;
                }
                "--tick" => {
                    tick = positive_seconds("--tick", require_value(args, "--tick")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url: normalize_sqlite_url(db_url),
            candidate: candidate.ok_or(ArgsError::MissingCandidate)?,
            learning: LearningKey::new(
                learning_type,
                learning_id.ok_or(ArgsError::MissingLearningId)?,
            ),
            duration,
            tick,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play   --learning-id <id> [options]");
    eprintln!("  cargo run -p app -- assess --learning-id <id> [options]");
    eprintln!("  cargo run -p app -- status --learning-id <id> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://lms.sqlite3)");
    eprintln!("  --candidate <id>          Candidate id (default: LMS_CANDIDATE_ID)");
    eprintln!("  --learning-id <id>        Learning item id");
    eprintln!("  --type <learning_type>    Policy, Orientation or Training (default: Training)");
    eprintln!("  --duration <seconds>      Simulated video length for play (default: 600)");
    eprintln!("  --tick <seconds>          Playback update interval for play (default: 0.5)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, LMS_CANDIDATE_ID, LMS_LOG, LMS_LOG_DIR, LMS_PERSIST_TIMEOUT_MS");
    eprintln!("  LMS_LIST_URL, LMS_LIST_TOKEN (use the list-store service instead of SQLite)");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn build_services(
    config: &Config,
    args: &Args,
) -> Result<AppServices, Box<dyn std::error::Error>> {
    let settings = config.session_settings();
    if let Some(url) = &config.list_store_url {
        let mut list_config = ListStoreConfig::new(url)?;
        if let Some(token) = &config.list_store_token {
            list_config = list_config.with_bearer_token(token.clone());
        }
        tracing::info!(site = %list_config.site_url, "using list store");
        return Ok(AppServices::new_list_store(list_config, settings)?);
    }

    prepare_sqlite_file(&args.db_url)?;
    tracing::info!(db = %args.db_url, "using sqlite store");
    Ok(AppServices::new_sqlite(&args.db_url, settings).await?)
}

// ─── CONSOLE HOST ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct ConsoleHost {
    position: f64,
    due: Vec<Question>,
}

impl PhaseHost for ConsoleHost {
    fn pause(&mut self) {
        println!("|| paused at {}", format_offset(self.position));
    }

    fn resume(&mut self) {
        println!("> resumed at {}", format_offset(self.position));
    }

    fn on_due(&mut self, questions: &[Question]) {
        self.due = questions.to_vec();
    }

    fn on_score_available(&mut self, report: ScoreReport) {
        let origin = match report.source {
            ScoreSource::Persisted => "already completed",
            ScoreSource::Session => "all phases answered",
        };
        println!("score: {}/{} ({origin})", report.score, report.total);
    }
}

/// Ask every question on stdin until each has a selection.
fn read_answers(
    questions: &[Question],
    input: &mut impl BufRead,
) -> Result<Vec<AnswerRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::with_capacity(questions.len());
    for question in questions {
        println!();
        println!("{} ({})", question.prompt(), question.question_type());
        for (index, option) in question.options().iter().enumerate() {
            println!("  {}) {option}", index + 1);
        }

        let draft = loop {
            print!("answer (numbers, comma separated): ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err("stdin closed before all questions were answered".into());
            }

            let mut draft = AnswerDraft::new(question);
            let picked: Result<(), String> = line
                .split(',')
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
                .try_for_each(|raw| {
                    let option = raw
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| question.options().get(i))
                        .ok_or_else(|| format!("no option {raw}"))?;
                    draft.pick(option).map_err(|e| e.to_string())
                });
            match picked {
                Ok(()) if !draft.is_empty() => break draft,
                Ok(()) => println!("pick at least one option"),
                Err(message) => println!("{message}"),
            }
        };
        records.push(draft.into_record()?);
    }
    Ok(records)
}

async fn play(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let phase_sessions = services.phase_sessions();
    let mut host = ConsoleHost::default();
    let mut session = phase_sessions
        .start(args.learning.clone(), args.candidate, &mut host)
        .await?;
    println!(
        "playing {} for candidate {} ({} questions)",
        args.learning,
        args.candidate,
        session.scheduler().total()
    );

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut step: u32 = 0;
    loop {
        let position = f64::from(step) * args.tick;
        if position > args.duration {
            break;
        }
        host.position = position;

        if session.on_time_update(position, &mut host) {
            let due = std::mem::take(&mut host.due);
            loop {
                let answers = read_answers(&due, &mut input)?;
                match phase_sessions
                    .on_quiz_complete(&mut session, &answers, &mut host)
                    .await
                {
                    Ok(done) => {
                        if !done.persist.is_saved() {
                            println!(
                                "warning: score not saved ({:?}), kept for this session only",
                                done.persist
                            );
                        }
                        break;
                    }
                    Err(PhaseSessionError::Submission(err)) => println!("{err}"),
                    Err(err) => return Err(err.into()),
                }
            }
        }
        step = step.saturating_add(1);
    }

    println!("playback ended at {}", format_offset(args.duration));
    Ok(())
}

async fn assess(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let assessments = services.assessments();
    let assessment = assessments
        .start(
            args.learning.learning_type,
            args.learning.learning_id.clone(),
            args.candidate,
        )
        .await?;
    if let Some(previous) = assessment.previous() {
        println!("previous attempt: {} ({})", previous.score, previous.status);
    }

    let stdin = std::io::stdin();
    let answers = read_answers(assessment.questions(), &mut stdin.lock())?;
    let result = assessments.submit(&assessment, &answers).await?;
    println!(
        "score: {}/{} {}",
        result.outcome.score, result.outcome.total, result.outcome.status
    );
    if !result.persist.is_saved() {
        println!("warning: score not saved");
    }
    Ok(())
}

async fn status(services: &AppServices, args: &Args) {
    let progress = services
        .progress()
        .progress(
            args.learning.learning_type,
            args.learning.learning_id.clone(),
            args.candidate,
        )
        .await;
    match progress {
        LearningProgress::NotStarted { total } => {
            println!("{}: not started ({total} questions)", args.learning);
        }
        LearningProgress::InProgress { answered, total } => {
            println!("{}: in progress ({answered}/{total} answered)", args.learning);
        }
        LearningProgress::Completed {
            score,
            total,
            status,
        } => println!("{}: completed, {score}/{total} {status}", args.learning),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let _log_guard = logging::init_tracing(&config.log_filter, config.log_dir.as_deref());

    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next().as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.to_owned())
        })?,
    };

    let args = Args::parse(&config, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = build_services(&config, &args).await?;
    match cmd {
        Command::Play => play(&services, &args).await,
        Command::Assess => assess(&services, &args).await,
        Command::Status => {
            status(&services, &args).await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
