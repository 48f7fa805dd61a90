use std::fmt;

use lms_core::model::{LearningId, LearningType};
use storage::repository::{QuestionRow, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    learning_type: LearningType,
    learning_id: LearningId,
    spacing_secs: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLearningId { raw: String },
    InvalidType { raw: String },
    InvalidSpacing { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLearningId { raw } => {
                write!(f, "invalid --learning-id value: {raw:?}")
            }
            ArgsError::InvalidType { raw } => {
                write!(f, "invalid --type value (Policy, Orientation or Training): {raw}")
            }
            ArgsError::InvalidSpacing { raw } => write!(f, "invalid --spacing value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite://lms.sqlite3".into());
        let mut learning_type = LearningType::Training;
        let mut learning_id = LearningId::new("TR-001")
            .ok_or_else(|| ArgsError::InvalidLearningId { raw: "TR-001".into() })?;
        let mut spacing_secs = 30_u32;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--type" => {
                    let value = require_value(&mut args, "--type")?;
                    learning_type = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidType { raw: value.clone() })?;
                }
                "--learning-id" => {
                    let value = require_value(&mut args, "--learning-id")?;
                    learning_id = LearningId::new(value.clone())
                        .ok_or(ArgsError::InvalidLearningId { raw: value })?;
                }
                "--spacing" => {
                    let value = require_value(&mut args, "--spacing")?;
                    spacing_secs = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidSpacing { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learning_type,
            learning_id,
            spacing_secs,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://lms.sqlite3)");
    eprintln!("  --type <learning_type>    Policy, Orientation or Training (default: Training)");
    eprintln!("  --learning-id <id>        Learning item id (default: TR-001)");
    eprintln!("  --spacing <seconds>       Seconds between quiz phases (default: 30)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL");
}

fn hms(total_secs: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    )
}

/// Sample bank: `(prompt, options, answer, type, phase)`. Phase 2 holds two
/// questions sharing one offset.
const SAMPLES: [(&str, [Option<&str>; 4], &str, &str, u32); 5] = [
    (
        "Who may approve a visitor badge?",
        [Some("Reception"), Some("Any employee"), Some("Security"), None],
        "Security",
        "Single",
        1,
    ),
    (
        "Which of these are personal protective equipment?",
        [Some("Gloves"), Some("Goggles"), Some("Lanyard"), Some("Helmet")],
        "Gloves:Goggles:Helmet",
        "Multiple",
        2,
    ),
    (
        "Where is the assembly point?",
        [Some("Car park"), Some("Lobby"), None, None],
        "Car park",
        "Single",
        2,
    ),
    (
        "Report a data incident within how many hours?",
        [Some("24"), Some("48"), Some("72"), None],
        "24",
        "Single",
        3,
    ),
    (
        "Which channels may carry customer data?",
        [Some("Encrypted mail"), Some("Personal chat"), Some("Approved file share"), None],
        "Encrypted mail:Approved file share",
        "Multiple",
        4,
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for (index, (prompt, options, answer, kind, phase)) in SAMPLES.iter().enumerate() {
        let row = QuestionRow {
            id: u64::try_from(index)? + 1,
            learning_type: args.learning_type,
            learning_id: args.learning_id.clone(),
            prompt: Some((*prompt).to_owned()),
            options: options.map(|o| o.map(str::to_owned)),
            answer: Some((*answer).to_owned()),
            question_type: Some((*kind).to_owned()),
            phase_duration: Some(hms(phase * args.spacing_secs)),
        };
        storage.questions.upsert_question(&row).await?;
    }

    println!(
        "Seeded {} questions for {}/{} into {}",
        SAMPLES.len(),
        args.learning_type,
        args.learning_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
