use std::fmt;

use chrono::{DateTime, Utc};
use storage::repository::Storage;
use tutor_core::model::{
    AssessmentQuestion, ProficiencyLevel, QuestionId, ScorableQuestion, SkillType, Task,
    TaskContent, TaskId, TaskQuestion,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
    drafts: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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
        let mut db_url = std::env::var("TUTOR_DB_URL")
            .unwrap_or_else(|_| "sqlite:tutor.sqlite3?mode=rwc".into());
        let mut now: Option<DateTime<Utc>> = None;
        let mut drafts = false;

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
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--drafts" => drafts = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, now, drafts })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:tutor.sqlite3?mode=rwc)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  --drafts                  Leave tasks unpublished");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  TUTOR_DB_URL");
}

fn options(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// (level, skill, text, options, correct index)
type QuestionRow = (
    ProficiencyLevel,
    SkillType,
    &'static str,
    &'static [&'static str],
    u32,
);

const PLACEMENT: &[QuestionRow] = &[
    (
        ProficiencyLevel::A1,
        SkillType::Grammar,
        "She ___ a teacher.",
        &["are", "is", "am", "be"],
        1,
    ),
    (
        ProficiencyLevel::A1,
        SkillType::Vocabulary,
        "Which word is a colour?",
        &["table", "green", "run", "happy"],
        1,
    ),
    (
        ProficiencyLevel::A2,
        SkillType::Grammar,
        "Yesterday we ___ to the cinema.",
        &["go", "goes", "went", "gone"],
        2,
    ),
    (
        ProficiencyLevel::A2,
        SkillType::Vocabulary,
        "You keep food cold in a ___.",
        &["oven", "fridge", "drawer", "sink"],
        1,
    ),
    (
        ProficiencyLevel::B1,
        SkillType::Grammar,
        "If it rains, we ___ at home.",
        &["stay", "will stay", "stayed", "would stay"],
        1,
    ),
    (
        ProficiencyLevel::B1,
        SkillType::Vocabulary,
        "To 'put off' a meeting means to ___ it.",
        &["cancel", "postpone", "attend", "organise"],
        1,
    ),
    (
        ProficiencyLevel::B2,
        SkillType::Grammar,
        "By the time we arrived, the film ___.",
        &["started", "has started", "had started", "was starting"],
        2,
    ),
    (
        ProficiencyLevel::B2,
        SkillType::Reading,
        "'The results were inconclusive' means the results were ___.",
        &["clear", "not decisive", "negative", "late"],
        1,
    ),
    (
        ProficiencyLevel::C1,
        SkillType::Grammar,
        "Not only ___ late, but he also forgot the tickets.",
        &["he was", "was he", "he is", "did he"],
        1,
    ),
    (
        ProficiencyLevel::C1,
        SkillType::Vocabulary,
        "A 'tenuous' link is one that is ___.",
        &["strong", "weak", "obvious", "recent"],
        1,
    ),
    (
        ProficiencyLevel::C2,
        SkillType::Grammar,
        "Little ___ that the plan would backfire.",
        &["they knew", "did they know", "they did know", "knew they"],
        1,
    ),
    (
        ProficiencyLevel::C2,
        SkillType::Vocabulary,
        "Something 'ineffable' is ___.",
        &["too great to be described", "impossible to eat", "not effective", "forgotten"],
        0,
    ),
];

/// (level, title, content kind, body or url, explanation)
type TaskRow = (
    ProficiencyLevel,
    &'static str,
    &'static str,
    &'static str,
    Option<&'static str>,
);

const TASKS: &[TaskRow] = &[
    (
        ProficiencyLevel::A1,
        "At the café",
        "text",
        "Anna orders a coffee and a sandwich. The coffee costs two euros.",
        Some("Numbers and prices in simple sentences."),
    ),
    (
        ProficiencyLevel::A2,
        "Weekend plans",
        "text",
        "Tom went hiking on Saturday. On Sunday he stayed at home and read a book.",
        Some("Past simple of regular and irregular verbs."),
    ),
    (
        ProficiencyLevel::B1,
        "Train announcement",
        "audio",
        "https://media.example.org/tasks/b1-train-announcement.mp3",
        None,
    ),
    (
        ProficiencyLevel::B2,
        "Remote work debate",
        "text",
        "Supporters argue that remote work saves time; critics say it weakens team culture.",
        Some("Contrasting opinions with linking words."),
    ),
    (
        ProficiencyLevel::C1,
        "Science explainer",
        "video",
        "https://media.example.org/tasks/c1-science-explainer.mp4",
        None,
    ),
    (
        ProficiencyLevel::C2,
        "Editorial nuance",
        "text",
        "The minister's remarks, ostensibly conciliatory, did little to assuage critics.",
        Some("Register and implied meaning."),
    ),
];

fn task_questions(
    task_id: TaskId,
    title: &str,
) -> Result<Vec<TaskQuestion>, Box<dyn std::error::Error>> {
    let base = task_id.value() * 100;
    Ok(vec![
        TaskQuestion::new(
            QuestionId::new(base + 1),
            task_id,
            format!("What is '{title}' mainly about?"),
            options(&["the main topic", "an unrelated topic", "nothing"]),
            0,
            1.0,
            1,
        )?,
        TaskQuestion::new(
            QuestionId::new(base + 2),
            task_id,
            "Which statement is true according to the material?",
            options(&["the first statement", "the opposite", "neither"]),
            0,
            2.0,
            2,
        )?,
    ])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for (i, (level, skill, text, opts, correct)) in PLACEMENT.iter().enumerate() {
        let question = AssessmentQuestion::new(
            QuestionId::new(u64::try_from(i)? + 1),
            *level,
            text,
            options(opts),
            *correct,
            ScorableQuestion::DEFAULT_WEIGHT,
            Some(*skill),
        )?;
        storage.questions.upsert_assessment_question(&question).await?;
    }

    for (i, (level, title, kind, material, explanation)) in TASKS.iter().enumerate() {
        let task_id = TaskId::new(u64::try_from(i)? + 1);
        let content = match *kind {
            "audio" => TaskContent::audio(material)?,
            "video" => TaskContent::video(material)?,
            _ => TaskContent::text(*material)?,
        };
        let mut task = Task::new(
            task_id,
            *level,
            *title,
            content,
            explanation.map(str::to_owned),
            now,
        )?;
        if !args.drafts {
            task.publish(now);
        }
        storage.tasks.upsert_task(&task).await?;
        storage
            .questions
            .replace_task_questions(task_id, &task_questions(task_id, title)?)
            .await?;
    }

    println!(
        "Seeded {} assessment questions and {} tasks into {}",
        PLACEMENT.len(),
        TASKS.len(),
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
