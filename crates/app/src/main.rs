mod config;
mod telemetry;

use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use services::{AppServices, Clock, JsonFileSource};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tutor_core::eligibility;
use tutor_core::model::{AnswerSet, LearnerProfile, TaskContent, TaskType};
use tutor_core::scoring;

use crate::config::AppConfig;

type BoxError = Box<dyn std::error::Error>;
type Input = Lines<BufReader<Stdin>>;

#[derive(Debug, Parser)]
#[command(name = "tutor", version, about = "CEFR placement and practice in the terminal")]
struct Cli {
    /// `SQLite` URL or path; overrides `TUTOR_DB_URL`.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the database schema.
    Migrate,
    /// Register a learner, or show the existing profile.
    Register {
        #[arg(long)]
        telegram_id: String,
        #[arg(long)]
        username: Option<String>,
    },
    /// Take the placement quiz.
    Assess {
        #[arg(long)]
        telegram_id: String,
    },
    /// Get a task matched to the learner's level and answer its questions.
    Practice {
        #[arg(long)]
        telegram_id: String,
    },
    /// Show a learner's task results.
    History {
        #[arg(long)]
        telegram_id: String,
    },
    /// List published tasks a learner at LEVEL may receive.
    Tasks {
        level: String,
        /// Only tasks of this kind (text, audio, video).
        #[arg(long)]
        task_type: Option<String>,
    },
    /// Map a normalized score in [0, 1] to a level.
    Classify { score: f64 },
    /// Levels a learner at LEVEL may be offered.
    Eligible { level: String },
    /// Import tasks and placement questions from a JSON bundle.
    Sync {
        #[arg(long)]
        file: std::path::PathBuf,
        /// Keep running and re-import every N minutes until interrupted.
        #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,
    },
}

#[derive(Debug)]
enum CliError {
    InvalidDbUrl { raw: String },
    UnknownLearner { telegram_id: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidDbUrl { raw } => write!(f, "invalid database url: {raw}"),
            CliError::UnknownLearner { telegram_id } => {
                write!(f, "no learner with telegram id {telegram_id}; run `tutor register` first")
            }
        }
    }
}

impl std::error::Error for CliError {}

async fn run() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    // Commands that need no storage.
    match &cli.command {
        Command::Classify { score } => {
            let level = scoring::classify_level(*score)?;
            println!("{level}");
            return Ok(());
        }
        Command::Eligible { level } => {
            let levels = eligibility::eligible_levels_for(level)?;
            let names: Vec<String> = levels.iter().map(ToString::to_string).collect();
            println!("{}", names.join(" "));
            return Ok(());
        }
        _ => {}
    }

    let db_url = normalize_sqlite_url(cli.db.unwrap_or(config.database.url));
    prepare_sqlite_file(&db_url)?;
    // Opening the store applies pending migrations.
    let storage = Storage::sqlite(&db_url).await?;
    info!(db_url = %db_url, "storage ready");
    let app = AppServices::from_storage(&storage, Clock::default_clock(), config.services);

    match cli.command {
        Command::Migrate => println!("database ready at {db_url}"),
        Command::Register {
            telegram_id,
            username,
        } => {
            let learner = app
                .learners()
                .register(&telegram_id, username.as_deref())
                .await?;
            print_profile(&learner);
        }
        Command::Assess { telegram_id } => {
            let learner = app.learners().register(&telegram_id, None).await?;
            assess(&app, &learner).await?;
        }
        Command::Practice { telegram_id } => {
            let learner = find_learner(&app, &telegram_id).await?;
            practice(&app, &learner).await?;
        }
        Command::History { telegram_id } => {
            let learner = find_learner(&app, &telegram_id).await?;
            let history = app.completion().history(learner.id()).await?;
            if history.is_empty() {
                println!("No completed tasks yet.");
            }
            for entry in history {
                println!(
                    "task {}  {:>5.1}%  {}",
                    entry.task_id,
                    entry.percentage_correct,
                    entry.completed_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Tasks { level, task_type } => {
            let tasks = match task_type {
                Some(raw) => {
                    let kind: TaskType = raw.parse()?;
                    app.delivery().tasks_for_level_and_type(&level, kind).await?
                }
                None => app.delivery().tasks_for_level(&level).await?,
            };
            for task in tasks {
                println!(
                    "{:>4}  {:<2}  {:<5}  {}",
                    task.id(),
                    task.level(),
                    task.content().task_type(),
                    task.title()
                );
            }
        }
        Command::Sync {
            file,
            every: Some(minutes),
        } => {
            let source = JsonFileSource::new(file);
            let period = Duration::from_secs(minutes.saturating_mul(60));
            info!(minutes, "scheduled content sync started");
            let rounds = app
                .sync()
                .sync_every(&source, period, async {
                    // Without a signal handler the loop runs until the process is killed.
                    if tokio::signal::ctrl_c().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                })
                .await;
            println!("stopped after {rounds} sync rounds");
        }
        Command::Sync { file, every: None } => {
            let stats = app.sync().sync(&JsonFileSource::new(file)).await?;
            println!(
                "tasks: {} created, {} updated; questions written: {}; rejected: {}",
                stats.tasks_created, stats.tasks_updated, stats.questions_written, stats.rejected
            );
        }
        Command::Classify { .. } | Command::Eligible { .. } => {}
    }
    Ok(())
}

async fn find_learner(app: &AppServices, telegram_id: &str) -> Result<LearnerProfile, BoxError> {
    app.learners().find(telegram_id).await?.ok_or_else(|| {
        CliError::UnknownLearner {
            telegram_id: telegram_id.to_string(),
        }
        .into()
    })
}

fn print_profile(learner: &LearnerProfile) {
    let level = learner
        .current_level()
        .map_or_else(|| "not assessed".to_string(), |l| l.to_string());
    println!(
        "learner {} (telegram {}): {level}",
        learner.id(),
        learner.telegram_user_id()
    );
}

async fn assess(app: &AppServices, learner: &LearnerProfile) -> Result<(), BoxError> {
    let started = app.assessments().start(learner.id()).await?;
    if started.abandoned.is_some() {
        println!("Your unfinished quiz was discarded; starting fresh.");
    }
    let id = started.session.id();
    let total = started.questions.len();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    for (index, question) in started.questions.iter().enumerate() {
        println!();
        println!("[{}/{total}] {}", index + 1, question.text());
        print_options(question.options());
        let Some(choice) = prompt_choice(&mut input, question.options().len()).await? else {
            app.assessments().abandon(id).await?;
            println!("Quiz abandoned. Your level is unchanged.");
            return Ok(());
        };
        app.assessments()
            .record_answer(id, question.id(), choice)
            .await?;
    }

    let outcome = app.assessments().complete(id).await?;
    println!();
    println!(
        "Score: {:.0}%. Your level: {}",
        outcome.score * 100.0,
        outcome.level
    );
    Ok(())
}

async fn practice(app: &AppServices, learner: &LearnerProfile) -> Result<(), BoxError> {
    let Some(task) = app.delivery().select_for_learner(learner.id()).await? else {
        println!("No tasks are available for your level yet.");
        return Ok(());
    };

    println!("{} ({})", task.title(), task.level());
    match task.content() {
        TaskContent::Text(body) => println!("\n{body}\n"),
        TaskContent::Audio(url) => println!("\nListen: {url}\n"),
        TaskContent::Video(url) => println!("\nWatch: {url}\n"),
    }

    let questions = app.completion().questions(task.id()).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut answers = AnswerSet::new();
    let started = Instant::now();
    for question in &questions {
        println!("{}", question.text());
        print_options(question.options());
        let Some(choice) = prompt_choice(&mut input, question.options().len()).await? else {
            println!("Stopped. Nothing was saved.");
            return Ok(());
        };
        answers.record(question.id(), choice);
    }

    let done = app
        .completion()
        .complete_task(
            learner.id(),
            task.id(),
            answers.clone(),
            Some(started.elapsed().as_secs_f64()),
        )
        .await?;

    println!();
    for question in &questions {
        let mark = if answers.get(question.id()) == Some(question.correct_answer()) {
            "correct"
        } else {
            "wrong"
        };
        println!("{mark:>7}  {}", question.text());
    }
    println!("Result: {:.0}%", done.progress.percentage_correct);
    if let Some(explanation) = task.explanation() {
        println!("\n{explanation}");
    }
    Ok(())
}

fn print_options(options: &[String]) {
    for (n, option) in (1..).zip(options) {
        println!("  {n}) {option}");
    }
}

/// Read until the learner picks a valid option. `None` means they quit.
async fn prompt_choice(input: &mut Input, options: usize) -> Result<Option<u32>, BoxError> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match parse_choice(line, options) {
            Some(choice) => return Ok(Some(choice)),
            None => println!("Pick a number from 1 to {options}, or q to stop."),
        }
    }
}

/// One-based menu pick to a zero-based option index.
fn parse_choice(raw: &str, options: usize) -> Option<u32> {
    let picked: usize = raw.trim().parse().ok()?;
    if picked == 0 || picked > options {
        return None;
    }
    u32::try_from(picked - 1).ok()
}

fn is_in_memory(db_url: &str) -> bool {
    db_url == "sqlite::memory:" || db_url.contains("mode=memory")
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), BoxError> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| CliError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(CliError::InvalidDbUrl {
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

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_picks_are_one_based() {
        assert_eq!(parse_choice("1", 4), Some(0));
        assert_eq!(parse_choice(" 4 ", 4), Some(3));
        assert_eq!(parse_choice("0", 4), None);
        assert_eq!(parse_choice("5", 4), None);
        assert_eq!(parse_choice("b", 4), None);
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/tutor.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/tutor.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite://tutor.sqlite3".into()),
            "sqlite://tutor.sqlite3"
        );
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn in_memory_urls_need_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("sqlite:file:x?mode=memory&cache=shared").is_ok());
        assert!(prepare_sqlite_file("postgres://nope").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tutor", "--db", "sqlite::memory:", "classify", "0.7"])
            .unwrap();
        assert_eq!(cli.db.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Command::Classify { score } if (score - 0.7).abs() < 1e-9));

        let cli = Cli::try_parse_from(["tutor", "tasks", "B1", "--task-type", "audio"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tasks { ref level, task_type: Some(ref t) } if level == "B1" && t == "audio"
        ));

        let cli = Cli::try_parse_from(["tutor", "sync", "--file", "c.json", "--every", "30"])
            .unwrap();
        assert!(matches!(cli.command, Command::Sync { every: Some(30), .. }));
        assert!(Cli::try_parse_from(["tutor", "sync", "--file", "c.json", "--every", "0"]).is_err());
    }
}
