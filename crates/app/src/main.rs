use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use quiz_core::model::{AuthContext, LearnerId, LessonId};
use quiz_core::quiz::{GeneratorConfig, QuestionOrder};
use quiz_core::rng::RngSource;
use services::{
    Clock, LessonQuiz, ProgressService, QuizLoopService, RemoteResultSink, RepositorySink,
    ResultHistoryService, ResultSink, SubmissionReceipt,
};
use storage::repository::Storage;
use storage::seed::seed_sample_lessons;

const DEFAULT_LEARNER: &str = "local";
const HISTORY_LIMIT: u32 = 20;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingLesson,
    InvalidLessonId { raw: String },
    InvalidLearnerId { raw: String },
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingLesson => write!(f, "quiz requires --lesson <id>"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson value: {raw}"),
            ArgsError::InvalidLearnerId { raw } => write!(f, "invalid --learner value: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz lessons [--db <sqlite_url>]");
    eprintln!(
        "  quiz quiz    --lesson <id> [--seed <u64>] [--shuffle] [--learner <id>] [--db <sqlite_url>]"
    );
    eprintln!("  quiz history [--lesson <id>] [--learner <id>] [--db <sqlite_url>]");
    eprintln!("  quiz progress [--words] [--learner <id>] [--db <sqlite_url>]");
    eprintln!("  quiz seed    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --learner {DEFAULT_LEARNER}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_LEARNER_ID, QUIZ_API_BASE_URL, QUIZ_API_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Lessons,
    Quiz,
    History,
    Progress,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "lessons" => Some(Self::Lessons),
            "quiz" => Some(Self::Quiz),
            "history" => Some(Self::History),
            "progress" => Some(Self::Progress),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    learner_id: LearnerId,
    lesson_id: Option<LessonId>,
    seed: Option<u64>,
    shuffle: bool,
    words: bool,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let learner_raw =
            std::env::var("QUIZ_LEARNER_ID").unwrap_or_else(|_| DEFAULT_LEARNER.into());
        let mut learner_id = LearnerId::parse(learner_raw.clone())
            .map_err(|_| ArgsError::InvalidLearnerId { raw: learner_raw })?;
        let mut lesson_id = None;
        let mut seed = None;
        let mut shuffle = false;
        let mut words = false;

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                (Command::Quiz | Command::History, "--lesson") => {
                    let value = require_value(args, "--lesson")?;
                    lesson_id = Some(parse_lesson_id(value)?);
                }
                (Command::Quiz | Command::History | Command::Progress, "--learner") => {
                    let value = require_value(args, "--learner")?;
                    learner_id = LearnerId::parse(value.clone())
                        .map_err(|_| ArgsError::InvalidLearnerId { raw: value })?;
                }
                (Command::Quiz, "--seed") => {
                    let value = require_value(args, "--seed")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                (Command::Quiz, "--shuffle") => shuffle = true,
                (Command::Progress, "--words") => words = true,
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Quiz && lesson_id.is_none() {
            return Err(ArgsError::MissingLesson);
        }

        Ok(Self {
            db_url,
            learner_id,
            lesson_id,
            seed,
            shuffle,
            words,
        })
    }
}

/// Accepts a full lesson id (`lesson_2`) or just its number (`2`).
fn parse_lesson_id(raw: String) -> Result<LessonId, ArgsError> {
    if let Ok(number) = raw.trim().parse::<u32>() {
        return Ok(LessonId::for_number(number));
    }
    LessonId::parse(raw.clone()).map_err(|_| ArgsError::InvalidLessonId { raw })
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

/// Remote sink when `QUIZ_API_BASE_URL` is set, the local database otherwise.
fn result_sink(storage: &Storage) -> Arc<dyn ResultSink> {
    match RemoteResultSink::from_env() {
        Some(remote) => {
            log::info!("submitting results to the remote API");
            Arc::new(remote)
        }
        None => Arc::new(RepositorySink::new(Arc::clone(&storage.results))),
    }
}

fn auth_context(learner_id: LearnerId) -> AuthContext {
    let auth = AuthContext::local(learner_id);
    match std::env::var("QUIZ_API_TOKEN") {
        Ok(token) => auth.with_bearer_token(token),
        Err(_) => auth,
    }
}

async fn list_lessons(storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    let lessons = storage.lessons.list_lessons().await?;
    if lessons.is_empty() {
        println!("No lessons yet. Run `quiz seed` to load the sample lessons.");
        return Ok(());
    }
    for lesson in lessons {
        println!(
            "{:<10} {:>2}. {} ({} words)",
            lesson.id, lesson.number, lesson.title, lesson.word_count
        );
        if !lesson.description.is_empty() {
            println!("              {}", lesson.description);
        }
    }
    Ok(())
}

enum Answer {
    Selected(String),
    Quit,
}

fn read_answer(quiz: &LessonQuiz, input: &mut impl BufRead) -> io::Result<Answer> {
    let Some(question) = quiz.current_question() else {
        return Ok(Answer::Quit);
    };
    loop {
        print!("Your answer (1-{}, q to quit): ", question.options().len());
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Answer::Quit);
        }
        let line = line.trim();
        match line {
            "" => {}
            "q" | "quit" => return Ok(Answer::Quit),
            _ => {
                if let Ok(n) = line.parse::<usize>() {
                    if let Some(option) = n.checked_sub(1).and_then(|i| question.options().get(i))
                    {
                        return Ok(Answer::Selected(option.clone()));
                    }
                    println!("Pick a number between 1 and {}.", question.options().len());
                    continue;
                }
                return Ok(Answer::Selected(line.to_owned()));
            }
        }
    }
}

async fn run_quiz(storage: &Storage, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(lesson_id) = args.lesson_id else {
        return Err(ArgsError::MissingLesson.into());
    };
    let clock = Clock::System;
    let order = if args.shuffle {
        QuestionOrder::Shuffled
    } else {
        QuestionOrder::Lesson
    };
    let svc = QuizLoopService::new(clock, Arc::clone(&storage.lessons), result_sink(storage))
        .with_config(GeneratorConfig::default().with_order(order));

    let mut rng = match args.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };
    let mut quiz = svc.start_quiz(&lesson_id, &mut rng).await?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    while let Some(question) = quiz.current_question() {
        let progress = quiz.progress();
        println!();
        println!(
            "Question {} of {}: {}",
            progress.answered + 1,
            progress.total,
            question.item().primary_text()
        );
        if !question.item().transliteration().is_empty() {
            println!("  ({})", question.item().transliteration());
        }
        for (i, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", i + 1);
        }

        let shown_at = clock.now();
        let selected = match read_answer(&quiz, &mut input)? {
            Answer::Selected(selected) => selected,
            Answer::Quit => {
                println!("Quiz abandoned; nothing was recorded.");
                return Ok(());
            }
        };
        let response = quiz.answer(selected, clock.seconds_since(shown_at))?;
        if response.is_correct {
            println!("Correct!");
        } else if let Some(question) = quiz.current_question() {
            println!("Not quite. The answer is: {}", question.correct_answer());
        }
        quiz.next()?;
    }
    drop(input);

    let result = quiz.session().finalize()?;
    println!();
    println!(
        "Score: {}/{} ({:.0}%) in {}s",
        result.correct_count(),
        result.total_questions(),
        result.score_percentage(),
        result.total_elapsed_seconds()
    );

    match svc.submit(&mut quiz, &auth_context(args.learner_id)).await? {
        SubmissionReceipt::Stored { result_id } => println!("Saved as result #{result_id}."),
        SubmissionReceipt::Accepted {
            message,
            words_learned,
        } => match words_learned {
            Some(words) => println!("{message} ({words} words learned)"),
            None => println!("{message}"),
        },
    }
    Ok(())
}

async fn show_history(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let history = ResultHistoryService::new(Arc::clone(&storage.results));
    let items = history
        .list_recent(&args.learner_id, args.lesson_id.as_ref(), HISTORY_LIMIT)
        .await?;
    if items.is_empty() {
        println!("No results recorded for {}.", args.learner_id);
        return Ok(());
    }
    for item in &items {
        println!(
            "{}  {:<10} {:>2}/{:<2} {:>5.1}%  {}s",
            item.submitted_at.format("%Y-%m-%d %H:%M"),
            item.lesson_id,
            item.correct,
            item.total,
            item.score_percentage,
            item.total_elapsed_seconds
        );
    }

    if let Some(lesson_id) = &args.lesson_id {
        let stats = history.lesson_stats(&args.learner_id, lesson_id).await?;
        println!(
            "{} attempts, best {:.1}%, average {:.1}%",
            stats.attempts, stats.best_score, stats.average_score
        );
    }
    Ok(())
}

async fn show_progress(storage: &Storage, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let progress = ProgressService::new(
        Clock::System,
        Arc::clone(&storage.lessons),
        Arc::clone(&storage.results),
    );
    let dashboard = progress.dashboard(&args.learner_id).await?;
    println!("Learner:               {}", args.learner_id);
    println!("Current streak:        {} days", dashboard.current_streak);
    println!("Lessons completed:     {}", dashboard.lessons_completed);
    println!("Quizzes taken:         {}", dashboard.quizzes_taken);
    println!("Words practiced today: {}", dashboard.words_practiced_today);
    match &dashboard.next_lesson {
        Some(next) => println!(
            "Next lesson:           {}. {} ({} words)",
            next.number, next.title, next.word_count
        ),
        None => println!("Next lesson:           all lessons attempted"),
    }

    if args.words {
        println!();
        for word in progress.word_progress(&args.learner_id).await? {
            let last = word
                .last_practiced
                .map_or_else(|| "never".to_owned(), |t| t.format("%Y-%m-%d").to_string());
            println!(
                "{:<10} {:<14} {:<20} {:>3}/{:<3} {}",
                word.lesson_id,
                word.transliteration,
                word.meaning,
                word.correct_attempts,
                word.total_attempts,
                last
            );
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    match cmd {
        Command::Lessons => list_lessons(&storage).await,
        Command::Quiz => run_quiz(&storage, parsed).await,
        Command::History => show_history(&storage, &parsed).await,
        Command::Progress => show_progress(&storage, &parsed).await,
        Command::Seed => {
            let count = seed_sample_lessons(storage.lessons.as_ref()).await?;
            println!("Seeded {count} lessons into {}.", parsed.db_url);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
