use std::error::Error;
use std::fmt;
use std::io::Write as _;

use math_core::model::{FractionOp, GameMode, GameResult, GameSettings, SettingsError};
use services::sessions::PracticeSession;
use services::{
    AppServices, Assignment, Clock, ExplanationService, ResultListItem, SessionError,
    SessionPhase, assignment_from_url, assignment_link, decode_assignment,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://mathwhiz.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidOp { raw: String },
    InvalidDbUrl { raw: String },
    MissingStudent,
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value: {raw} (times, fractions, mixed)")
            }
            ArgsError::InvalidOp { raw } => {
                write!(f, "invalid --ops value: {raw} (add, sub, mul, div)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingStudent => write!(f, "--student is required"),
            ArgsError::Settings(err) => write!(f, "invalid settings: {err}"),
        }
    }
}

impl Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_string(),
    })
}

fn parse_list<T>(
    raw: &str,
    item: impl FnMut(&str) -> Result<T, ArgsError>,
) -> Result<Vec<T>, ArgsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(item)
        .collect()
}

fn parse_mode(raw: &str) -> Result<GameMode, ArgsError> {
    let mode = match raw.trim().to_ascii_lowercase().as_str() {
        "times" | "tables" | "times-tables" => Some(GameMode::TimesTables),
        "fractions" | "fraction-ops" => Some(GameMode::FractionsOps),
        "mixed" | "mixed-to-improper" => Some(GameMode::MixedToImproper),
        _ => GameMode::parse(raw.trim()),
    };
    mode.ok_or_else(|| ArgsError::InvalidMode {
        raw: raw.to_string(),
    })
}

fn parse_op(raw: &str) -> Result<FractionOp, ArgsError> {
    match raw {
        "add" | "+" => Ok(FractionOp::Add),
        "sub" | "subtract" | "-" => Ok(FractionOp::Subtract),
        "mul" | "multiply" | "x" | "*" => Ok(FractionOp::Multiply),
        "div" | "divide" | "/" => Ok(FractionOp::Divide),
        _ => Err(ArgsError::InvalidOp {
            raw: raw.to_string(),
        }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play    [--db <sqlite_url>] [--student <name>] [round flags]");
    eprintln!("                              [--assignment <token_or_link>] [--memory]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--student <name>] [--limit <n>] [--clear]");
    eprintln!("  cargo run -p app -- assign  --student <name> [--base-url <url>] [round flags]");
    eprintln!();
    eprintln!("Round flags:");
    eprintln!("  --mode times|fractions|mixed   --count <n>      --time <seconds>");
    eprintln!("  --tables 2,3,7                 --ops add,sub    --dens 2,4,8");
    eprintln!("  --max-whole <n>");
    eprintln!();
    eprintln!("During play: type an answer (12 or 7/3), ? for help, q to quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MATH_DB_URL, MATH_STUDENT, MATH_ASSIGNMENT_BASE_URL,");
    eprintln!("  MATH_AI_API_KEY, MATH_AI_BASE_URL, MATH_AI_MODEL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    History,
    Assign,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "history" => Some(Self::History),
            "assign" => Some(Self::Assign),
            _ => None,
        }
    }
}

/// Round flags shared by `play` and `assign`.
struct RoundFlags {
    mode: GameMode,
    count: Option<usize>,
    time: Option<u32>,
    tables: Option<Vec<i64>>,
    ops: Option<Vec<FractionOp>>,
    dens: Option<Vec<i64>>,
    max_whole: Option<i64>,
    touched: bool,
}

impl RoundFlags {
    fn new() -> Self {
        Self {
            mode: GameMode::TimesTables,
            count: None,
            time: None,
            tables: None,
            ops: None,
            dens: None,
            max_whole: None,
            touched: false,
        }
    }

    /// Consume `flag` if it is a round flag.
    fn accept(
        &mut self,
        flag: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<bool, ArgsError> {
        match flag {
            "--mode" => self.mode = parse_mode(&require_value(args, "--mode")?)?,
            "--count" => {
                let raw = require_value(args, "--count")?;
                self.count = Some(parse_number(&raw, "--count")?);
            }
            "--time" => {
                let raw = require_value(args, "--time")?;
                self.time = Some(parse_number(&raw, "--time")?);
            }
            "--tables" => {
                let raw = require_value(args, "--tables")?;
                self.tables = Some(parse_list(&raw, |s| parse_number(s, "--tables"))?);
            }
            "--ops" => {
                let raw = require_value(args, "--ops")?;
                self.ops = Some(parse_list(&raw, parse_op)?);
            }
            "--dens" => {
                let raw = require_value(args, "--dens")?;
                self.dens = Some(parse_list(&raw, |s| parse_number(s, "--dens"))?);
            }
            "--max-whole" => {
                let raw = require_value(args, "--max-whole")?;
                self.max_whole = Some(parse_number(&raw, "--max-whole")?);
            }
            _ => return Ok(false),
        }
        self.touched = true;
        Ok(true)
    }

    fn into_settings(self) -> Result<GameSettings, ArgsError> {
        let mut settings = GameSettings::default_for(self.mode);
        if let Some(count) = self.count {
            settings = settings.with_question_count(count);
        }
        if let Some(time) = self.time {
            settings = settings.with_time_limit(time);
        }
        if let Some(tables) = self.tables {
            settings = settings.with_tables(tables);
        }
        if let Some(ops) = self.ops {
            settings = settings.with_ops(ops);
        }
        if let Some(dens) = self.dens {
            settings = settings.with_denominators(dens);
        }
        if let Some(max) = self.max_whole {
            settings = settings.with_max_whole_number(max);
        }
        settings.validate().map_err(ArgsError::Settings)?;
        Ok(settings)
    }
}

fn env_db_url() -> String {
    std::env::var("MATH_DB_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url)
}

fn env_student() -> Option<String> {
    std::env::var("MATH_STUDENT")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_db_flag(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(normalize_sqlite_url(value))
}

struct PlayArgs {
    db_url: String,
    student: Option<String>,
    settings: GameSettings,
}

impl PlayArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = env_db_url();
        let mut student = env_student();
        let mut flags = RoundFlags::new();
        let mut assignment_raw = None;

        while let Some(arg) = args.next() {
            if flags.accept(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--db" => db_url = parse_db_flag(args)?,
                "--memory" => db_url = "sqlite::memory:".into(),
                "--student" => student = Some(require_value(args, "--student")?),
                "--assignment" => assignment_raw = Some(require_value(args, "--assignment")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let assignment = assignment_raw.as_deref().and_then(read_assignment);
        if assignment_raw.is_some() && assignment.is_none() {
            eprintln!("That assignment could not be read; using the round flags instead.");
        }

        match assignment {
            Some(assignment) => {
                if flags.touched {
                    eprintln!("Assignment settings take precedence over round flags.");
                }
                Ok(Self {
                    db_url,
                    student: Some(assignment.student_name),
                    settings: assignment.settings,
                })
            }
            None => Ok(Self {
                db_url,
                student,
                settings: flags.into_settings()?,
            }),
        }
    }
}

fn read_assignment(raw: &str) -> Option<Assignment> {
    if raw.contains("://") {
        assignment_from_url(raw)
    } else {
        decode_assignment(raw)
    }
}

struct HistoryArgs {
    db_url: String,
    student: Option<String>,
    limit: u32,
    clear: bool,
}

impl HistoryArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: env_db_url(),
            student: None,
            limit: 20,
            clear: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => parsed.db_url = parse_db_flag(args)?,
                "--student" => parsed.student = Some(require_value(args, "--student")?),
                "--limit" => {
                    parsed.limit = parse_number(&require_value(args, "--limit")?, "--limit")?;
                }
                "--clear" => parsed.clear = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

struct AssignArgs {
    base_url: String,
    assignment: Assignment,
}

impl AssignArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut base_url = std::env::var("MATH_ASSIGNMENT_BASE_URL").ok();
        let mut student = None;
        let mut flags = RoundFlags::new();

        while let Some(arg) = args.next() {
            if flags.accept(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--student" => student = Some(require_value(args, "--student")?),
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let student = student
            .filter(|s| !s.trim().is_empty())
            .ok_or(ArgsError::MissingStudent)?;
        let base_url = base_url.ok_or(ArgsError::MissingValue { flag: "--base-url" })?;
        Ok(Self {
            base_url,
            assignment: Assignment::new(student.trim(), flags.into_settings()?),
        })
    }
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

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn Error>> {
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

//
// ─── PLAY ──────────────────────────────────────────────────────────────────────
//

type Input = Lines<BufReader<Stdin>>;

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn split_answer(line: &str) -> (&str, Option<&str>) {
    match line.split_once('/') {
        Some((num, den)) => (num.trim(), Some(den.trim())),
        None => (line.trim(), None),
    }
}

async fn play(services: &AppServices, args: PlayArgs) -> Result<(), Box<dyn Error>> {
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    let recent = services.history().load_recent(3).await;
    if !recent.is_empty() {
        println!("Recent rounds:");
        for result in &recent {
            println!(
                "  {}  {}  {}/{}",
                result.date().format("%Y-%m-%d %H:%M"),
                result.mode(),
                result.score(),
                result.total_questions()
            );
        }
        println!();
    }

    let mut session = services
        .session_loop()
        .start_session(&args.settings, args.student)
        .await?;
    if session.progress().total < args.settings.question_count {
        println!(
            "Only {} different questions fit these settings.",
            session.progress().total
        );
    }

    loop {
        match session.phase() {
            SessionPhase::Finished | SessionPhase::Abandoned => break,
            SessionPhase::RetryIntro => {
                prompt("Let's fix the ones you missed. Press Enter to start (q to quit) ");
                match input.next_line().await? {
                    Some(line) if !is_quit(&line) => session.proceed_to_retry()?,
                    _ => {
                        session.exit()?;
                    }
                }
            }
            SessionPhase::MainRound | SessionPhase::RetryRound => {
                if !ask(&mut session, &mut input).await? {
                    break;
                }
            }
        }
    }

    if let Some(result) = session.result() {
        print_summary(&result);
    }
    Ok(())
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "q" | "quit" | "exit")
}

/// Present one question. Returns `false` once the learner has left.
async fn ask(session: &mut PracticeSession, input: &mut Input) -> Result<bool, Box<dyn Error>> {
    let snapshot = session.snapshot();
    let Some(question) = snapshot.question else {
        return Ok(true);
    };
    let progress = snapshot.progress;
    let label = if progress.is_retry() { "fix " } else { "" };
    let clock = progress
        .remaining_secs
        .map(|s| format!("  ({s}s left)"))
        .unwrap_or_default();
    prompt(&format!(
        "[{label}{}/{}] {} = {clock}\n> ",
        progress.position,
        progress.total,
        question.text()
    ));

    let Some(line) = input.next_line().await? else {
        session.exit()?;
        return Ok(false);
    };
    let line = line.trim();

    if is_quit(line) {
        session.exit()?;
        return Ok(false);
    }
    if matches!(line, "?" | "help") {
        let text = session.request_help().await?;
        println!("\n{text}\n");
        prompt("(press Enter to continue) ");
        let _ = input.next_line().await?;
        session.close_help();
        return Ok(true);
    }

    let (num, den) = split_answer(line);
    match session.grade(num, den) {
        Ok(outcome) => {
            if outcome.is_correct {
                println!("Correct!");
            } else if outcome.phase == SessionPhase::RetryRound {
                println!("Not quite, try again.");
            } else {
                println!("Not quite.");
            }
            session.settle().await?;
        }
        Err(SessionError::InvalidInput(_)) => println!("Please type a number."),
        Err(SessionError::WrongPhase(_) | SessionError::Completed) => {
            println!("Time's up!");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(true)
}

fn print_summary(result: &GameResult) {
    println!();
    if !result.completed() {
        println!("Round ended early.");
    }
    println!(
        "{}  {}/{} ({}%)",
        result.band().message(),
        result.score(),
        result.total_questions(),
        result.percentage()
    );
    if result.unanswered() > 0 {
        println!("Unanswered: {}", result.unanswered());
    }
    if result.retry_count() > 0 {
        println!("Extra tries while fixing mistakes: {}", result.retry_count());
    }
}

//
// ─── HISTORY / ASSIGN ──────────────────────────────────────────────────────────
//

async fn history(services: &AppServices, args: HistoryArgs) -> Result<(), Box<dyn Error>> {
    let history = services.history();
    if args.clear {
        let removed = history.clear_all().await?;
        println!("Removed {removed} results.");
        return Ok(());
    }

    let rows = match args.student.as_deref() {
        Some(name) => history.list_for_student(name, args.limit).await?,
        None => history.list_recent(args.limit).await?,
    };
    if rows.is_empty() {
        println!("No results yet.");
        return Ok(());
    }
    for row in &rows {
        print_row(row);
    }
    Ok(())
}

fn print_row(row: &ResultListItem) {
    println!(
        "#{:<4} {}  {:<12} {:<18} {:>3}/{:<3} {:>3}%  retries {:<3} {}",
        row.id,
        row.date.format("%Y-%m-%d %H:%M"),
        row.student_name.as_deref().unwrap_or("-"),
        row.mode.as_str(),
        row.score,
        row.total_questions,
        row.percentage,
        row.retry_count,
        if row.completed { "done" } else { "left early" },
    );
}

fn assign(args: &AssignArgs) -> Result<(), Box<dyn Error>> {
    let link = assignment_link(&args.base_url, &args.assignment)?;
    println!("{link}");
    Ok(())
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: play when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    match cmd {
        Command::Assign => {
            let parsed = AssignArgs::parse(&mut iter).map_err(report)?;
            assign(&parsed)
        }
        Command::Play => {
            let parsed = PlayArgs::parse(&mut iter).map_err(report)?;
            let (services, worker) = open_services(&parsed.db_url).await?;
            let outcome = play(&services, parsed).await;
            drop(services);
            let saved = worker.await.unwrap_or(0);
            tracing::debug!(saved, "persistence worker finished");
            outcome
        }
        Command::History => {
            let parsed = HistoryArgs::parse(&mut iter).map_err(report)?;
            let (services, _worker) = open_services(&parsed.db_url).await?;
            history(&services, parsed).await
        }
    }
}

async fn open_services(
    db_url: &str,
) -> Result<(AppServices, tokio::task::JoinHandle<usize>), Box<dyn Error>> {
    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(db_url)?;
    let explainer = ExplanationService::from_env();
    Ok(AppServices::new_sqlite(db_url, Clock::system(), explainer).await?)
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn answers_split_on_slash() {
        assert_eq!(split_answer("12"), ("12", None));
        assert_eq!(split_answer(" 7 / 3 "), ("7", Some("3")));
        assert_eq!(split_answer("5/"), ("5", Some("")));
    }

    #[test]
    fn round_flags_build_settings() {
        let mut flags = RoundFlags::new();
        let mut it = args(&[
            "--mode", "fractions", "--count", "6", "--time", "45", "--ops", "add, div", "--dens",
            "4,8",
        ]);
        while let Some(flag) = it.next() {
            assert!(flags.accept(&flag, &mut it).unwrap());
        }
        let settings = flags.into_settings().unwrap();
        assert_eq!(settings.mode, GameMode::FractionsOps);
        assert_eq!(settings.question_count, 6);
        assert_eq!(settings.time_limit_seconds, 45);
        assert_eq!(settings.fraction_ops, vec![FractionOp::Add, FractionOp::Divide]);
        assert_eq!(settings.selected_denominators, vec![4, 8]);
    }

    #[test]
    fn bad_flags_are_reported() {
        let mut flags = RoundFlags::new();
        assert!(matches!(
            flags.accept("--mode", &mut args(&["algebra"])),
            Err(ArgsError::InvalidMode { .. })
        ));
        assert!(matches!(
            flags.accept("--count", &mut args(&[])),
            Err(ArgsError::MissingValue { flag: "--count" })
        ));

        let mut zero = RoundFlags::new();
        zero.accept("--count", &mut args(&["0"])).unwrap();
        assert!(matches!(zero.into_settings(), Err(ArgsError::Settings(_))));
        let mut huge = RoundFlags::new();
        huge.accept("--dens", &mut args(&["4,4000000000"])).unwrap();
        assert!(matches!(
            huge.into_settings(),
            Err(ArgsError::Settings(SettingsError::DenominatorTooLarge(4_000_000_000)))
        ));
    }

    #[test]
    fn assign_requires_student_and_base_url() {
        assert!(matches!(
            AssignArgs::parse(&mut args(&["--base-url", "https://x.example/"])),
            Err(ArgsError::MissingStudent)
        ));
        let parsed = AssignArgs::parse(&mut args(&[
            "--student",
            "Maya",
            "--base-url",
            "https://x.example/",
            "--mode",
            "mixed",
        ]))
        .unwrap();
        assert_eq!(parsed.assignment.student_name, "Maya");
        assert_eq!(parsed.assignment.settings.mode, GameMode::MixedToImproper);
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/a.db".into()),
            "sqlite:///tmp/a.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/b.db".into()), "sqlite:///tmp/b.db");
    }
}
