use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::format_countdown;
use quiz_core::model::{LevelId, QuizId, QuizSource, SubjectId};
use services::session::{QuizAttempt, SettledHook};
use services::{
    Clock, FeedbackMode, QuizSessionService, RetryPolicy, SessionOutcome, SessionStateTag,
    SubmissionOutcome,
};
use storage::repository::{AuthToken, InMemoryRepository, Storage};
use storage::BackendConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    MissingQuiz,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value: {raw} (expected checked or immediate)")
            }
            ArgsError::MissingQuiz => write!(f, "pass either --subject and --level, or --quiz"),
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

fn require_id(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [take] --subject <id> --level <id> [options]");
    eprintln!("  cargo run -p app -- [take] --quiz <id> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --mode checked|immediate   feedback style (default: checked)");
    eprintln!("  --api <url>                backend base url");
    eprintln!("  --token <token>            bearer token sent with submissions");
    eprintln!("  --fixtures <path>          serve quizzes from a local JSON file instead");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_URL, QUIZ_AUTH_TOKEN, QUIZ_HTTP_TIMEOUT_SECS,");
    eprintln!("  QUIZ_SUBMIT_RETRIES, QUIZ_SUBMIT_RETRY_DELAY_MS, RUST_LOG");
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    source: QuizSource,
    mode: FeedbackMode,
    api_url: Option<String>,
    token: Option<String>,
    fixtures: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = args.into_iter().peekable();
        if args.peek().map(String::as_str) == Some("take") {
            args.next();
        }

        let mut subject = None;
        let mut level = None;
        let mut quiz = None;
        let mut mode = FeedbackMode::default();
        let mut api_url = None;
        let mut token = None;
        let mut fixtures = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--subject" => subject = Some(require_id(&mut args, "--subject")?),
                "--level" => level = Some(require_id(&mut args, "--level")?),
                "--quiz" => quiz = Some(require_id(&mut args, "--quiz")?),
                "--mode" => {
                    let value = require_value(&mut args, "--mode")?;
                    mode = match value.as_str() {
                        "checked" => FeedbackMode::Checked,
                        "immediate" => FeedbackMode::Immediate,
                        _ => return Err(ArgsError::InvalidMode { raw: value }),
                    };
                }
                "--api" => api_url = Some(require_value(&mut args, "--api")?),
                "--token" => token = Some(require_value(&mut args, "--token")?),
                "--fixtures" => {
                    fixtures = Some(PathBuf::from(require_value(&mut args, "--fixtures")?));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let source = match (quiz, subject, level) {
            (Some(id), None, None) => QuizSource::standalone(QuizId::new(id)),
            (None, Some(subject), Some(level)) => {
                QuizSource::level(SubjectId::new(subject), LevelId::new(level))
            }
            _ => return Err(ArgsError::MissingQuiz),
        };

        Ok(Self {
            source,
            mode,
            api_url,
            token,
            fixtures,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(args: &Args) -> Result<QuizSessionService, Box<dyn std::error::Error>> {
    let mut config = BackendConfig::from_env();
    if let Some(url) = &args.api_url {
        config.base_url.clone_from(url);
    }
    if let Some(token) = &args.token {
        config.auth_token = AuthToken::new(token.as_str());
    }

    // Fixtures keep the whole loop offline; submissions are scored locally.
    let storage = match &args.fixtures {
        Some(path) => {
            info!(path = %path.display(), "serving quizzes from fixtures");
            Storage::from_in_memory(InMemoryRepository::from_fixture_file(path)?)
        }
        None => {
            info!(api = %config.base_url, "using quiz backend");
            Storage::http(&config)?
        }
    };

    let on_settled: SettledHook = Arc::new(|outcome: &SubmissionOutcome| match outcome {
        SubmissionOutcome::Accepted { .. } => println!("Your results were saved."),
        SubmissionOutcome::Failed { .. } => {
            println!("Your results could not be saved; your score above still stands.");
        }
    });

    Ok(
        QuizSessionService::new(Clock::default_clock(), storage.quizzes, storage.submissions)
            .with_mode(args.mode)
            .with_auth_token(config.auth_token.clone())
            .with_retry_policy(RetryPolicy::from_config(&config))
            .with_on_settled(on_settled),
    )
}

/// Print whatever the session currently shows.
fn show(attempt: &QuizAttempt, checked: bool) {
    let session = attempt.session();
    match session.tag() {
        SessionStateTag::Loading => println!("Loading..."),
        SessionStateTag::Active => {
            if let Some(view) = attempt.question_view() {
                render::question(&view, checked);
            }
        }
        SessionStateTag::Completed => {
            if let Some(view) = attempt.result_view() {
                render::result(&view);
            }
        }
        // reported once, on exit
        SessionStateTag::Errored => {}
    }
}

/// What a line of input asks for.
enum Input {
    Redraw(SessionOutcome),
    Time,
    Retake,
    Quit,
    Unknown,
}

fn interpret(attempt: &mut QuizAttempt, line: &str) -> Input {
    let line = line.trim();
    let completed = attempt.session().tag() == SessionStateTag::Completed;
    match line {
        "q" | "quit" => Input::Quit,
        "r" | "retake" if completed => Input::Retake,
        "t" | "time" => Input::Time,
        "c" | "check" => Input::Redraw(attempt.reveal_feedback()),
        "n" | "next" => Input::Redraw(attempt.advance()),
        "f" | "finish" => Input::Redraw(attempt.complete()),
        _ => {
            let picked = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| {
                    attempt
                        .session()
                        .current_question()
                        .and_then(|q| q.options().get(i).cloned())
                });
            match picked {
                Some(option) => Input::Redraw(attempt.select_answer(option)),
                None => Input::Unknown,
            }
        }
    }
}

fn report(outcome: &SessionOutcome) {
    if let SessionOutcome::Refused(refusal) = outcome {
        println!("Not yet: {refusal}.");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    let args = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let service = build_service(&args)?;
    let checked = args.mode == FeedbackMode::Checked;

    let mut attempt = QuizAttempt::start(&service, args.source).await;
    show(&attempt, checked);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !matches!(attempt.session().tag(), SessionStateTag::Errored) {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match interpret(&mut attempt, &line) {
                    Input::Quit => break,
                    Input::Time => {
                        let left = attempt.session().remaining_secs().unwrap_or(0);
                        println!("{} left", format_countdown(left));
                    }
                    Input::Retake => {
                        if attempt.retake().await {
                            show(&attempt, checked);
                        }
                    }
                    Input::Redraw(outcome) => {
                        report(&outcome);
                        let changed = matches!(
                            outcome,
                            SessionOutcome::Applied | SessionOutcome::Completed(_)
                        );
                        if changed {
                            show(&attempt, checked);
                        }
                    }
                    Input::Unknown => println!("Unrecognised input: {}", line.trim()),
                }
            }
            Some(outcome) = attempt.next_tick(), if attempt.is_ticking() => {
                match outcome {
                    SessionOutcome::Completed(_) => {
                        println!();
                        println!("Time is up!");
                        show(&attempt, checked);
                    }
                    _ => {
                        if let Some(left @ (60 | 30 | 10)) = attempt.session().remaining_secs() {
                            println!("{} left", format_countdown(left));
                        }
                    }
                }
            }
        }
    }

    let pending = attempt.take_submission();
    attempt.cancel();
    if let Some(handle) = pending {
        if !handle.is_finished() {
            println!("Saving your results...");
        }
        let outcome = handle.settled().await;
        if !outcome.is_accepted() {
            warn!("exiting with an unsaved result");
        }
    }

    match attempt.session().error() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
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

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_level_source_with_defaults() {
        let args = parse(&["take", "--subject", "1", "--level", "3"]).unwrap();
        assert_eq!(
            args.source,
            QuizSource::level(SubjectId::new(1), LevelId::new(3))
        );
        assert_eq!(args.mode, FeedbackMode::Checked);
        assert!(args.fixtures.is_none());
    }

    #[test]
    fn parses_standalone_quiz_and_options() {
        let args = parse(&[
            "--quiz",
            "8",
            "--mode",
            "immediate",
            "--fixtures",
            "fixtures/sample_quizzes.json",
            "--token",
            "abc",
        ])
        .unwrap();
        assert_eq!(args.source, QuizSource::standalone(QuizId::new(8)));
        assert_eq!(args.mode, FeedbackMode::Immediate);
        assert_eq!(args.token.as_deref(), Some("abc"));
        assert_eq!(
            args.fixtures,
            Some(PathBuf::from("fixtures/sample_quizzes.json"))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse(&["--subject", "1"]), Err(ArgsError::MissingQuiz));
        assert_eq!(
            parse(&["--quiz", "8", "--subject", "1", "--level", "1"]),
            Err(ArgsError::MissingQuiz)
        );
        assert_eq!(
            parse(&["--quiz", "x"]),
            Err(ArgsError::InvalidId {
                flag: "--quiz",
                raw: "x".into()
            })
        );
        assert_eq!(
            parse(&["--quiz", "1", "--mode", "fast"]),
            Err(ArgsError::InvalidMode { raw: "fast".into() })
        );
        assert_eq!(
            parse(&["--quiz"]),
            Err(ArgsError::MissingValue { flag: "--quiz" })
        );
        assert_eq!(
            parse(&["--quiz", "1", "--verbose"]),
            Err(ArgsError::UnknownArg("--verbose".into()))
        );
    }
}
