// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use cuecards::app_config::{self, Config, CueChangePolicy};
use cuecards::clock::{ClockSampler, SimulatedPlayer};
use cuecards::flashcards::{ContextType, Flashcard};
use cuecards::services::http::HttpFlashcardService;
use cuecards::services::mock::MockFlashcardService;
use cuecards::services::{FlashcardService, SubtitleSource};
use cuecards::session::history::{record_if_new, validate_source_url, HistoryEntry};
use cuecards::session::{
    Engine, EngineCommand, EngineHandle, InMemoryHistory, SessionSnapshot, StudySession,
};
use cuecards::subtitle_processor::{
    load_cue_file, resolve_active_index, CueContext, SubtitleCue, Timestamp,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for CueChangePolicy to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCuePolicy {
    Text,
    Identity,
}

impl From<CliCuePolicy> for CueChangePolicy {
    fn from(policy: CliCuePolicy) -> Self {
        match policy {
            CliCuePolicy::Text => CueChangePolicy::Text,
            CliCuePolicy::Identity => CueChangePolicy::Identity,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the cues of a subtitle file, or show the cue active at a time
    Cues {
        /// SRT or WebVTT file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Playback time (HH:MM:SS.mmm or seconds)
        #[arg(long)]
        at: Option<String>,
    },

    /// Study a subtitle track interactively
    Study(StudyArgs),

    /// Generate shell completions for cuecards
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct StudyArgs {
    /// Local SRT or WebVTT file
    #[arg(value_name = "FILE", required_unless_present = "url", conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Video URL to process through the backend
    #[arg(long)]
    url: Option<String>,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "CUECARDS_ENDPOINT")]
    endpoint: Option<String>,

    /// Use the built-in mock service instead of the backend
    #[arg(long)]
    mock: bool,

    /// How cue changes are detected
    #[arg(long, value_enum)]
    cue_policy: Option<CliCuePolicy>,

    /// Theme for out-of-context generation (repeatable)
    #[arg(long = "theme")]
    themes: Vec<String>,
}

/// cuecards - turn subtitle selections into flashcards
#[derive(Parser, Debug)]
#[command(name = "cuecards")]
#[command(version)]
#[command(about = "Subtitle-driven flashcard study engine")]
#[command(long_about = "cuecards keeps the current subtitle in sync with playback, builds word
selections from it and drives flashcard generation, review and export.

EXAMPLES:
    cuecards cues talk.srt                        # List cues
    cuecards cues talk.vtt --at 00:01:12.500      # Show the cue active at a time
    cuecards study talk.srt                       # Study against the configured backend
    cuecards study --mock talk.srt                # Study offline with the mock service
    cuecards study --url https://youtu.be/abc123  # Fetch cues through the backend
    cuecards completions bash > cuecards.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cuecards", &mut std::io::stdout());
            Ok(())
        }
        Commands::Cues { file, at } => run_cues(file, at),
        Commands::Study(args) => {
            let config = load_config(&cli.config_path, cli.log_level, &args)?;
            run_study(config, args).await
        }
    }
}

fn load_config(path: &str, log_level: Option<CliLogLevel>, args: &StudyArgs) -> Result<Config> {
    let mut config = Config::load_or_create(path)?;

    // Override config with CLI options if provided
    if let Some(endpoint) = &args.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if let Some(policy) = args.cue_policy {
        config.playback.cue_change_policy = policy.into();
    }
    if !args.themes.is_empty() {
        config.generation.custom_themes = args.themes.clone();
    }
    match log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn parse_time(raw: &str) -> Result<f64> {
    if let Some(timestamp) = Timestamp::parse(raw) {
        return Ok(timestamp.as_secs_f64());
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or_else(|| anyhow!("Invalid time '{}': expected HH:MM:SS.mmm or seconds", raw))
}

fn run_cues(file: PathBuf, at: Option<String>) -> Result<()> {
    let cues = load_cue_file(&file)?;

    match at {
        None => {
            for (index, cue) in cues.iter().enumerate() {
                println!("{:>4}  {}", index + 1, cue);
            }
        }
        Some(raw) => {
            let time = parse_time(&raw)?;
            match resolve_active_index(&cues, time) {
                Some(index) => {
                    let context = CueContext::around(&cues, index);
                    println!("cue {} {}", index + 1, cues[index]);
                    println!("  previous: {}", context.previous);
                    println!("  next:     {}", context.next);
                }
                None => println!("No cue is active at {}", raw),
            }
        }
    }
    Ok(())
}

async fn run_study(config: Config, args: StudyArgs) -> Result<()> {
    let http = HttpFlashcardService::from_config(&config.service)?;
    let mock = MockFlashcardService::working();
    let mut history = InMemoryHistory::new();

    let cues: Vec<SubtitleCue> = match (&args.file, &args.url) {
        (Some(file), _) => load_cue_file(file)?,
        (None, Some(url)) => {
            let url = validate_source_url(url)?;
            let source: &dyn SubtitleSource = if args.mock { &mock } else { &http };
            info!("Processing video {}", url);
            let video = source.process_video(url.as_str()).await?;
            info!("{}", video.message);
            let entry = HistoryEntry::from_processed(url.as_str(), &video);
            record_if_new(&mut history, entry);
            video.subtitles
        }
        (None, None) => return Err(anyhow!("Either FILE or --url is required")),
    };
    if cues.is_empty() {
        return Err(anyhow!("The subtitle track has no cues"));
    }

    let service: Arc<dyn FlashcardService> = if args.mock { Arc::new(mock) } else { Arc::new(http) };
    let player = Arc::new(SimulatedPlayer::new());
    let session = StudySession::from_config(cues, &config);
    let (engine, task) = Engine::spawn(session, ClockSampler::from_config(&config.playback), service);
    engine.send(EngineCommand::AttachClock(player.clone())).await?;

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match run_repl_line(&engine, &player, line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => error!("{}", e),
        }
    }

    engine.shutdown();
    let _ = task.await;
    Ok(())
}

// @returns: false when the REPL should exit
async fn run_repl_line(engine: &EngineHandle, player: &SimulatedPlayer, line: &str) -> Result<bool> {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match verb {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "help" => print_help(),
        "play" => {
            player.play();
            engine.send(EngineCommand::PlaybackStateChanged { playing: true }).await?;
        }
        "pause" => {
            player.pause();
            engine.send(EngineCommand::PlaybackStateChanged { playing: false }).await?;
        }
        "seek" => {
            let time = parse_time(rest)?;
            player.seek(time);
            engine.send(EngineCommand::ObserveTime(time)).await?;
        }
        "show" => print_snapshot(&engine.snapshot().await?),
        "click" => {
            for word in rest.split_whitespace() {
                engine.send(EngineCommand::ClickWord(word.to_string())).await?;
            }
            println!("selection: {}", engine.snapshot().await?.phrase());
        }
        "commit" => engine.send(EngineCommand::CommitSelection).await?,
        "toggle" => {
            let card = card_at(engine, rest).await?;
            engine.send(EngineCommand::ToggleCard(card.id)).await?;
        }
        "edit" => {
            let (number, fields) = rest.split_once(' ').unwrap_or((rest, ""));
            let card = card_at(engine, number).await?;
            let parts: Vec<&str> = fields.split('|').map(str::trim).collect();
            let [english, portuguese, term] = parts.as_slice() else {
                return Err(anyhow!("Usage: edit <n> <english>|<portuguese>|<term>"));
            };
            engine.send(EngineCommand::BeginEdit(card.id.clone())).await?;
            let edited = Flashcard::new(card.id, *english, *portuguese, *term);
            engine.send(EngineCommand::SaveEdit(edited)).await?;
        }
        "more" => {
            let context_type = match rest {
                "" | "in" => ContextType::InContext,
                "out" => ContextType::OutOfContext,
                other => return Err(anyhow!("Unknown context '{}', expected in or out", other)),
            };
            engine.send(EngineCommand::RequestMore(context_type)).await?;
        }
        "submit" => engine.send(EngineCommand::Submit).await?,
        "back" => engine.send(EngineCommand::GoBack).await?,
        "confirm" => engine.send(EngineCommand::Confirm).await?,
        "dismiss" => engine.send(EngineCommand::Dismiss).await?,
        other => return Err(anyhow!("Unknown command '{}', type help", other)),
    }
    Ok(true)
}

async fn card_at(engine: &EngineHandle, number: &str) -> Result<Flashcard> {
    let index: usize = number
        .trim()
        .parse()
        .map_err(|_| anyhow!("Expected a card number, got '{}'", number))?;
    let snapshot = engine.snapshot().await?;
    let workflow = snapshot.workflow.ok_or_else(|| anyhow!("No flashcards yet, commit a selection first"))?;
    index
        .checked_sub(1)
        .and_then(|i| workflow.candidates.get(i).cloned())
        .ok_or_else(|| anyhow!("No card number {}", index))
}

fn print_help() {
    println!("Commands:");
    println!("  play | pause | seek <time>      control the simulated player");
    println!("  show                            show cue, selection and cards");
    println!("  click <word>...                 click words of the current subtitle");
    println!("  commit                          generate cards for the selection");
    println!("  toggle <n> | edit <n> a|b|c     choose or edit card n");
    println!("  more [in|out]                   generate more cards");
    println!("  submit | back | confirm         review and send chosen cards");
    println!("  dismiss | help | quit");
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    match snapshot.current_time {
        Some(time) => println!("time: {:.3}s", time),
        None => println!("time: -"),
    }
    match &snapshot.active_cue {
        Some(cue) => println!("cue:  {}", cue),
        None => println!("cue:  (none)"),
    }
    println!("selection: {}", snapshot.phrase());

    let Some(workflow) = &snapshot.workflow else {
        return;
    };
    let loading = if workflow.loading { " (waiting for service)" } else { "" };
    println!("flashcards for '{}': {} step{}", workflow.phrase, workflow.step, loading);
    for (i, card) in workflow.candidates.iter().enumerate() {
        let mark = if workflow.chosen.contains(&card.id) { "x" } else { " " };
        println!(
            "  [{}] {:>2}. {} / {} ({})",
            mark,
            i + 1,
            card.english_sentence,
            card.portuguese_translation,
            card.term_translation
        );
    }
    if !workflow.confirmation_list.is_empty() {
        println!("  checked:");
        for entry in &workflow.confirmation_list {
            let tag = if entry.is_duplicate { "duplicate" } else { "new" };
            println!("    {:<9} {}", tag, entry.flashcard.english_sentence);
        }
    }
    if let Some(error) = &workflow.last_error {
        println!("  error: {}", error);
    }
    if let Some(message) = &workflow.status_message {
        println!("  {}", message);
    }
}
