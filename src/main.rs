//! study-stream CLI - Parse course documents and generate exercises from the terminal

mod tui;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use study_stream::{
    AnalyzeParams, ApiError, Config, GenerateFromTextParams, GenerateHandler, StudyClient, Usage,
    UsageMetrics,
};
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use tui::{Output, ParseSpinner};

#[derive(Parser)]
#[command(name = "study-stream")]
#[command(about = "Stream document parsing and exercise generation from the study-assistant backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (defaults to logging.level from the config)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Config file (default: ~/.config/study-stream/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token
    #[arg(long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an uploaded document and follow its progress
    Parse {
        /// Document id returned by the upload
        doc_id: String,
    },

    /// Generate exercises from source text, streaming them to stdout
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        exercise: ExerciseArgs,

        /// Exercise set title
        #[arg(long)]
        title: Option<String>,

        /// Key point to cover (repeatable)
        #[arg(long = "key-point")]
        key_points: Vec<String>,

        /// Analysis summary or intent passed to the generator
        #[arg(long)]
        analysis: Option<String>,

        /// Run the analysis step first and use its key points
        #[arg(long)]
        analyze: bool,
    },

    /// Analyze source text and show the key points generation would use
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        exercise: ExerciseArgs,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct SourceArgs {
    /// Source text
    #[arg(short, long, conflicts_with = "file")]
    content: Option<String>,

    /// Read the source text from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ExerciseArgs {
    /// Question type (single_choice, multiple_choice, fill_blank, short_answer, true_false)
    #[arg(short = 'q', long, default_value = "single_choice")]
    question_type: String,

    /// Difficulty (easy, medium, hard)
    #[arg(short, long, default_value = "medium")]
    difficulty: String,

    /// Number of questions
    #[arg(short = 'n', long, default_value = "5")]
    count: u32,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_from(config_path.clone())
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(url) = cli.base_url {
        config.api.base_url = url;
    }
    if let Some(token) = cli.token {
        config.api.token = Some(token);
    }

    // Setup logging
    let level_name = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    let log_level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse { doc_id } => {
            let client = client_for(&config)?;
            run_parse(&client, &doc_id).await?;
        }
        Commands::Generate {
            source,
            exercise,
            title,
            key_points,
            analysis,
            analyze,
        } => {
            let client = client_for(&config)?;
            let content = read_source(&source).await?;
            run_generate(
                &client,
                content,
                exercise,
                title,
                key_points,
                analysis,
                analyze,
            )
            .await?;
        }
        Commands::Analyze { source, exercise } => {
            let client = client_for(&config)?;
            let content = read_source(&source).await?;
            let mut metrics = UsageMetrics::new();
            run_analyze(&client, content, &exercise, &mut metrics).await?;
            eprint!("\n{}", metrics);
        }
        Commands::Config(cmd) => {
            run_config_command(cmd, &config, config_path)?;
        }
    }

    Ok(())
}

fn client_for(config: &Config) -> Result<StudyClient> {
    config.validate()?;
    Ok(StudyClient::from_config(config))
}

async fn read_source(source: &SourceArgs) -> Result<String> {
    match (&source.content, &source.file) {
        (Some(content), _) => Ok(content.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        (None, None) => bail!("provide the source text with --content or --file"),
    }
}

async fn run_parse(client: &StudyClient, doc_id: &str) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = client.start_parse(doc_id, tx, None);

    let mut spinner = ParseSpinner::new();
    spinner.start(&format!("parsing {}", doc_id));

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                match tui::describe(&event) {
                    Output::Spinner(msg) => spinner.set_message(&msg),
                    Output::Line(line) => spinner.println(&line),
                    Output::Finish => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, aborting parse session");
                session.abort();
            }
        }
    }

    spinner.stop();
    let state = session.subscribe();
    let result = session.done().await;
    info!("Parse session ended: {:?}", *state.borrow());
    result?;
    Ok(())
}

/// Writes generated text straight to stdout
#[derive(Default)]
struct StdoutHandler {
    finished: Option<(String, Option<Usage>)>,
    error: Option<ApiError>,
}

impl GenerateHandler for StdoutHandler {
    fn on_chunk(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_done(&mut self, exercise_id: &str, usage: Option<Usage>) {
        self.finished = Some((exercise_id.to_string(), usage));
    }

    fn on_error(&mut self, error: ApiError) {
        self.error = Some(error);
    }
}

async fn run_generate(
    client: &StudyClient,
    content: String,
    exercise: ExerciseArgs,
    title: Option<String>,
    key_points: Vec<String>,
    analysis: Option<String>,
    analyze: bool,
) -> Result<()> {
    let mut metrics = UsageMetrics::new();

    let mut key_points = key_points;
    if analyze {
        let analyzed = run_analyze(client, content.clone(), &exercise, &mut metrics).await?;
        if key_points.is_empty() {
            key_points = analyzed.key_points;
        }
    }

    let mut params =
        GenerateFromTextParams::new(content, exercise.question_type, exercise.difficulty, exercise.count)
            .with_key_points(key_points);
    if let Some(title) = title {
        params = params.with_title(title);
    }
    if let Some(analysis) = analysis {
        params = params.with_analysis(analysis);
    }

    let mut handler = StdoutHandler::default();
    tokio::select! {
        _ = client.generate_from_text(&params, &mut handler) => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted");
            return Ok(());
        }
    }

    if let Some(error) = handler.error {
        return Err(error).context("generation failed");
    }

    println!();
    if let Some((exercise_id, usage)) = handler.finished {
        if exercise_id.is_empty() {
            eprintln!("\nNo exercise id was returned");
        } else {
            eprintln!("\nExercise: {}", exercise_id);
        }
        metrics.record(usage.as_ref());
    }
    eprint!("\n{}", metrics);

    Ok(())
}

async fn run_analyze(
    client: &StudyClient,
    content: String,
    exercise: &ExerciseArgs,
    metrics: &mut UsageMetrics,
) -> Result<study_stream::AnalyzeForConfirmResponse> {
    let params = AnalyzeParams::new(
        content,
        exercise.question_type.clone(),
        exercise.difficulty.clone(),
        exercise.count,
    );
    info!("Analyzing {} characters of source text", params.content.chars().count());

    let response = client
        .analyze_for_confirm(&params)
        .await
        .context("analysis failed")?;

    eprintln!("--- Analysis ---");
    if let Some(label) = response
        .question_type_label
        .as_deref()
        .or(response.question_type.as_deref())
    {
        eprintln!("Question type: {}", label);
    }
    if let Some(label) = response
        .difficulty_label
        .as_deref()
        .or(response.difficulty.as_deref())
    {
        eprintln!("Difficulty: {}", label);
    }
    if let Some(count) = response.count {
        eprintln!("Count: {}", count);
    }
    eprintln!("Key points:");
    for point in &response.key_points {
        eprintln!("  - {}", point);
    }
    metrics.record(response.usage.as_ref());

    Ok(response)
}

fn run_config_command(cmd: ConfigCommands, config: &Config, path: PathBuf) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save_to(path.clone())?;
            println!("Config written to: {}", path.display());
        }
        ConfigCommands::Show => {
            let mut shown = config.clone();
            if shown.api.token.is_some() {
                shown.api.token = Some("********".to_string());
            }
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
