//! draftloop - interactive document drafting from the terminal
//!
//! Asks a text generator for a template, gathers details from the user,
//! drafts the document, and revises it until the user is satisfied.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use draftloop::{
    create_generator, DraftConfig, DraftError, Session, SessionController, SessionState,
    TerminalChannel, UserChannel,
};

#[derive(Parser)]
#[command(name = "draftloop")]
#[command(version = "0.1.0")]
#[command(about = "Draft documents interactively with an LLM until you are satisfied", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding .draftloop/settings.json (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a drafting session
    Run {
        /// Kind of document to draft (asked interactively when omitted)
        document_type: Option<String>,

        /// Generator provider: groq, openai, or claude
        #[arg(long, env = "DRAFTLOOP_PROVIDER", value_name = "PROVIDER")]
        provider: Option<String>,

        /// Model name passed to the provider
        #[arg(long, env = "DRAFTLOOP_MODEL", value_name = "MODEL")]
        model: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Maximum tokens per completion
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Give up after this many revisions
        #[arg(long)]
        max_revisions: Option<u32>,

        /// Write the final document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the session (transcript included) as JSON to this file
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate .draftloop/settings.json
    Validate,
}

/// Overrides for the settings file taken from `run` flags.
struct RunOverrides {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<u64>,
    max_revisions: Option<u32>,
}

impl RunOverrides {
    fn apply(self, config: &mut DraftConfig) {
        if let Some(provider) = self.provider {
            config.generator.provider = provider;
        }
        if let Some(model) = self.model {
            config.generator.model = Some(model);
        }
        if let Some(temperature) = self.temperature {
            config.generator.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.generator.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.timeout {
            config.generator.timeout_secs = timeout;
        }
        if self.max_revisions.is_some() {
            config.max_revisions = self.max_revisions;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "draftloop=debug,info"
    } else {
        "draftloop=info,warn"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let outcome = match cli.command {
        Commands::Run {
            document_type,
            provider,
            model,
            temperature,
            max_tokens,
            timeout,
            max_revisions,
            output,
            transcript,
        } => {
            let overrides = RunOverrides {
                provider,
                model,
                temperature,
                max_tokens,
                timeout,
                max_revisions,
            };
            run_session(
                &project_path,
                document_type,
                overrides,
                output.as_deref(),
                transcript.as_deref(),
            )
            .await
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => show_config(&project_path, json),
            ConfigAction::Validate => validate_config(&project_path),
        },
    };

    if let Err(e) = outcome {
        debug!(state = ?e.state(), exit_code = e.exit_code(), "draftloop failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(wait) = e.retry_after() {
            eprintln!(
                "{} The failure looks transient; retry in {}s",
                "Hint:".yellow(),
                wait.as_secs()
            );
        }
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run_session(
    project_path: &Path,
    document_type: Option<String>,
    overrides: RunOverrides,
    output: Option<&Path>,
    transcript: Option<&Path>,
) -> draftloop::Result<()> {
    let mut config = DraftConfig::load(project_path)?;
    overrides.apply(&mut config);
    config.ensure_valid()?;

    let generator = create_generator(&config.generator)?;
    if !generator.available().await {
        debug!(
            "Generator {} reports unavailable; the first request will fail",
            generator.model_name()
        );
    }

    let channel = Arc::new(TerminalChannel::stdio());
    let document_type = match document_type {
        Some(kind) => kind,
        None => ask_document_type(channel.as_ref()).await?,
    };

    println!(
        "{} Drafting a {} with {}",
        "Session:".cyan().bold(),
        document_type.bold(),
        generator.model_name()
    );

    let mut controller = SessionController::new(document_type, generator, channel)
        .with_predicate(config.predicate())
        .with_max_revisions(config.max_revisions);

    let result = controller.run().await.map(|_| ());

    // Written even when the run aborted
    if let Some(path) = transcript {
        write_transcript(path, controller.session())?;
    }
    result?;

    let session = controller.session();
    println!("\n{}", "Final Document:".green().bold());
    println!("{}", session.document());

    if let Some(path) = output {
        std::fs::write(path, session.document())?;
        println!(
            "\n{} Document written to {}",
            "OK".green(),
            path.display()
        );
    }

    Ok(())
}

async fn ask_document_type(channel: &dyn UserChannel) -> draftloop::Result<String> {
    // No session exists yet; failures are charged to its first state
    let reply = channel
        .prompt_user("What type of document would you like to create?")
        .await
        .map_err(|e| DraftError::channel(SessionState::Template, e))?;

    let kind = reply.trim();
    if kind.is_empty() {
        return Err(DraftError::Other(anyhow::anyhow!(
            "a document type is required"
        )));
    }
    Ok(kind.to_string())
}

fn write_transcript(path: &Path, session: &Session) -> draftloop::Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(path, json)?;
    debug!("Transcript written to {}", path.display());
    Ok(())
}

fn show_config(project_path: &Path, json: bool) -> draftloop::Result<()> {
    let config = DraftConfig::load(project_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("\n{} Draft Configuration", "Config:".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("   Provider: {}", config.generator.provider);
    println!("   Model: {}", config.generator.resolved_model());
    println!("   Temperature: {}", config.generator.temperature);
    println!("   Max tokens: {}", config.generator.max_tokens);
    println!("   Timeout: {}s", config.generator.timeout_secs);
    println!(
        "   Satisfaction keywords: {}",
        config.satisfaction_keywords.join(", ")
    );
    match config.max_revisions {
        Some(max) => println!("   Max revisions: {}", max),
        None => println!("   Max revisions: unbounded"),
    }
    println!(
        "   Settings: {}",
        DraftConfig::settings_path(project_path).display()
    );

    Ok(())
}

fn validate_config(project_path: &Path) -> draftloop::Result<()> {
    let settings_path = DraftConfig::settings_path(project_path);
    if !settings_path.exists() {
        println!(
            "{} settings.json not found (using defaults)",
            "Info:".blue()
        );
    }

    let config = DraftConfig::load(project_path)?;
    let problems = config.validate();

    if problems.is_empty() {
        println!("{} Configuration is valid", "OK".green());
        return Ok(());
    }

    for (field, reason) in &problems {
        eprintln!("{} {}: {}", "Invalid:".yellow(), field, reason);
    }
    let (field, reason) = problems.into_iter().next().unwrap_or_default();
    Err(DraftError::invalid_config(field, reason))
}
