//! CLI surface: one subcommand per stage, matching the interactive flags
//! from the external interfaces section — `--brief`/`--issue`, `--resume`,
//! `--auto`, `--mock`, `--repo`.

mod commands;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use warden_utils::error::UserFriendlyError;
use warden_utils::ExitCode;

#[derive(Parser)]
#[command(name = "warden", about = "Governance workflow engine for issue, design, and implementation stages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root; defaults to the current directory.
    #[arg(long, global = true)]
    repo: Option<Utf8PathBuf>,

    /// Explicit config file path, overriding discovery.
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Never touch the editor or prompt for input; decide purely from state.
    #[arg(long, global = true)]
    auto: bool,

    /// Run entirely against fixture LLM/tracker responses; no external calls.
    #[arg(long, global = true)]
    mock: bool,

    /// Emit structured JSON logs instead of compact text.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft, review, and file a tracker issue from a markdown brief.
    Issue {
        #[arg(long)]
        brief: Utf8PathBuf,
        #[arg(long)]
        resume: bool,
    },
    /// Draft, review, and approve a low-level design for a filed issue.
    Lld {
        #[arg(long)]
        issue: u64,
        #[arg(long)]
        resume: bool,
    },
    /// Test-first draft, run, review, and merge an implementation.
    Impl {
        #[arg(long)]
        issue: u64,
        #[arg(long)]
        resume: bool,
        #[arg(long, default_value = "cargo test")]
        test_command: String,
    },
}

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    warden_utils::logging::init(cli.log_json);

    let ctx = CliContext::from_cli(&cli);

    let rt = tokio::runtime::Runtime::new().map_err(|_| ExitCode::IoError)?;

    let result = rt.block_on(async {
        match cli.command {
            Commands::Issue { brief, resume } => commands::run_issue(&ctx, brief, resume).await,
            Commands::Lld { issue, resume } => commands::run_lld(&ctx, issue, resume).await,
            Commands::Impl { issue, resume, test_command } => commands::run_impl(&ctx, issue, resume, test_command).await,
        }
    });

    match result {
        Ok(outcome) => {
            report_outcome(&outcome);
            match outcome.error_message {
                Some(msg) if !msg.is_empty() => Err(ExitCode::from_error_message(&msg)),
                _ => Ok(()),
            }
        }
        Err(e) => {
            eprintln!("error: {}", e.user_message());
            for suggestion in e.suggestions() {
                eprintln!("  hint: {suggestion}");
            }
            Err(ExitCode::from_category(e.category()))
        }
    }
}

fn report_outcome(outcome: &commands::CommandOutcome) {
    match &outcome.error_message {
        Some(msg) if !msg.is_empty() => eprintln!("paused: {msg}"),
        _ => match &outcome.final_url {
            Some(url) => println!("done: {url}"),
            None => println!("done"),
        },
    }
}

pub(crate) struct CliContext {
    pub repo_root: Utf8PathBuf,
    pub config_path: Option<Utf8PathBuf>,
    pub auto: bool,
    pub mock: bool,
}

impl CliContext {
    fn from_cli(cli: &Cli) -> Self {
        let repo_root = cli.repo.clone().unwrap_or_else(|| {
            Utf8PathBuf::from_path_buf(std::env::current_dir().unwrap_or_default()).unwrap_or_default()
        });
        Self { repo_root, config_path: cli.config.clone(), auto: cli.auto, mock: cli.mock }
    }
}
