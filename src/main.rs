mod ai;
mod commands;
mod config;
mod db;
mod error;
mod generation;
mod models;
mod prompt;
mod render;
mod research;

use ai::{AIProvider, AnthropicProvider};
use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::style::Stylize;
use db::Database;
use prompt::Prompter;
use render::{ChromePrinter, Renderer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobb")]
#[command(about = "Job application assistant - research, generate, track")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Data directory (database, output, photo, guidelines)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Model to use (sonnet, opus, haiku or a full model id)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage your personal profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage job listings
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Search the web and build a company research summary for a job
    Research {
        /// ID of the job to research
        job_id: i64,
    },

    /// Generate CV and cover letter PDFs for a job
    Apply {
        /// ID of the job to apply for
        job_id: i64,

        /// Feedback to improve the cover letter (e.g. 'make it less formal')
        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Convert an edited HTML file back to PDF with the same styling
    Render {
        /// Path to the HTML file to convert
        html_file: PathBuf,
    },

    /// Track application statuses
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Create or update your basic profile info
    Setup,

    /// Show your full profile
    Show,

    /// Add a work experience entry
    AddExperience,

    /// Add an education entry
    AddEducation,

    /// Add a skill
    AddSkill,

    /// Add multiple skills at once (comma-separated)
    AddSkills,
}

#[derive(Subcommand)]
enum JobCommands {
    /// Manually add a job you want to apply for
    Add,

    /// List all saved jobs
    List,

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum StatusCommands {
    /// Show all applications and their current status
    List,

    /// Update the status of an application
    Update {
        /// Job ID
        job_id: i64,

        /// New status: draft, sent, interview, rejected, offer
        #[arg(long)]
        status: String,

        /// Notes to store with the application
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete the application and its document records for a job
    Remove {
        /// Job ID
        job_id: i64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,jobb=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match error::classify(&err) {
            Some(app_err) if app_err.is_user_facing() => {
                eprintln!("{}", app_err.to_string().red());
                Ok(ExitCode::FAILURE)
            }
            _ => Err(err),
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir, cli.model)?;
    let mut db = Database::open(&config.db_path())?;
    debug!(data_dir = %config.data_dir.display(), db = %db.path().display(), "ready");

    let make_provider = || -> Result<Box<dyn AIProvider>> {
        Ok(Box::new(AnthropicProvider::from_config(&config)?))
    };
    let renderer = || Renderer::new(config.output_dir(), config.photo_dir(), Box::new(ChromePrinter));

    match cli.command {
        Commands::Profile { command } => {
            let mut prompter = Prompter::stdio();
            match command {
                ProfileCommands::Setup => commands::profile_setup(&mut db, &mut prompter)?,
                ProfileCommands::Show => commands::profile_show(&mut db)?,
                ProfileCommands::AddExperience => {
                    commands::profile_add_experience(&mut db, &mut prompter)?
                }
                ProfileCommands::AddEducation => {
                    commands::profile_add_education(&mut db, &mut prompter)?
                }
                ProfileCommands::AddSkill => commands::profile_add_skill(&mut db, &mut prompter)?,
                ProfileCommands::AddSkills => commands::profile_add_skills(&mut db, &mut prompter)?,
            }
        }

        Commands::Job { command } => match command {
            JobCommands::Add => {
                commands::job_add(&mut db, &mut Prompter::stdio())?;
            }
            JobCommands::List => commands::job_list(&mut db)?,
            JobCommands::Show { id } => commands::job_show(&mut db, id)?,
        },

        Commands::Research { job_id } => commands::research(&mut db, job_id, make_provider)?,

        Commands::Apply { job_id, feedback } => {
            commands::apply(
                &mut db,
                &config,
                &renderer(),
                job_id,
                feedback.as_deref(),
                make_provider,
            )?;
        }

        Commands::Render { html_file } => commands::render(&renderer(), &html_file)?,

        Commands::Status { command } => match command {
            StatusCommands::List => commands::status_list(&mut db)?,
            StatusCommands::Update {
                job_id,
                status,
                notes,
            } => commands::status_update(&mut db, job_id, &status, notes.as_deref())?,
            StatusCommands::Remove { job_id } => commands::status_remove(&mut db, job_id)?,
        },
    }

    Ok(())
}
