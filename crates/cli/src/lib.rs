pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "supportdesk",
    about = "Supportdesk operator CLI",
    long_about = "Prepare the knowledge base, inspect configuration, and run single support turns.",
    after_help = "Examples:\n  supportdesk migrate\n  supportdesk seed --faq data/kb/sample_faq.md\n  supportdesk ask --session demo \"What's my order A-123 status?\"\n  supportdesk config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Ingest the knowledge-base seed documents (idempotent by source)")]
    Seed {
        #[arg(long, value_name = "PATH", help = "FAQ markdown file to ingest")]
        faq: Option<PathBuf>,
    },
    #[command(about = "Run one turn through the full pipeline and print the response")]
    Ask {
        #[arg(long, help = "Session identifier attached to the turn")]
        session: String,
        #[arg(help = "Customer message")]
        message: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { faq } => commands::seed::run(faq),
        Command::Ask { session, message } => commands::ask::run(&session, &message),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
