pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "mentor",
    about = "Mentor operator CLI",
    long_about = "Run learner-request orchestration turns, apply migrations, and inspect configuration.",
    after_help = "Examples:\n  mentor migrate\n  mentor config\n  mentor chat --message \"Make me 8 easy flashcards on photosynthesis\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,
    #[command(about = "Run one orchestration turn against the configured gateway and tools")]
    Chat(commands::chat::ChatArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Chat(args) => commands::chat::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
