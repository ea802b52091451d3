mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{edit, scan, watch, EditArgs, ScanArgs, WatchArgs};

/// Trellis CLI - structural editing for markup projects
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a project directory and print its file tree
    Scan(ScanArgs),

    /// Run a structural action on a markup file
    Edit(EditArgs),

    /// Watch a project and reconcile on every change
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Scan(args) => scan(args, &cwd).await,
        Command::Edit(args) => edit(args, &cwd),
        Command::Watch(args) => watch(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
