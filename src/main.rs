use clap::Parser;
use slack_backup::commands;
use slack_backup::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = commands::run_backup(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
