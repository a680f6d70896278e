mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, UpdateCommands};
use output::{print_error, print_usage};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print_usage(&e.to_string());
                std::process::exit(1);
            }
            _ => {
                let msg = e.to_string();
                print_error(msg.trim_start_matches("error: "));
                std::process::exit(1);
            }
        },
    };

    observability::init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Commands::Update(update) = &cli.command;

    if update.command.is_empty() {
        print_usage(&subcommand_help(update.command.name()));
        anyhow::bail!("no arguments given to update {}", update.command.name());
    }

    match &update.command {
        UpdateCommands::AppInsights(args) => commands::update::appinsights(args).await?,
        UpdateCommands::Endpoint(args) => commands::update::endpoint(args).await?,
        UpdateCommands::Generic(args) => commands::update::generic(args).await?,
    }

    Ok(())
}

fn subcommand_help(name: &str) -> String {
    let mut cmd = Cli::command();
    cmd.build();
    cmd.find_subcommand_mut("update")
        .and_then(|update| update.find_subcommand_mut(name))
        .map(|sub| sub.render_help().to_string())
        .unwrap_or_default()
}
