use anyhow::Result;
use clap::{crate_version, Parser, Subcommand};
use vaultkeep_app::vaultkeepapp_run;

mod commands;
mod ui;

use commands::{policy, repository, retention, snapshot};

fn main() {
    match CliOptions::try_parse() {
        Ok(options) => {
            let vcount = options.verbose as usize;
            vaultkeepapp_run(|_| command_dispatch(options), vcount);
        }
        Err(e) => {
            let message = e.to_string();
            println!("{}", message.replace("error:", "ERRO:"));
            println!();
        }
    }
}

async fn command_dispatch(options: CliOptions) -> Result<()> {
    match options.subcmd {
        TopCommands::Repository(cmd) => match cmd {
            RepositoryCommands::Create(options) => repository::create(options)?,
            RepositoryCommands::Connect(options) => repository::connect(options)?,
        },
        TopCommands::Snapshot(cmd) => match cmd {
            SnapshotCommands::Create(options) => snapshot::create(options).await?,
        },
        TopCommands::Policy(cmd) => match cmd {
            PolicyCommands::Set(options) => policy::set(options)?,
            PolicyCommands::Show(options) => policy::show(options)?,
        },
        TopCommands::Retention(cmd) => match cmd {
            RetentionCommands::Evaluate(options) => retention::evaluate(options)?,
        },
    }

    Ok(())
}

#[derive(Parser)]
#[clap(version = crate_version!(), author = "rebeagle")]
struct CliOptions {
    /// Enable debug logs. Use twice to enable trace logs.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    subcmd: TopCommands,
}

#[derive(Subcommand)]
enum TopCommands {
    #[clap(subcommand)]
    Repository(RepositoryCommands),
    #[clap(subcommand)]
    Snapshot(SnapshotCommands),
    #[clap(subcommand)]
    Policy(PolicyCommands),
    #[clap(subcommand)]
    Retention(RetentionCommands),
}

#[derive(Subcommand)]
enum RepositoryCommands {
    Create(repository::RepositoryCreateOptions),
    Connect(repository::RepositoryConnectOptions),
}

#[derive(Subcommand)]
enum SnapshotCommands {
    Create(snapshot::SnapshotCreateOptions),
}

#[derive(Subcommand)]
enum PolicyCommands {
    Set(policy::PolicySetOptions),
    Show(policy::PolicyShowOptions),
}

#[derive(Subcommand)]
enum RetentionCommands {
    Evaluate(retention::RetentionEvaluateOptions),
}
