mod commands;
mod config;
mod error;
mod output;

use clap::{Parser, Subcommand};
use rd_core::ids;
use rd_core::types::StatsKey;
use rd_core::Admin;
use rd_db::DbStore;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::commands::backfill::BackfillArgs;
use crate::commands::events::{ExportArgs, IdArgs, ListArgs, StatsArgs, TailArgs};
use crate::config::Config;
use crate::error::{CliError, Result};

#[derive(Parser)]
#[command(name = "rd", about = "Admin CLI for the redirector events database")]
struct Cli {
    /// Database file (defaults to $DB_PATH, then /data/events.db)
    #[arg(long, global = true)]
    db: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recent events
    #[command(visible_alias = "list")]
    Ls(ListArgs),
    /// Show one or more events as JSON
    #[command(visible_alias = "show")]
    Cat(IdArgs),
    /// Delete one or more events and print the deleted rows
    #[command(visible_alias = "delete")]
    Rm(IdArgs),
    /// Export rows to CSV
    Export(ExportArgs),
    /// Follow new inserts (prints tuple lines)
    Tail(TailArgs),
    /// Top-N counts
    Stats(StatsArgs),
    /// Correct client_ip values recorded from a proxy hop
    #[command(
        name = "backfill-ips",
        long_about = r#"
Re-derive client_ip for events whose stored address is not publicly routable,
using X-Forwarded-For and then CloudFront-Viewer-Address.

Examples:
  rd backfill-ips                      # Show proposed corrections (dry-run)
  rd backfill-ips --apply              # Back up the database, then write them
  rd backfill-ips --only-ips 172.20.0.1 --apply --no-backup
"#
    )]
    BackfillIps(BackfillArgs),
}

impl Command {
    /// Commands whose errors are reported as JSON on stdout.
    fn emits_json(&self) -> bool {
        matches!(self, Self::Cat(_) | Self::Rm(_))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.db);
    let json_errors = cli.command.emits_json();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err, json_errors),
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let open = || -> Result<Admin<DbStore>> {
        let store = DbStore::open(&config.db_path, config.busy_timeout)?;
        Ok(Admin::new(store))
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Ls(args) => commands::events::list(&open()?, args, &mut out),
        Command::Cat(args) => {
            let selection = ids::resolve(&args.ids).map_err(rd_core::RedirectorError::from)?;
            commands::events::show(&open()?, &selection, &mut out)
        }
        Command::Rm(args) => {
            let selection = ids::resolve(&args.ids).map_err(rd_core::RedirectorError::from)?;
            commands::events::delete(&open()?, &selection, &mut out)
        }
        Command::Export(args) => commands::events::export(&open()?, args, &mut out),
        Command::Tail(args) => {
            drop(out);
            commands::events::tail(config, args).await
        }
        Command::Stats(args) => {
            let key: StatsKey = args.by.parse().map_err(rd_core::RedirectorError::from)?;
            commands::events::stats(&open()?, key, args.limit, &mut out)
        }
        Command::BackfillIps(args) => {
            commands::backfill::run(&open()?, &config.db_path, &args, &mut out)
        }
    }
}

fn report(err: &CliError, json_errors: bool) -> ExitCode {
    if err.is_broken_pipe() {
        return ExitCode::SUCCESS;
    }
    tracing::debug!(error = ?err, "command failed");
    match err.envelope().filter(|_| json_errors) {
        Some(body) => println!("{body}"),
        None => eprintln!("rd: {err}"),
    }
    err.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_exits_quietly() {
        let err = CliError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(report(&err, false), ExitCode::SUCCESS);
    }
}
