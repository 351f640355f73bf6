use crate::commands::{run_admin, run_ingest, run_metrics, run_score, AdminAction, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fraud_lens::config::{StorageBackend, StorageConfig};
use fraud_lens::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Fraud Lens",
    about = "Ingest, score, and review insurance claims from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Ingest a CSV export into the configured store and rescore every claim
    Ingest(IngestArgs),
    /// Print the headline metrics and band distribution
    Metrics(StorageArgs),
    /// Delete all claims and baselines, keeping the schema
    Reset(StorageArgs),
    /// Drop and recreate the claim tables
    Drop(StorageArgs),
    /// Explain the score of a single charge without touching storage
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StorageArgs {
    /// Override the SQLite database path
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// Keep claims in memory instead of SQLite
    #[arg(long, conflicts_with = "database")]
    pub(crate) memory: bool,
}

impl StorageArgs {
    pub(crate) fn apply(self, storage: &mut StorageConfig) {
        if let Some(path) = self.database {
            storage.backend = StorageBackend::Sqlite;
            storage.database_path = path;
        }
        if self.memory {
            storage.backend = StorageBackend::Memory;
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// CSV export to ingest
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Clear existing claims before ingesting
    #[arg(long)]
    pub(crate) reset: bool,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ingest(args) => run_ingest(args),
        Command::Metrics(storage) => run_metrics(storage),
        Command::Reset(storage) => run_admin(storage, AdminAction::Reset),
        Command::Drop(storage) => run_admin(storage, AdminAction::Drop),
        Command::Score(args) => run_score(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["fraud-lens-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn ingest_accepts_storage_overrides() {
        let cli = Cli::try_parse_from([
            "fraud-lens-api",
            "ingest",
            "--csv",
            "claims.csv",
            "--reset",
            "--database",
            "tmp/claims.db",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Ingest(args)) => {
                assert_eq!(args.csv, PathBuf::from("claims.csv"));
                assert!(args.reset);
                assert_eq!(args.storage.database, Some(PathBuf::from("tmp/claims.db")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn memory_and_database_flags_conflict() {
        let result = Cli::try_parse_from([
            "fraud-lens-api",
            "metrics",
            "--memory",
            "--database",
            "claims.db",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn score_parses_formatted_dollars() {
        let cli = Cli::try_parse_from([
            "fraud-lens-api",
            "score",
            "--charge",
            "$2,500",
            "--mean",
            "1000",
            "--std-dev",
            "250",
            "--ruleset",
            "legacy",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.charge, 2500.0);
                assert_eq!(args.mean, Some(1000.0));
                assert_eq!(args.std_dev, Some(250.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn std_dev_requires_mean() {
        let result = Cli::try_parse_from([
            "fraud-lens-api",
            "score",
            "--charge",
            "10",
            "--std-dev",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn storage_args_override_config_backend() {
        let mut storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: PathBuf::from("data/claims.db"),
        };
        StorageArgs {
            database: None,
            memory: true,
        }
        .apply(&mut storage);
        assert_eq!(storage.backend, StorageBackend::Memory);

        StorageArgs {
            database: Some(PathBuf::from("other.db")),
            memory: false,
        }
        .apply(&mut storage);
        assert_eq!(storage.backend, StorageBackend::Sqlite);
        assert_eq!(storage.database_path, PathBuf::from("other.db"));
    }
}
