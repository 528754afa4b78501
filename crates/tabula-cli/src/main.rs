use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tabula", version, about = "Tabula SQL agent CLI")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, short = 'c', global = true, default_value = "tabula.yaml", env = "TABULA_CONFIG")]
    config: PathBuf,

    /// Company the session runs for.
    #[arg(long, global = true, default_value = "default", env = "TABULA_TENANT")]
    tenant: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Run every statement in a read-only transaction.
    #[arg(long, global = true, default_value_t = false)]
    read_only: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tables the tenant may query.
    Tables,

    /// Describe tables (all usable tables when none are given).
    Info {
        /// Table names, optionally qualified as "database.table".
        tables: Vec<String>,
    },

    /// Run a query and print the rendered result.
    Query {
        sql: String,

        /// "all" or "one"
        #[arg(long, default_value = "all")]
        fetch: String,
    },

    /// Print the agent tool definitions as JSON.
    Tools,

    /// Call an agent tool with JSON arguments.
    Call {
        tool: String,

        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = commands::Session {
        config_path: cli.config,
        tenant: cli.tenant,
        read_only: cli.read_only,
    };

    match cli.cmd {
        Command::Tables => commands::tables(&session).await,
        Command::Info { tables } => commands::info(&session, tables).await,
        Command::Query { sql, fetch } => commands::query(&session, &sql, &fetch).await,
        Command::Tools => commands::tools(),
        Command::Call { tool, args } => commands::call(&session, &tool, &args).await,
    }
}
