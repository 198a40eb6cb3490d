//! # iThenticate Bridge CLI (`ithen`)
//!
//! ## Usage
//!
//! ```bash
//! ithen --config ./config/ithen.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ithen init` | Create the SQLite database and records table |
//! | `ithen sid` | Log in and print the session ID |
//! | `ithen submit` | Submit an entity's paper file |
//! | `ithen pending <id>` | Print whether a document's report is still pending |
//! | `ithen report` | Refresh score, report ID and report URL for a stored record |
//! | `ithen show` | Print a stored record |
//! | `ithen delete` | Delete a stored record |
//!
//! ## Examples
//!
//! ```bash
//! ithen init
//! ithen submit --bundle paper --entity-id 7 --title "On Rust" \
//!     --file papers/on-rust.pdf --author Ada:Lovelace:corresponding
//! ithen pending 4242
//! ithen report --bundle paper --entity-id 7
//! ithen show --document-id 4242
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use ithenticate_bridge::commands::{self, EntityArgs, ShowTarget, SubmitArgs};
use ithenticate_bridge::config;
use ithenticate_bridge::ithenticate_core::entity::{Author, Profile};
use ithenticate_bridge::logging;
use ithenticate_bridge::migrate;
use ithenticate_bridge::session::CredentialOverrides;

/// iThenticate bridge: submit papers and track their similarity reports.
#[derive(Parser)]
#[command(name = "ithen", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ithen.toml")]
    config: PathBuf,

    /// iThenticate username; overrides config.
    #[arg(long, global = true)]
    username: Option<String>,

    /// iThenticate password; overrides config.
    #[arg(long, global = true)]
    password: Option<String>,

    /// iThenticate API endpoint; overrides config.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct EntityOpts {
    /// Bundle (content type) of the node.
    #[arg(long)]
    bundle: String,

    /// Node ID.
    #[arg(long)]
    entity_id: i64,

    /// Revision ID. Omit to address the latest stored revision.
    #[arg(long)]
    revision: Option<i64>,
}

impl From<EntityOpts> for EntityArgs {
    fn from(opts: EntityOpts) -> Self {
        EntityArgs {
            bundle: opts.bundle,
            entity_id: opts.entity_id,
            revision: opts.revision,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Log in and print the session ID.
    Sid,

    /// Submit an entity's paper file to iThenticate.
    ///
    /// Entities that already have a document ID are not submitted again.
    Submit {
        #[command(flatten)]
        entity: EntityOpts,

        /// Document title.
        #[arg(long)]
        title: String,

        /// Paper file, relative to `[files].root`.
        #[arg(long)]
        file: String,

        /// Author as `FIRST:LAST[:TYPES]`; mark the corresponding author
        /// with the `corresponding` type. Repeatable.
        #[arg(long = "author")]
        authors: Vec<Author>,

        /// Owner profile as `FIRST:LAST`, used when no `--author` is given.
        #[arg(long)]
        owner: Option<Profile>,
    },

    /// Print `pending` or `ready` for a document's report.
    Pending {
        /// iThenticate document ID.
        document_id: i64,
    },

    /// Refresh percent match, report ID and report URL of a stored record.
    Report {
        #[command(flatten)]
        entity: EntityOpts,
    },

    /// Print a stored record.
    Show {
        #[arg(long, required_unless_present_any = ["document_id", "report_id"])]
        bundle: Option<String>,

        #[arg(long, requires = "bundle")]
        entity_id: Option<i64>,

        #[arg(long, requires = "entity_id")]
        revision: Option<i64>,

        /// Look up by iThenticate document ID.
        #[arg(long, conflicts_with_all = ["bundle", "report_id"])]
        document_id: Option<i64>,

        /// Look up by iThenticate report ID.
        #[arg(long, conflicts_with = "bundle")]
        report_id: Option<i64>,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a stored record.
    Delete {
        #[command(flatten)]
        entity: EntityOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let cfg = config::load_config(&cli.config)?;
    let overrides = CredentialOverrides {
        username: cli.username,
        password: cli.password,
        api_url: cli.url,
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sid => {
            commands::run_sid(&cfg, &overrides).await?;
        }
        Commands::Submit {
            entity,
            title,
            file,
            authors,
            owner,
        } => {
            let args = SubmitArgs {
                entity: entity.into(),
                title,
                file,
                authors,
                owner,
            };
            commands::run_submit(&cfg, &overrides, &args).await?;
        }
        Commands::Pending { document_id } => {
            commands::run_pending(&cfg, &overrides, document_id).await?;
        }
        Commands::Report { entity } => {
            commands::run_report(&cfg, &overrides, &entity.into()).await?;
        }
        Commands::Show {
            bundle,
            entity_id,
            revision,
            document_id,
            report_id,
            json,
        } => {
            let target = match (document_id, report_id, bundle, entity_id) {
                (Some(id), _, _, _) => ShowTarget::DocumentId(id),
                (_, Some(id), _, _) => ShowTarget::ReportId(id),
                (_, _, Some(bundle), Some(entity_id)) => ShowTarget::Entity(EntityArgs {
                    bundle,
                    entity_id,
                    revision,
                }),
                _ => anyhow::bail!("show needs --document-id, --report-id or --bundle with --entity-id"),
            };
            commands::run_show(&cfg, &target, json).await?;
        }
        Commands::Delete { entity } => {
            commands::run_delete(&cfg, &entity.into()).await?;
        }
    }

    Ok(())
}
