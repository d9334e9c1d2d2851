use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use minuta_core::{DraftId, DraftStatus, IdKind};
use minuta_sync::{EditorSession, HttpDraftStore};

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "minuta", version)]
#[command(about = "Draft contracts against a Minuta server", long_about = None)]
struct Cli {
    /// Base URL of the Minuta server
    #[arg(long, global = true, env = "MINUTA_SERVER", default_value = "http://localhost:8000")]
    server: String,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "MINUTA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contract types
    Types,
    /// Show a draft's status and preview
    Show {
        id: DraftId,
        /// Print the rendered HTML instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Create a draft of the given contract type
    New {
        contract_type: u64,
        #[arg(long)]
        title: String,
    },
    /// Set a document variable
    Set {
        id: DraftId,
        name: String,
        value: String,
    },
    /// Bind a party and qualification template to a role
    Assign {
        id: DraftId,
        role: String,
        entity: u64,
        #[arg(long)]
        template: u64,
    },
    /// Append a clause from the library
    AddClause { id: DraftId, clause: u64 },
    /// Link a file to a clause (1-based position), uploading it or reusing an uploaded one
    Attach {
        id: DraftId,
        position: usize,
        #[arg(required_unless_present = "existing")]
        file: Option<PathBuf>,
        /// Id of a file already uploaded to this draft (see `attachments`)
        #[arg(long, conflicts_with = "file")]
        existing: Option<u64>,
    },
    /// Send a draft for review
    Submit { id: DraftId },
    /// Approve a draft under review
    Approve { id: DraftId },
    /// Return a draft to DRAFT
    Revert { id: DraftId },
    /// Show the audit trail
    History { id: DraftId },
    /// List uploaded files
    Attachments { id: DraftId },
    /// Export a draft as .docx
    Export {
        id: DraftId,
        #[arg(long)]
        out: PathBuf,
    },
    /// Replace a draft's clauses with the paragraphs of a .docx or .txt file
    Import { id: DraftId, file: PathBuf },
    /// Apply the CPF/CNPJ/RG mask to a value
    Mask { kind: IdKind, value: String },
    /// Check a CPF/CNPJ/RG value
    Validate { kind: IdKind, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("minuta v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Mask { kind, value } => commands::mask(kind, &value),
        Commands::Validate { kind, value } => commands::validate(kind, &value)?,
        command => {
            let store = HttpDraftStore::new(cli.server).with_token(cli.token);
            let mut session = EditorSession::open(store).await?;
            let result = run(&mut session, command).await;
            display::print_notices(&session.drain_notices());
            result?
        }
    };
    print!("{output}");

    Ok(())
}

async fn run(session: &mut EditorSession<HttpDraftStore>, command: Commands) -> Result<String> {
    match command {
        Commands::Types => Ok(commands::types(session)),
        Commands::Show { id, html } => commands::show(session, id, html).await,
        Commands::New {
            contract_type,
            title,
        } => commands::new(session, contract_type, &title).await,
        Commands::Set { id, name, value } => commands::set(session, id, &name, &value).await,
        Commands::Assign {
            id,
            role,
            entity,
            template,
        } => commands::assign(session, id, &role, entity, template).await,
        Commands::AddClause { id, clause } => commands::add_clause(session, id, clause).await,
        Commands::Attach {
            id,
            position,
            file,
            existing,
        } => match (file, existing) {
            (_, Some(attachment)) => {
                commands::link_existing(session, id, position, attachment).await
            }
            (Some(file), None) => commands::attach(session, id, position, &file).await,
            (None, None) => anyhow::bail!("give a file to upload or --existing <attachment-id>"),
        },
        Commands::Submit { id } => commands::transition(session, id, DraftStatus::Review).await,
        Commands::Approve { id } => commands::transition(session, id, DraftStatus::Final).await,
        Commands::Revert { id } => commands::transition(session, id, DraftStatus::Draft).await,
        Commands::History { id } => commands::history(session, id).await,
        Commands::Attachments { id } => commands::attachments(session, id).await,
        Commands::Export { id, out } => commands::export(session, id, &out).await,
        Commands::Import { id, file } => commands::import(session, id, &file).await,
        Commands::Mask { kind, value } => Ok(commands::mask(kind, &value)),
        Commands::Validate { kind, value } => commands::validate(kind, &value),
    }
}
