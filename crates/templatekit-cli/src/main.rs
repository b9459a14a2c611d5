//! # TemplateKit CLI
//!
//! Browse and edit templates kept in a [`FileStorage`] directory.
//!
//! ```bash
//! # List your templates plus every public one
//! templatekit list --owner <uuid> --public
//!
//! # Import a layout exported from the editor
//! templatekit import invoice.json
//!
//! # Make it visible to everyone
//! templatekit publish <id>
//!
//! # Show the element types that can be dropped on a canvas
//! templatekit palette
//! ```

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use templatekit_core::element::{ContentError, Element, ElementKind};
use templatekit_core::storage::{TemplateRecord, UserId};
use templatekit_core::{
    FileStorage, LayoutError, LayoutStore, StorageError, SyncError, Synchronizer, TemplateFilter,
    TemplateId, TemplateStorage,
};
use thiserror::Error;

/// TemplateKit - document template storage utility
#[derive(Parser, Debug)]
#[command(name = "templatekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the template documents
    #[arg(long, global = true, env = "TEMPLATEKIT_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List stored templates
    List {
        /// Only templates owned by this user
        #[arg(long)]
        owner: Option<UserId>,

        /// Include public templates
        #[arg(long)]
        public: bool,
    },
    /// Print a template's elements in sequence order
    Show { id: TemplateId },
    /// Create an empty template
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        public: bool,

        #[arg(long)]
        owner: Option<UserId>,
    },
    /// Save a layout JSON file as a new template
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print the stored layout JSON
    Export { id: TemplateId },
    /// Change a template's name
    Rename { id: TemplateId, name: String },
    /// Make a template public, or private again with --private
    Publish {
        id: TemplateId,

        #[arg(long)]
        private: bool,
    },
    /// Delete a template and its elements
    Delete { id: TemplateId },
    /// List the element types offered by the palette
    Palette,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let storage = match cli.data_dir {
        Some(dir) => FileStorage::new(dir)?,
        None => FileStorage::default_location()?,
    };
    log::debug!("Using template directory {}", storage.base_path().display());

    let sync = Synchronizer::new(Arc::new(storage));
    let mut out = io::stdout().lock();
    pollster::block_on(execute(cli.command, &sync, &mut out))
}

async fn execute<S: TemplateStorage>(
    command: Command,
    sync: &Synchronizer<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Command::List { owner, public } => {
            let filter = TemplateFilter {
                owner,
                include_public: public,
            };
            for summary in sync.list(&filter).await? {
                writeln!(
                    out,
                    "{}  {:<32} {:>3} elements{}",
                    summary.id,
                    summary.name,
                    summary.element_count,
                    if summary.is_public { "  public" } else { "" }
                )?;
            }
        }
        Command::Show { id } => {
            let mut store = LayoutStore::new();
            sync.load(id, &mut store).await?;
            writeln!(out, "{}{}", store.name(), if store.is_public() { " (public)" } else { "" })?;
            for (index, element) in store.iter().enumerate() {
                let (position, size) = (element.position(), element.size());
                writeln!(
                    out,
                    "{:>3}. {:<10} at ({}, {}) size {}x{} row {}",
                    index,
                    element.kind(),
                    position.x,
                    position.y,
                    size.width,
                    size.height,
                    element.row_order()
                )?;
            }
        }
        Command::Create {
            name,
            public,
            owner,
        } => {
            let mut store = LayoutStore::new();
            store.set_name(name);
            store.set_public(public);
            let id = save_new(sync, owner, &store).await?;
            writeln!(out, "{}", id)?;
        }
        Command::Import { path } => {
            let record = read_layout(&path)?;
            let elements = record
                .elements
                .into_iter()
                .map(Element::from_record)
                .collect::<Result<Vec<_>, _>>()?;
            let mut store = LayoutStore::new();
            store.replace_all(record.meta.name, record.meta.is_public, elements)?;
            let id = save_new(sync, record.owner_id, &store).await?;
            log::info!("Imported {} as {}", path.display(), id);
            writeln!(out, "{}", id)?;
        }
        Command::Export { id } => {
            let record = sync.storage().get_template(id).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }
        Command::Rename { id, name } => {
            let mut store = LayoutStore::new();
            sync.load(id, &mut store).await?;
            store.set_name(name);
            sync.save(Some(id), &store.snapshot()).await?;
        }
        Command::Publish { id, private } => {
            let mut store = LayoutStore::new();
            sync.load(id, &mut store).await?;
            store.set_public(!private);
            sync.save(Some(id), &store.snapshot()).await?;
        }
        Command::Delete { id } => sync.delete(id).await?,
        Command::Palette => {
            for kind in ElementKind::ALL {
                let size = kind.default_size();
                writeln!(out, "{:<10} {:<14} {}x{}", kind, kind.label(), size.width, size.height)?;
            }
        }
    }
    Ok(())
}

/// Save as a new template, recording `owner` when one is given.
async fn save_new<S: TemplateStorage>(
    sync: &Synchronizer<S>,
    owner: Option<UserId>,
    store: &LayoutStore,
) -> Result<TemplateId, CliError> {
    let snapshot = store.snapshot();
    let id = match owner {
        Some(owner) => {
            Synchronizer::new(sync.storage().clone())
                .with_owner(owner)
                .save(None, &snapshot)
                .await?
        }
        None => sync.save(None, &snapshot).await?,
    };
    Ok(id)
}

fn read_layout(path: &Path) -> Result<TemplateRecord, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}
