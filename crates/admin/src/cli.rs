//! Command-line argument definitions using clap derive.
//!
//! Every command prints its result as JSON on stdout. Logs go to stderr.

use clap::{Parser, Subcommand, ValueEnum};
use vellum_core::locking::{ResourceRef, ResourceType};
use vellum_core::types::{DbId, VersionNumber};

/// Operator tooling for the vellum content versioning engine
#[derive(Parser, Debug)]
#[command(name = "vellum-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Identity recorded on mutating commands.
#[derive(clap::Args, Debug, Clone)]
pub struct ActorArgs {
    /// User id to attribute the change to
    #[arg(long)]
    pub actor_id: DbId,

    /// Display name to attribute the change to
    #[arg(long, default_value = "operator")]
    pub actor_name: String,
}

/// Lockable resource kinds, as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    Content,
    Element,
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Collection => ResourceType::Collection,
            ResourceKind::Content => ResourceType::Content,
            ResourceKind::Element => ResourceType::Element,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Declare a release on a collection
    Release {
        #[arg(long)]
        collection: DbId,

        /// Release name, unique within the collection
        #[arg(long)]
        name: String,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// List a collection's releases in declaration order
    Releases {
        #[arg(long)]
        collection: DbId,
    },

    /// Count the versions a purge would delete
    PreviewPurge {
        #[arg(long)]
        collection: DbId,
    },

    /// Delete every version that is neither a release end nor current
    Purge {
        #[arg(long)]
        collection: DbId,
    },

    /// List active locks within a collection
    Locks {
        #[arg(long)]
        collection: DbId,
    },

    /// Release a lock, optionally overriding its holder
    #[command(after_help = "\
EXAMPLES:
    # Release a content lock you hold
    vellum-admin unlock --type content --id 42 --actor-id 7

    # Clear an abandoned element lock held by someone else
    vellum-admin unlock --type element --content 42 --id hero --actor-id 1 --force")]
    Unlock {
        #[arg(long = "type", value_enum)]
        kind: ResourceKind,

        /// Collection or content id, or the element id for element locks
        #[arg(long)]
        id: String,

        /// Owning content id (element locks only)
        #[arg(long, required_if_eq("kind", "element"))]
        content: Option<DbId>,

        /// Release even if another user holds the lock
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// List a content's stored versions
    Versions {
        #[arg(long)]
        content: DbId,

        /// Only versions after this number
        #[arg(long)]
        after: Option<VersionNumber>,

        /// Page size
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Compare two versions of a content
    Diff {
        #[arg(long)]
        content: DbId,

        #[arg(long)]
        from: VersionNumber,

        #[arg(long)]
        to: VersionNumber,
    },
}

/// Build the resource reference for `unlock` from its flags.
pub fn resource_ref(
    kind: ResourceKind,
    id: &str,
    content: Option<DbId>,
) -> Result<ResourceRef, CliError> {
    let numeric = || {
        id.parse::<DbId>().map_err(|_| CliError::InvalidId {
            kind: ResourceType::from(kind).as_str(),
            id: id.to_string(),
        })
    };
    match kind {
        ResourceKind::Collection => Ok(ResourceRef::collection(numeric()?)),
        ResourceKind::Content => Ok(ResourceRef::content(numeric()?)),
        ResourceKind::Element => {
            let content_id = content.ok_or(CliError::MissingContent)?;
            Ok(ResourceRef::element(content_id, id))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("--id '{id}' is not a valid {kind} id")]
    InvalidId { kind: &'static str, id: String },

    #[error("--content is required for element locks")]
    MissingContent,
}
