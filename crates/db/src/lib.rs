//! Database layer for taskhub
//!
//! Provides SurrealDB connection management with an embedded SurrealKV
//! backend (or an in-memory engine), schema initialization, data models,
//! and the repositories used by the HTTP layer.

pub mod error;
pub mod models;
pub mod repository;
pub mod schema;

pub use error::{DbError, DbResult};
pub use models::{Task, TaskDraft, TaskFields, UNASSIGNED, User, parse_deadline};
pub use repository::{
    AssignmentService, CompareOp, DEFAULT_LIMIT, FieldMask, SortDirection, SortKey, TaskFilter,
    TaskLister, TaskListing, TaskQuery, TaskRepository, UserRepository, project_task,
};

use std::path::{Path, PathBuf};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, SurrealKv};
use tracing::info;

/// Default database location below the platform data directory
pub const DEFAULT_DB_SUBPATH: &str = "taskhub/data";

/// Fallback database path when no data directory is known
pub const FALLBACK_DB_PATH: &str = ".taskhub/data";

/// SurrealDB namespace used for all taskhub data
const NAMESPACE: &str = "taskhub";

/// SurrealDB database name within the namespace
const DATABASE: &str = "main";

/// Database wrapper providing connection management for SurrealDB
pub struct Database {
    /// The underlying SurrealDB client
    client: Surreal<Db>,
    /// Path where the database is stored, `None` for in-memory databases
    path: Option<PathBuf>,
}

impl Database {
    /// Connect to a SurrealDB database at the specified path.
    ///
    /// Creates the database directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `DbError::CreateDirectory` if directory creation fails.
    /// Returns `DbError::Connection` if database connection fails.
    pub async fn connect(path: &Path) -> DbResult<Self> {
        let path = Self::prepare_path(path)?;

        let client =
            Surreal::new::<SurrealKv>(path.clone())
                .await
                .map_err(|e| DbError::Connection {
                    path: path.clone(),
                    source: Box::new(e),
                })?;

        info!("Opened database at {}", path.display());
        Ok(Self {
            client,
            path: Some(path),
        })
    }

    /// Open a fresh in-memory database.
    ///
    /// Data is lost when the database is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the engine cannot be started.
    pub async fn in_memory() -> DbResult<Self> {
        let client = Surreal::new::<Mem>(())
            .await
            .map_err(|e| DbError::Connection {
                path: PathBuf::from("memory"),
                source: Box::new(e),
            })?;

        info!("Opened in-memory database");
        Ok(Self { client, path: None })
    }

    /// Initialize the database schema.
    ///
    /// Selects the taskhub namespace and database, then defines the task
    /// and user tables.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Schema` if schema initialization fails.
    pub async fn init(&self) -> DbResult<()> {
        self.client
            .use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| DbError::Schema(Box::new(e)))?;

        schema::init_schema(&self.client).await?;

        Ok(())
    }

    /// Get a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Db> {
        &self.client
    }

    /// Get the path where the database is stored, if it is on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Repository for single-task reads and writes
    pub fn tasks(&self) -> TaskRepository<'_> {
        TaskRepository::new(&self.client)
    }

    /// Repository for the user collaborator
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.client)
    }

    /// Filtered, sorted and paginated task reads
    pub fn lister(&self) -> TaskLister<'_> {
        TaskLister::new(&self.client)
    }

    /// Task writes that keep user pending lists consistent
    pub fn assignments(&self) -> AssignmentService<'_> {
        AssignmentService::new(&self.client)
    }

    /// Get the default database path.
    ///
    /// Returns `<data_local_dir>/taskhub/data`, or `.taskhub/data` relative
    /// to the working directory when the platform has no data directory.
    pub fn default_path() -> PathBuf {
        match dirs::data_local_dir() {
            Some(base) => base.join(DEFAULT_DB_SUBPATH),
            None => PathBuf::from(FALLBACK_DB_PATH),
        }
    }

    /// Prepare the database path by creating missing directories.
    fn prepare_path(path: &Path) -> DbResult<PathBuf> {
        let path = path.to_path_buf();

        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| DbError::CreateDirectory {
                path: path.clone(),
                source: e,
            })?;
        }

        Ok(path)
    }
}

// Ensure Database is Send + Sync so it can be shared across request handlers
static_assertions::assert_impl_all!(Database: Send, Sync);
