//! File-backed databases for tests that need several real connections.
//!
//! `:memory:` pools hold a single connection, so tasks spawned against them
//! are serialized by the pool and never meet SQLite's locking. A [`TempDb`]
//! is a WAL file opened with the production options, inside a temp directory
//! that is removed on drop.

use tempfile::TempDir;

use crate::pool::{Database, DbConfig};

pub(crate) struct TempDb {
    pub db: Database,
    _dir: TempDir,
}

impl TempDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db = Database::new(DbConfig::new(dir.path().join("mizan.db")).max_connections(8))
            .await
            .expect("open temp database");

        TempDb { db, _dir: dir }
    }
}
