use crate::config::Config;
use crate::error::{AgroError, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    pub fn open(data_dir_override: Option<&PathBuf>) -> Result<Self> {
        let path = Config::db_path(data_dir_override)?;
        let conn = Connection::open(&path)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        super::migrations::run(&db)?;

        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };

        super::migrations::run(&db)?;

        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AgroError::InvalidData("database connection lock poisoned".into()))
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` with exclusive access to the connection. Reads and writes made
    /// through a transaction opened here are not interleaved with any other
    /// caller of this handle or its clones.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_database_runs_migrations() {
        let db = Database::open_in_memory().unwrap();
        let version: i32 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(version as usize, super::super::migrations::count());
        assert_eq!(db.path(), &PathBuf::from(":memory:"));
    }

    #[test]
    fn open_creates_file_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();
        let db = Database::open(Some(&data_dir)).unwrap();
        assert!(db.path().exists());
        assert_eq!(db.path(), &data_dir.join("agrowatch.db"));

        // Reopening applies no migration twice.
        drop(db);
        Database::open(Some(&data_dir)).unwrap();
    }

    #[test]
    fn clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plots (name, owner_email, created_at) VALUES ('A', 'a@b.c', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let count: i64 = other
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM plots", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
