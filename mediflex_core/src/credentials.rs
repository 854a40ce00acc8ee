//! Local account storage.
//!
//! Accounts live in a SQLite `users` table; the logged-in flags live next to
//! it in a JSON session file (see [`crate::store`]).
//!
//! **Security gap:** passwords are stored and compared in plaintext, as in
//! the deployed app. This is not a hardened credential store.

use crate::store::JsonDocument;
use crate::{Credential, Result, Session};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    email TEXT UNIQUE,
    password TEXT
)";

/// Account table plus the device-local session flags
pub struct CredentialStore {
    conn: Connection,
    session_path: PathBuf,
}

impl CredentialStore {
    /// Open (and create if needed) the database at `db_path`
    pub fn open(db_path: &Path, session_path: impl Into<PathBuf>) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        // Other processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Opened credential store at {:?}", db_path);
        Ok(Self {
            conn,
            session_path: session_path.into(),
        })
    }

    /// In-memory database with a file-backed session (for tests)
    pub fn open_in_memory(session_path: impl Into<PathBuf>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            session_path: session_path.into(),
        })
    }

    /// Insert a new account
    ///
    /// Returns `Ok(false)` when the email is already registered.
    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<bool> {
        let result = self.conn.execute(
            "INSERT INTO users (name, email, password) VALUES (?1, ?2, ?3)",
            params![name, email, password],
        );

        match result {
            Ok(_) => {
                tracing::info!("Registered account for {}", email);
                Ok(true)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                tracing::info!("Registration rejected, {} already exists", email);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up the account name for an email/password pair
    pub fn login(&self, email: &str, password: &str) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM users WHERE email = ?1 AND password = ?2",
                params![email, password],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;

        // A matched row with a NULL name still counts as a successful login.
        Ok(name.map(|n| n.unwrap_or_default()))
    }

    /// Fetch a stored account by email
    pub fn find(&self, email: &str) -> Result<Option<Credential>> {
        let credential = self
            .conn
            .query_row(
                "SELECT name, email, password FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(Credential {
                        name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        email: row.get(1)?,
                        password: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    /// Record `email`/`name` as the logged-in user
    pub fn set_logged_in(&self, email: &str, name: &str) -> Result<()> {
        let session = Session {
            logged_in: true,
            email: Some(email.to_string()),
            name: Some(name.to_string()),
        };
        session.save(&self.session_path)
    }

    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.session()?.logged_in)
    }

    pub fn logged_in_email(&self) -> Result<Option<String>> {
        Ok(self.session()?.email)
    }

    pub fn logged_in_name(&self) -> Result<Option<String>> {
        Ok(self.session()?.name)
    }

    /// Clear every session flag
    pub fn logout(&self) -> Result<()> {
        Session::default().save(&self.session_path)?;
        tracing::info!("Cleared session");
        Ok(())
    }

    fn session(&self) -> Result<Session> {
        Session::load(&self.session_path)
    }
}
