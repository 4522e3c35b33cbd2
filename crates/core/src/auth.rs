//! Authentication service
//!
//! Operator credentials live in a small TOML store next to the data
//! directory. Passwords are kept as argon2 PHC strings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::logbook::LogContext;

const CATEGORY: &str = "Authentication";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialStore {
    #[serde(default)]
    users: BTreeMap<String, String>,
}

/// An authenticated operator session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub username: String,
    pub started_at: DateTime<Utc>,
}

pub struct AuthService {
    store: Mutex<CredentialStore>,
    users_file: Option<PathBuf>,
    logbook: Option<LogContext>,
}

impl AuthService {
    /// Open the credential store; a missing file means no users yet
    pub fn open(users_file: &Path) -> Result<Self> {
        let store = match std::fs::read_to_string(users_file) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CredentialStore::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            store: Mutex::new(store),
            users_file: Some(users_file.to_path_buf()),
            logbook: None,
        })
    }

    /// In-memory store with no backing file
    pub fn empty() -> Self {
        Self {
            store: Mutex::new(CredentialStore::default()),
            users_file: None,
            logbook: None,
        }
    }

    pub fn bind_logbook(&mut self, logbook: LogContext) {
        self.logbook = Some(logbook);
    }

    pub fn logbook(&self) -> Option<&LogContext> {
        self.logbook.as_ref()
    }

    /// File the store was opened from
    pub fn users_file(&self) -> Option<&Path> {
        self.users_file.as_deref()
    }

    fn store(&self) -> Result<MutexGuard<'_, CredentialStore>> {
        self.store
            .lock()
            .map_err(|_| Error::Authentication("Credential store is unavailable".to_string()))
    }

    pub fn user_count(&self) -> usize {
        self.store().map(|store| store.users.len()).unwrap_or(0)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        if username.trim().len() < 3 {
            return Err(Error::Authentication(
                "Username must be at least 3 characters".to_string(),
            ));
        }
        if password.len() < 6 {
            return Err(Error::Authentication(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        let mut store = self.store()?;
        if store.users.contains_key(username) {
            return Err(Error::Authentication(format!("User {username} already exists")));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Authentication(format!("Failed to hash password: {e}")))?
            .to_string();
        store.users.insert(username.to_string(), hash);
        drop(store);

        if let Some(log) = &self.logbook {
            log.info(CATEGORY, &format!("Registered user {username}"));
        }
        Ok(())
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session> {
        let result = self.verify(username, password);
        if let Some(log) = &self.logbook {
            match &result {
                Ok(_) => log.info(CATEGORY, &format!("User {username} signed in")),
                Err(e) => log.warning(CATEGORY, &format!("Sign-in failed for {username}: {e}")),
            }
        }
        result
    }

    fn verify(&self, username: &str, password: &str) -> Result<Session> {
        let stored = self
            .store()?
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| Error::Authentication("User not found".to_string()))?;
        let parsed = PasswordHash::new(&stored)
            .map_err(|_| Error::Authentication("Invalid stored password".to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| Error::Authentication("Invalid password".to_string()))?;

        Ok(Session {
            id: Uuid::new_v4(),
            username: username.to_string(),
            started_at: Utc::now(),
        })
    }

    pub fn save(&self, users_file: &Path) -> Result<()> {
        if let Some(parent) = users_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string(&*self.store()?)?;
        std::fs::write(users_file, contents)?;
        Ok(())
    }

    /// Write the store back to the file it was opened from
    pub fn persist(&self) -> Result<()> {
        match &self.users_file {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}
