//! Logged-in user state and the credential the gateway attaches to requests.
//!
//! A [`Session`] is the only holder of the bearer token. Gateways receive it
//! as an `Arc<dyn CredentialProvider>`, so several independent gateways (or
//! tests) can each run against their own session.
//!
//! When a session file is configured the logged-in user is written there as a
//! JSON blob on login, read back once by [`Session::restore`] at startup, and
//! removed on logout.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Supplies the credential value for mutating requests.
pub trait CredentialProvider: Send + Sync {
    /// Bearer token for the `Authorization` header, if logged in.
    fn token(&self) -> Option<String>;
}

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// What the backend returns on a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggedUser {
    pub token: String,
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct Session {
    user: RwLock<Option<LoggedUser>>,
    file: Option<PathBuf>,
}

impl Session {
    /// A session that lives only in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the session persisted at `path`. A missing file means nobody is
    /// logged in; an unreadable or corrupt file is an error.
    pub fn restore(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let user = match fs::read(&path) {
            Ok(bytes) => {
                let user: LoggedUser =
                    serde_json::from_slice(&bytes).map_err(|source| Error::SessionFormat {
                        path: path.clone(),
                        source,
                    })?;
                info!(username = %user.username, "restored session");
                Some(user)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => return Err(Error::SessionIo { path, source }),
        };

        Ok(Self {
            user: RwLock::new(user),
            file: Some(path),
        })
    }

    pub fn user(&self) -> Option<LoggedUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Id of the logged-in user, compared against a record's owner.
    pub fn user_id(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|user| user.id.clone())
    }

    pub fn set_user(&self, user: LoggedUser) -> Result<()> {
        if let Some(path) = &self.file {
            persist(path, &user)?;
        }
        debug!(username = %user.username, "session started");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(path) = &self.file {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Error::SessionIo {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
        debug!("session cleared");
        Ok(())
    }
}

impl CredentialProvider for Session {
    fn token(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|user| user.token.clone())
    }
}

fn persist(path: &Path, user: &LoggedUser) -> Result<()> {
    let encoded = serde_json::to_vec_pretty(user).map_err(|source| Error::SessionFormat {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, encoded).map_err(|source| Error::SessionIo {
        path: path.to_path_buf(),
        source,
    })
}
