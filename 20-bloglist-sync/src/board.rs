//! Composes the gateway, the store, and the notifier into user-level actions.
//!
//! Every action follows the same order: ask the gateway, apply the confirmed
//! result to the store, then post a notification. Failures leave the store
//! untouched, post exactly one failure notification, and are handed back to
//! the caller.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    gateway::Gateway,
    notification::{Notification, Notifier},
    resource::{Resource, UserProfile},
    session::{Credentials, Session},
    store::Store,
};

pub const DEFAULT_NOTIFICATION_DELAY: Duration = Duration::from_secs(5);

pub struct Board<R> {
    store: Store<R>,
    gateway: Gateway<R>,
    notifier: Notifier,
    session: Arc<Session>,
    delay: Duration,
    filter: Mutex<String>,
}

impl<R: Resource> Board<R> {
    pub fn new(gateway: Gateway<R>, session: Arc<Session>) -> Self {
        Self {
            store: Store::new(),
            gateway,
            notifier: Notifier::new(),
            session,
            delay: DEFAULT_NOTIFICATION_DELAY,
            filter: Mutex::new(String::new()),
        }
    }

    pub fn with_notification_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn store(&self) -> &Store<R> {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loads the full list from the backend. On failure the store is left
    /// empty.
    pub async fn initialize(&self) -> Result<()> {
        match self.gateway.list_all().await {
            Ok(records) => {
                info!(count = records.len(), collection = R::COLLECTION, "loaded");
                self.store.initialize(records);
                Ok(())
            }
            Err(err) => {
                self.store.initialize(Vec::new());
                Err(self.fail(err))
            }
        }
    }

    pub async fn create(&self, draft: R::Draft) -> Result<R> {
        let record = self.gateway.create(&draft).await.map_err(|err| self.fail(err))?;
        self.store.append(record.clone());
        self.succeed(record.created_message());
        Ok(record)
    }

    /// Raises the rank of `id` by one once the backend confirms it.
    ///
    /// Two likes in flight for the same record both send `local + 1`; whichever
    /// confirmation lands last wins.
    pub async fn like(&self, id: &str) -> Result<R> {
        let Some(current) = self.store.get(id) else {
            return Err(self.fail(Error::NotFound(format!("{} {id}", R::COLLECTION))));
        };
        let confirmed = self
            .gateway
            .update_rank(id, current.rank().saturating_add(1))
            .await
            .map_err(|err| self.fail(err))?;
        self.store.replace(confirmed.clone());
        self.succeed(confirmed.ranked_message());
        Ok(confirmed)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let label = self.store.get(id).map(|record| record.label());
        self.gateway.delete(id).await.map_err(|err| self.fail(err))?;
        self.store.remove(id);
        let label = label.unwrap_or_else(|| id.to_string());
        self.succeed(format!("removed {label}"));
        Ok(())
    }

    /// Whether the logged-in user created `record` and so may delete it.
    pub fn can_remove(&self, record: &R) -> bool {
        match (record.owner_id(), self.session.user_id()) {
            (Some(owner), Some(user)) => owner == user,
            _ => false,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let user = match self.gateway.login(&credentials).await {
            Ok(user) => user,
            Err(Error::Auth(_)) => {
                return Err(self.fail(Error::Auth("wrong username or password".into())));
            }
            Err(err) => return Err(self.fail(err)),
        };
        let name = user.name.clone();
        self.session.set_user(user).map_err(|err| self.fail(err))?;
        self.succeed(format!("logged in as {name}"));
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.clear().map_err(|err| self.fail(err))?;
        self.succeed("logged out");
        Ok(())
    }

    /// Every user with the blogs they added. Read-only: the store is not
    /// touched and success posts no notification.
    pub async fn users(&self) -> Result<Vec<UserProfile>> {
        self.gateway.users().await.map_err(|err| self.fail(err))
    }

    pub async fn user(&self, id: &str) -> Result<UserProfile> {
        self.gateway.user(id).await.map_err(|err| self.fail(err))
    }

    pub fn set_filter(&self, needle: &str) {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = needle.trim().to_string();
    }

    pub fn filter(&self) -> String {
        self.filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The ordered records the current filter lets through.
    pub fn visible(&self) -> Vec<R> {
        self.store.filtered(&self.filter())
    }

    fn succeed(&self, message: impl Into<String>) {
        self.notifier.show(Notification::success(message), self.delay);
    }

    fn fail(&self, err: Error) -> Error {
        warn!(error = %err, collection = R::COLLECTION, "operation failed");
        self.notifier
            .show(Notification::failure(err.to_string()), self.delay);
        err
    }
}
