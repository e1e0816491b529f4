//! Single-slot status message that clears itself after a delay.
//!
//! The slot is either empty or holds one [`Notification`]. `show` replaces
//! whatever is there and re-arms the expiry; it never queues. The expiry task
//! of a replaced notification is aborted, and a generation counter stops a
//! task that already woke up from clearing a newer message.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub kind: Kind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: Kind::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: Kind::Failure,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    slot: watch::Sender<Option<Notification>>,
    expiry: Mutex<Expiry>,
}

#[derive(Default)]
struct Expiry {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: watch::Sender::new(None),
                expiry: Mutex::new(Expiry::default()),
            }),
        }
    }

    /// Makes `notification` the active one and clears it `delay` from now,
    /// unless another `show` or `dismiss` comes first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn show(&self, notification: Notification, delay: Duration) {
        let mut expiry = self.inner.lock_expiry();
        if let Some(previous) = expiry.task.take() {
            previous.abort();
        }
        expiry.generation += 1;
        let generation = expiry.generation;

        debug!(kind = ?notification.kind, message = %notification.message, ?delay, "notify");
        self.inner.slot.send_replace(Some(notification));

        let inner = Arc::clone(&self.inner);
        expiry.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.expire(generation);
        }));
    }

    /// Clears the slot now and cancels the pending expiry.
    pub fn dismiss(&self) {
        let mut expiry = self.inner.lock_expiry();
        if let Some(task) = expiry.task.take() {
            task.abort();
        }
        expiry.generation += 1;
        self.inner.slot.send_if_modified(|slot| slot.take().is_some());
    }

    pub fn current(&self) -> Option<Notification> {
        self.inner.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.slot.subscribe()
    }
}

impl Inner {
    fn lock_expiry(&self) -> std::sync::MutexGuard<'_, Expiry> {
        self.expiry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, generation: u64) {
        let mut expiry = self.lock_expiry();
        if expiry.generation != generation {
            return;
        }
        expiry.task = None;
        debug!("notification expired");
        self.slot.send_if_modified(|slot| slot.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn show_then_expire() {
        let notifier = Notifier::new();
        assert_eq!(notifier.current(), None);

        notifier.show(Notification::success("saved"), DELAY);
        assert_eq!(notifier.current(), Some(Notification::success("saved")));

        sleep(DELAY - Duration::from_millis(1)).await;
        assert!(notifier.current().is_some());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(notifier.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_show_replaces_and_restarts_the_timer() {
        let notifier = Notifier::new();

        notifier.show(Notification::success("first"), DELAY);
        sleep(Duration::from_millis(60)).await;
        notifier.show(Notification::failure("second"), DELAY);

        // Past the first deadline: the second message is still up.
        sleep(Duration::from_millis(60)).await;
        assert_eq!(notifier.current(), Some(Notification::failure("second")));

        // Past the second deadline.
        sleep(Duration::from_millis(60)).await;
        assert_eq!(notifier.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_only_ever_see_one_message() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.show(Notification::success("one"), DELAY);
        notifier.show(Notification::success("two"), DELAY);

        rx.changed().await.expect("notifier alive");
        assert_eq!(
            rx.borrow_and_update().clone(),
            Some(Notification::success("two"))
        );

        rx.changed().await.expect("notifier alive");
        assert_eq!(rx.borrow_and_update().clone(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_does_not_clear_newer_message() {
        let notifier = Notifier::new();
        notifier.show(Notification::success("old"), DELAY);
        notifier.inner.expire(0);
        notifier.show(Notification::success("new"), DELAY);

        // A wake-up carrying the first generation arrives late.
        notifier.inner.expire(1);
        assert_eq!(notifier.current(), Some(Notification::success("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_cancels_pending_expiry() {
        let notifier = Notifier::new();
        notifier.show(Notification::success("bye"), DELAY);
        notifier.dismiss();
        assert_eq!(notifier.current(), None);

        notifier.show(Notification::success("again"), DELAY * 3);
        sleep(DELAY * 2).await;
        assert_eq!(notifier.current(), Some(Notification::success("again")));
    }
}
