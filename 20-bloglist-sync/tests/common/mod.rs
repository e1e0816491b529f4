#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use bloglist_sync::{
    board::Board,
    gateway::Gateway,
    resource::Resource,
    server::{Account, Backend},
    session::Session,
};
use reqwest::Url;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const NOTIFY_DELAY: Duration = Duration::from_millis(200);

/// A backend bound to an ephemeral port, stopped on [`TestBackend::shutdown`].
pub struct TestBackend {
    pub base_url: Url,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

impl TestBackend {
    pub async fn start() -> Result<Self> {
        let accounts = vec![
            "alice:wonderland:Alice Liddell".parse::<Account>().map_err(anyhow::Error::msg)?,
            "bob:builder:Bob".parse::<Account>().map_err(anyhow::Error::msg)?,
        ];
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let backend = Backend::new(listener, accounts);
        let addr = backend.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = backend.run_until(shutdown).await;
        });

        Ok(Self {
            base_url: Url::parse(&format!("http://{addr}/"))?,
            shutdown: shutdown_tx,
            server,
        })
    }

    pub fn gateway<R: Resource>(&self, session: Arc<Session>) -> Gateway<R> {
        Gateway::new(reqwest::Client::new(), self.base_url.clone(), session)
    }

    pub fn board<R: Resource>(&self) -> Board<R> {
        let session = Arc::new(Session::new());
        Board::new(self.gateway(session.clone()), session).with_notification_delay(NOTIFY_DELAY)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.server.await;
    }
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(Url::parse(&format!("http://{addr}/"))?)
}
