//! Bot-relay HTTP adapter.
//!
//! Implements [`RelayPort`] with a blocking `reqwest` client. Each request
//! runs on its own short-lived thread and hands the status back through an
//! `embassy-sync` [`Signal`], so the single-threaded runtime never blocks
//! on the network.
//!
//! ```text
//!  runtime ──post_json()──▶ spawn ──▶ [relay-http thread] ──send()──▶ relay
//!     ▲                                       │
//!     └──────────── Signal<status> ◀──────────┘
//! ```
//!
//! The request URL embeds the bot token, so it is never logged; reqwest
//! errors are stripped of their URL before they reach the log.

use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;

use crate::app::ports::RelayPort;
use crate::error::ChannelError;

type Reply = Signal<CriticalSectionRawMutex, Result<u16, ChannelError>>;

pub struct ReqwestRelay {
    client: Client,
}

impl ReqwestRelay {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vitalband/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn execute(&self, request: RequestBuilder) -> Result<u16, ChannelError> {
        let reply = Arc::new(Reply::new());
        let tx = reply.clone();

        let spawned = std::thread::Builder::new()
            .name("relay-http".into())
            .spawn(move || {
                let result = match request.send() {
                    Ok(resp) => {
                        let status = resp.status();
                        debug!("relay: HTTP {}", status);
                        Ok(status.as_u16())
                    }
                    Err(e) => {
                        warn!("relay: request failed: {}", e.without_url());
                        Err(ChannelError::Transport)
                    }
                };
                tx.signal(result);
            });

        if let Err(e) = spawned {
            warn!("relay: cannot spawn request thread: {}", e);
            return Err(ChannelError::Transport);
        }
        reply.wait().await
    }
}

impl RelayPort for ReqwestRelay {
    async fn post_json(&self, url: &str, body: &str) -> Result<u16, ChannelError> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        self.execute(request).await
    }

    async fn get(&self, url: &str) -> Result<u16, ChannelError> {
        self.execute(self.client.get(url)).await
    }
}
