use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use common::Attempt;
use russh::server::{Auth, Handler};
use tracing::{error, info};

use crate::geo::Enricher;
use crate::recorder::Recorder;

/// Per-offer capture logic shared by every connection. Holds no mutable
/// state of its own; the recorder serializes its writes.
pub struct Capture {
    enricher: Enricher,
    recorder: Arc<Recorder>,
    delay: Duration,
}

impl Capture {
    pub fn new(enricher: Enricher, recorder: Arc<Recorder>, delay: Duration) -> Self {
        Self { enricher, recorder, delay }
    }

    /// Record one credential offer and decide whether to accept it. The
    /// answer is always `false`.
    pub async fn handle(&self, source_address: &str, username: &str, password: &str) -> bool {
        let timestamp = Local::now().fixed_offset();
        let location = self.enricher.enrich(source_address);
        let attempt = Attempt {
            timestamp,
            username: username.to_string(),
            password: password.to_string(),
            source_address: source_address.to_string(),
            location,
        };

        match self.recorder.record(&attempt).await {
            Ok(()) => info!(
                source = %attempt.source_address,
                user = %attempt.username,
                country = %attempt.location.country,
                "login attempt recorded"
            ),
            Err(e) => error!(source = %attempt.source_address, error = %e, "failed to record attempt"),
        }

        // a real sshd takes a moment before saying no
        tokio::time::sleep(self.delay).await;
        false
    }
}

/// russh handler for one accepted connection.
pub struct DecoySession {
    peer: SocketAddr,
    capture: Arc<Capture>,
}

impl DecoySession {
    pub fn new(peer: SocketAddr, capture: Arc<Capture>) -> Self {
        Self { peer, capture }
    }
}

#[async_trait]
impl Handler for DecoySession {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        let source = self.peer.ip().to_canonical().to_string();
        if self.capture.handle(&source, user, password).await {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject { proceed_with_methods: None })
        }
    }
}
