use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::services::{AuthStore, ChallengeStore, SessionStore};
use crate::workers::Worker;

/// Periodically removes expired sessions and expired two-factor
/// challenges.
pub struct Janitor {
    sessions: SessionStore,
    challenges: Arc<ChallengeStore>,
    interval: Duration,
}

impl Janitor {
    pub fn new(
        store: Arc<dyn AuthStore>,
        challenges: Arc<ChallengeStore>,
        interval: Duration,
    ) -> Self {
        Janitor {
            sessions: SessionStore::new(store),
            challenges,
            interval,
        }
    }

    async fn tick(&self) {
        match self.sessions.purge_expired().await {
            Ok(0) => debug!("no expired sessions"),
            Ok(removed) => info!(removed, "purged expired sessions"),
            Err(e) => error!(error = %e, "failed to purge expired sessions"),
        }

        let swept = self.challenges.sweep();
        if swept > 0 {
            info!(swept, "swept expired challenges");
        }
    }
}

#[async_trait]
impl Worker for Janitor {
    fn name(&self) -> &'static str {
        "janitor"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.tick().await,
            }
        }
    }
}
