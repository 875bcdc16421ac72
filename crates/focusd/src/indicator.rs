//! Badge indicator that reports changes to subscribed views

use async_trait::async_trait;
use focus_api::{Badge, EventPayload};
use focus_host_api::{HostError, HostResult, Indicator};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Forwards badge changes as [`EventPayload::BadgeChanged`], skipping
/// repeats of the badge already shown
pub struct BroadcastIndicator {
    tx: mpsc::UnboundedSender<EventPayload>,
    current: Mutex<Option<Badge>>,
}

impl BroadcastIndicator {
    pub fn new(tx: mpsc::UnboundedSender<EventPayload>) -> Self {
        Self {
            tx,
            current: Mutex::new(None),
        }
    }

    fn update(&self, badge: Option<Badge>) -> HostResult<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| HostError::BadgeFailed("badge state poisoned".into()))?;
        if *current == badge {
            return Ok(());
        }

        debug!(badge = ?badge, "Badge changed");
        *current = badge.clone();
        self.tx
            .send(EventPayload::BadgeChanged { badge })
            .map_err(|_| HostError::BadgeFailed("event loop stopped".into()))
    }
}

#[async_trait]
impl Indicator for BroadcastIndicator {
    async fn set_badge(&self, badge: &Badge) -> HostResult<()> {
        self.update(Some(badge.clone()))
    }

    async fn clear_badge(&self) -> HostResult<()> {
        self.update(None)
    }
}
