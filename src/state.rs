//! Shared application state handed to every handler.

use std::time::Duration;

use crate::{notify::ChangeFeed, services::transfer_service::TransferMode};

#[derive(Debug, Clone)]
pub struct AppState<G> {
    pub gateway: G,
    pub feed: ChangeFeed,
    pub transfer_mode: TransferMode,
    /// Cap on how long `GET /api/v1/changes/next` may wait
    pub change_poll_max: Duration,
}

impl<G> AppState<G> {
    pub fn new(gateway: G, feed: ChangeFeed) -> Self {
        Self {
            gateway,
            feed,
            transfer_mode: TransferMode::default(),
            change_poll_max: Duration::from_secs(30),
        }
    }

    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    pub fn with_change_poll_max(mut self, max: Duration) -> Self {
        self.change_poll_max = max;
        self
    }
}
