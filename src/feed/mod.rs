pub mod poller;
pub mod sse;
pub mod stream;

pub use poller::{Poller, SnapshotSource};
pub use stream::{ConnState, HttpLogTransport, LogStream};

use anyhow::Result;
use async_trait::async_trait;

use crate::api::types::{DashboardSnapshot, WhaleFeed};
use crate::api::SentinelClient;

/// Dashboard snapshot source backed by the REST API.
pub struct DashboardSource {
    client: SentinelClient,
}

impl DashboardSource {
    pub fn new(client: SentinelClient) -> Self {
        DashboardSource { client }
    }
}

#[async_trait]
impl SnapshotSource for DashboardSource {
    type Snapshot = DashboardSnapshot;

    async fn fetch(&self) -> Result<DashboardSnapshot> {
        Ok(self.client.fetch_dashboard().await?)
    }

    fn name(&self) -> &str {
        "dashboard"
    }
}

/// Whale feed source backed by the REST API.
pub struct WhaleSource {
    client: SentinelClient,
}

impl WhaleSource {
    pub fn new(client: SentinelClient) -> Self {
        WhaleSource { client }
    }
}

#[async_trait]
impl SnapshotSource for WhaleSource {
    type Snapshot = WhaleFeed;

    async fn fetch(&self) -> Result<WhaleFeed> {
        Ok(self.client.fetch_whales().await?)
    }

    fn name(&self) -> &str {
        "whales"
    }
}
