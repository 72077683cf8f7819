//! Where the agent gets its desired state and packet bytes from

use async_trait::async_trait;
use fleetpack_api::{DesiredState, Labels};
use fleetpack_client::HttpClient;

use crate::error::Result;

/// Remote side of reconciliation
#[async_trait]
pub trait PacketSource: Send + Sync {
    /// Resolve what a device with `labels` should have installed
    async fn desired_state(&self, labels: &Labels) -> Result<DesiredState>;

    /// Raw bytes of the packet stored under `hash`
    async fn packet_data(&self, hash: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl PacketSource for HttpClient {
    async fn desired_state(&self, labels: &Labels) -> Result<DesiredState> {
        Ok(self.compute_desired_state(labels).await?)
    }

    async fn packet_data(&self, hash: &str) -> Result<Vec<u8>> {
        Ok(HttpClient::packet_data(self, hash).await?)
    }
}
