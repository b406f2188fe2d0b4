use serde::Serialize;
use std::time::SystemTime;

/// Point-in-time view of one simulated client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub client: usize,
    pub channel_id: String,
    pub connection_id: Option<String>,
    pub session_id: Option<String>,
    pub role: String,
    pub state: String,
    pub connected_url: Option<String>,
    pub websocket_connected: bool,
    pub datachannel_connected: bool,
    pub retry: u32,
}

/// One snapshot of every registered client.
#[derive(Debug, Clone, Serialize)]
pub struct StatsBatch {
    pub taken_at: SystemTime,
    pub clients: Vec<ClientStats>,
}

impl StatsBatch {
    pub fn new(clients: Vec<ClientStats>) -> Self {
        Self {
            taken_at: SystemTime::now(),
            clients,
        }
    }

    pub fn connected(&self) -> usize {
        self.clients
            .iter()
            .filter(|c| c.websocket_connected || c.datachannel_connected)
            .count()
    }
}
