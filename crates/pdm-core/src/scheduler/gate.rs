//! Network-availability gate: executions wait here until the host is online.

use tokio::sync::watch;

#[derive(Debug)]
pub struct NetworkGate {
    tx: watch::Sender<bool>,
}

impl NetworkGate {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the gate reports online.
    pub async fn wait_online(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|online| *online).await.is_err() {
            tracing::debug!("network gate closed");
        }
    }
}
