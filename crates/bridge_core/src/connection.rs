//! One-shot readiness handshake with the host runtime

use crate::host::ObjectRegistry;
use crate::{BridgeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Resolved exactly once, when the host runtime announces its object registry.
///
/// Clones share the same handshake; the host side calls
/// [`HostReadiness::announce`], the page side awaits [`HostReadiness::wait`].
#[derive(Clone)]
pub struct HostReadiness {
    tx: Arc<watch::Sender<Option<Arc<ObjectRegistry>>>>,
    rx: watch::Receiver<Option<Arc<ObjectRegistry>>>,
}

impl HostReadiness {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx: Arc::new(tx), rx }
    }

    /// Publish the registry. Only the first announcement is accepted.
    pub fn announce(&self, registry: ObjectRegistry) -> Result<Arc<ObjectRegistry>> {
        let registry = Arc::new(registry);
        let mut accepted = false;
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(registry.clone());
            accepted = true;
            true
        });

        if !accepted {
            tracing::warn!("Ignoring repeated host announcement");
            return Err(BridgeError::AlreadyConnected);
        }
        tracing::info!(objects = ?registry.ids(), "Host runtime ready");
        Ok(registry)
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the announcement, up to `timeout`
    pub async fn wait(&self, timeout: Duration) -> Result<Arc<ObjectRegistry>> {
        let mut rx = self.rx.clone();
        let ready = tokio::time::timeout(timeout, async move {
            let announced = rx
                .wait_for(Option::is_some)
                .await
                .map_err(|_| BridgeError::NotReady("readiness channel closed".into()))?;
            announced
                .clone()
                .ok_or_else(|| BridgeError::NotReady("empty announcement".into()))
        })
        .await;

        match ready {
            Ok(result) => result,
            Err(_) => Err(BridgeError::NotReady(format!(
                "no host runtime after {} ms",
                timeout.as_millis()
            ))),
        }
    }
}

impl Default for HostReadiness {
    fn default() -> Self {
        Self::new()
    }
}
