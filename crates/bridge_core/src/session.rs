//! Connected page session

use crate::adapter::SignalAdapter;
use crate::config::BridgeConfig;
use crate::host::{HostObject, ObjectRegistry};
use crate::{BridgeError, Result};
use bridge_proto::{DirectoryContentsUpdated, SignalName, CODE_EXECUTOR, FILE_SYSTEM_HANDLER, FILE_SYSTEM_SIGNALS};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the directory update bus
const EVENT_CAPACITY: usize = 64;

/// Bindings to the host objects of one connection, plus page-level state
pub struct Session {
    registry: Arc<ObjectRegistry>,
    file_system: Option<Arc<SignalAdapter>>,
    executor: Option<Arc<dyn HostObject>>,
    current_path: RwLock<String>,
    events: broadcast::Sender<DirectoryContentsUpdated>,
    open: AtomicBool,
}

impl Session {
    /// Bind the objects exposed in `registry`
    pub fn open(registry: Arc<ObjectRegistry>, config: &BridgeConfig) -> Self {
        let file_system = match registry.get(FILE_SYSTEM_HANDLER) {
            Some(handler) => Some(Arc::new(SignalAdapter::wrap(
                handler,
                Some(&*registry),
                FILE_SYSTEM_SIGNALS,
                &config.signals,
            ))),
            None => {
                tracing::error!("fileSystemHandler not found in host registry");
                None
            }
        };

        let executor = registry.get(CODE_EXECUTOR);
        if executor.is_none() {
            tracing::info!("No code executor exposed by host");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            registry,
            file_system,
            executor,
            current_path: RwLock::new(String::new()),
            events,
            open: AtomicBool::new(true),
        }
    }

    /// The file-system handler with its channels completed
    pub fn file_system(&self) -> Result<Arc<SignalAdapter>> {
        self.ensure_open()?;
        self.file_system
            .clone()
            .ok_or_else(|| BridgeError::NotConnected("FileSystemHandler".into()))
    }

    pub fn executor(&self) -> Result<Arc<dyn HostObject>> {
        self.ensure_open()?;
        let executor = self
            .executor
            .clone()
            .ok_or_else(|| BridgeError::MissingCapability(format!("object {}", CODE_EXECUTOR)))?;
        if executor.signal(SignalName::CodeResultReady).is_none() {
            return Err(BridgeError::MissingCapability("signal codeResultReady".into()));
        }
        Ok(executor)
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }

    /// Directory most recently requested for listing; empty is home
    pub fn current_path(&self) -> String {
        self.current_path.read().clone()
    }

    pub fn set_current_path(&self, path: &str) {
        *self.current_path.write() = path.to_string();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryContentsUpdated> {
        self.events.subscribe()
    }

    /// Notify subscribers; returns how many received it
    pub fn publish(&self, update: DirectoryContentsUpdated) -> usize {
        // No subscribers is not an error
        self.events.send(update).unwrap_or(0)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Stop accepting requests. Returns false if already closed.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        if was_open {
            tracing::info!("Bridge session closed");
        }
        was_open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected("Bridge session".into()))
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("file_system", &self.file_system.is_some())
            .field("executor", &self.executor.is_some())
            .field("current_path", &*self.current_path.read())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    fn registry_with(objects: Vec<Arc<dyn HostObject>>) -> Arc<ObjectRegistry> {
        let registry = ObjectRegistry::new();
        for object in objects {
            registry.register(object);
        }
        Arc::new(registry)
    }

    #[test]
    fn test_missing_handler() {
        let session = Session::open(registry_with(vec![]), &BridgeConfig::default());
        let err = session.file_system().err().unwrap();
        assert_eq!(err.to_string(), "FileSystemHandler not initialized");
        assert!(matches!(session.executor(), Err(BridgeError::MissingCapability(_))));
    }

    #[test]
    fn test_executor_without_result_signal() {
        let registry = registry_with(vec![MockHost::named(CODE_EXECUTOR).into_object()]);
        let session = Session::open(registry, &BridgeConfig::default());
        assert_eq!(
            session.executor().err(),
            Some(BridgeError::MissingCapability("signal codeResultReady".into()))
        );
    }

    #[test]
    fn test_close_rejects_requests() {
        let registry = registry_with(vec![MockHost::file_system().into_object()]);
        let session = Session::open(registry, &BridgeConfig::default());
        assert!(session.file_system().is_ok());

        assert!(session.close());
        assert!(!session.close());
        assert!(matches!(session.file_system(), Err(BridgeError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let session = Session::open(registry_with(vec![]), &BridgeConfig::default());
        assert_eq!(
            session.publish(DirectoryContentsUpdated {
                path: String::new(),
                entries: vec![],
                degraded: false,
            }),
            0
        );

        let mut rx = session.subscribe();
        session.set_current_path("docs");
        session.publish(DirectoryContentsUpdated {
            path: session.current_path(),
            entries: vec![],
            degraded: true,
        });
        let update = rx.recv().await.unwrap();
        assert_eq!(update.path, "docs");
        assert!(update.degraded);
    }
}
