//! Request/response client over the host's file-system handler

use crate::config::BridgeConfig;
use crate::connection::HostReadiness;
use crate::host::{HostObject, ObjectRegistry};
use crate::pending::PendingOperation;
use crate::session::Session;
use crate::{BridgeError, Result};
use bridge_proto::{DirectoryContentsUpdated, HostCommand, OperationKind, SignalArgs};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Page-side client. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct BridgeClient {
    pub(crate) session: Arc<Session>,
    pub(crate) config: Arc<BridgeConfig>,
}

impl BridgeClient {
    /// Wait for the host runtime, then bind its objects
    pub async fn connect(readiness: &HostReadiness, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let registry = readiness.wait(config.timeouts.readiness()).await?;
        Self::attach(registry, config)
    }

    /// Bind to an already announced registry
    pub fn attach(registry: Arc<ObjectRegistry>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let session = Arc::new(Session::open(registry, &config));
        tracing::info!(session = ?session, "Bridge client connected");
        Ok(Self {
            session,
            config: Arc::new(config),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Resolves with the created path
    pub async fn create_file(&self, path: &str, content: &str) -> Result<String> {
        self.request(OperationKind::CreateFile, path, content).await
    }

    pub async fn create_directory(&self, path: &str) -> Result<String> {
        self.request(OperationKind::CreateDirectory, path, "").await
    }

    pub async fn change_file_content(&self, path: &str, content: &str) -> Result<String> {
        self.request(OperationKind::ChangeFileContent, path, content).await
    }

    pub async fn delete_file(&self, path: &str) -> Result<String> {
        self.request(OperationKind::DeleteFile, path, "").await
    }

    pub async fn delete_directory(&self, path: &str) -> Result<String> {
        self.request(OperationKind::DeleteDirectory, path, "").await
    }

    /// Resolves with the file content
    pub async fn read_file(&self, path: &str) -> Result<String> {
        self.request(OperationKind::ReadFile, path, "").await
    }

    /// Hand a dropped file to the host for saving into `dir_path`.
    ///
    /// The host reports nothing back; refresh the listing to observe it.
    pub fn save_dropped_file(&self, dir_path: &str, file_name: &str, data_url: &str) -> Result<()> {
        if file_name.is_empty() {
            return Err(BridgeError::Validation("File name is required".into()));
        }
        if !data_url.starts_with("data:") {
            return Err(BridgeError::Validation("File data must be a data URL".into()));
        }
        self.send(
            HostCommand::SaveDroppedFile {
                dir_path: dir_path.to_string(),
                file_name: file_name.to_string(),
                data_url: data_url.to_string(),
            },
            "save dropped file",
        )
    }

    /// Ask the host to open `path` with its default application
    pub fn open_file(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(BridgeError::Validation("File path is required".into()));
        }
        self.send(HostCommand::OpenFile { path: path.to_string() }, "open file")
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryContentsUpdated> {
        self.session.subscribe()
    }

    /// Close the session; later requests fail with `NotConnected`
    pub fn disconnect(&self) {
        self.session.close();
    }

    /// Fire-and-forget host call
    fn send(&self, command: HostCommand, operation: &str) -> Result<()> {
        let host = self.session.file_system()?;
        let method = command.method();
        if !host.supports(method) {
            return Err(BridgeError::MissingCapability(format!("method {}", method)));
        }
        tracing::debug!(method = %method, path = command.path().unwrap_or_default(), "Sending host command");
        host.invoke(&command)
            .map(|_| ())
            .map_err(|e| BridgeError::Invocation {
                operation: operation.to_string(),
                message: e.0,
            })
    }

    /// Invoke `kind` and wait for its success or error signal
    async fn request(&self, kind: OperationKind, path: &str, content: &str) -> Result<String> {
        if path.is_empty() {
            return Err(BridgeError::Validation(kind.missing_path_message().into()));
        }

        let host = self.session.file_system()?;
        let success_name = kind.success_signal();
        let error_name = kind.error_signal();
        let success = host
            .signal(success_name)
            .ok_or_else(|| BridgeError::MissingCapability(format!("signal {}", success_name)))?;
        let failure = host
            .signal(error_name)
            .ok_or_else(|| BridgeError::MissingCapability(format!("signal {}", error_name)))?;

        let op = PendingOperation::new(kind.verb());
        tracing::debug!(op = %op.id(), operation = kind.verb(), path, "Request started");

        let expected = path.to_string();
        let correlate = self.config.signals.correlate_by_path;
        op.listen(&success, move |args| {
            if correlate && args.str_at(0).is_some_and(|reported| reported != expected) {
                return None;
            }
            Some(success_value(kind, &expected, args))
        });
        op.listen(&failure, |args| Some(Err(BridgeError::Host(error_message(args)))));

        if let Err(e) = host.invoke(&kind.command(path, content)) {
            tracing::error!(op = %op.id(), error = %e, "Host call failed");
            return op.fail_now(BridgeError::Invocation {
                operation: kind.verb().to_string(),
                message: e.0,
            });
        }

        let id = op.id();
        let outcome = op.wait(self.config.timeouts.operation()).await;
        match &outcome {
            Ok(_) => tracing::info!(op = %id, operation = kind.verb(), path, "Request completed"),
            Err(e) => tracing::warn!(op = %id, operation = kind.verb(), path, error = %e, "Request failed"),
        }
        outcome
    }
}

/// Value a success emission resolves with
fn success_value(kind: OperationKind, requested: &str, args: &SignalArgs) -> Result<String> {
    match kind {
        OperationKind::ReadFile => args
            .str_at(1)
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Payload("fileRead carried no content".into())),
        _ => Ok(args.str_at(0).unwrap_or(requested).to_string()),
    }
}

fn error_message(args: &SignalArgs) -> String {
    match args.get(0) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "Unknown host error".to_string(),
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
