//! Requests to the host's code executor

use crate::client::BridgeClient;
use crate::pending::PendingOperation;
use crate::{BridgeError, Result};
use bridge_proto::{ExecutorRequest, HostCommand, HostMethod, SignalName};
use serde_json::Value;

impl BridgeClient {
    /// Run `code` on the host and resolve with the first `codeResultReady` payload
    pub async fn execute_python(&self, code: &str) -> Result<Value> {
        let executor = self.session.executor()?;
        if !executor.supports(HostMethod::ExecuteSignal) {
            return Err(BridgeError::MissingCapability("method executeSignal".into()));
        }
        let channel = executor
            .signal(SignalName::CodeResultReady)
            .ok_or_else(|| BridgeError::MissingCapability("signal codeResultReady".into()))?;

        let op = PendingOperation::new("execute code");
        op.listen(&channel, |args| Some(Ok(args.get(0).cloned().unwrap_or(Value::Null))));

        let request = ExecutorRequest::ExecutePython { code: code.to_string() };
        tracing::debug!(op = %op.id(), bytes = code.len(), "Executing code on host");
        if let Err(e) = executor.invoke(&HostCommand::ExecuteSignal { payload: request.to_value() }) {
            return op.fail_now(BridgeError::Invocation {
                operation: "execute code".into(),
                message: e.0,
            });
        }

        op.wait(self.config.timeouts.executor()).await
    }

    /// Ask the host to save `data` (a data URL) as a PDF named `filename`
    pub fn download_pdf(&self, filename: &str, data: &str) -> Result<()> {
        if filename.is_empty() {
            return Err(BridgeError::Validation("File name is required".into()));
        }
        self.send_to_executor(
            ExecutorRequest::DownloadPdf {
                filename: filename.to_string(),
                data: data.to_string(),
            },
            "download PDF",
        )
    }

    /// Ask the host to open `url` in a browser
    pub fn open_url(&self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(BridgeError::Validation("URL is required".into()));
        }
        self.send_to_executor(ExecutorRequest::OpenUrl(url.to_string()), "open URL")
    }

    fn send_to_executor(&self, request: ExecutorRequest, operation: &str) -> Result<()> {
        let executor = self.session.executor()?;
        if !executor.supports(HostMethod::ExecuteSignal) {
            return Err(BridgeError::MissingCapability("method executeSignal".into()));
        }
        executor
            .invoke(&HostCommand::ExecuteSignal { payload: request.to_value() })
            .map(|_| ())
            .map_err(|e| BridgeError::Invocation {
                operation: operation.to_string(),
                message: e.0,
            })
    }
}
