//! Protocol definitions for Page <-> Host bridge communication
//!
//! This crate defines the shared vocabulary between the page-side bridge
//! client and the host runtime that owns the real file-system and
//! code-execution services: signal names, host commands, directory
//! listings and executor requests.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Registry id of the host file-system handler
pub const FILE_SYSTEM_HANDLER: &str = "fileSystemHandler";

/// Registry id of the host code executor
pub const CODE_EXECUTOR: &str = "codeExecutor";

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected a JSON array listing, got {0}")]
    NotAList(&'static str),
}

/// Named event channels exposed by host objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalName {
    /// `(path, content)`
    FileRead,
    /// `(path)`
    FileCreated,
    /// `(path)`
    FileChanged,
    /// `(path)`
    FileDeleted,
    /// `(path)`
    DirectoryCreated,
    /// `(path)`
    DirectoryDeleted,
    /// `(path, entries_json)`
    DirectoryListed,
    /// `(message)`
    ErrorOccurred,
    /// `(result)` on the code executor
    CodeResultReady,
    /// Relay channel of a proxy object; carries the relayed signal's arguments as one value
    SignalFired,
}

/// Every file-system channel the page side expects to be able to listen on
pub const FILE_SYSTEM_SIGNALS: &[SignalName] = &[
    SignalName::FileRead,
    SignalName::FileCreated,
    SignalName::FileChanged,
    SignalName::FileDeleted,
    SignalName::DirectoryCreated,
    SignalName::DirectoryDeleted,
    SignalName::DirectoryListed,
    SignalName::ErrorOccurred,
];

impl SignalName {
    /// Wire name as exposed by the host
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::FileRead => "fileRead",
            SignalName::FileCreated => "fileCreated",
            SignalName::FileChanged => "fileChanged",
            SignalName::FileDeleted => "fileDeleted",
            SignalName::DirectoryCreated => "directoryCreated",
            SignalName::DirectoryDeleted => "directoryDeleted",
            SignalName::DirectoryListed => "directoryListed",
            SignalName::ErrorOccurred => "errorOccurred",
            SignalName::CodeResultReady => "codeResultReady",
            SignalName::SignalFired => "signalFired",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the proxy object a host may register to relay `signal` of `object_id`
pub fn signal_proxy_id(object_id: &str, signal: SignalName) -> String {
    format!("{}_{}", object_id, signal.as_str())
}

/// Positional arguments carried by one signal emission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalArgs(pub Vec<Value>);

impl SignalArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Emission without arguments
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Emission with a single argument
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Emission with string arguments only
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Unpack the payload of a proxy `signalFired` emission.
    ///
    /// Multi-argument signals are relayed as an array, single-argument
    /// signals as the bare value, argument-less signals as `null`.
    pub fn from_fired(payload: Value) -> Self {
        match payload {
            Value::Array(values) => Self(values),
            Value::Null => Self::none(),
            other => Self(vec![other]),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Argument at `index` if it is a string
    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Methods exposed by host objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostMethod {
    ReadFile,
    CreateFile,
    CreateDirectory,
    ChangeFileContent,
    DeleteFile,
    DeleteDirectory,
    ListDirectory,
    GetDirectoryContents,
    GetCachedDirectoryContents,
    SaveDroppedFile,
    OpenFile,
    ExecuteSignal,
}

impl HostMethod {
    /// Method name as exposed by the host
    pub fn as_str(&self) -> &'static str {
        match self {
            HostMethod::ReadFile => "readFile",
            HostMethod::CreateFile => "createFile",
            HostMethod::CreateDirectory => "createDirectory",
            HostMethod::ChangeFileContent => "changeFileContent",
            HostMethod::DeleteFile => "deleteFile",
            HostMethod::DeleteDirectory => "deleteDirectory",
            HostMethod::ListDirectory => "listDirectory",
            HostMethod::GetDirectoryContents => "getDirectoryContents",
            HostMethod::GetCachedDirectoryContents => "getCachedDirectoryContents",
            HostMethod::SaveDroppedFile => "saveDroppedFile",
            HostMethod::OpenFile => "openFile",
            HostMethod::ExecuteSignal => "executeSignal",
        }
    }
}

impl fmt::Display for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands sent from the page to a host object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum HostCommand {
    ReadFile { path: String },
    CreateFile { path: String, content: String },
    CreateDirectory { path: String },
    ChangeFileContent { path: String, content: String },
    DeleteFile { path: String },
    DeleteDirectory { path: String },

    /// Answered by `directoryListed`
    ListDirectory { path: String },

    /// Answered by the call's return value
    GetDirectoryContents { path: String },

    /// Answered by the call's return value, from the host's listing cache
    GetCachedDirectoryContents { path: String },

    /// Store a dropped file in `dir_path`; `data_url` holds the encoded content
    SaveDroppedFile {
        dir_path: String,
        file_name: String,
        data_url: String,
    },

    /// Open with the system's default application
    OpenFile { path: String },

    /// Generic code executor entry point
    ExecuteSignal { payload: Value },
}

impl HostCommand {
    pub fn method(&self) -> HostMethod {
        match self {
            HostCommand::ReadFile { .. } => HostMethod::ReadFile,
            HostCommand::CreateFile { .. } => HostMethod::CreateFile,
            HostCommand::CreateDirectory { .. } => HostMethod::CreateDirectory,
            HostCommand::ChangeFileContent { .. } => HostMethod::ChangeFileContent,
            HostCommand::DeleteFile { .. } => HostMethod::DeleteFile,
            HostCommand::DeleteDirectory { .. } => HostMethod::DeleteDirectory,
            HostCommand::ListDirectory { .. } => HostMethod::ListDirectory,
            HostCommand::GetDirectoryContents { .. } => HostMethod::GetDirectoryContents,
            HostCommand::GetCachedDirectoryContents { .. } => HostMethod::GetCachedDirectoryContents,
            HostCommand::SaveDroppedFile { .. } => HostMethod::SaveDroppedFile,
            HostCommand::OpenFile { .. } => HostMethod::OpenFile,
            HostCommand::ExecuteSignal { .. } => HostMethod::ExecuteSignal,
        }
    }

    /// Target path, if the command has one
    pub fn path(&self) -> Option<&str> {
        match self {
            HostCommand::ReadFile { path }
            | HostCommand::CreateFile { path, .. }
            | HostCommand::CreateDirectory { path }
            | HostCommand::ChangeFileContent { path, .. }
            | HostCommand::DeleteFile { path }
            | HostCommand::DeleteDirectory { path }
            | HostCommand::ListDirectory { path }
            | HostCommand::GetDirectoryContents { path }
            | HostCommand::GetCachedDirectoryContents { path }
            | HostCommand::OpenFile { path } => Some(path),
            HostCommand::SaveDroppedFile { dir_path, .. } => Some(dir_path),
            HostCommand::ExecuteSignal { .. } => None,
        }
    }
}

/// Operations completed through a success/error signal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ReadFile,
    CreateFile,
    CreateDirectory,
    ChangeFileContent,
    DeleteFile,
    DeleteDirectory,
}

impl OperationKind {
    pub fn success_signal(&self) -> SignalName {
        match self {
            OperationKind::ReadFile => SignalName::FileRead,
            OperationKind::CreateFile => SignalName::FileCreated,
            OperationKind::CreateDirectory => SignalName::DirectoryCreated,
            OperationKind::ChangeFileContent => SignalName::FileChanged,
            OperationKind::DeleteFile => SignalName::FileDeleted,
            OperationKind::DeleteDirectory => SignalName::DirectoryDeleted,
        }
    }

    pub fn error_signal(&self) -> SignalName {
        SignalName::ErrorOccurred
    }

    /// Message for a request without its required path
    pub fn missing_path_message(&self) -> &'static str {
        match self {
            OperationKind::CreateDirectory | OperationKind::DeleteDirectory => {
                "Directory path is required"
            }
            _ => "File path is required",
        }
    }

    /// Verb used in invocation failure messages
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::ReadFile => "read file",
            OperationKind::CreateFile => "create file",
            OperationKind::CreateDirectory => "create directory",
            OperationKind::ChangeFileContent => "change file content",
            OperationKind::DeleteFile => "delete file",
            OperationKind::DeleteDirectory => "delete directory",
        }
    }

    /// Build the host command; `content` is ignored by kinds without a payload
    pub fn command(&self, path: &str, content: &str) -> HostCommand {
        let path = path.to_string();
        match self {
            OperationKind::ReadFile => HostCommand::ReadFile { path },
            OperationKind::CreateFile => HostCommand::CreateFile {
                path,
                content: content.to_string(),
            },
            OperationKind::CreateDirectory => HostCommand::CreateDirectory { path },
            OperationKind::ChangeFileContent => HostCommand::ChangeFileContent {
                path,
                content: content.to_string(),
            },
            OperationKind::DeleteFile => HostCommand::DeleteFile { path },
            OperationKind::DeleteDirectory => HostCommand::DeleteDirectory { path },
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDirectoryEntry")]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub is_file: bool,
}

/// Host listings omit `is_file` or `path` on some entries
#[derive(Deserialize)]
struct RawDirectoryEntry {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    is_dir: bool,
    #[serde(default)]
    is_file: Option<bool>,
}

impl From<RawDirectoryEntry> for DirectoryEntry {
    fn from(raw: RawDirectoryEntry) -> Self {
        Self {
            path: raw.path.unwrap_or_else(|| raw.name.clone()),
            is_file: raw.is_file.unwrap_or(!raw.is_dir),
            is_dir: raw.is_dir,
            name: raw.name,
        }
    }
}

impl DirectoryEntry {
    pub fn directory(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            is_dir: true,
            is_file: false,
        }
    }

    pub fn file(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            is_dir: false,
            is_file: true,
        }
    }
}

/// Decode a host listing payload
pub fn parse_listing(json: &str) -> Result<Vec<DirectoryEntry>, ProtoError> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(_) => Err(ProtoError::NotAList("object")),
        Value::String(_) => Err(ProtoError::NotAList("string")),
        Value::Number(_) => Err(ProtoError::NotAList("number")),
        Value::Bool(_) => Err(ProtoError::NotAList("bool")),
        Value::Null => Err(ProtoError::NotAList("null")),
    }
}

/// Encode entries the way hosts send them
pub fn listing_to_json(entries: &[DirectoryEntry]) -> String {
    // Plain structs of strings and bools always serialize
    serde_json::to_string(entries).unwrap_or_else(|_| "[]".to_string())
}

/// Canned listing shown when no host strategy produced data
pub fn fallback_listing() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::directory("Documents", "Documents"),
        DirectoryEntry::directory("Downloads", "Downloads"),
        DirectoryEntry::directory("Pictures", "Pictures"),
        DirectoryEntry::directory("Videos", "Videos"),
        DirectoryEntry::directory("Music", "Music"),
        DirectoryEntry::file("example.txt", "example.txt"),
    ]
}

/// "Directory contents updated" notification for the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryContentsUpdated {
    pub path: String,
    pub entries: Vec<DirectoryEntry>,
    /// Entries are the canned fallback, not host data
    pub degraded: bool,
}

/// Requests accepted by the code executor's `executeSignal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorRequest {
    ExecutePython { code: String },
    DownloadPdf { filename: String, data: String },
    /// Sent as a bare string
    OpenUrl(String),
}

impl ExecutorRequest {
    pub fn to_value(&self) -> Value {
        match self {
            ExecutorRequest::ExecutePython { code } => json!({
                "type": "executePython",
                "code": code,
            }),
            ExecutorRequest::DownloadPdf { filename, data } => json!({
                "type": "downloadPDF",
                "filename": filename,
                "data": data,
            }),
            ExecutorRequest::OpenUrl(url) => Value::String(url.clone()),
        }
    }

    /// Decode an `executeSignal` payload; unknown shapes yield `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) => Some(ExecutorRequest::OpenUrl(url.clone())),
            Value::Object(map) => {
                let field = |name: &str| {
                    map.get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                match map.get("type").and_then(Value::as_str)? {
                    "executePython" => Some(ExecutorRequest::ExecutePython { code: field("code") }),
                    "downloadPDF" => Some(ExecutorRequest::DownloadPdf {
                        filename: field("filename"),
                        data: field("data"),
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Tag of one in-flight request, used for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_wire_names() {
        assert_eq!(SignalName::DirectoryListed.as_str(), "directoryListed");
        assert_eq!(
            serde_json::to_string(&SignalName::ErrorOccurred).unwrap(),
            "\"errorOccurred\""
        );
        assert!(!FILE_SYSTEM_SIGNALS.contains(&SignalName::CodeResultReady));
        assert_eq!(
            signal_proxy_id(FILE_SYSTEM_HANDLER, SignalName::FileCreated),
            "fileSystemHandler_fileCreated"
        );
    }

    #[test]
    fn test_fired_payload_unpacking() {
        let args = SignalArgs::from_fired(json!(["docs", "[]"]));
        assert_eq!(args.len(), 2);
        assert_eq!(args.str_at(1), Some("[]"));

        let args = SignalArgs::from_fired(json!("docs/a.txt"));
        assert_eq!(args.str_at(0), Some("docs/a.txt"));

        assert!(SignalArgs::from_fired(Value::Null).is_empty());
    }

    #[test]
    fn test_parse_listing_defaults() {
        let json = r#"[
            {"name": "src", "path": "proj/src", "is_dir": true},
            {"name": "README.md", "is_dir": false}
        ]"#;
        let entries = parse_listing(json).unwrap();

        assert_eq!(entries[0], DirectoryEntry::directory("src", "proj/src"));
        assert_eq!(entries[1].path, "README.md");
        assert!(entries[1].is_file);
    }

    #[test]
    fn test_parse_listing_rejects_non_list() {
        assert!(matches!(
            parse_listing(r#"{"name": "x"}"#),
            Err(ProtoError::NotAList("object"))
        ));
        assert!(matches!(parse_listing("not json"), Err(ProtoError::InvalidJson(_))));
    }

    #[test]
    fn test_fallback_listing_flags() {
        let entries = fallback_listing();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["Documents", "Downloads", "Pictures", "Videos", "Music", "example.txt"]
        );
        assert!(entries[..5].iter().all(|e| e.is_dir && !e.is_file));
        assert!(entries[5].is_file && !entries[5].is_dir);

        let decoded = parse_listing(&listing_to_json(&entries)).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_operation_kind_mapping() {
        assert_eq!(
            OperationKind::DeleteDirectory.missing_path_message(),
            "Directory path is required"
        );
        assert_eq!(OperationKind::DeleteFile.missing_path_message(), "File path is required");
        assert_eq!(OperationKind::ChangeFileContent.success_signal(), SignalName::FileChanged);

        let cmd = OperationKind::CreateFile.command("a.txt", "hi");
        assert_eq!(cmd.method(), HostMethod::CreateFile);
        assert_eq!(cmd.path(), Some("a.txt"));
        assert_eq!(
            OperationKind::CreateDirectory.command("d", "ignored"),
            HostCommand::CreateDirectory { path: "d".into() }
        );
    }

    #[test]
    fn test_executor_request_values() {
        let req = ExecutorRequest::ExecutePython { code: "print(1)".into() };
        let value = req.to_value();
        assert_eq!(value["type"], "executePython");
        assert_eq!(ExecutorRequest::from_value(&value), Some(req));

        let url = ExecutorRequest::OpenUrl("https://example.org".into());
        assert_eq!(url.to_value(), json!("https://example.org"));

        assert_eq!(ExecutorRequest::from_value(&json!({"type": "other"})), None);
    }
}
