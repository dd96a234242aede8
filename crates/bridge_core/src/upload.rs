//! Drag-and-drop upload batches

use crate::client::BridgeClient;
use crate::BridgeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use tokio::sync::watch;

/// Reserved device names that cannot be used as file names
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters not allowed in a file name on any supported host
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// A file dropped onto the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// `data:{mime};base64,{payload}`
    pub fn data_url(&self) -> String {
        let mime = if self.mime.is_empty() {
            "application/octet-stream"
        } else {
            &self.mime
        };
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}

/// Make a dropped file name safe to hand to the host
pub fn sanitize_file_name(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let name_upper = result.to_uppercase();
    let base_name = name_upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base_name) {
        result = format!("_{}", result);
    }

    // Trailing dots and spaces are stripped by some hosts
    while result.ends_with('.') || result.ends_with(' ') {
        result.pop();
    }

    if result.is_empty() {
        result = "_unnamed".to_string();
    }

    result
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    /// Files processed so far, failed ones included
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl UploadProgress {
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    /// 0.0 to 100.0
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f32 * 100.0 / self.total as f32
    }
}

/// Outcome of a submitted batch
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Sanitized names handed to the host
    pub saved: Vec<String>,
    pub failed: Vec<(String, BridgeError)>,
}

impl UploadReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Files dropped together, saved into the current directory
pub struct UploadBatch {
    files: Vec<DroppedFile>,
    progress: watch::Sender<UploadProgress>,
}

impl UploadBatch {
    pub fn new(files: Vec<DroppedFile>) -> Self {
        let (progress, _) = watch::channel(UploadProgress {
            completed: 0,
            failed: 0,
            total: files.len(),
        });
        Self { files, progress }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    /// Encode and submit every file. Failures are recorded, not fatal.
    pub async fn submit(self, client: &BridgeClient) -> UploadReport {
        let Self { files, progress } = self;
        let dir = client.session().current_path();
        tracing::info!(dir = %dir, files = files.len(), "Uploading dropped files");

        let progress = &progress;
        let dir = dir.as_str();
        let results = join_all(files.into_iter().map(|file| async move {
            let name = sanitize_file_name(&file.name);
            let result = match tokio::task::spawn_blocking(move || file.data_url()).await {
                Ok(data_url) => client.save_dropped_file(dir, &name, &data_url),
                Err(e) => Err(BridgeError::Payload(format!("encoding failed: {}", e))),
            };

            progress.send_modify(|p| {
                p.completed += 1;
                if result.is_err() {
                    p.failed += 1;
                }
            });
            (name, result)
        }))
        .await;

        let mut report = UploadReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.saved.push(name),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Upload failed");
                    report.failed.push((name, e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::ObjectRegistry;
    use crate::testing::MockHost;
    use bridge_proto::{HostCommand, HostMethod};
    use std::sync::Arc;

    fn client_for(host: Arc<MockHost>) -> BridgeClient {
        let registry = ObjectRegistry::new();
        registry.register(host);
        BridgeClient::attach(Arc::new(registry), BridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_data_url() {
        let file = DroppedFile::new("a.txt", "text/plain", b"hello".to_vec());
        assert_eq!(file.data_url(), "data:text/plain;base64,aGVsbG8=");

        let file = DroppedFile::new("blob", "", vec![0, 1, 2]);
        assert_eq!(file.data_url(), "data:application/octet-stream;base64,AAEC");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_file_name("a:b*c?.txt"), "a_b_c_.txt");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(sanitize_file_name("con.txt"), "_con.txt");
        assert_eq!(sanitize_file_name("notes. "), "notes");
        assert_eq!(sanitize_file_name(".."), "_unnamed");
        assert_eq!(sanitize_file_name(""), "_unnamed");
    }

    #[test]
    fn test_progress_percent() {
        let progress = UploadProgress {
            completed: 1,
            failed: 0,
            total: 4,
        };
        assert_eq!(progress.percent(), 25.0);
        assert!(!progress.is_finished());
        assert!(UploadProgress::default().is_finished());
    }

    #[tokio::test]
    async fn test_batch_saves_into_current_dir() {
        let host = MockHost::file_system().shared();
        let client = client_for(host.clone());
        client.session().set_current_path("Pictures");

        let batch = UploadBatch::new(vec![
            DroppedFile::new("cat.png", "image/png", vec![1, 2, 3]),
            DroppedFile::new("dog/1.png", "image/png", vec![4]),
        ]);
        let progress = batch.progress();
        assert_eq!(progress.borrow().total, 2);

        let report = batch.submit(&client).await;
        assert!(report.is_complete_success());
        assert_eq!(report.saved, vec!["cat.png", "dog_1.png"]);
        assert_eq!(
            *progress.borrow(),
            UploadProgress {
                completed: 2,
                failed: 0,
                total: 2
            }
        );

        let calls = host.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&HostCommand::SaveDroppedFile {
            dir_path: "Pictures".into(),
            file_name: "cat.png".into(),
            data_url: "data:image/png;base64,AQID".into(),
        }));
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let host = MockHost::file_system()
            .failing(HostMethod::SaveDroppedFile, "quota exceeded")
            .shared();
        let client = client_for(host.clone());

        let batch = UploadBatch::new(vec![
            DroppedFile::new("a.bin", "", vec![0]),
            DroppedFile::new("b.bin", "", vec![1]),
        ]);
        let progress = batch.progress();
        let report = batch.submit(&client).await;

        assert_eq!(report.failed.len(), 2);
        assert_eq!(
            report.failed[0].1.to_string(),
            "Failed to save dropped file: quota exceeded"
        );
        assert_eq!(progress.borrow().failed, 2);
        assert!(progress.borrow().is_finished());
        assert_eq!(host.call_count(HostMethod::SaveDroppedFile), 2);
    }
}
