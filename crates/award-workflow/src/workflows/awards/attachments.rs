use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::config::{StorageConfig, DEFAULT_MAX_UPLOAD_BYTES};

/// File received with a nomination, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Allow-list and size cap applied to the whole batch before any file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_total_bytes: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["pdf".to_string()],
            max_total_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AttachmentPolicy {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_total_bytes: config.max_upload_bytes,
            ..Self::default()
        }
    }

    pub fn validate(&self, uploads: &[AttachmentUpload]) -> Result<(), AttachmentViolation> {
        let mut total: u64 = 0;
        for upload in uploads {
            if upload.file_name.trim().is_empty() {
                return Err(AttachmentViolation::MissingFileName);
            }
            let extension = upload.extension().unwrap_or_default();
            if !self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
            {
                return Err(AttachmentViolation::DisallowedExtension {
                    file_name: upload.file_name.clone(),
                    allowed: self.allowed_extensions.join(", "),
                });
            }
            total = total.saturating_add(upload.size_bytes());
        }

        if total > self.max_total_bytes {
            return Err(AttachmentViolation::TooLarge {
                total_bytes: total,
                max_bytes: self.max_total_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentViolation {
    #[error("attachment is missing a file name")]
    MissingFileName,
    #[error("file '{file_name}' is not allowed; accepted types: {allowed}")]
    DisallowedExtension { file_name: String, allowed: String },
    #[error("attachments total {total_bytes} bytes, above the {max_bytes} byte limit")]
    TooLarge { total_bytes: u64, max_bytes: u64 },
}

/// Location of a file accepted by durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_type: String,
    pub path: String,
    pub size_bytes: u64,
}

/// Durable file storage used for nomination attachments.
pub trait AttachmentStorage: Send + Sync {
    fn store(&self, file_type: &str, content: &[u8]) -> Result<StoredFile, StorageError>;
    fn remove(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to write attachment {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to remove attachment {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Writes attachments under `<root>/<file_type>/<timestamp>-<uuid>.<file_type>`.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStorage {
    root: PathBuf,
}

impl LocalAttachmentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(file_type: &str) -> String {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{stamp}-{}.{file_type}", Uuid::new_v4().simple())
    }
}

impl AttachmentStorage for LocalAttachmentStorage {
    fn store(&self, file_type: &str, content: &[u8]) -> Result<StoredFile, StorageError> {
        let directory = self.root.join(file_type);
        let path = directory.join(Self::file_name(file_type));
        let display = path.display().to_string();

        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&directory)?;
            let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
            file.write_all(content)?;
            file.sync_all()
        };
        write().map_err(|source| StorageError::Write {
            path: display.clone(),
            source,
        })?;

        Ok(StoredFile {
            file_type: file_type.to_string(),
            path: display,
            size_bytes: content.len() as u64,
        })
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove {
                path: path.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_accepts_pdf_only() {
        let policy = AttachmentPolicy::default();
        assert!(policy
            .validate(&[AttachmentUpload::new("Certificate.PDF", b"%PDF".to_vec())])
            .is_ok());

        let err = policy
            .validate(&[AttachmentUpload::new("photo.jpg", b"jpeg".to_vec())])
            .expect_err("jpg rejected");
        assert!(matches!(err, AttachmentViolation::DisallowedExtension { .. }));

        let err = policy
            .validate(&[AttachmentUpload::new("noextension", b"x".to_vec())])
            .expect_err("missing extension rejected");
        assert!(matches!(err, AttachmentViolation::DisallowedExtension { .. }));
    }

    #[test]
    fn policy_caps_the_summed_size() {
        let policy = AttachmentPolicy {
            allowed_extensions: vec!["pdf".into()],
            max_total_bytes: 10,
        };
        let within = vec![
            AttachmentUpload::new("a.pdf", vec![0u8; 5]),
            AttachmentUpload::new("b.pdf", vec![0u8; 5]),
        ];
        assert!(policy.validate(&within).is_ok());

        let over = vec![
            AttachmentUpload::new("a.pdf", vec![0u8; 6]),
            AttachmentUpload::new("b.pdf", vec![0u8; 5]),
        ];
        assert_eq!(
            policy.validate(&over),
            Err(AttachmentViolation::TooLarge {
                total_bytes: 11,
                max_bytes: 10
            })
        );
    }

    #[test]
    fn local_storage_partitions_by_type_and_removes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalAttachmentStorage::new(dir.path());

        let first = storage.store("pdf", b"%PDF-1.7").expect("stored");
        let second = storage.store("pdf", b"%PDF-1.7").expect("stored");
        assert_ne!(first.path, second.path);
        assert!(first.path.starts_with(&dir.path().join("pdf").display().to_string()));
        assert!(first.path.ends_with(".pdf"));
        assert_eq!(first.size_bytes, 8);
        assert_eq!(std::fs::read(&first.path).expect("readable"), b"%PDF-1.7");

        storage.remove(&first.path).expect("removed");
        assert!(!Path::new(&first.path).exists());
        storage.remove(&first.path).expect("second remove is a no-op");
    }
}
