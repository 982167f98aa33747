//! Filesystem blob store for attachment contents.
//!
//! Objects are laid out the same way as in the cloud bucket so the returned
//! `gs://` locations stay valid if the directory is later synced to GCS:
//!
//! ```text
//! {base_path}/{bucket}/attachments/{email_id}/{file_id}_{sanitized_name}
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use mailroom_core::{attachment_object_path, storage_uri, BlobStore, Error, Result};

/// Blob store writing into a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    bucket: String,
}

impl FilesystemBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            bucket: bucket.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Local path of an object inside the bucket directory.
    pub fn object_path(&self, object: &str) -> PathBuf {
        self.base_path.join(&self.bucket).join(object)
    }

    async fn write_atomic(&self, full_path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob_storage: create_dir_all failed");
                e
            })?;
        }

        let temp_path = temp_path_for(full_path);
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob_storage: rename failed");
            e
        })?;
        Ok(())
    }
}

/// `{file_name}.tmp` next to the target, keeping the real extension.
fn temp_path_for(full_path: &Path) -> PathBuf {
    let mut name = full_path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    full_path.with_file_name(name)
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn upload(
        &self,
        data: &[u8],
        file_name: &str,
        email_id: &str,
        file_id: &str,
    ) -> Result<String> {
        let object = attachment_object_path(email_id, file_id, file_name);
        let full_path = self.object_path(&object);
        debug!(
            subsystem = "storage",
            component = "filesystem",
            email_id,
            file_id,
            full_path = %full_path.display(),
            size = data.len(),
            "blob_storage: upload"
        );

        self.write_atomic(&full_path, data).await?;
        Ok(storage_uri(&self.bucket, &object))
    }

    /// Write, read back and delete a health-check file.
    async fn ping(&self) -> Result<()> {
        let check_dir = self.base_path.join(&self.bucket).join(".health-check");
        let check_file = check_dir.join("ping.bin");
        let data = b"mailroom-storage-ping";

        fs::create_dir_all(&check_dir).await.map_err(|e| {
            Error::Storage(format!("create_dir_all({}): {e}", check_dir.display()))
        })?;
        fs::write(&check_file, data)
            .await
            .map_err(|e| Error::Storage(format!("write({}): {e}", check_file.display())))?;
        let read_back = fs::read(&check_file)
            .await
            .map_err(|e| Error::Storage(format!("read({}): {e}", check_file.display())))?;
        if read_back != data {
            return Err(Error::Storage("read-back mismatch".to_string()));
        }
        fs::remove_file(&check_file)
            .await
            .map_err(|e| Error::Storage(format!("remove_file({}): {e}", check_file.display())))?;
        let _ = fs::remove_dir(&check_dir).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_gs_uri_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "bucket");

        let uri = store
            .upload(b"%PDF-1.7", "invoice.pdf", "email_001", "file_001")
            .await
            .unwrap();
        assert_eq!(uri, "gs://bucket/attachments/email_001/file_001_invoice.pdf");

        let written = store.object_path("attachments/email_001/file_001_invoice.pdf");
        assert_eq!(std::fs::read(written).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_upload_sanitizes_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "bucket");

        let uri = store
            .upload(b"x", "../scan?.pdf", "email_001", "file_002")
            .await
            .unwrap();
        assert_eq!(uri, "gs://bucket/attachments/email_001/file_002_.._scan_.pdf");
        assert!(store
            .object_path("attachments/email_001/file_002_.._scan_.pdf")
            .exists());
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "bucket");

        store.upload(b"old", "a.txt", "e", "f").await.unwrap();
        store.upload(b"new", "a.txt", "e", "f").await.unwrap();

        let written = store.object_path("attachments/e/f_a.txt");
        assert_eq!(std::fs::read(written).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_upload_ids_cannot_escape_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let store = FilesystemBlobStore::new(&base, "bucket");

        let uri = store
            .upload(b"x", "n.pdf", "..", "../../../outside")
            .await
            .unwrap();
        assert_eq!(uri, "gs://bucket/attachments/__/.._.._.._outside_n.pdf");
        assert!(store
            .object_path("attachments/__/.._.._.._outside_n.pdf")
            .exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(!base.join("bucket/outside_n.pdf").exists());
    }

    #[test]
    fn test_temp_path_keeps_full_file_name() {
        let pdf = temp_path_for(Path::new("/b/attachments/e/f1_report.pdf"));
        let docx = temp_path_for(Path::new("/b/attachments/e/f1_report.docx"));
        assert_eq!(pdf, Path::new("/b/attachments/e/f1_report.pdf.tmp"));
        assert_ne!(pdf, docx);
    }

    #[tokio::test]
    async fn test_uploads_differing_only_in_extension_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "bucket");

        store.upload(b"pdf", "report.pdf", "e", "f1").await.unwrap();
        store.upload(b"docx", "report.docx", "e", "f1").await.unwrap();

        let folder = store.object_path("attachments/e");
        assert_eq!(std::fs::read(folder.join("f1_report.pdf")).unwrap(), b"pdf");
        assert_eq!(std::fs::read(folder.join("f1_report.docx")).unwrap(), b"docx");
        let leftovers = std::fs::read_dir(&folder)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_ping_round_trip_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "bucket");

        store.ping().await.unwrap();
        assert!(!dir.path().join("bucket/.health-check/ping.bin").exists());
    }

    #[tokio::test]
    async fn test_ping_fails_on_unwritable_base() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = FilesystemBlobStore::new(&blocker, "bucket");
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
