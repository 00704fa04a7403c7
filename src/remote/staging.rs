use crate::error::StageError;
use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// Upper bound on the buffer reserved up front from the reported size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// A durable blob store that files are staged into before extraction.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StageError>;
}

/// An opened, user-supplied file.
///
/// The content can be read exactly once; a retry has to open the file again.
pub struct UploadedFile {
    name: String,
    size: u64,
    content: Box<dyn AsyncRead + Send + Unpin>,
}

impl UploadedFile {
    pub fn new<R>(name: String, size: u64, content: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            name,
            size,
            content: Box::new(content),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Drains the content, returning the name and the bytes read.
    pub async fn into_parts(mut self) -> std::io::Result<(String, Vec<u8>)> {
        let mut bytes = Vec::with_capacity(self.size.min(MAX_PREALLOCATION) as usize);
        self.content.read_to_end(&mut bytes).await?;
        Ok((self.name, bytes))
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Transfers files to the object store under their own name.
pub struct StagingUploader<S> {
    store: S,
    content_type: String,
}

impl<S: ObjectStore> StagingUploader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type<T: Into<String>>(mut self, content_type: T) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Uploads the file, consuming it. Returns the object key.
    pub async fn stage(&self, file: UploadedFile, bucket: &str) -> Result<String, StageError> {
        let declared_size = file.size();
        let (key, bytes) = file
            .into_parts()
            .await
            .map_err(|e| StageError::new("ReadFailed", e.to_string()))?;

        if bytes.len() as u64 != declared_size {
            log::warn!(
                "{}: read {} bytes, expected {}",
                key,
                bytes.len(),
                declared_size
            );
        }

        log::debug!("staging {} ({} bytes) into bucket {}", key, bytes.len(), bucket);
        self.store
            .put_object(bucket, &key, bytes, &self.content_type)
            .await?;

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fakes::FakeStore;
    use std::io::Cursor;

    fn uploaded(name: &str, bytes: &'static [u8]) -> UploadedFile {
        UploadedFile::new(name.to_string(), bytes.len() as u64, Cursor::new(bytes))
    }

    #[tokio::test]
    async fn test_stage_uploads_full_content_under_file_name() {
        let store = FakeStore::new();
        let puts = store.puts();
        let uploader = StagingUploader::new(store);

        let key = uploader
            .stage(uploaded("invoice.pdf", b"%PDF-1.7 body"), "bucket-a")
            .await
            .unwrap();

        assert_eq!(key, "invoice.pdf");
        let recorded = puts.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].bucket, "bucket-a");
        assert_eq!(recorded[0].key, "invoice.pdf");
        assert_eq!(recorded[0].body, b"%PDF-1.7 body".to_vec());
        assert_eq!(recorded[0].content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_reported_size_does_not_bound_the_read() {
        let file = UploadedFile::new("huge.pdf".to_string(), u64::MAX, Cursor::new(&b"%PDF"[..]));
        let (name, bytes) = file.into_parts().await.unwrap();
        assert_eq!(name, "huge.pdf");
        assert_eq!(bytes, b"%PDF".to_vec());
    }

    #[tokio::test]
    async fn test_store_errors_are_surfaced() {
        let store = FakeStore::new().failing("broken.pdf", 1);
        let uploader = StagingUploader::new(store).with_content_type("application/octet-stream");

        let error = uploader
            .stage(uploaded("broken.pdf", b"x"), "bucket-a")
            .await
            .unwrap_err();
        assert_eq!(error.code, "AccessDenied");
    }

    #[tokio::test]
    async fn test_unreadable_content_is_a_stage_error() {
        struct Broken;

        impl AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk vanished",
                )))
            }
        }

        let store = FakeStore::new();
        let puts = store.puts();
        let uploader = StagingUploader::new(store);

        let error = uploader
            .stage(UploadedFile::new("gone.pdf".to_string(), 10, Broken), "bucket-a")
            .await
            .unwrap_err();
        assert_eq!(error.code, "ReadFailed");
        assert!(puts.lock().unwrap().is_empty());
    }
}
