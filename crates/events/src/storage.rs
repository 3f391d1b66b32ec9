//! Seam to the object store that holds files produced by tools.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("presign config error: {0}")]
    PresignConfig(String),
    #[error("presign error: {0}")]
    Presign(String),
}

/// A single object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
pub trait FileUrlSigner: Send + Sync {
    /// Time-limited read URL for `object`.
    async fn signed_read_url(&self, object: &StorageObject) -> Result<String, StorageError>;
}

/// A working directory such as `gs://bucket/session_files/shop/session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    pub bucket: String,
    pub base_path: String,
}

impl StorageRoot {
    /// Accepts `gs://` and `s3://` URLs with a non-empty bucket and base path.
    pub fn parse(url: &str) -> Option<Self> {
        let rest = url
            .strip_prefix("gs://")
            .or_else(|| url.strip_prefix("s3://"))?;
        let (bucket, base_path) = rest.split_once('/')?;
        if bucket.is_empty() || base_path.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            base_path: base_path.to_string(),
        })
    }

    pub fn object(&self, relative_path: &str) -> StorageObject {
        StorageObject {
            bucket: self.bucket.clone(),
            key: format!("{}/{}", self.base_path, relative_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_base_path() {
        let root = StorageRoot::parse("gs://files/session_files/shop-1/s-1").unwrap();
        assert_eq!(root.bucket, "files");
        assert_eq!(root.base_path, "session_files/shop-1/s-1");
        assert_eq!(
            root.object("out/banner.png"),
            StorageObject {
                bucket: "files".into(),
                key: "session_files/shop-1/s-1/out/banner.png".into(),
            }
        );
        assert!(StorageRoot::parse("s3://files/base").is_some());
    }

    #[test]
    fn rejects_other_urls() {
        assert_eq!(StorageRoot::parse("https://files/base"), None);
        assert_eq!(StorageRoot::parse("gs://files"), None);
        assert_eq!(StorageRoot::parse("gs://files/"), None);
        assert_eq!(StorageRoot::parse("gs:///base"), None);
    }
}
