use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Address of an object inside external storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobDescriptor {
    pub bucket: String,
    pub key: String,
}

impl BlobDescriptor {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Where a stored object can be fetched from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobLocation {
    pub uri: String,
}

impl BlobLocation {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Lightweight listing record used for raw object enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListedBlobRecord {
    pub name: String,
    pub mime: Option<String>,
    pub size: i64,
    pub created_at: Option<i64>,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn put(
        &self,
        descriptor: &BlobDescriptor,
        content: &[u8],
        metadata: BlobMetadata,
    ) -> Result<BlobLocation>;

    async fn delete(&self, descriptor: &BlobDescriptor) -> Result<()>;

    /// Lists objects in `bucket` whose key starts with `prefix/`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ListedBlobRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_keeps_bucket_and_key() {
        let descriptor = BlobDescriptor::new("cooperative", "ws-1/report.pdf");
        assert_eq!(descriptor.bucket, "cooperative");
        assert_eq!(descriptor.key, "ws-1/report.pdf");
    }
}
