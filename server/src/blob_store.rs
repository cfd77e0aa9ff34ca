use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use agrocoop_core::{
    blob::{BlobDescriptor, BlobLocation, BlobMetadata, BlobStorage, ListedBlobRecord},
    config::{AppConfig, BlobStoreBackend},
};

const LIST_PAGE_LIMIT: usize = 1000;

/// Builds the configured object store.
pub fn build_blob_storage(config: &AppConfig) -> Result<Arc<dyn BlobStorage>> {
    match config.blob_store_backend {
        BlobStoreBackend::Memory => Ok(Arc::new(InMemoryBlobStorage::default())),
        BlobStoreBackend::Supabase => {
            let base_url = config
                .storage_url
                .as_deref()
                .context("AGROCOOP_STORAGE_URL is required for the supabase blob store")?;
            let service_key = config
                .storage_key
                .as_deref()
                .context("AGROCOOP_STORAGE_KEY is required for the supabase blob store")?;
            let storage = SupabaseBlobStorage::new(Client::new(), base_url, service_key)?;
            Ok(Arc::new(storage))
        }
    }
}

/// Naive in-memory blob storage used for local development and tests.
#[derive(Default)]
pub struct InMemoryBlobStorage {
    entries: RwLock<HashMap<String, (BlobMetadata, Vec<u8>)>>,
}

impl InMemoryBlobStorage {
    fn key(descriptor: &BlobDescriptor) -> String {
        format!("{}/{}", descriptor.bucket, descriptor.key)
    }

    pub async fn contains(&self, descriptor: &BlobDescriptor) -> bool {
        self.entries.read().await.contains_key(&Self::key(descriptor))
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn put(
        &self,
        descriptor: &BlobDescriptor,
        content: &[u8],
        mut metadata: BlobMetadata,
    ) -> Result<BlobLocation> {
        if metadata.content_length.is_none() {
            metadata.content_length = Some(content.len() as u64);
        }
        if metadata.last_modified.is_none() {
            metadata.last_modified = Some(Utc::now());
        }

        let key = Self::key(descriptor);
        self.entries
            .write()
            .await
            .insert(key.clone(), (metadata, content.to_vec()));

        Ok(BlobLocation::new(format!("memory://{key}")))
    }

    async fn delete(&self, descriptor: &BlobDescriptor) -> Result<()> {
        self.entries.write().await.remove(&Self::key(descriptor));
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ListedBlobRecord>> {
        let entries = self.entries.read().await;
        let full_prefix = format!("{bucket}/{prefix}/");
        let mut blobs: Vec<ListedBlobRecord> = entries
            .iter()
            .filter_map(|(key, (metadata, bytes))| {
                let name = key.strip_prefix(&full_prefix)?;
                let size = metadata
                    .content_length
                    .unwrap_or(bytes.len() as u64)
                    .min(i64::MAX as u64) as i64;
                Some(ListedBlobRecord {
                    name: name.to_owned(),
                    mime: metadata.content_type.clone(),
                    size,
                    created_at: metadata.last_modified.map(|dt| dt.timestamp()),
                })
            })
            .collect();

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }
}

/// Object storage speaking the Supabase Storage REST API.
pub struct SupabaseBlobStorage {
    client: Client,
    base_url: Url,
    service_key: String,
}

impl SupabaseBlobStorage {
    pub fn new(client: Client, base_url: &str, service_key: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid storage url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("storage url cannot be used as a base: {base_url}"));
        }
        Ok(Self {
            client,
            base_url,
            service_key: service_key.to_owned(),
        })
    }

    /// `<base>/storage/v1/object/<segments...>/<bucket>/<key segments...>`
    fn object_url(&self, segments: &[&str], bucket: &str, key: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow!("storage url cannot be used as a base"))?;
            path.pop_if_empty();
            path.extend(["storage", "v1", "object"]);
            path.extend(segments.iter().copied());
            path.push(bucket);
            if let Some(key) = key {
                path.extend(key.split('/'));
            }
        }
        Ok(url)
    }

    pub fn public_url(&self, descriptor: &BlobDescriptor) -> Result<Url> {
        self.object_url(&["public"], &descriptor.bucket, Some(&descriptor.key))
    }

    async fn error_for(response: reqwest::Response, action: &str) -> anyhow::Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable>".to_string());
        anyhow!("storage {action} failed with {status}: {body}")
    }
}

#[derive(Debug, Deserialize)]
struct StorageObject {
    name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<StorageObjectMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageObjectMetadata {
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    mimetype: Option<String>,
}

#[async_trait]
impl BlobStorage for SupabaseBlobStorage {
    async fn put(
        &self,
        descriptor: &BlobDescriptor,
        content: &[u8],
        metadata: BlobMetadata,
    ) -> Result<BlobLocation> {
        let url = self.object_url(&[], &descriptor.bucket, Some(&descriptor.key))?;
        let content_type = metadata
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_owned());

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(content.to_vec())
            .send()
            .await
            .context("request storage upload")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response, "upload").await);
        }

        debug!(bucket = %descriptor.bucket, key = %descriptor.key, "stored object");
        Ok(BlobLocation::new(self.public_url(descriptor)?.to_string()))
    }

    async fn delete(&self, descriptor: &BlobDescriptor) -> Result<()> {
        let url = self.object_url(&[], &descriptor.bucket, None)?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "prefixes": [descriptor.key] }))
            .send()
            .await
            .context("request storage delete")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response, "delete").await);
        }
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ListedBlobRecord>> {
        let url = self.object_url(&["list"], bucket, None)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({
                "prefix": prefix,
                "limit": LIST_PAGE_LIMIT,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await
            .context("request storage listing")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response, "list").await);
        }

        let objects = response
            .json::<Vec<StorageObject>>()
            .await
            .context("decode storage listing")?;

        Ok(objects
            .into_iter()
            .map(|object| {
                let metadata = object.metadata.unwrap_or_default();
                ListedBlobRecord {
                    name: object.name,
                    mime: metadata.mimetype,
                    size: metadata.size.unwrap_or(0),
                    created_at: object.created_at.map(|dt| dt.timestamp()),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_storage_lists_by_workspace_prefix() {
        let storage = InMemoryBlobStorage::default();
        let deed = BlobDescriptor::new("cooperative", "ws-1/a-deed.pdf");
        let other = BlobDescriptor::new("cooperative", "ws-2/b-deed.pdf");

        storage
            .put(&deed, b"deed", BlobMetadata::default())
            .await
            .expect("put deed");
        storage
            .put(&other, b"other", BlobMetadata::default())
            .await
            .expect("put other");

        let listed = storage.list("cooperative", "ws-1").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a-deed.pdf");
        assert_eq!(listed[0].size, 4);

        storage.delete(&deed).await.expect("delete");
        assert!(!storage.contains(&deed).await);
        assert!(storage.contains(&other).await);
    }

    #[test]
    fn public_url_escapes_key_segments() {
        let storage =
            SupabaseBlobStorage::new(Client::new(), "https://project.supabase.co/", "key")
                .expect("storage");
        let url = storage
            .public_url(&BlobDescriptor::new("cooperative", "ws-1/id-land deed.pdf"))
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/storage/v1/object/public/cooperative/ws-1/id-land%20deed.pdf"
        );
    }

    #[test]
    fn supabase_backend_requires_credentials() {
        let config = AppConfig {
            blob_store_backend: BlobStoreBackend::Supabase,
            ..AppConfig::default()
        };
        assert!(build_blob_storage(&config).is_err());
    }
}
