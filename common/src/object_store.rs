use crate::error::{AppError, AppResult};
use crate::settings::S3Settings;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_credential_types::{provider::SharedCredentialsProvider, Credentials};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

const MULTIPART_THRESHOLD: usize = 5 * 1024 * 1024;
const UPLOAD_ATTEMPTS: u32 = 3;

/// Byte-level key/value storage for workflow state and activity outputs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Missing keys are reported as [`AppError::NotFound`].
    async fn get(&self, path: &str) -> AppResult<Vec<u8>>;

    /// Creates or overwrites the object at `path`.
    async fn set(&self, path: &str, body: Vec<u8>) -> AppResult<()>;
}

pub async fn read_json<T: DeserializeOwned>(store: &dyn ObjectStore, path: &str) -> AppResult<T> {
    let bytes = store.get(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Validation(format!("object '{}' is not valid JSON: {}", path, e)))
}

pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    path: &str,
    value: &T,
) -> AppResult<()> {
    let body = serde_json::to_vec_pretty(value)?;
    store.set(path, body).await
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, path: &str) -> AppResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("object '{}'", path)))
    }

    async fn set(&self, path: &str, body: Vec<u8>) -> AppResult<()> {
        self.objects.write().await.insert(path.to_string(), body);
        Ok(())
    }
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim_matches('"').trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn is_aliyun_oss(endpoint_url: &str) -> bool {
    endpoint_url.contains("aliyuncs.com")
}

fn resolve_force_path_style(force_path_style: bool, endpoint: Option<&str>) -> bool {
    match endpoint {
        _ if force_path_style => true,
        Some(ep) => !is_aliyun_oss(ep),
        None => false,
    }
}

fn s3_error<E: std::fmt::Display>(action: &str, path: &str, err: E) -> AppError {
    AppError::remote(None, format!("s3 {} '{}' failed: {}", action, path, err))
}

impl S3ObjectStore {
    pub async fn new(settings: &S3Settings) -> Self {
        let region_provider =
            RegionProviderChain::first_try(aws_types::region::Region::new(settings.region.clone()))
                .or_default_provider();

        let mut config_loader =
            aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        if let (Some(ak), Some(sk)) = (
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
        ) {
            let creds = Credentials::new(ak, sk, None, None, "config");
            config_loader =
                config_loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }

        let endpoint = settings.endpoint.as_deref().map(normalize_endpoint);
        if let Some(ep) = endpoint.as_deref() {
            config_loader = config_loader.endpoint_url(ep);
        }

        let config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(resolve_force_path_style(
                settings.force_path_style,
                endpoint.as_deref(),
            ))
            .build();

        tracing::info!(bucket = %settings.bucket, endpoint = ?endpoint, "S3 object store ready");
        Self {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket.clone(),
        }
    }

    async fn put_once(&self, path: &str, body: &[u8], base64_md5: &str) -> AppResult<()> {
        if body.len() > MULTIPART_THRESHOLD {
            return self.put_multipart(path, body).await;
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(body.to_vec()))
            .content_md5(base64_md5)
            .send()
            .await
            .map_err(|e| s3_error("put", path, e))?;
        Ok(())
    }

    async fn put_multipart(&self, path: &str, body: &[u8]) -> AppResult<()> {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| s3_error("create multipart upload", path, e))?;

        let upload_id = upload
            .upload_id
            .ok_or_else(|| s3_error("create multipart upload", path, "no upload id"))?;
        let mut completed_parts = Vec::new();

        for (i, chunk) in body.chunks(MULTIPART_THRESHOLD).enumerate() {
            let part_number = (i + 1) as i32;
            let part = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(path)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| s3_error("upload part", path, e))?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(part.e_tag.unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| s3_error("complete multipart upload", path, e))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, path: &str) -> AppResult<Vec<u8>> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("object '{}'", path))
                } else {
                    s3_error("get", path, service_error)
                }
            })?;

        let bytes = obj
            .body
            .collect()
            .await
            .map_err(|e| s3_error("read", path, e))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn set(&self, path: &str, body: Vec<u8>) -> AppResult<()> {
        let md5_digest = md5::compute(&body);
        let base64_md5 = general_purpose::STANDARD.encode(md5_digest.0);

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.put_once(path, &body, &base64_md5).await {
                Ok(()) => return Ok(()),
                Err(e) if attempts >= UPLOAD_ATTEMPTS => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt = attempts, path, error = %e, "Upload failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(500 * attempts as u64))
                        .await;
                }
            }
        }
    }
}
