use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::Config;

use super::{key_from_url, prepare_upload, storage_key, MediaStore, KEY_PREFIX};

#[derive(Debug, Error)]
#[error("media store unavailable: {0}")]
pub struct MediaInitError(String);

/// S3/MinIO-backed media store. The bucket is verified (and created when
/// missing) once at construction, not per call.
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub async fn connect(config: &Config) -> Result<Self, MediaInitError> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.media_region.clone()));
        if let Some(endpoint) = &config.media_endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        let store = Self {
            client: Client::from_conf(s3_config),
            bucket: config.media_bucket.clone(),
            public_base_url: config
                .media_public_base_url
                .trim_end_matches('/')
                .to_string(),
        };
        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> Result<(), MediaInitError> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();
        if exists {
            debug!(bucket = %self.bucket, "bucket already exists");
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| MediaInitError(err.to_string()))?;
        info!(bucket = %self.bucket, "created media bucket");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, data: Bytes, original_name: &str, content_type: &str) -> Option<String> {
        let key = storage_key(original_name, Utc::now());
        let body = prepare_upload(data);
        let size = body.len();

        match self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
        {
            Ok(_) => {
                debug!(%key, size, "image uploaded");
                Some(self.public_url(&key))
            }
            Err(err) => {
                error!(error = %err, %key, "image upload failed");
                None
            }
        }
    }

    async fn delete(&self, url: &str) -> bool {
        let Some(key) = key_from_url(url) else {
            error!(%url, "could not derive storage key from url");
            return false;
        };

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => {
                debug!(%key, "image deleted");
                true
            }
            Err(err) => {
                error!(error = %err, %key, "image deletion failed");
                false
            }
        }
    }

    async fn list(&self) -> Vec<String> {
        match self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(KEY_PREFIX)
            .send()
            .await
        {
            Ok(response) => response
                .contents()
                .iter()
                .filter_map(|object| object.key())
                .map(|key| self.public_url(key))
                .collect(),
            Err(err) => {
                error!(error = %err, "image listing failed");
                Vec::new()
            }
        }
    }
}
