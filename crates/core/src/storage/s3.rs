//! S3-compatible storage backend (requires the `s3` feature).
//!
//! Works with AWS S3, Cloudflare R2, MinIO and other services that speak
//! the S3 API.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use super::{BlobStore, ObjectMeta, PutOptions, StoredObject};
use crate::Error;
use crate::config::StorageConfig;

/// Storage backend backed by an S3 bucket.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Create an `S3Store` with an existing [`Client`] and bucket name.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    /// Create an `S3Store` using credentials from the AWS environment
    /// (env vars, config files, IMDS) and the region and endpoint overrides
    /// from `config`.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, Error> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| Error::Storage("s3 backend requires a bucket".into()))?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::new(Client::from_conf(builder.build()), bucket))
    }
}

/// S3 user metadata travels as HTTP headers, which only carry ASCII.
/// Values are percent-encoded on the way in (non-ASCII always is) and
/// decoded on the way out.
const METADATA_ESCAPES: &AsciiSet = &CONTROLS.add(b'%');

fn encode_metadata(metadata: BTreeMap<String, String>) -> HashMap<String, String> {
    metadata
        .into_iter()
        .map(|(k, v)| (k, utf8_percent_encode(&v, METADATA_ESCAPES).to_string()))
        .collect()
}

fn to_btree(metadata: Option<&HashMap<String, String>>) -> BTreeMap<String, String> {
    metadata
        .map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl BlobStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => return Ok(None),
            Err(e) => return Err(Error::Storage(format!("get {key}: {}", DisplayErrorContext(&e)))),
        };

        let content_type = output.content_type().map(str::to_string);
        let metadata = to_btree(output.metadata());
        let data: Bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("read {key}: {e}")))?
            .into_bytes();

        tracing::debug!("downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);

        let meta = ObjectMeta { key: key.to_string(), size: data.len() as u64, content_type, metadata };
        Ok(Some(StoredObject { data, meta }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, Error> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: output.content_length().unwrap_or_default().max(0) as u64,
                content_type: output.content_type().map(str::to_string),
                metadata: to_btree(output.metadata()),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(Error::Storage(format!("head {key}: {}", DisplayErrorContext(&e)))),
        }
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<(), Error> {
        let len = data.len();
        let metadata = encode_metadata(options.metadata);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .set_content_type(options.content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("put {key}: {}", DisplayErrorContext(&e))))?;

        tracing::debug!("uploaded {} bytes to s3://{}/{}", len, self.bucket, key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter("/")
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| Error::Storage(format!("list {prefix}: {}", DisplayErrorContext(&e))))?;

            keys.extend(page.contents().iter().filter_map(|o| o.key()).map(str::to_string));

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!("listed {} keys under s3://{}/{}", keys.len(), self.bucket, prefix);
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_values_are_ascii_on_the_wire() {
        let mut metadata = BTreeMap::new();
        metadata.insert("target_url".to_string(), "https://example.com/café".to_string());
        metadata.insert("modifiers".to_string(), "full,mobile".to_string());

        let encoded = encode_metadata(metadata.clone());

        assert_eq!(encoded["target_url"], "https://example.com/caf%C3%A9");
        assert_eq!(encoded["modifiers"], "full,mobile");
        assert!(encoded.values().all(|v| v.is_ascii()));
        assert_eq!(to_btree(Some(&encoded)), metadata);
    }

    #[test]
    fn test_metadata_keeps_literal_percent() {
        let mut metadata = BTreeMap::new();
        metadata.insert("target_url".to_string(), "https://example.com/100%25".to_string());

        let encoded = encode_metadata(metadata.clone());

        assert_eq!(encoded["target_url"], "https://example.com/100%2525");
        assert_eq!(to_btree(Some(&encoded)), metadata);
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        assert!(to_btree(None).is_empty());
    }
}
