use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Client for S3-compatible object storage holding captured frames.
pub struct FrameStore {
    bucket: Box<Bucket>,
    public_url: String,
}

impl FrameStore {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Key a frame is stored under: unique per source and capture instant.
    pub fn frame_key(source_id: &str, captured_at: DateTime<Utc>) -> String {
        format!("frames/{}/{}.jpg", source_id, captured_at.timestamp_millis())
    }

    /// Upload raw frame bytes; returns the public locator for the object.
    pub async fn upload_frame(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(format!("{}/{}", self.public_url, key))
    }

    /// Download frame bytes (used by tooling and tests, not the hot path).
    pub async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.bucket.get_object(key).await.map_err(StorageError::S3)?;
        Ok(response.to_vec())
    }

    /// Delete an object.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.bucket.delete_object(key).await.map_err(StorageError::S3)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_frame_key_is_unique_per_instant() {
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let t2 = t1 + chrono::Duration::milliseconds(500);
        assert_ne!(FrameStore::frame_key("s1", t1), FrameStore::frame_key("s1", t2));
        assert_eq!(
            FrameStore::frame_key("s1", t1),
            format!("frames/s1/{}.jpg", t1.timestamp_millis())
        );
    }
}
