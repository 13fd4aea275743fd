use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use hex;
use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Invalid file format")]
    InvalidFormat,
    #[error("File too large")]
    FileTooLarge,
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    pub fn calculate_photo_hash(photo_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(photo_data);
        hex::encode(hasher.finalize())
    }

    /// Content-addressed key, so re-saving the same photo for the same
    /// user overwrites one object instead of accumulating copies.
    pub fn scan_photo_key(user_id: &str, photo_hash: &str, file_extension: &str) -> String {
        format!("scans/{}/{}.{}", user_id, photo_hash, file_extension)
    }

    pub fn extract_file_extension(mime_type: &str) -> Result<&str, S3ServiceError> {
        match mime_type {
            "image/jpeg" => Ok("jpg"),
            "image/png" => Ok("png"),
            "image/webp" => Ok("webp"),
            _ => Err(S3ServiceError::InvalidFormat),
        }
    }

    pub fn validate_photo_size(photo_data: &[u8]) -> Result<(), S3ServiceError> {
        const MAX_SIZE: usize = 20 * 1024 * 1024;
        if photo_data.len() > MAX_SIZE {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    /// Store a scan photo and return the object key recorded in history.
    pub async fn upload_scan_photo(
        &self,
        user_id: &str,
        photo_data: &[u8],
        mime_type: &str,
    ) -> Result<String, S3ServiceError> {
        S3Service::validate_photo_size(photo_data)?;

        let photo_hash = S3Service::calculate_photo_hash(photo_data);
        let file_extension = S3Service::extract_file_extension(mime_type)?;
        let s3_key = S3Service::scan_photo_key(user_id, &photo_hash, file_extension);

        let body = ByteStream::from(photo_data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&s3_key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(s3_key)
    }

    pub async fn get_photo(&self, s3_key: &str) -> Result<Vec<u8>, S3ServiceError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}
