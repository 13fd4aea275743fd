use base64::Engine;
use chrono::Utc;
use uuid::Uuid;

use shared::{SaveScanRequest, ScanHistoryEntry};

use crate::db::dynamodb_repository::{DynamoDbRepository, RepositoryError};
use crate::storage::s3_service::{S3Service, S3ServiceError};

/// Saves a finished scan on explicit user action: the photo goes to S3,
/// the validated result and photo key go to the history table.
#[derive(Clone)]
pub struct HistoryService {
    db_repo: DynamoDbRepository,
    s3_service: S3Service,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Storage error: {0}")]
    Storage(#[from] S3ServiceError),
    #[error("Invalid image data: {0}")]
    InvalidImage(String),
}

impl HistoryService {
    pub fn new(db_repo: DynamoDbRepository, s3_service: S3Service) -> Self {
        Self {
            db_repo,
            s3_service,
        }
    }

    fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), HistoryError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| HistoryError::InvalidImage("not a data URL".to_string()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| HistoryError::InvalidImage("missing base64 payload".to_string()))?;
        if mime_type.is_empty() {
            return Err(HistoryError::InvalidImage("missing MIME type".to_string()));
        }

        let photo_data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| HistoryError::InvalidImage(e.to_string()))?;
        Ok((mime_type.to_string(), photo_data))
    }

    pub async fn save_scan(
        &self,
        request: &SaveScanRequest,
    ) -> Result<ScanHistoryEntry, HistoryError> {
        let (mime_type, photo_data) = Self::decode_data_url(&request.image_data_url)?;

        let photo_key = self
            .s3_service
            .upload_scan_photo(&request.user_id, &photo_data, &mime_type)
            .await?;

        let entry = ScanHistoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            farm_id: request.farm_id.clone(),
            result: request.result.clone(),
            photo_key,
            photo_mime_type: mime_type,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db_repo.create_history_entry(&entry).await?;
        Ok(entry)
    }

    pub async fn history_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ScanHistoryEntry>, HistoryError> {
        Ok(self.db_repo.history_for_user(user_id).await?)
    }

    pub async fn photo_for_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<(Vec<u8>, String), HistoryError> {
        let entry = self.db_repo.get_history_entry(user_id, entry_id).await?;
        let photo_data = self.s3_service.get_photo(&entry.photo_key).await?;
        Ok((photo_data, entry.photo_mime_type))
    }
}
