use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json;
use std::collections::HashMap;
use std::str::FromStr;

use shared::{DiseaseReference, ProductRecommendation, ScanHistoryEntry, Severity};

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    diseases_table: String,
    products_table: String,
    history_table: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl DynamoDbRepository {
    pub fn new(
        client: Client,
        diseases_table: String,
        products_table: String,
        history_table: String,
    ) -> Self {
        Self {
            client,
            diseases_table,
            products_table,
            history_table,
        }
    }

    // Disease reference operations

    /// Write one reference entry. The deterministic per-name id is the
    /// partition key, so repeating a write overwrites the same document
    /// instead of duplicating it.
    pub async fn create_disease(&self, disease: &DiseaseReference) -> Result<(), RepositoryError> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(disease.id.clone()));
        item.insert("name".to_string(), AttributeValue::S(disease.name.clone()));
        item.insert(
            "severity".to_string(),
            AttributeValue::S(disease.severity.to_string()),
        );
        item.insert("symptoms".to_string(), string_list_attr(&disease.symptoms));
        item.insert(
            "treatment".to_string(),
            AttributeValue::S(disease.treatment.clone()),
        );
        item.insert(
            "prevention".to_string(),
            string_list_attr(&disease.prevention),
        );
        item.insert(
            "common_crops".to_string(),
            string_list_attr(&disease.common_crops),
        );

        self.client
            .put_item()
            .table_name(&self.diseases_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    pub async fn list_diseases(&self) -> Result<Vec<DiseaseReference>, RepositoryError> {
        let result = self
            .client
            .scan()
            .table_name(&self.diseases_table)
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let mut diseases = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                diseases.push(self.parse_disease_from_item(item)?);
            }
        }
        Ok(diseases)
    }

    /// Up to `limit` reference entries for the manual-selection fallback.
    pub async fn fallback_candidates(
        &self,
        limit: usize,
    ) -> Result<Vec<DiseaseReference>, RepositoryError> {
        let result = self
            .client
            .scan()
            .table_name(&self.diseases_table)
            .limit(limit as i32)
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let mut candidates = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                candidates.push(self.parse_disease_from_item(item)?);
            }
        }
        candidates.truncate(limit);
        Ok(candidates)
    }

    // Product operations

    /// Products whose target-pest set contains the disease name exactly.
    /// The scan limit applies before the filter, so the cap is enforced
    /// client-side after parsing.
    pub async fn products_for_disease(
        &self,
        disease_name: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecommendation>, RepositoryError> {
        let result = self
            .client
            .scan()
            .table_name(&self.products_table)
            .filter_expression("contains(target_pests, :disease)")
            .expression_attribute_values(":disease", AttributeValue::S(disease_name.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let mut products = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                products.push(self.parse_product_from_item(item)?);
            }
        }
        products.truncate(limit);
        Ok(products)
    }

    // Scan history operations

    pub async fn create_history_entry(
        &self,
        entry: &ScanHistoryEntry,
    ) -> Result<(), RepositoryError> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(entry.id.clone()));
        item.insert(
            "user_id".to_string(),
            AttributeValue::S(entry.user_id.clone()),
        );
        if let Some(farm_id) = &entry.farm_id {
            item.insert("farm_id".to_string(), AttributeValue::S(farm_id.clone()));
        }
        item.insert(
            "result".to_string(),
            AttributeValue::S(serde_json::to_string(&entry.result)?),
        );
        item.insert(
            "photo_key".to_string(),
            AttributeValue::S(entry.photo_key.clone()),
        );
        item.insert(
            "photo_mime_type".to_string(),
            AttributeValue::S(entry.photo_mime_type.clone()),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(entry.created_at.clone()),
        );

        self.client
            .put_item()
            .table_name(&self.history_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    pub async fn history_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ScanHistoryEntry>, RepositoryError> {
        let result = self
            .client
            .scan()
            .table_name(&self.history_table)
            .filter_expression("user_id = :user_id")
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let mut entries = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                entries.push(self.parse_history_from_item(item)?);
            }
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn get_history_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<ScanHistoryEntry, RepositoryError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(entry_id.to_string()));

        let result = self
            .client
            .get_item()
            .table_name(&self.history_table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let entry = self.parse_history_from_item(item)?;
                if entry.user_id != user_id {
                    return Err(RepositoryError::NotFound);
                }
                Ok(entry)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    // Helper methods for parsing DynamoDB items

    fn parse_disease_from_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> Result<DiseaseReference, RepositoryError> {
        let id = item
            .get("id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid disease id".to_string()))?
            .clone();

        let name = item
            .get("name")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid disease name".to_string()))?
            .clone();

        let severity = item
            .get("severity")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| Severity::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid severity".to_string()))?;

        let symptoms = item
            .get("symptoms")
            .and_then(parse_string_list)
            .ok_or_else(|| RepositoryError::InvalidData("Invalid symptoms".to_string()))?;

        let treatment = item
            .get("treatment")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid treatment".to_string()))?
            .clone();

        let prevention = item
            .get("prevention")
            .and_then(parse_string_list)
            .ok_or_else(|| RepositoryError::InvalidData("Invalid prevention".to_string()))?;

        let common_crops = item
            .get("common_crops")
            .and_then(parse_string_list)
            .unwrap_or_default();

        Ok(DiseaseReference {
            id,
            name,
            symptoms,
            treatment,
            prevention,
            severity,
            common_crops,
        })
    }

    fn parse_product_from_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> Result<ProductRecommendation, RepositoryError> {
        let id = item
            .get("id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid product id".to_string()))?
            .clone();

        let name = item
            .get("name")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid product name".to_string()))?
            .clone();

        let description = item
            .get("description")
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_default();

        let target_pests = item
            .get("target_pests")
            .and_then(|v| v.as_ss().ok())
            .cloned()
            .ok_or_else(|| RepositoryError::InvalidData("Invalid target_pests".to_string()))?;

        Ok(ProductRecommendation {
            id,
            name,
            description,
            target_pests,
        })
    }

    fn parse_history_from_item(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> Result<ScanHistoryEntry, RepositoryError> {
        let id = item
            .get("id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid history id".to_string()))?
            .clone();

        let user_id = item
            .get("user_id")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid user_id".to_string()))?
            .clone();

        let farm_id = item.get("farm_id").and_then(|v| v.as_s().ok()).cloned();

        let result = item
            .get("result")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid result".to_string()))?;

        let photo_key = item
            .get("photo_key")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid photo_key".to_string()))?
            .clone();

        let photo_mime_type = item
            .get("photo_mime_type")
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_else(|| "image/jpeg".to_string());

        let created_at = item
            .get("created_at")
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid created_at".to_string()))?
            .clone();

        Ok(ScanHistoryEntry {
            id,
            user_id,
            farm_id,
            result,
            photo_key,
            photo_mime_type,
            created_at,
        })
    }
}

/// Ordered lists are stored as DynamoDB lists, not string sets, so the
/// original ordering survives the round trip.
fn string_list_attr(values: &[String]) -> AttributeValue {
    AttributeValue::L(
        values
            .iter()
            .map(|v| AttributeValue::S(v.clone()))
            .collect(),
    )
}

fn parse_string_list(value: &AttributeValue) -> Option<Vec<String>> {
    value
        .as_l()
        .ok()?
        .iter()
        .map(|v| v.as_s().ok().cloned())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
    use shared::AnalysisResult;

    // Nothing listens on the discard port, so every call fails fast
    // without leaving localhost.
    pub(crate) fn offline_repository() -> DynamoDbRepository {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:9")
            .credentials_provider(Credentials::new("akid", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .build();
        DynamoDbRepository::new(
            Client::from_conf(config),
            "diseases".to_string(),
            "products".to_string(),
            "scan_history".to_string(),
        )
    }

    fn disease_item() -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".into(), AttributeValue::S("late-blight".into()));
        item.insert("name".into(), AttributeValue::S("Late Blight".into()));
        item.insert("severity".into(), AttributeValue::S("Severe".into()));
        item.insert(
            "symptoms".into(),
            AttributeValue::L(vec![
                AttributeValue::S("Water-soaked lesions".into()),
                AttributeValue::S("White mold on undersides".into()),
            ]),
        );
        item.insert(
            "treatment".into(),
            AttributeValue::S("Apply copper-based fungicide".into()),
        );
        item.insert(
            "prevention".into(),
            AttributeValue::L(vec![AttributeValue::S("Rotate crops".into())]),
        );
        item.insert(
            "common_crops".into(),
            AttributeValue::L(vec![
                AttributeValue::S("Potato".into()),
                AttributeValue::S("Tomato".into()),
            ]),
        );
        item
    }

    #[test]
    fn disease_item_round_trips_with_order_preserved() {
        let repo = offline_repository();
        let disease = repo.parse_disease_from_item(disease_item()).unwrap();

        assert_eq!(disease.id, "late-blight");
        assert_eq!(disease.severity, Severity::Severe);
        assert_eq!(
            disease.symptoms,
            vec!["Water-soaked lesions", "White mold on undersides"]
        );
        assert_eq!(disease.common_crops, vec!["Potato", "Tomato"]);
    }

    #[test]
    fn disease_item_with_bad_severity_is_invalid() {
        let repo = offline_repository();
        let mut item = disease_item();
        item.insert("severity".into(), AttributeValue::S("Catastrophic".into()));

        let err = repo.parse_disease_from_item(item).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn product_item_parses_target_pest_set() {
        let repo = offline_repository();
        let mut item = HashMap::new();
        item.insert("id".into(), AttributeValue::S("copper-shield".into()));
        item.insert("name".into(), AttributeValue::S("Copper Shield WP".into()));
        item.insert(
            "description".into(),
            AttributeValue::S("Copper hydroxide fungicide".into()),
        );
        item.insert(
            "target_pests".into(),
            AttributeValue::Ss(vec!["Late Blight".into(), "Early Blight".into()]),
        );

        let product = repo.parse_product_from_item(item).unwrap();
        assert_eq!(product.id, "copper-shield");
        assert!(product.target_pests.iter().any(|p| p == "Late Blight"));
    }

    #[test]
    fn history_item_round_trips_the_result_json() {
        let repo = offline_repository();
        let result = AnalysisResult {
            disease_name: "Leaf Rust".into(),
            confidence: 74.0,
            crop_type: "Wheat".into(),
            severity: Severity::Moderate,
            symptoms: vec!["Orange pustules".into()],
            treatment: "Apply triazole fungicide".into(),
            prevention: vec!["Plant resistant cultivars".into()],
        };

        let mut item = HashMap::new();
        item.insert("id".into(), AttributeValue::S("entry-1".into()));
        item.insert("user_id".into(), AttributeValue::S("user-1".into()));
        item.insert(
            "result".into(),
            AttributeValue::S(serde_json::to_string(&result).unwrap()),
        );
        item.insert(
            "photo_key".into(),
            AttributeValue::S("scans/user-1/abc.jpg".into()),
        );
        item.insert(
            "photo_mime_type".into(),
            AttributeValue::S("image/jpeg".into()),
        );
        item.insert(
            "created_at".into(),
            AttributeValue::S("2026-03-01T08:00:00+00:00".into()),
        );

        let entry = repo.parse_history_from_item(item).unwrap();
        assert_eq!(entry.result, result);
        assert!(entry.farm_id.is_none());
    }

    #[actix_web::test]
    async fn unreachable_endpoint_surfaces_as_dynamodb_error() {
        let repo = offline_repository();
        let err = repo.list_diseases().await.unwrap_err();
        assert!(matches!(err, RepositoryError::DynamoDb(_)));
    }
}
