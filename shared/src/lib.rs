use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub mod scan;

pub use scan::{advance, ScanEvent, ScanPhase};

/// Crop type reported for results produced by manual fallback selection.
pub const MANUAL_CROP_TYPE: &str = "Manual Selection";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub image_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString,
)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A validated diagnosis, either from the vision model or from manual
/// fallback selection (confidence 0, crop type [`MANUAL_CROP_TYPE`]).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub disease_name: String,
    pub confidence: f32,
    pub crop_type: String,
    pub severity: Severity,
    pub symptoms: Vec<String>,
    pub treatment: String,
    pub prevention: Vec<String>,
}

/// Normalized photo produced by image intake: a `data:` URL bounded in
/// pixel size, plus metadata about the original upload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub data_url: String,
    pub file_name: String,
    pub byte_size: i64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Entry in the seedable disease reference collection used by the manual
/// fallback path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseReference {
    pub id: String,
    pub name: String,
    pub symptoms: Vec<String>,
    pub treatment: String,
    pub prevention: Vec<String>,
    pub severity: Severity,
    pub common_crops: Vec<String>,
}

impl DiseaseReference {
    /// Map a manually picked reference entry into the result shape used by
    /// a validated automatic diagnosis. Confidence is fixed at 0 so the
    /// manual origin stays visible downstream.
    pub fn manual_result(&self) -> AnalysisResult {
        AnalysisResult {
            disease_name: self.name.clone(),
            confidence: 0.0,
            crop_type: MANUAL_CROP_TYPE.to_string(),
            severity: self.severity,
            symptoms: self.symptoms.clone(),
            treatment: self.treatment.clone(),
            prevention: self.prevention.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub id: String,
    pub name: String,
    pub description: String,
    pub target_pests: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveScanRequest {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,
    pub image_data_url: String,
    pub result: AnalysisResult,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanHistoryEntry {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,
    pub result: AnalysisResult,
    pub photo_key: String,
    pub photo_mime_type: String,
    pub created_at: String,
}

/// Error body returned by the API on non-success statuses.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn reference() -> DiseaseReference {
        DiseaseReference {
            id: "late-blight".into(),
            name: "Late Blight".into(),
            symptoms: vec!["Dark water-soaked lesions".into()],
            treatment: "Apply a copper-based fungicide".into(),
            prevention: vec!["Rotate crops".into()],
            severity: Severity::Severe,
            common_crops: vec!["Potato".into(), "Tomato".into()],
        }
    }

    #[test]
    fn severity_accepts_exact_names_only() {
        assert_eq!(Severity::from_str("Mild").unwrap(), Severity::Mild);
        assert_eq!(Severity::from_str("Moderate").unwrap(), Severity::Moderate);
        assert_eq!(Severity::from_str("Severe").unwrap(), Severity::Severe);
        assert!(Severity::from_str("severe").is_err());
        assert!(Severity::from_str("Critical").is_err());
    }

    #[test]
    fn severity_display_round_trips() {
        for severity in [Severity::Mild, Severity::Moderate, Severity::Severe] {
            assert_eq!(Severity::from_str(&severity.to_string()).unwrap(), severity);
        }
    }

    #[test]
    fn analysis_result_uses_camel_case_wire_names() {
        let result = reference().manual_result();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("diseaseName").is_some());
        assert!(json.get("cropType").is_some());
        assert_eq!(json["severity"], "Severe");
    }

    #[test]
    fn manual_result_signals_manual_origin() {
        let result = reference().manual_result();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.crop_type, MANUAL_CROP_TYPE);
        assert_eq!(result.disease_name, "Late Blight");
        assert_eq!(result.severity, Severity::Severe);
        assert!(!result.symptoms.is_empty());
        assert!(!result.prevention.is_empty());
    }

    #[test]
    fn analysis_request_omits_missing_farm_id() {
        let request = AnalysisRequest {
            image_base64: "data:image/jpeg;base64,AAAA".into(),
            farm_id: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("imageBase64"));
        assert!(!json.contains("farmId"));
    }
}
