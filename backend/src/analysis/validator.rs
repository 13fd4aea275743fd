use std::str::FromStr;

use serde_json::Value;
use shared::{AnalysisResult, Severity};

/// Field-level schema violation. The message names the first check that
/// failed; nothing after it is inspected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

const REQUIRED_FIELDS: [&str; 7] = [
    "diseaseName",
    "confidence",
    "cropType",
    "severity",
    "symptoms",
    "treatment",
    "prevention",
];

/// Check a parsed but untyped model response against the result schema.
/// Validation is all-or-nothing; a result is only built when every field
/// passes.
pub fn validate(value: &Value) -> Result<AnalysisResult, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError("response is not a JSON object".into()))?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(ValidationError(format!("missing required field: {}", field)));
        }
    }

    let disease_name = object["diseaseName"]
        .as_str()
        .ok_or_else(|| ValidationError("diseaseName must be a string".into()))?;

    let confidence = object["confidence"]
        .as_f64()
        .filter(|c| (0.0..=100.0).contains(c))
        .ok_or_else(|| ValidationError("confidence must be a number between 0 and 100".into()))?;

    let crop_type = object["cropType"]
        .as_str()
        .ok_or_else(|| ValidationError("cropType must be a string".into()))?;

    let severity = object["severity"]
        .as_str()
        .and_then(|s| Severity::from_str(s).ok())
        .ok_or_else(|| ValidationError("severity must be one of Mild, Moderate or Severe".into()))?;

    let symptoms = string_list(&object["symptoms"])
        .ok_or_else(|| ValidationError("symptoms must be a non-empty list of strings".into()))?;

    let treatment = object["treatment"]
        .as_str()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ValidationError("treatment must be a non-empty string".into()))?;

    let prevention = string_list(&object["prevention"])
        .ok_or_else(|| ValidationError("prevention must be a non-empty list of strings".into()))?;

    Ok(AnalysisResult {
        disease_name: disease_name.to_string(),
        confidence: confidence as f32,
        crop_type: crop_type.to_string(),
        severity,
        symptoms,
        treatment: treatment.to_string(),
        prevention,
    })
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "diseaseName": "Late Blight",
            "confidence": 92.5,
            "cropType": "Potato",
            "severity": "Severe",
            "symptoms": ["Dark water-soaked lesions", "White mold on leaf undersides"],
            "treatment": "Apply copper-based fungicide and destroy infected plants",
            "prevention": ["Plant certified seed", "Avoid overhead irrigation"]
        })
    }

    #[test]
    fn full_schema_is_accepted_and_mapped() {
        let result = validate(&valid_payload()).unwrap();
        assert_eq!(result.disease_name, "Late Blight");
        assert_eq!(result.confidence, 92.5);
        assert_eq!(result.crop_type, "Potato");
        assert_eq!(result.severity, Severity::Severe);
        assert_eq!(result.symptoms.len(), 2);
        assert_eq!(result.prevention.len(), 2);
    }

    #[test]
    fn each_missing_field_is_named_in_the_error() {
        for field in REQUIRED_FIELDS {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);

            let err = validate(&payload).unwrap_err();
            assert!(
                err.0.contains(field),
                "error for missing {} was: {}",
                field,
                err.0
            );
        }
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        for accepted in [0, 100] {
            let mut payload = valid_payload();
            payload["confidence"] = json!(accepted);
            assert!(validate(&payload).is_ok(), "confidence {} rejected", accepted);
        }
        for rejected in [-1, 101] {
            let mut payload = valid_payload();
            payload["confidence"] = json!(rejected);
            let err = validate(&payload).unwrap_err();
            assert!(err.0.contains("confidence"));
        }
    }

    #[test]
    fn severity_matches_are_exact() {
        for accepted in ["Mild", "Moderate", "Severe"] {
            let mut payload = valid_payload();
            payload["severity"] = json!(accepted);
            assert!(validate(&payload).is_ok());
        }
        for rejected in ["severe", "Critical", "MILD", ""] {
            let mut payload = valid_payload();
            payload["severity"] = json!(rejected);
            let err = validate(&payload).unwrap_err();
            assert!(err.0.contains("severity"));
        }
    }

    #[test]
    fn non_objects_are_rejected_up_front() {
        for payload in [json!([1, 2, 3]), json!("Late Blight"), json!(null)] {
            let err = validate(&payload).unwrap_err();
            assert!(err.0.contains("not a JSON object"));
        }
    }

    #[test]
    fn lists_must_be_non_empty_and_all_strings() {
        let mut payload = valid_payload();
        payload["symptoms"] = json!([]);
        assert!(validate(&payload).unwrap_err().0.contains("symptoms"));

        let mut payload = valid_payload();
        payload["prevention"] = json!(["Rotate crops", 7]);
        assert!(validate(&payload).unwrap_err().0.contains("prevention"));

        let mut payload = valid_payload();
        payload["treatment"] = json!("   ");
        assert!(validate(&payload).unwrap_err().0.contains("treatment"));
    }
}
