use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::VisionConfig;

/// Upper bound on one inference round trip. Vision calls on large photos
/// can take tens of seconds; anything past this is treated as a transport
/// failure and feeds the fallback path.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are a plant pathologist helping smallholder farmers. \
Examine the crop photo and identify the most likely disease. \
Respond with a single JSON object and nothing else, using exactly these fields: \
diseaseName (string), confidence (number from 0 to 100), cropType (string), \
severity (exactly one of \"Mild\", \"Moderate\", \"Severe\"), \
symptoms (array of strings), treatment (string), prevention (array of strings). \
If the plant looks healthy, use \"Healthy\" as diseaseName with severity \"Mild\".";

const USER_PROMPT: &str = "Analyze this crop photo and identify any disease.";

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Vision API credential is not configured")]
    MissingCredential,
    #[error("Vision API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Vision API returned status {status}")]
    Status { status: u16, detail: String },
    #[error("Vision API returned an empty response")]
    EmptyResponse,
    #[error("Vision API returned malformed JSON")]
    MalformedJson(String),
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible multimodal inference API.
///
/// The photo travels as a data URL inside an `image_url` content part at
/// high detail; the response is constrained to a JSON object with low
/// sampling temperature so diagnoses stay consistent across retries.
#[derive(Clone)]
pub struct VisionService {
    http_client: HttpClient,
    api_key: Option<String>,
    base_url: String,
    config: VisionConfig,
}

impl VisionService {
    pub fn new(api_key: Option<String>, base_url: String, config: VisionConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url,
            config,
        }
    }

    /// Send one analysis request and return the model's parsed JSON body.
    /// Schema validation happens in the caller; this layer only guarantees
    /// the content is well-formed JSON.
    pub async fn analyze(&self, image_data_url: &str) -> Result<Value, VisionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VisionError::MissingCredential)?;

        let request = self.build_request(image_data_url);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(VisionError::Status { status, detail });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        Self::parse_completion(completion)
    }

    fn build_request(&self, image_data_url: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: USER_PROMPT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_data_url.to_string(),
                                detail: "high".to_string(),
                            },
                        },
                    ]),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        }
    }

    fn parse_completion(completion: ChatCompletionResponse) -> Result<Value, VisionError> {
        let content = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or(VisionError::EmptyResponse)?;

        serde_json::from_str(content).map_err(|e| VisionError::MalformedJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(api_key: Option<&str>, base_url: &str) -> VisionService {
        VisionService::new(
            api_key.map(str::to_string),
            base_url.to_string(),
            VisionConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_tokens: 1024,
            },
        )
    }

    #[test]
    fn request_carries_prompt_image_and_json_constraint() {
        let svc = service(Some("sk-test"), "https://api.example.com/v1");
        let request = svc.build_request("data:image/jpeg;base64,QUJD");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["response_format"]["type"], "json_object");

        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("diseaseName"));

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,QUJD");
        assert_eq!(parts[1]["image_url"]["detail"], "high");
    }

    #[test]
    fn completion_content_is_parsed_as_json() {
        let completion: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"diseaseName\":\"Leaf Rust\"}"}}]}"#,
        )
        .unwrap();

        let value = VisionService::parse_completion(completion).unwrap();
        assert_eq!(value["diseaseName"], "Leaf Rust");
    }

    #[test]
    fn empty_choices_and_blank_content_are_distinct_from_bad_json() {
        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            VisionService::parse_completion(empty),
            Err(VisionError::EmptyResponse)
        ));

        let blank: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(
            VisionService::parse_completion(blank),
            Err(VisionError::EmptyResponse)
        ));

        let fenced: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"```json\n{}\n```"}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            VisionService::parse_completion(fenced),
            Err(VisionError::MalformedJson(_))
        ));
    }

    #[actix_web::test]
    async fn missing_credential_fails_before_any_network_call() {
        let svc = service(None, "https://api.example.com/v1");
        let err = svc.analyze("data:image/jpeg;base64,QUJD").await.unwrap_err();
        assert!(matches!(err, VisionError::MissingCredential));
    }

    #[actix_web::test]
    async fn unreachable_endpoint_surfaces_as_http_error() {
        // Port 9 is the discard port; nothing listens there.
        let svc = service(Some("sk-test"), "http://127.0.0.1:9");
        let err = svc.analyze("data:image/jpeg;base64,QUJD").await.unwrap_err();
        assert!(matches!(err, VisionError::Http(_)));
    }
}
