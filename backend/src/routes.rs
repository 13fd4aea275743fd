use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;

use shared::{AnalysisRequest, DiseaseReference, ErrorBody, ProductRecommendation, SaveScanRequest};

use crate::analysis::intake;
use crate::analysis::validator;
use crate::analysis::vision_service::{VisionError, VisionService};
use crate::config::AnalysisConfig;
use crate::db::dynamodb_repository::{DynamoDbRepository, RepositoryError};
use crate::db::seed;
use crate::history::history_service::{HistoryError, HistoryService};

#[derive(Deserialize)]
struct ProductQuery {
    disease: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.service(
        web::resource("/api/analyze-crop")
            .route(web::get().to(analysis_status))
            .route(web::post().to(analyze_crop)),
    )
    .service(web::resource("/api/scan-image").route(web::post().to(scan_image)))
    .service(web::resource("/api/diseases/fallback").route(web::get().to(fallback_diseases)))
    .service(
        web::resource("/api/products/recommendations")
            .route(web::get().to(product_recommendations)),
    )
    .service(web::resource("/api/history").route(web::post().to(save_history)))
    .service(web::resource("/api/history/{user_id}").route(web::get().to(get_history)))
    .service(
        web::resource("/api/history/{user_id}/{entry_id}/photo")
            .route(web::get().to(get_history_photo)),
    )
    .service(Files::new("/static", frontend_dir).show_files_listing());
}

fn input_error(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorBody {
        error: message.to_string(),
        details: None,
    })
}

/// Upstream failures carry a distinct reason plus whatever diagnostic the
/// service produced; the fallback flow keys off the non-200 status.
fn upstream_error(err: &VisionError) -> HttpResponse {
    error!("Analysis request failed upstream: {}", err);
    let details = match err {
        VisionError::Status { detail, .. } if !detail.is_empty() => Some(detail.clone()),
        VisionError::MalformedJson(detail) => Some(detail.clone()),
        _ => None,
    };
    HttpResponse::BadGateway().json(ErrorBody {
        error: err.to_string(),
        details,
    })
}

async fn analysis_status(config: web::Data<AnalysisConfig>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "crop-analysis",
        "model": config.vision.model
    }))
}

async fn analyze_crop(
    vision: web::Data<VisionService>,
    request: web::Json<AnalysisRequest>,
) -> HttpResponse {
    let image = request.image_base64.trim();
    if image.is_empty() {
        return input_error("No image provided");
    }
    if !image.starts_with("data:image/") {
        return input_error("Image must be an embeddable image data URL");
    }

    if let Some(farm_id) = &request.farm_id {
        info!("Analyzing crop photo for farm {}", farm_id);
    }

    let raw = match vision.analyze(image).await {
        Ok(raw) => raw,
        Err(VisionError::MissingCredential) => {
            // Configuration problem, not user input; detail stays in the logs.
            error!("Vision API credential missing; set VISION_API_KEY");
            return HttpResponse::InternalServerError().json(ErrorBody {
                error: "Analysis service is not configured".to_string(),
                details: None,
            });
        }
        Err(e) => return upstream_error(&e),
    };

    match validator::validate(&raw) {
        Ok(result) => {
            info!(
                "Validated diagnosis: {} ({}% confidence)",
                result.disease_name, result.confidence
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            error!("Model response failed schema validation: {}", e);
            HttpResponse::BadGateway().json(ErrorBody {
                error: "Vision API response failed validation".to_string(),
                details: Some(e.to_string()),
            })
        }
    }
}

async fn scan_image(
    config: web::Data<AnalysisConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut photo: Option<(Vec<u8>, String, String)> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("photo") {
            // Drain unrelated fields so the stream can advance.
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("photo")
            .to_string();
        let mime_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut photo_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            photo_data.write_all(&data)?;
        }
        photo = Some((photo_data, file_name, mime_type));
    }

    let (photo_data, file_name, mime_type) = match photo {
        Some(parts) => parts,
        None => return Ok(input_error("No photo field in upload")),
    };

    match intake::process_upload(&photo_data, &file_name, &mime_type, &config.image) {
        Ok(encoded) => Ok(HttpResponse::Ok().json(encoded)),
        Err(e) => {
            info!("Rejected photo upload '{}': {}", file_name, e);
            Ok(input_error(&e.to_string()))
        }
    }
}

async fn fallback_diseases(
    repo: web::Data<DynamoDbRepository>,
    config: web::Data<AnalysisConfig>,
) -> HttpResponse {
    match seed::ensure_candidates(&repo, config.fallback.candidate_limit).await {
        Ok(candidates) => HttpResponse::Ok().json(candidates),
        Err(e) => {
            // Degrades to an empty list; the picker shows nothing rather
            // than blocking the flow.
            error!("Fallback candidate lookup failed: {}", e);
            HttpResponse::Ok().json(Vec::<DiseaseReference>::new())
        }
    }
}

async fn product_recommendations(
    repo: web::Data<DynamoDbRepository>,
    config: web::Data<AnalysisConfig>,
    query: web::Query<ProductQuery>,
) -> HttpResponse {
    match repo
        .products_for_disease(&query.disease, config.products.recommendation_limit)
        .await
    {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            error!("Product lookup for '{}' failed: {}", query.disease, e);
            HttpResponse::Ok().json(Vec::<ProductRecommendation>::new())
        }
    }
}

async fn save_history(
    history: web::Data<HistoryService>,
    request: web::Json<SaveScanRequest>,
) -> HttpResponse {
    if request.user_id.trim().is_empty() {
        return input_error("Missing user id");
    }

    match history.save_scan(&request).await {
        Ok(entry) => {
            info!("Saved scan {} for user {}", entry.id, entry.user_id);
            HttpResponse::Created().json(entry)
        }
        Err(HistoryError::InvalidImage(detail)) => HttpResponse::BadRequest().json(ErrorBody {
            error: "Invalid image data".to_string(),
            details: Some(detail),
        }),
        Err(e) => {
            error!("Failed to save scan history: {}", e);
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "Failed to save scan".to_string(),
                details: None,
            })
        }
    }
}

async fn get_history(
    history: web::Data<HistoryService>,
    path: web::Path<String>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match history.history_for_user(&user_id).await {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => {
            error!("Failed to load history for {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "Failed to load scan history".to_string(),
                details: None,
            })
        }
    }
}

async fn get_history_photo(
    history: web::Data<HistoryService>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (user_id, entry_id) = path.into_inner();
    match history.photo_for_entry(&user_id, &entry_id).await {
        Ok((photo_data, mime_type)) => HttpResponse::Ok()
            .content_type(mime_type.as_str())
            .body(photo_data),
        Err(HistoryError::Repository(RepositoryError::NotFound)) => {
            HttpResponse::NotFound().json(ErrorBody {
                error: "Scan not found".to_string(),
                details: None,
            })
        }
        Err(e) => {
            error!("Failed to load photo for scan {}: {}", entry_id, e);
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "Failed to load scan photo".to_string(),
                details: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use image::codecs::png::PngEncoder;
    use image::{Rgb, RgbImage};
    use serde_json::Value;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::analysis::vision_service::VisionService;
    use crate::db::dynamodb_repository::tests::offline_repository;
    use crate::storage::s3_service::tests::offline_service;

    // Discard port; requests fail fast without leaving the host.
    fn vision(api_key: Option<&str>) -> VisionService {
        vision_at(api_key, "http://127.0.0.1:9")
    }

    fn vision_at(api_key: Option<&str>, base_url: &str) -> VisionService {
        VisionService::new(
            api_key.map(str::to_string),
            base_url.to_string(),
            AnalysisConfig::default().vision,
        )
    }

    /// Stand-in for the chat-completions endpoint, answering with the given
    /// string as the assistant message content.
    async fn stub_vision_api(content: String) -> MockServer {
        let server = MockServer::start().await;
        let completion = json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&completion))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    macro_rules! test_app {
        ($vision:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($vision))
                    .app_data(web::Data::new(AnalysisConfig::default()))
                    .app_data(web::Data::new(offline_repository()))
                    .app_data(web::Data::new(HistoryService::new(
                        offline_repository(),
                        offline_service(),
                    )))
                    .configure(|cfg| configure_routes(cfg, ".".to_string())),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn liveness_probe_reports_ok() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::get().uri("/api/analyze-crop").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], AnalysisConfig::default().vision.model);
    }

    #[actix_web::test]
    async fn empty_image_is_rejected_before_any_network_call() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn non_data_url_image_is_rejected() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "https://example.com/leaf.jpg" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("data URL"));
    }

    #[actix_web::test]
    async fn missing_credential_is_a_generic_server_error() {
        let app = test_app!(vision(None));
        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "data:image/jpeg;base64,QUJD" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Analysis service is not configured");
        assert!(body.get("details").map_or(true, Value::is_null));
    }

    #[actix_web::test]
    async fn unreachable_inference_service_maps_to_bad_gateway() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "data:image/jpeg;base64,QUJD", "farmId": "farm-9" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);

        let body: Value = test::read_body_json(resp).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn validated_diagnosis_round_trips_through_the_handler() {
        let diagnosis = json!({
            "diseaseName": "Early Blight",
            "confidence": 86.5,
            "cropType": "Tomato",
            "severity": "Moderate",
            "symptoms": ["Concentric rings on older leaves"],
            "treatment": "Remove affected leaves and spray chlorothalonil",
            "prevention": ["Mulch the soil", "Water at the base"]
        });
        let server = stub_vision_api(diagnosis.to_string()).await;
        let app = test_app!(vision_at(Some("sk-test"), &server.uri()));

        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "data:image/jpeg;base64,QUJD", "farmId": "farm-2" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["diseaseName"], "Early Blight");
        assert_eq!(body["cropType"], "Tomato");
        assert_eq!(body["severity"], "Moderate");
        assert_eq!(body["confidence"], 86.5);
        assert_eq!(body["symptoms"], json!(["Concentric rings on older leaves"]));
    }

    #[actix_web::test]
    async fn schema_breaking_diagnosis_maps_to_bad_gateway() {
        // Well-formed JSON whose severity is outside the schema.
        let diagnosis = json!({
            "diseaseName": "Early Blight",
            "confidence": 86.5,
            "cropType": "Tomato",
            "severity": "Catastrophic",
            "symptoms": ["Spots"],
            "treatment": "Spray",
            "prevention": ["Mulch"]
        });
        let server = stub_vision_api(diagnosis.to_string()).await;
        let app = test_app!(vision_at(Some("sk-test"), &server.uri()));

        let req = test::TestRequest::post()
            .uri("/api/analyze-crop")
            .set_json(json!({ "imageBase64": "data:image/jpeg;base64,QUJD" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Vision API response failed validation");
        assert!(body["details"].as_str().unwrap().contains("severity"));
    }

    #[actix_web::test]
    async fn fallback_lookup_failure_degrades_to_empty_list() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::get()
            .uri("/api/diseases/fallback")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn product_lookup_failure_degrades_to_empty_list() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::get()
            .uri("/api/products/recommendations?disease=Late%20Blight")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn history_save_requires_a_user_id() {
        let app = test_app!(vision(Some("sk-test")));
        let req = test::TestRequest::post()
            .uri("/api/history")
            .set_json(json!({
                "userId": "  ",
                "imageDataUrl": "data:image/jpeg;base64,QUJD",
                "result": {
                    "diseaseName": "Early Blight",
                    "confidence": 80.0,
                    "cropType": "Tomato",
                    "severity": "Moderate",
                    "symptoms": ["Spots"],
                    "treatment": "Spray",
                    "prevention": ["Mulch"]
                }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    fn multipart_photo(field_name: &str, file_name: &str, data: &[u8]) -> (String, Vec<u8>) {
        let boundary = "----scan-test-boundary";
        let mut payload = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: image/png\r\n\r\n",
            b = boundary,
            f = field_name,
            n = file_name,
        )
        .into_bytes();
        payload.extend_from_slice(data);
        payload.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", boundary),
            payload,
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(320, 240, Rgb([30, 110, 60]));
        let mut out = Vec::new();
        img.write_with_encoder(PngEncoder::new(&mut out)).unwrap();
        out
    }

    #[actix_web::test]
    async fn photo_upload_returns_an_encoded_image() {
        let app = test_app!(vision(Some("sk-test")));
        let (content_type, payload) = multipart_photo("photo", "leaf.png", &png_bytes());
        let req = test::TestRequest::post()
            .uri("/api/scan-image")
            .insert_header(("content-type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["dataUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(body["fileName"], "leaf.png");
        assert_eq!(body["width"], 320);
    }

    #[actix_web::test]
    async fn photo_upload_without_the_photo_field_is_rejected() {
        let app = test_app!(vision(Some("sk-test")));
        let (content_type, payload) = multipart_photo("attachment", "leaf.png", &png_bytes());
        let req = test::TestRequest::post()
            .uri("/api/scan-image")
            .insert_header(("content-type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
