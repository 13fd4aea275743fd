mod analysis;
mod config;
mod db;
mod history;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use std::env;

use analysis::vision_service::VisionService;
use config::AnalysisConfig;
use db::dynamodb_repository::DynamoDbRepository;
use history::history_service::HistoryService;
use routes::configure_routes;
use storage::s3_service::S3Service;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let frontend_dir = if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        format!("{}/../frontend/dist", manifest_dir)
    } else {
        "/usr/src/app/frontend/dist".to_string()
    };

    dotenv::dotenv().ok();

    let analysis_config = AnalysisConfig::load_or_default();

    // Initialize AWS configuration
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    // Create AWS clients
    let dynamodb_client = DynamoDbClient::new(&aws_config);
    let s3_client = S3Client::new(&aws_config);

    // Get table names from environment
    let diseases_table =
        env::var("DYNAMODB_DISEASES_TABLE").unwrap_or_else(|_| "diseases".to_string());
    let products_table =
        env::var("DYNAMODB_PRODUCTS_TABLE").unwrap_or_else(|_| "products".to_string());
    let history_table =
        env::var("DYNAMODB_HISTORY_TABLE").unwrap_or_else(|_| "scan_history".to_string());
    let scan_bucket =
        env::var("S3_SCAN_BUCKET").unwrap_or_else(|_| "farm-scan-photos".to_string());

    // Create repository and services
    let db_repo = DynamoDbRepository::new(
        dynamodb_client,
        diseases_table,
        products_table,
        history_table,
    );
    let s3_service = S3Service::new(s3_client, scan_bucket);
    let history_service = HistoryService::new(db_repo.clone(), s3_service);

    // Vision inference client. A missing credential is a per-request
    // configuration error, not a startup failure, so the server still
    // comes up and the fallback flow stays usable.
    let vision_api_key = env::var("VISION_API_KEY").ok();
    let vision_base_url =
        env::var("VISION_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    if vision_api_key.is_none() {
        log::warn!(
            "VISION_API_KEY is not set. Crop analysis requests will fail until it is configured."
        );
    }

    let vision_service = VisionService::new(
        vision_api_key,
        vision_base_url,
        analysis_config.vision.clone(),
    );

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(analysis_config.clone()))
            .app_data(web::Data::new(vision_service.clone()))
            .app_data(web::Data::new(db_repo.clone()))
            .app_data(web::Data::new(history_service.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
