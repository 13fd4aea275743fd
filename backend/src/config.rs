use serde::{Deserialize, Serialize};
use serde_yaml;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub version: f32,
    pub image: ImageIntakeConfig,
    pub vision: VisionConfig,
    pub fallback: FallbackConfig,
    pub products: ProductConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageIntakeConfig {
    pub max_bytes: usize,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub accepted_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub candidate_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub recommendation_limit: usize,
}

impl AnalysisConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let manifest_dir =
            std::env::var("CARGO_MANIFEST_DIR").map_err(|_| "Failed to get manifest directory")?;
        let config_path = format!("{}/../config/analysis.yaml", manifest_dir);
        let config_str = std::fs::read_to_string(config_path)?;
        let config: AnalysisConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    /// Load the YAML config, falling back to compiled defaults when the file
    /// is absent or malformed so the server can still come up.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load analysis config, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: 1.0,
            image: ImageIntakeConfig {
                max_bytes: 10 * 1024 * 1024,
                max_dimension: 1024,
                jpeg_quality: 85,
                accepted_types: vec![
                    "image/jpeg".to_string(),
                    "image/png".to_string(),
                    "image/webp".to_string(),
                ],
            },
            vision: VisionConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_tokens: 1024,
            },
            fallback: FallbackConfig { candidate_limit: 5 },
            products: ProductConfig {
                recommendation_limit: 10,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_file_matches_compiled_defaults() {
        let loaded = AnalysisConfig::load().unwrap();
        let defaults = AnalysisConfig::default();
        assert_eq!(loaded.image.max_bytes, defaults.image.max_bytes);
        assert_eq!(loaded.image.max_dimension, defaults.image.max_dimension);
        assert_eq!(loaded.vision.model, defaults.vision.model);
        assert_eq!(loaded.fallback.candidate_limit, defaults.fallback.candidate_limit);
        assert_eq!(
            loaded.products.recommendation_limit,
            defaults.products.recommendation_limit
        );
    }

    #[test]
    fn accepted_types_cover_the_common_camera_formats() {
        let config = AnalysisConfig::default();
        for mime in ["image/jpeg", "image/png", "image/webp"] {
            assert!(config.image.accepted_types.iter().any(|t| t == mime));
        }
    }
}
