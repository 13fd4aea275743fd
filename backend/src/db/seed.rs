use lazy_static::lazy_static;
use tokio::sync::Mutex;

use shared::{DiseaseReference, Severity};

use super::dynamodb_repository::{DynamoDbRepository, RepositoryError};

/// Deterministic per-name identifier, so seeding the same disease twice
/// writes the same document.
pub fn slug_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn baseline(
    name: &str,
    severity: Severity,
    symptoms: &[&str],
    treatment: &str,
    prevention: &[&str],
    common_crops: &[&str],
) -> DiseaseReference {
    DiseaseReference {
        id: slug_id(name),
        name: name.to_string(),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        treatment: treatment.to_string(),
        prevention: prevention.iter().map(|s| s.to_string()).collect(),
        severity,
        common_crops: common_crops.iter().map(|s| s.to_string()).collect(),
    }
}

lazy_static! {
    /// Five well-known crop diseases used to bootstrap an empty reference
    /// collection. Kept small on purpose; the collection only backs the
    /// manual fallback picker.
    pub static ref BASELINE_DISEASES: Vec<DiseaseReference> = vec![
        baseline(
            "Late Blight",
            Severity::Severe,
            &[
                "Dark water-soaked lesions on leaves and stems",
                "White fungal growth on leaf undersides in humid weather",
                "Firm brown rot spreading into tubers and fruit",
            ],
            "Remove and destroy infected plants, then apply a copper-based fungicide to the remaining crop",
            &[
                "Plant certified disease-free seed",
                "Rotate away from potato and tomato for at least two seasons",
                "Avoid overhead irrigation late in the day",
            ],
            &["Potato", "Tomato"],
        ),
        baseline(
            "Powdery Mildew",
            Severity::Mild,
            &[
                "White powdery patches on upper leaf surfaces and stems",
                "Leaves curl, yellow and drop early",
            ],
            "Spray wettable sulfur or potassium bicarbonate at first sign and repeat weekly",
            &[
                "Choose resistant varieties",
                "Space plants for good airflow",
                "Avoid excess nitrogen fertilizer",
            ],
            &["Wheat", "Squash", "Grape"],
        ),
        baseline(
            "Leaf Rust",
            Severity::Moderate,
            &[
                "Orange-brown pustules scattered on upper leaf surfaces",
                "Premature yellowing and leaf drop from the lower canopy",
            ],
            "Apply a triazole fungicide as soon as pustules appear",
            &[
                "Plant resistant cultivars",
                "Remove volunteer host plants between seasons",
                "Sow early so grain fills before rust pressure peaks",
            ],
            &["Wheat", "Barley", "Coffee"],
        ),
        baseline(
            "Bacterial Leaf Blight",
            Severity::Severe,
            &[
                "Leaf tips yellow and dry to a straw color",
                "Water-soaked streaks along the leaf veins",
                "Milky bacterial ooze visible on cut leaves in the morning",
            ],
            "Drain the field, remove infected plants and apply a copper-based bactericide to limit spread",
            &[
                "Use resistant varieties and clean certified seed",
                "Apply nitrogen in balanced split doses",
                "Keep field bunds free of host weeds",
            ],
            &["Rice"],
        ),
        baseline(
            "Early Blight",
            Severity::Moderate,
            &[
                "Dark concentric rings forming a target pattern on older leaves",
                "Yellow halo around leaf spots",
                "Lower leaves drop as spots merge",
            ],
            "Remove affected lower leaves and spray chlorothalonil or a copper fungicide on a 7-10 day schedule",
            &[
                "Mulch the soil surface to stop spore splash",
                "Rotate crops and stake plants for airflow",
                "Water at the base, not over the foliage",
            ],
            &["Tomato", "Potato"],
        ),
    ];

    // Serializes in-process seeding so concurrent fallback requests do not
    // race the emptiness check. Cross-process races stay harmless because
    // the deterministic ids make the writes idempotent.
    static ref SEED_LOCK: Mutex<()> = Mutex::new(());
}

/// Seed the reference collection with the baseline set if it is empty.
pub async fn seed_if_empty(repo: &DynamoDbRepository) -> Result<(), RepositoryError> {
    let _guard = SEED_LOCK.lock().await;

    if !repo.list_diseases().await?.is_empty() {
        return Ok(());
    }

    log::info!(
        "🔄 Seeding disease reference collection with {} baseline entries",
        BASELINE_DISEASES.len()
    );
    for disease in BASELINE_DISEASES.iter() {
        repo.create_disease(disease).await?;
    }
    log::info!("✅ Disease reference collection seeded");
    Ok(())
}

/// Fallback candidates for manual selection, seeding the collection first
/// if the initial read comes back empty.
pub async fn ensure_candidates(
    repo: &DynamoDbRepository,
    limit: usize,
) -> Result<Vec<DiseaseReference>, RepositoryError> {
    let candidates = repo.fallback_candidates(limit).await?;
    if !candidates.is_empty() {
        return Ok(candidates);
    }

    seed_if_empty(repo).await?;
    repo.fallback_candidates(limit).await
}
