//! Skin lesion analysis: preprocess → classify → pick top class → enrich.

use super::classifier::{ClassProbabilities, LesionClassifier};
use super::knowledge_base::KnowledgeBase;
use super::metrics;
use super::preprocess::preprocess_image;
use crate::models::{AdditionalInfo, Assessment, Confidence, SkinAnalysis, SKIN_DISCLAIMER};
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct SkinAnalysisService {
    classifier: Arc<dyn LesionClassifier>,
    knowledge_base: Arc<KnowledgeBase>,
    input_size: u32,
}

impl SkinAnalysisService {
    pub fn new(
        classifier: Arc<dyn LesionClassifier>,
        knowledge_base: Arc<KnowledgeBase>,
        input_size: u32,
    ) -> Self {
        Self {
            classifier,
            knowledge_base,
            input_size,
        }
    }

    /// Classify raw image bytes and build the response payload.
    ///
    /// Decoding and inference run on the blocking pool.
    #[tracing::instrument(skip(self, image), fields(bytes = image.len(), backend = self.classifier.name()))]
    pub async fn analyze(&self, image: Vec<u8>) -> Result<SkinAnalysis, AppError> {
        let classifier = Arc::clone(&self.classifier);
        let input_size = self.input_size;
        let start = Instant::now();

        let probabilities = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
            let tensor = preprocess_image(&image, input_size)?;
            Ok(classifier.classify(&tensor)?)
        })
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Inference task failed: {}", e)))??;

        let analysis = self.assemble(&probabilities);

        metrics::record_skin_prediction(analysis.additional_info.diagnosis_code, start.elapsed());
        tracing::info!(
            diagnosis = %analysis.additional_info.diagnosis_code,
            confidence = analysis.assessment.confidence.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Skin lesion classified"
        );

        Ok(analysis)
    }

    /// Map a probability distribution onto the knowledge base entry of its
    /// top class.
    pub fn assemble(&self, probabilities: &ClassProbabilities) -> SkinAnalysis {
        let (top_class, top_probability) = probabilities.top();
        let record = self.knowledge_base.lookup(top_class);

        let all_probabilities: BTreeMap<_, _> = probabilities
            .iter()
            .map(|(class, p)| (class, to_percent_one_decimal(p)))
            .collect();

        SkinAnalysis {
            assessment: Assessment {
                possible_diagnosis: record.name.clone(),
                confidence: Confidence::from_fraction(top_probability),
                severity: record.severity,
                description: record.description.clone(),
                recommendations: record.recommendations.clone(),
                emergency_care: record.emergency_care.clone(),
                disclaimer: SKIN_DISCLAIMER.to_string(),
            },
            additional_info: AdditionalInfo {
                diagnosis_code: top_class,
                risk_factors: record.risk_factors.clone(),
                symptoms: record.symptoms.clone(),
                prognosis: record.prognosis.clone(),
                treatment_options: record.treatment_options.clone(),
                all_probabilities,
            },
            referral: None,
        }
    }
}

fn to_percent_one_decimal(probability: f32) -> f64 {
    if !probability.is_finite() {
        return 0.0;
    }
    (f64::from(probability) * 1000.0).round() / 10.0
}
