//! Response payloads for the analysis endpoints.
//!
//! Both endpoints share the [`Assessment`] fields. Skin results add
//! `additional_info`; either may carry a [`Referral`] when the caller is
//! authenticated against the DoctorMate directory.

use super::diagnosis::{Confidence, LesionClass, Severity};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const SKIN_DISCLAIMER: &str = "This is an AI-generated assessment and not a substitute for professional medical advice. Please consult a dermatologist for proper diagnosis and treatment.";

pub const SYMPTOM_DISCLAIMER: &str = "This is an AI-generated assessment and not a substitute for professional medical advice. Please consult a healthcare provider for proper diagnosis and treatment.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub possible_diagnosis: String,
    pub confidence: Confidence,
    pub severity: Severity,
    pub description: String,
    pub recommendations: Vec<String>,
    pub emergency_care: String,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalInfo {
    pub diagnosis_code: LesionClass,
    pub risk_factors: Vec<String>,
    pub symptoms: Vec<String>,
    pub prognosis: String,
    pub treatment_options: Vec<String>,
    /// Percentage per class, one decimal place.
    pub all_probabilities: BTreeMap<LesionClass, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinAnalysis {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub additional_info: AdditionalInfo,
    #[serde(flatten)]
    pub referral: Option<Referral>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomAnalysis {
    #[serde(flatten)]
    pub assessment: Assessment,
    #[serde(flatten)]
    pub referral: Option<Referral>,
}

/// Payload carried in a successful envelope. Serialized untagged so the
/// wire shape is exactly the variant's own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Skin(SkinAnalysis),
    Symptom(SymptomAnalysis),
}

impl AnalysisPayload {
    pub fn set_referral(&mut self, referral: Referral) {
        match self {
            AnalysisPayload::Skin(skin) => skin.referral = Some(referral),
            AnalysisPayload::Symptom(symptom) => symptom.referral = Some(referral),
        }
    }
}

impl From<SkinAnalysis> for AnalysisPayload {
    fn from(value: SkinAnalysis) -> Self {
        AnalysisPayload::Skin(value)
    }
}

impl From<SymptomAnalysis> for AnalysisPayload {
    fn from(value: SymptomAnalysis) -> Self {
        AnalysisPayload::Symptom(value)
    }
}

/// Specialty and doctors suggested for a diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Referral {
    pub specialty: Option<Specialty>,
    pub recommended_doctors: Vec<Doctor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub consultation_fee: Option<serde_json::Value>,
    #[serde(default)]
    pub address: Option<serde_json::Value>,
    #[serde(default)]
    pub working_time: Option<serde_json::Value>,
    #[serde(default)]
    pub qualifications: Option<serde_json::Value>,
}

/// Directory ids arrive as either strings or numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assessment() -> Assessment {
        Assessment {
            possible_diagnosis: "Tension headache".to_string(),
            confidence: Confidence::from_percent(70.0).unwrap(),
            severity: Severity::Mild,
            description: "Common headache".to_string(),
            recommendations: vec!["Rest".to_string()],
            emergency_care: "Seek care if sudden and severe".to_string(),
            disclaimer: SYMPTOM_DISCLAIMER.to_string(),
        }
    }

    #[test]
    fn symptom_payload_has_no_additional_info_or_referral_by_default() {
        let payload = AnalysisPayload::from(SymptomAnalysis {
            assessment: assessment(),
            referral: None,
        });
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["possible_diagnosis"], "Tension headache");
        assert_eq!(value["confidence"], 70);
        assert_eq!(value["severity"], "Mild");
        assert!(value.get("additional_info").is_none());
        assert!(value.get("specialty").is_none());
        assert!(value.get("recommended_doctors").is_none());
    }

    #[test]
    fn referral_fields_flatten_into_payload() {
        let mut payload = AnalysisPayload::from(SymptomAnalysis {
            assessment: assessment(),
            referral: None,
        });
        payload.set_referral(Referral {
            specialty: Some(Specialty {
                id: "n-1".to_string(),
                name: Some("Neurology".to_string()),
                description: None,
                image_url: None,
            }),
            recommended_doctors: vec![],
        });

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["specialty"]["name"], "Neurology");
        assert_eq!(value["specialty"]["imageUrl"], json!(null));
        assert_eq!(value["recommended_doctors"], json!([]));
    }

    #[test]
    fn probabilities_serialize_keyed_by_code() {
        let mut all = BTreeMap::new();
        all.insert(LesionClass::Nv, 95.0);
        all.insert(LesionClass::Mel, 2.5);

        let info = AdditionalInfo {
            diagnosis_code: LesionClass::Nv,
            risk_factors: vec![],
            symptoms: vec![],
            prognosis: String::new(),
            treatment_options: vec![],
            all_probabilities: all,
        };
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["diagnosis_code"], "nv");
        assert_eq!(value["all_probabilities"], json!({"mel": 2.5, "nv": 95.0}));
    }

    #[test]
    fn directory_ids_accept_numbers() {
        let doctor: Doctor =
            serde_json::from_value(json!({"id": 42, "fullName": "Dr. Numeric"})).unwrap();
        assert_eq!(doctor.id, "42");

        let specialty: Specialty = serde_json::from_value(json!({"id": "s-1"})).unwrap();
        assert_eq!(specialty.id, "s-1");

        assert!(serde_json::from_value::<Doctor>(json!({"id": null})).is_err());
    }
}
