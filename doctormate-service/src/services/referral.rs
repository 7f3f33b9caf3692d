//! Specialty and doctor suggestions from the DoctorMate directory API.
//!
//! Enrichment is best effort: upstream failures are logged and produce an
//! empty [`Referral`], never a failed analysis.

use crate::config::DoctorMateApiConfig;
use crate::models::{Doctor, LesionClass, Referral, Specialty};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use service_core::observability::PropagateTrace;
use std::time::Duration;
use thiserror::Error;

pub const DERMATOLOGY: &str = "b2222222-b2b2-b2b2-b2b2-b2b2b2b2b2b2";
pub const CARDIOLOGY: &str = "a1111111-a1a1-a1a1-a1a1-a1a1a1a1a1a1";
pub const NEUROLOGY: &str = "5b05c49a-288f-48f3-b684-6d505c58d276";
pub const PEDIATRICS: &str = "bb79c512-c722-4e5a-a1fc-c9699359b636";
pub const GENERAL: &str = "fa12fdd9-0a6a-4330-814c-17fd31fbd637";

/// Checked in order; the first matching keyword decides.
const SYMPTOM_KEYWORDS: &[(&[&str], &str)] = &[
    (&["heart", "chest pain", "palpitation", "cardiac"], CARDIOLOGY),
    (
        &["brain", "headache", "seizure", "neurological", "nerve"],
        NEUROLOGY,
    ),
    (
        &["skin", "rash", "acne", "eczema", "dermatological"],
        DERMATOLOGY,
    ),
    (&["child", "infant", "pediatric", "baby"], PEDIATRICS),
];

/// Every lesion class is seen by dermatology.
pub fn specialty_for_lesion(_class: LesionClass) -> &'static str {
    DERMATOLOGY
}

pub fn specialty_for_symptoms(symptoms: &str, diagnosis: &str) -> &'static str {
    let combined = format!("{} {}", symptoms, diagnosis).to_lowercase();

    SYMPTOM_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| combined.contains(k)))
        .map(|(_, specialty)| *specialty)
        .unwrap_or(GENERAL)
}

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("DoctorMate API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DoctorMate API returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, Deserialize)]
struct SpecialtiesResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DoctorsResponse {
    #[serde(default)]
    data: Option<DoctorsPage>,
}

#[derive(Debug, Deserialize)]
struct DoctorsPage {
    #[serde(default)]
    doctors: Vec<serde_json::Value>,
}

/// Decode each directory entry on its own, skipping the malformed ones.
fn parse_entries<T: DeserializeOwned>(
    entries: Vec<serde_json::Value>,
    kind: &'static str,
) -> impl Iterator<Item = T> {
    entries
        .into_iter()
        .filter_map(move |raw| match serde_json::from_value::<T>(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, kind, "Skipping malformed directory entry");
                None
            }
        })
}

/// HTTP client for the DoctorMate directory.
#[derive(Clone)]
pub struct DoctorMateClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    doctor_limit: usize,
}

impl DoctorMateClient {
    pub fn new(config: &DoctorMateApiConfig) -> Result<Self, ReferralError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            doctor_limit: config.doctor_limit,
        })
    }

    /// Look up one specialty by id. `None` when the directory has no entry.
    pub async fn specialty(
        &self,
        specialty_id: &str,
        token: &str,
    ) -> Result<Option<Specialty>, ReferralError> {
        let url = format!("{}/Specialties", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(self.timeout)
            .propagate_trace()
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReferralError::Status(response.status()));
        }

        let body: SpecialtiesResponse = response.json().await?;
        let mut specialties = parse_entries::<Specialty>(body.data, "specialty");
        Ok(specialties.find(|s| s.id == specialty_id))
    }

    /// First `limit` doctors listed under a specialty.
    pub async fn recommended_doctors(
        &self,
        specialty_id: &str,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Doctor>, ReferralError> {
        let url = format!("{}/Specialties/{}/doctors", self.base_url, specialty_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("page", 1), ("limit", limit)])
            .timeout(self.timeout)
            .propagate_trace()
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReferralError::Status(response.status()));
        }

        let body: DoctorsResponse = response.json().await?;
        let entries = body.data.map(|page| page.doctors).unwrap_or_default();
        let doctors = parse_entries::<Doctor>(entries, "doctor")
            .take(limit)
            .collect();

        Ok(doctors)
    }

    /// Specialty plus recommended doctors. Never fails: each half falls back
    /// to empty on error.
    #[tracing::instrument(skip(self, token))]
    pub async fn referral_for(&self, specialty_id: &str, token: &str) -> Referral {
        let (specialty, doctors) = tokio::join!(
            self.specialty(specialty_id, token),
            self.recommended_doctors(specialty_id, token, self.doctor_limit),
        );

        let specialty = specialty.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch specialty");
            None
        });
        let recommended_doctors = doctors.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch recommended doctors");
            Vec::new()
        });

        Referral {
            specialty,
            recommended_doctors,
        }
    }
}
