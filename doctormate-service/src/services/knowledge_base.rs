//! Static lesion reference data, keyed by class code.
//!
//! Loaded once at startup and shared read-only. Construction fails unless all
//! seven classes are present, so [`KnowledgeBase::lookup`] cannot miss.

use crate::models::{DiagnosisRecord, LesionClass, Severity};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const EMBEDDED_RULES: &str = include_str!("../../data/skin_rules.json");

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("Failed to read knowledge base at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid knowledge base document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Knowledge base has an entry for unknown class '{0}'")]
    UnknownClass(String),

    #[error("Knowledge base is missing class '{0}'")]
    MissingClass(LesionClass),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    description: String,
    severity: Severity,
    recommendations: Vec<String>,
    emergency_care: String,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    symptoms: Vec<String>,
    prognosis: String,
    #[serde(default)]
    treatment_options: Vec<String>,
}

impl RawRecord {
    fn into_record(self, code: LesionClass) -> DiagnosisRecord {
        DiagnosisRecord {
            code,
            name: self.name,
            description: self.description,
            severity: self.severity,
            recommendations: self.recommendations,
            emergency_care: self.emergency_care,
            risk_factors: self.risk_factors,
            symptoms: self.symptoms,
            prognosis: self.prognosis,
            treatment_options: self.treatment_options,
        }
    }
}

#[derive(Debug)]
pub struct KnowledgeBase {
    // Indexed by `LesionClass::index`.
    records: Vec<DiagnosisRecord>,
}

impl KnowledgeBase {
    /// The reference data compiled into the binary.
    pub fn embedded() -> Result<Self, KnowledgeBaseError> {
        Self::from_json(EMBEDDED_RULES)
    }

    pub fn from_path(path: &Path) -> Result<Self, KnowledgeBaseError> {
        let json = std::fs::read_to_string(path).map_err(|source| KnowledgeBaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from `path` when given, otherwise fall back to the embedded data.
    pub fn load(path: Option<&Path>) -> Result<Self, KnowledgeBaseError> {
        let kb = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded()?,
        };

        tracing::info!(
            source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "embedded".to_string()),
            classes = kb.records.len(),
            "Loaded skin lesion knowledge base"
        );

        Ok(kb)
    }

    pub fn from_json(json: &str) -> Result<Self, KnowledgeBaseError> {
        let raw: HashMap<String, RawRecord> = serde_json::from_str(json)?;

        let mut by_class = HashMap::with_capacity(raw.len());
        for (code, record) in raw {
            let class: LesionClass = code
                .parse()
                .map_err(|_| KnowledgeBaseError::UnknownClass(code.clone()))?;
            by_class.insert(class, record);
        }

        let records = LesionClass::ALL
            .iter()
            .map(|class| {
                by_class
                    .remove(class)
                    .map(|raw| raw.into_record(*class))
                    .ok_or(KnowledgeBaseError::MissingClass(*class))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { records })
    }

    pub fn lookup(&self, class: LesionClass) -> &DiagnosisRecord {
        &self.records[class.index()]
    }
}
