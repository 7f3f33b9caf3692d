//! Domain models for the DoctorMate service.

pub mod analysis;
pub mod diagnosis;
pub mod request;

pub use analysis::{
    AdditionalInfo, AnalysisPayload, Assessment, Doctor, Referral, SkinAnalysis, Specialty,
    SymptomAnalysis, SKIN_DISCLAIMER, SYMPTOM_DISCLAIMER,
};
pub use diagnosis::{Confidence, DiagnosisRecord, LesionClass, Severity};
pub use request::SymptomsRequest;
