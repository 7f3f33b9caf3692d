pub mod classifier;
pub mod knowledge_base;
pub mod metrics;
pub mod preprocess;
pub mod providers;
pub mod referral;
pub mod skin_analysis;
pub mod symptom_analysis;

pub use classifier::{load_classifier, ClassProbabilities, FixedClassifier, LesionClassifier};
pub use knowledge_base::KnowledgeBase;
pub use referral::DoctorMateClient;
pub use skin_analysis::SkinAnalysisService;
pub use symptom_analysis::{SymptomAnalysisError, SymptomAnalysisService};
