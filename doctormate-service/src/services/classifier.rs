//! Lesion classifier abstraction.
//!
//! The production implementation wraps an ONNX Runtime session (behind the
//! `onnx` feature). [`FixedClassifier`] returns a preset distribution and is
//! used in tests and local development.

use super::preprocess::ImageTensor;
use crate::models::LesionClass;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to initialise model: {0}")]
    ModelInit(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ModelNotFound(_)
            | ClassifierError::Unavailable(_)
            | ClassifierError::ModelInit(_) => {
                tracing::error!(error = %err, "Classifier not available");
                AppError::ServiceUnavailable
            }
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Per-class probabilities in model output order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities([f32; LesionClass::COUNT]);

impl ClassProbabilities {
    pub fn new(values: [f32; LesionClass::COUNT]) -> Self {
        Self(values)
    }

    /// Build from a raw output slice. The slice must hold exactly one value
    /// per class.
    pub fn from_slice(values: &[f32]) -> Result<Self, ClassifierError> {
        let array: [f32; LesionClass::COUNT] = values.try_into().map_err(|_| {
            ClassifierError::UnexpectedOutput(format!(
                "expected {} class scores, got {}",
                LesionClass::COUNT,
                values.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn get(&self, class: LesionClass) -> f32 {
        self.0[class.index()]
    }

    /// Highest-probability class.
    ///
    /// Ties resolve to the lowest class index; NaN scores never win.
    pub fn top(&self) -> (LesionClass, f32) {
        let mut best = (LesionClass::ALL[0], f32::NEG_INFINITY);
        for class in LesionClass::ALL {
            let score = self.0[class.index()];
            if score > best.1 {
                best = (class, score);
            }
        }
        if best.1 == f32::NEG_INFINITY {
            best.1 = 0.0;
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (LesionClass, f32)> + '_ {
        LesionClass::ALL.iter().map(|class| (*class, self.0[class.index()]))
    }
}

/// Runs a pretrained classifier over a preprocessed image.
///
/// Implementations are deterministic for a given input and weights and are
/// shared across requests, hence `Send + Sync`. `classify` is CPU-bound and
/// should be called from a blocking context.
pub trait LesionClassifier: Send + Sync {
    fn classify(&self, input: &ImageTensor) -> Result<ClassProbabilities, ClassifierError>;

    /// Short backend name, used in logs and metrics.
    fn name(&self) -> &str;
}

/// Load the production classifier from `model_path`.
///
/// Fails when the artifact is missing, cannot be loaded, or the service was
/// built without the `onnx` feature.
pub fn load_classifier(
    model_path: &Path,
    intra_threads: usize,
) -> Result<Box<dyn LesionClassifier>, ClassifierError> {
    #[cfg(feature = "onnx")]
    {
        let classifier = onnx::OnnxLesionClassifier::load(model_path, intra_threads)?;
        Ok(Box::new(classifier))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = intra_threads;
        Err(ClassifierError::Unavailable(format!(
            "cannot load {}: built without the `onnx` feature, rebuild with `--features onnx`",
            model_path.display()
        )))
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use super::{ClassProbabilities, ClassifierError, ImageTensor, LesionClassifier};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// ONNX Runtime backed classifier.
    ///
    /// `Session::run` needs `&mut self`, so the session sits behind a mutex
    /// while the trait exposes `&self`.
    pub struct OnnxLesionClassifier {
        session: Mutex<Session>,
    }

    impl OnnxLesionClassifier {
        pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, ClassifierError> {
            if !model_path.exists() {
                return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .with_intra_threads(intra_threads)
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e: ort::Error| {
                    ClassifierError::ModelInit(format!("ONNX load failed: {e}"))
                })?;

            tracing::info!(model = %model_path.display(), "ONNX lesion classifier loaded");

            Ok(Self {
                session: Mutex::new(session),
            })
        }
    }

    impl LesionClassifier for OnnxLesionClassifier {
        fn classify(&self, input: &ImageTensor) -> Result<ClassProbabilities, ClassifierError> {
            use ort::value::TensorRef;

            let view = input.view();
            let tensor = TensorRef::from_array_view(&view)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

            // Output shape: [1, 7]
            let (shape, scores) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::UnexpectedOutput(format!("{e}")))?;

            tracing::trace!(shape = ?shape, "Classifier output");

            ClassProbabilities::from_slice(scores)
        }

        fn name(&self) -> &str {
            "onnx"
        }
    }
}

/// Returns the same distribution for every input.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    probabilities: ClassProbabilities,
}

impl FixedClassifier {
    pub fn new(probabilities: ClassProbabilities) -> Self {
        Self { probabilities }
    }

    /// `probability` on `class`, the remainder spread evenly over the others.
    pub fn confident(class: LesionClass, probability: f32) -> Self {
        let rest = (1.0 - probability) / (LesionClass::COUNT as f32 - 1.0);
        let mut values = [rest; LesionClass::COUNT];
        values[class.index()] = probability;
        Self::new(ClassProbabilities::new(values))
    }
}

impl LesionClassifier for FixedClassifier {
    fn classify(&self, _input: &ImageTensor) -> Result<ClassProbabilities, ClassifierError> {
        Ok(self.probabilities)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
