//! DoctorMate AI: skin lesion classification and LLM-backed symptom analysis
//! behind a small HTTP API.
//!
//! The lesion classifier runs on ONNX Runtime, which is gated behind the
//! `onnx` feature so the rest of the crate builds and tests without fetching
//! the runtime binaries. A binary built without it refuses to start. Run the
//! service with:
//!
//! ```text
//! cargo run -p doctormate-service --features onnx
//! ```

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
