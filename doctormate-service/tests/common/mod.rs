#![allow(dead_code)]

use doctormate_service::config::DoctormateConfig;
use doctormate_service::models::LesionClass;
use doctormate_service::services::providers::mock::MockTextProvider;
use doctormate_service::services::{FixedClassifier, KnowledgeBase, LesionClassifier};
use doctormate_service::{AppState, Application};
use image::{ImageFormat, Rgb, RgbImage};
use service_core::config::Config;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

pub const VALID_ASSESSMENT: &str = r#"{
    "possible_diagnosis": "Migraine",
    "confidence": 78,
    "severity": "Moderate",
    "description": "Recurring throbbing headache with light sensitivity.",
    "recommendations": ["Rest in a dark room", "Stay hydrated"],
    "emergency_care": "Seek urgent care for sudden, severe headache or vision loss.",
    "disclaimer": "model supplied text"
}"#;

pub struct TestAppOptions {
    pub classifier: Arc<dyn LesionClassifier>,
    pub provider: Arc<MockTextProvider>,
    pub llm_timeout_secs: u64,
    pub doctormate_url: String,
    pub max_upload_bytes: usize,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            classifier: Arc::new(FixedClassifier::confident(LesionClass::Nv, 0.95)),
            provider: Arc::new(MockTextProvider::responding(VALID_ASSESSMENT)),
            llm_timeout_secs: 5,
            // Nothing listens here; referral calls fail fast
            doctormate_url: "http://127.0.0.1:9/api".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub provider: Arc<MockTextProvider>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestAppOptions::default()).await
    }

    pub async fn spawn_with(options: TestAppOptions) -> Self {
        let vars: HashMap<&str, String> = HashMap::from([
            ("GEMINI_API_KEY", "test-key".to_string()),
            ("GEMINI_TIMEOUT_SECS", options.llm_timeout_secs.to_string()),
            ("DOCTORMATE_API_URL", options.doctormate_url.clone()),
            ("DOCTORMATE_API_TIMEOUT_SECS", "2".to_string()),
            ("SKIN_MODEL_INPUT_SIZE", "32".to_string()),
            ("MAX_UPLOAD_BYTES", options.max_upload_bytes.to_string()),
        ]);
        let common = Config {
            port: 0,
            ..Config::default()
        };
        let config = DoctormateConfig::from_lookup(common, |key| vars.get(key).cloned())
            .expect("Failed to build test config");

        let state = AppState::new(
            config,
            options.classifier,
            Arc::new(KnowledgeBase::embedded().expect("embedded knowledge base")),
            options.provider.clone(),
        )
        .expect("Failed to build app state");

        let app = Application::with_state(state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        tokio::spawn(async move {
            app.run_until_stopped(std::future::pending()).await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
            provider: options.provider,
        }
    }

    pub async fn post_image(&self, bytes: Vec<u8>, token: Option<&str>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("lesion.png")
            .mime_str("image/png")
            .expect("valid mime");
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .client
            .post(format!("{}/ai/skin/check", self.address))
            .multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn post_symptoms(
        &self,
        body: serde_json::Value,
        token: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}/ai/symptoms/check", self.address))
            .json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Rgb([190, 140, 120]))
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}
