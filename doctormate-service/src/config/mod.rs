use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MODEL_PATH: &str = "models/MobileNetV2_best.onnx";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DOCTORMATE_API_URL: &str = "https://doctormate.runasp.net/api";

/// Default upload limit (10MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct DoctormateConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub classifier: ClassifierConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub gemini: GeminiSettings,
    pub doctormate_api: DoctorMateApiConfig,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    /// Edge of the square model input.
    pub input_size: u32,
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// External rules file. The embedded copy is used when unset.
    pub rules_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl GeminiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorMateApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub doctor_limit: usize,
}

impl DoctorMateApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DoctorMateApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DOCTORMATE_API_URL.to_string(),
            timeout_secs: 10,
            doctor_limit: 3,
        }
    }
}

impl DoctormateConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the service settings from `lookup`, layered over `common`.
    ///
    /// With `ENVIRONMENT=prod` every key must be set; elsewhere the defaults
    /// apply. `GEMINI_API_KEY` has no default.
    pub fn from_lookup<F>(mut common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        if common.otlp_endpoint.is_none() {
            common.otlp_endpoint = lookup("OTLP_ENDPOINT").filter(|v| !v.trim().is_empty());
        }

        Ok(DoctormateConfig {
            common,
            classifier: ClassifierConfig {
                model_path: PathBuf::from(get("SKIN_MODEL_PATH", Some(DEFAULT_MODEL_PATH))?),
                input_size: parse_nonzero("SKIN_MODEL_INPUT_SIZE", get("SKIN_MODEL_INPUT_SIZE", Some("224"))?)?,
                intra_threads: parse_nonzero("SKIN_MODEL_THREADS", get("SKIN_MODEL_THREADS", Some("2"))?)?,
            },
            knowledge_base: KnowledgeBaseConfig {
                rules_path: lookup("SKIN_RULES_PATH")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
            },
            gemini: GeminiSettings {
                api_key: get("GEMINI_API_KEY", None)?,
                model: get("GEMINI_MODEL", Some(DEFAULT_GEMINI_MODEL))?,
                api_base: get("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE))?,
                temperature: parse("GEMINI_TEMPERATURE", get("GEMINI_TEMPERATURE", Some("0.3"))?)?,
                timeout_secs: parse_nonzero("GEMINI_TIMEOUT_SECS", get("GEMINI_TIMEOUT_SECS", Some("30"))?)?,
            },
            doctormate_api: DoctorMateApiConfig {
                base_url: get("DOCTORMATE_API_URL", Some(DEFAULT_DOCTORMATE_API_URL))?,
                timeout_secs: parse_nonzero(
                    "DOCTORMATE_API_TIMEOUT_SECS",
                    get("DOCTORMATE_API_TIMEOUT_SECS", Some("10"))?,
                )?,
                doctor_limit: parse_nonzero(
                    "DOCTORMATE_DOCTOR_LIMIT",
                    get("DOCTORMATE_DOCTOR_LIMIT", Some("3"))?,
                )?,
            },
            max_upload_bytes: parse_nonzero(
                "MAX_UPLOAD_BYTES",
                get("MAX_UPLOAD_BYTES", Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()))?,
            )?,
        })
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse<T>(key: &str, raw: String) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e))
    })
}

/// Sizes, limits and timeouts where zero would disable the feature outright.
fn parse_nonzero<T>(key: &str, raw: String) -> Result<T, AppError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let value: T = parse(key, raw)?;
    if value == T::default() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be greater than zero",
            key
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DoctormateConfig, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DoctormateConfig::from_lookup(core_config::Config::default(), move |key| {
            map.get(key).cloned()
        })
    }

    #[test]
    fn defaults_apply_outside_prod() {
        let config = load(&[("GEMINI_API_KEY", "k")]).unwrap();

        assert_eq!(config.classifier.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.classifier.input_size, 224);
        assert_eq!(config.classifier.intra_threads, 2);
        assert!(config.knowledge_base.rules_path.is_none());
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert!((config.gemini.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.gemini.timeout(), Duration::from_secs(30));
        assert_eq!(config.doctormate_api.base_url, DEFAULT_DOCTORMATE_API_URL);
        assert_eq!(config.doctormate_api.doctor_limit, 3);
        assert_eq!(config.max_upload_bytes, 10_485_760);
    }

    #[test]
    fn api_key_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn prod_requires_every_key() {
        let err = load(&[("ENVIRONMENT", "prod"), ("GEMINI_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_TIMEOUT_SECS", "5"),
            ("SKIN_MODEL_INPUT_SIZE", "160"),
            ("SKIN_RULES_PATH", "/etc/doctormate/rules.json"),
            ("OTLP_ENDPOINT", "http://collector:4317"),
        ])
        .unwrap();

        assert_eq!(config.gemini.timeout(), Duration::from_secs(5));
        assert_eq!(config.classifier.input_size, 160);
        assert_eq!(
            config.knowledge_base.rules_path,
            Some(PathBuf::from("/etc/doctormate/rules.json"))
        );
        assert_eq!(config.common.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = load(&[("GEMINI_API_KEY", "k"), ("GEMINI_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn zero_sizes_and_timeouts_are_rejected() {
        for key in [
            "GEMINI_TIMEOUT_SECS",
            "SKIN_MODEL_INPUT_SIZE",
            "SKIN_MODEL_THREADS",
            "DOCTORMATE_API_TIMEOUT_SECS",
            "DOCTORMATE_DOCTOR_LIMIT",
            "MAX_UPLOAD_BYTES",
        ] {
            let err = load(&[("GEMINI_API_KEY", "k"), (key, "0")]).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{} accepted zero", key);
            assert!(err.to_string().contains(key));
        }
    }
}
