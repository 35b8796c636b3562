use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Hosted inference endpoint used when `INFERENCE_BASE_URL` is not provided.
pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";
/// Extractive question-answering model used when `QA_MODEL` is not provided.
pub const DEFAULT_QA_MODEL: &str = "distilbert/distilbert-base-cased-distilled-squad";
/// Abstractive summarization model used with the Hugging Face provider by default.
pub const DEFAULT_HF_SUMMARIZATION_MODEL: &str = "sshleifer/distilbart-cnn-12-6";
/// Summarization model used with the Ollama provider by default.
pub const DEFAULT_OLLAMA_SUMMARIZATION_MODEL: &str = "llama3.2";
/// Local Ollama runtime address.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const DEFAULT_SUMMARY_CHUNK_SIZE: usize = 1000;
const DEFAULT_SUMMARY_MAX_LENGTH: usize = 130;
const DEFAULT_SUMMARY_MIN_LENGTH: usize = 30;
const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the medsum services.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the inference endpoint serving the QA and summarization models.
    pub inference_base_url: String,
    /// Optional bearer token sent to the inference endpoint.
    pub inference_api_token: Option<String>,
    /// Extractive question-answering model identifier.
    pub qa_model: String,
    /// Backend that produces abstractive summaries.
    pub summarization_provider: SummarizationProvider,
    /// Summarization model identifier passed to the provider.
    pub summarization_model: String,
    /// Base URL of the Ollama runtime (used when the provider is `ollama`).
    pub ollama_url: String,
    /// Window size, in characters, used to split documents before summarization.
    pub summary_chunk_size: usize,
    /// Upper bound on the generated length of each chunk summary.
    pub summary_max_length: usize,
    /// Lower bound on the generated length of each chunk summary.
    pub summary_min_length: usize,
    /// Lower `min_length` for chunks too short to satisfy it, and skip blank chunks.
    pub summary_clamp_min_length: bool,
    /// Maximum accepted upload size for the HTTP surface.
    pub upload_limit_bytes: usize,
    /// Seconds an HTTP session may sit unused before it is evicted; `0` keeps sessions forever.
    pub session_idle_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported abstractive summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Hugging Face style inference endpoint (`/models/{model}`).
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value.parse().map_err(|()| {
                ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
            })?,
            None => SummarizationProvider::HuggingFace,
        };
        let summarization_model = load_env_optional("SUMMARIZATION_MODEL").unwrap_or_else(|| {
            match summarization_provider {
                SummarizationProvider::HuggingFace => DEFAULT_HF_SUMMARIZATION_MODEL.to_string(),
                SummarizationProvider::Ollama => DEFAULT_OLLAMA_SUMMARIZATION_MODEL.to_string(),
            }
        });

        let summary_chunk_size =
            load_parsed("SUMMARY_CHUNK_SIZE")?.unwrap_or(DEFAULT_SUMMARY_CHUNK_SIZE);
        if summary_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CHUNK_SIZE".into()));
        }
        let summary_max_length =
            load_parsed("SUMMARY_MAX_LENGTH")?.unwrap_or(DEFAULT_SUMMARY_MAX_LENGTH);
        let summary_min_length =
            load_parsed("SUMMARY_MIN_LENGTH")?.unwrap_or(DEFAULT_SUMMARY_MIN_LENGTH);
        if summary_min_length > summary_max_length {
            return Err(ConfigError::InvalidValue("SUMMARY_MIN_LENGTH".into()));
        }

        Ok(Self {
            inference_base_url: load_env_optional("INFERENCE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_INFERENCE_BASE_URL.to_string()),
            inference_api_token: load_env_optional("INFERENCE_API_TOKEN"),
            qa_model: load_env_optional("QA_MODEL").unwrap_or_else(|| DEFAULT_QA_MODEL.to_string()),
            summarization_provider,
            summarization_model,
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            summary_chunk_size,
            summary_max_length,
            summary_min_length,
            summary_clamp_min_length: load_bool("SUMMARY_CLAMP_MIN_LENGTH")?.unwrap_or(true),
            upload_limit_bytes: load_parsed("UPLOAD_LIMIT_BYTES")?
                .unwrap_or(DEFAULT_UPLOAD_LIMIT_BYTES),
            session_idle_secs: load_parsed("SESSION_IDLE_SECS")?
                .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            server_port: load_parsed("SERVER_PORT")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference_base_url: DEFAULT_INFERENCE_BASE_URL.to_string(),
            inference_api_token: None,
            qa_model: DEFAULT_QA_MODEL.to_string(),
            summarization_provider: SummarizationProvider::HuggingFace,
            summarization_model: DEFAULT_HF_SUMMARIZATION_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            summary_chunk_size: DEFAULT_SUMMARY_CHUNK_SIZE,
            summary_max_length: DEFAULT_SUMMARY_MAX_LENGTH,
            summary_min_length: DEFAULT_SUMMARY_MIN_LENGTH,
            summary_clamp_min_length: true,
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            server_port: None,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn load_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        inference_base_url = %config.inference_base_url,
        qa_model = %config.qa_model,
        summarization_provider = ?config.summarization_provider,
        summarization_model = %config.summarization_model,
        summary_chunk_size = config.summary_chunk_size,
        session_idle_secs = config.session_idle_secs,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!(
            "HuggingFace".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::HuggingFace)
        );
        assert_eq!(
            " ollama ".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::Ollama)
        );
        assert!("openai".parse::<SummarizationProvider>().is_err());
    }

    #[test]
    fn defaults_match_reference_pipeline() {
        let config = Config::default();
        assert_eq!(config.summary_chunk_size, 1000);
        assert_eq!(config.summary_max_length, 130);
        assert_eq!(config.summary_min_length, 30);
        assert!(config.summary_clamp_min_length);
        assert_eq!(config.session_idle_secs, 1800);
    }

    #[test]
    fn unparsable_values_are_invalid_and_absent_values_are_defaults() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("MEDSUM_TEST_BAD_SECS", "soon") };
        let error = load_parsed::<u64>("MEDSUM_TEST_BAD_SECS").unwrap_err();
        assert!(
            matches!(error, ConfigError::InvalidValue(key) if key == "MEDSUM_TEST_BAD_SECS")
        );

        assert_eq!(load_parsed::<u64>("MEDSUM_TEST_UNSET_SECS").unwrap(), None);
    }
}
