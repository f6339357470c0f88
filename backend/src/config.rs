use std::env;
use std::fmt;
use std::path::PathBuf;

use strum::{Display, EnumString};
use url::Url;

use crate::auth::BasicAuthConfig;
use crate::predictor::SamChoice;
use crate::predictor::segformer::{DEFAULT_HF_ENDPOINT, DEFAULT_HF_MODEL};
use crate::storage::LabelStudioFiles;
use crate::storage::credentials::{DEFAULT_CREDENTIALS_KEY, DEFAULT_METADATA_URL};
use crate::storage::signer::{DEFAULT_STORAGE_ENDPOINT, DEFAULT_STORAGE_REGION};

pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_SAM_PREDICTOR_URL: &str = "http://localhost:8000/predict";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} is set but {1} is not")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sam,
    Clothing,
}

#[derive(Clone)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub port: u16,
    pub sam_choice: SamChoice,
    pub sam_predictor_url: Url,
    pub hf_endpoint: Url,
    pub hf_model: String,
    pub hf_token: Option<String>,
    pub files: LabelStudioFiles,
    pub metadata_url: String,
    pub credentials_key: String,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub label_map_path: Option<PathBuf>,
    pub from_name: String,
    pub to_name: String,
    pub value_key: String,
    pub basic_auth: Option<BasicAuthConfig>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("port", &self.port)
            .field("sam_choice", &self.sam_choice)
            .field("sam_predictor_url", &self.sam_predictor_url.as_str())
            .field("hf_endpoint", &self.hf_endpoint.as_str())
            .field("hf_model", &self.hf_model)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "***"))
            .field("files", &self.files)
            .field("metadata_url", &self.metadata_url)
            .field("credentials_key", &self.credentials_key)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("storage_region", &self.storage_region)
            .field("label_map_path", &self.label_map_path)
            .field("from_name", &self.from_name)
            .field("to_name", &self.to_name)
            .field("value_key", &self.value_key)
            .field("basic_auth", &self.basic_auth)
            .finish()
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| invalid(name, value, e))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let backend = match get("ML_BACKEND") {
            Some(v) => v
                .to_lowercase()
                .parse()
                .map_err(|_| invalid("ML_BACKEND", &v, "expected 'sam' or 'clothing'"))?,
            None => BackendKind::default(),
        };

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|e| invalid("PORT", &v, e))?,
            None => DEFAULT_PORT,
        };

        let sam_choice = match get("SAM_CHOICE") {
            Some(v) => v
                .parse()
                .map_err(|_| invalid("SAM_CHOICE", &v, "expected 'MobileSAM' or 'SAM'"))?,
            None => SamChoice::default(),
        };

        let host = get("LABEL_STUDIO_HOST")
            .map(|v| parse_url("LABEL_STUDIO_HOST", &v))
            .transpose()?;

        let basic_auth = match (get("BASIC_AUTH_USER"), get("BASIC_AUTH_PASS")) {
            (Some(user), Some(password)) => Some(BasicAuthConfig { user, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Incomplete("BASIC_AUTH_USER", "BASIC_AUTH_PASS")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("BASIC_AUTH_PASS", "BASIC_AUTH_USER")),
        };

        Ok(Self {
            backend,
            port,
            sam_choice,
            sam_predictor_url: parse_url(
                "SAM_PREDICTOR_URL",
                &get_or("SAM_PREDICTOR_URL", DEFAULT_SAM_PREDICTOR_URL),
            )?,
            hf_endpoint: parse_url("HF_ENDPOINT", &get_or("HF_ENDPOINT", DEFAULT_HF_ENDPOINT))?,
            hf_model: get_or("HF_MODEL", DEFAULT_HF_MODEL),
            hf_token: get("HF_API_TOKEN"),
            files: LabelStudioFiles {
                host,
                access_token: get("LABEL_STUDIO_ACCESS_TOKEN"),
                document_root: get("LOCAL_FILES_DOCUMENT_ROOT").map(PathBuf::from),
            },
            metadata_url: get_or("METADATA_URL", DEFAULT_METADATA_URL),
            credentials_key: get_or("CREDENTIALS_METADATA_KEY", DEFAULT_CREDENTIALS_KEY),
            storage_endpoint: get_or("STORAGE_ENDPOINT", DEFAULT_STORAGE_ENDPOINT),
            storage_region: get_or("STORAGE_REGION", DEFAULT_STORAGE_REGION),
            label_map_path: get("LABEL_MAP_PATH").map(PathBuf::from),
            from_name: get_or("FROM_NAME", "tag"),
            to_name: get_or("TO_NAME", "image"),
            value_key: get_or("VALUE_KEY", "image"),
            basic_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend, BackendKind::Sam);
        assert_eq!(config.port, 9090);
        assert_eq!(config.sam_choice, SamChoice::MobileSam);
        assert_eq!(config.sam_predictor_url.as_str(), DEFAULT_SAM_PREDICTOR_URL);
        assert_eq!(config.hf_model, "mattmdjaga/segformer_b2_clothes");
        assert_eq!(config.storage_endpoint, "https://storage.googleapis.com");
        assert_eq!(config.credentials_key, "GOOGLE_APPLICATION_CREDENTIALS_BASE64");
        assert_eq!(
            (config.from_name.as_str(), config.to_name.as_str(), config.value_key.as_str()),
            ("tag", "image", "image")
        );
        assert!(config.files.host.is_none());
        assert!(config.basic_auth.is_none());
        assert!(config.label_map_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ML_BACKEND", "Clothing"),
            ("PORT", "8080"),
            ("SAM_CHOICE", "SAM"),
            ("LABEL_STUDIO_HOST", "http://localhost:8080"),
            ("LABEL_STUDIO_ACCESS_TOKEN", "secret"),
            ("LOCAL_FILES_DOCUMENT_ROOT", "/srv/files"),
            ("LABEL_MAP_PATH", "labels.yaml"),
            ("BASIC_AUTH_USER", "ls"),
            ("BASIC_AUTH_PASS", "pw"),
            ("HF_API_TOKEN", ""),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendKind::Clothing);
        assert_eq!(config.port, 8080);
        assert_eq!(config.sam_choice, SamChoice::Sam);
        assert_eq!(config.files.host.unwrap().as_str(), "http://localhost:8080/");
        assert_eq!(config.files.access_token.as_deref(), Some("secret"));
        assert_eq!(config.files.document_root, Some(PathBuf::from("/srv/files")));
        assert_eq!(config.label_map_path, Some(PathBuf::from("labels.yaml")));
        assert_eq!(config.basic_auth.unwrap().user, "ls");
        assert!(config.hf_token.is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config(&[
            ("LABEL_STUDIO_HOST", "http://localhost:8080"),
            ("LABEL_STUDIO_ACCESS_TOKEN", "ls-secret-token"),
            ("BASIC_AUTH_USER", "ls"),
            ("BASIC_AUTH_PASS", "basic-secret-pass"),
            ("HF_API_TOKEN", "hf-secret-token"),
        ])
        .unwrap();
        let debug = format!("{:?}", config);
        for secret in ["ls-secret-token", "basic-secret-pass", "hf-secret-token"] {
            assert!(!debug.contains(secret), "{} leaked", secret);
        }
        assert!(debug.contains("http://localhost:8080"));
        assert!(debug.contains("user: \"ls\""));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            config(&[("ML_BACKEND", "yolo")]),
            Err(ConfigError::Invalid { name: "ML_BACKEND", .. })
        ));
        assert!(matches!(
            config(&[("PORT", "ninety")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("SAM_PREDICTOR_URL", "not a url")]),
            Err(ConfigError::Invalid { name: "SAM_PREDICTOR_URL", .. })
        ));
        assert!(matches!(
            config(&[("BASIC_AUTH_USER", "ls")]),
            Err(ConfigError::Incomplete("BASIC_AUTH_USER", "BASIC_AUTH_PASS"))
        ));
    }
}
