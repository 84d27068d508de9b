use crate::errors::{ExtendedError, ExtendedResult};
use crate::size::DEFAULT_SIZE_THRESHOLD;
use crate::transform::DefaultSendTransform;

pub const ENV_QUEUE_URL: &str = "SPILLWAY_QUEUE_URL";
pub const ENV_BUCKET: &str = "SPILLWAY_BUCKET";
pub const ENV_KEY_PREFIX: &str = "SPILLWAY_KEY_PREFIX";
pub const ENV_SIZE_THRESHOLD: &str = "SPILLWAY_SIZE_THRESHOLD";
pub const ENV_ALWAYS_OFFLOAD: &str = "SPILLWAY_ALWAYS_OFFLOAD";
pub const ENV_RECEIPT_HANDLE_MARKERS: &str = "SPILLWAY_RECEIPT_HANDLE_MARKERS";

/// Settings shared by the extended producer and consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedConfig {
    pub queue_url: String,
    pub bucket: String,
    /// Prepended verbatim to generated object keys.
    pub key_prefix: String,
    pub size_threshold: usize,
    pub always_offload: bool,
    pub use_receipt_handle_markers: bool,
}

impl ExtendedConfig {
    pub fn new(queue_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            bucket: bucket.into(),
            key_prefix: String::new(),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            always_offload: false,
            use_receipt_handle_markers: true,
        }
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_size_threshold(mut self, size_threshold: usize) -> Self {
        self.size_threshold = size_threshold;
        self
    }

    pub fn with_always_offload(mut self, always_offload: bool) -> Self {
        self.always_offload = always_offload;
        self
    }

    pub fn with_receipt_handle_markers(mut self, enabled: bool) -> Self {
        self.use_receipt_handle_markers = enabled;
        self
    }

    pub fn validate(&self) -> ExtendedResult<()> {
        if self.queue_url.trim().is_empty() {
            return Err(ExtendedError::InvalidConfiguration(
                "queue_url must not be empty".to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(ExtendedError::InvalidConfiguration(
                "bucket must not be empty".to_string(),
            ));
        }
        if self.bucket.contains(')') {
            return Err(ExtendedError::InvalidConfiguration(format!(
                "bucket {:?} must not contain ')'",
                self.bucket
            )));
        }
        if self.key_prefix.contains(')') {
            return Err(ExtendedError::InvalidConfiguration(format!(
                "key_prefix {:?} must not contain ')'",
                self.key_prefix
            )));
        }
        if self.size_threshold == 0 {
            return Err(ExtendedError::InvalidConfiguration(
                "size_threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn send_transform(&self) -> DefaultSendTransform {
        DefaultSendTransform {
            always_offload: self.always_offload,
            threshold: self.size_threshold,
        }
    }

    pub fn from_env() -> ExtendedResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source; unset optional values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> ExtendedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| {
                ExtendedError::InvalidConfiguration(format!("{name} is not set"))
            })
        };

        let mut config = Self::new(required(ENV_QUEUE_URL)?, required(ENV_BUCKET)?);
        if let Some(prefix) = lookup(ENV_KEY_PREFIX) {
            config.key_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_SIZE_THRESHOLD) {
            config.size_threshold = raw.trim().parse().map_err(|_| {
                ExtendedError::InvalidConfiguration(format!(
                    "{ENV_SIZE_THRESHOLD} must be a byte count, got {raw:?}"
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_ALWAYS_OFFLOAD) {
            config.always_offload = parse_flag(ENV_ALWAYS_OFFLOAD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RECEIPT_HANDLE_MARKERS) {
            config.use_receipt_handle_markers = parse_flag(ENV_RECEIPT_HANDLE_MARKERS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(name: &str, raw: &str) -> ExtendedResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ExtendedError::InvalidConfiguration(format!(
            "{name} must be a boolean, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn extended_config_defaults_expected_baseline() {
        let config = ExtendedConfig::new("https://queue.example/q", "payloads");
        assert_eq!(config.key_prefix, "");
        assert_eq!(config.size_threshold, 262_144);
        assert!(!config.always_offload);
        assert!(config.use_receipt_handle_markers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_empty_bucket_expected_invalid_configuration() {
        let error = ExtendedConfig::new("https://queue.example/q", " ")
            .validate()
            .expect_err("empty bucket should fail");
        assert!(matches!(error, ExtendedError::InvalidConfiguration(_)));
    }

    #[test]
    fn validate_bucket_with_paren_expected_invalid_configuration() {
        let error = ExtendedConfig::new("https://queue.example/q", "pay)loads")
            .validate()
            .expect_err("bucket with ')' should fail");
        let ExtendedError::InvalidConfiguration(message) = error else {
            panic!("expected InvalidConfiguration");
        };
        assert!(message.contains("bucket"));
    }

    #[test]
    fn validate_key_prefix_with_paren_expected_invalid_configuration() {
        let error = ExtendedConfig::new("https://queue.example/q", "payloads")
            .with_key_prefix("archive(v2)/")
            .validate()
            .expect_err("key prefix with ')' should fail");
        let ExtendedError::InvalidConfiguration(message) = error else {
            panic!("expected InvalidConfiguration");
        };
        assert!(message.contains("key_prefix"));
    }

    #[test]
    fn validate_key_prefix_with_open_paren_only_expected_ok() {
        let config = ExtendedConfig::new("https://queue.example/q", "payloads")
            .with_key_prefix("archive(v2/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_zero_threshold_expected_invalid_configuration() {
        let error = ExtendedConfig::new("https://queue.example/q", "payloads")
            .with_size_threshold(0)
            .validate()
            .expect_err("zero threshold should fail");
        assert!(matches!(error, ExtendedError::InvalidConfiguration(_)));
    }

    #[test]
    fn from_lookup_all_fields_expected_overrides() {
        let config = ExtendedConfig::from_lookup(lookup_from(&[
            (ENV_QUEUE_URL, "https://queue.example/q"),
            (ENV_BUCKET, "payloads"),
            (ENV_KEY_PREFIX, "large/"),
            (ENV_SIZE_THRESHOLD, "1024"),
            (ENV_ALWAYS_OFFLOAD, "yes"),
            (ENV_RECEIPT_HANDLE_MARKERS, "false"),
        ]))
        .expect("config should load");

        assert_eq!(config.key_prefix, "large/");
        assert_eq!(config.size_threshold, 1024);
        assert!(config.always_offload);
        assert!(!config.use_receipt_handle_markers);
    }

    #[test]
    fn from_lookup_missing_bucket_expected_invalid_configuration() {
        let error = ExtendedConfig::from_lookup(lookup_from(&[(
            ENV_QUEUE_URL,
            "https://queue.example/q",
        )]))
        .expect_err("missing bucket should fail");
        assert!(error.to_string().contains(ENV_BUCKET));
    }

    #[test]
    fn from_lookup_bad_threshold_expected_invalid_configuration() {
        let error = ExtendedConfig::from_lookup(lookup_from(&[
            (ENV_QUEUE_URL, "https://queue.example/q"),
            (ENV_BUCKET, "payloads"),
            (ENV_SIZE_THRESHOLD, "lots"),
        ]))
        .expect_err("non-numeric threshold should fail");
        assert!(matches!(error, ExtendedError::InvalidConfiguration(_)));
    }
}
