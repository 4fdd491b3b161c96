use std::path::Path;

use crate::config::schema::EngineConfig;
use crate::config::selectors::validate_overrides;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let base_url = config.target.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "target.base_url must not be empty".to_string(),
        });
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("target.base_url must be an http(s) URL: {}", base_url),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be greater than 0".to_string(),
        });
    }

    if config.timings.modal_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "timings.modal_attempts must be at least 1".to_string(),
        });
    }

    validate_overrides(&config.selectors)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateDeliveryPolicy;
    use std::io::Write;

    const MINIMAL: &str = r#"
version: "1.0"
target:
  base_url: "https://erp.example.com"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.target.login_path, "/Account/Login");
        assert_eq!(config.timings.navigation_timeout_ms, 60_000);
        assert_eq!(config.duplicate_delivery, DuplicateDeliveryPolicy::SkipTerminal);
        assert!(config.worker_count > 0);
        assert!(config.selectors.is_empty());
    }

    #[test]
    fn test_full_config() {
        let yaml = r##"
version: "1.0"
target:
  base_url: "https://erp.example.com"
  login_path: "/login"
  estimation_path: "/estimates/new"
timings:
  step_settle_ms: 250
  modal_attempts: 5
worker_count: 2
database_path: "/tmp/erpflow.db"
duplicate_delivery: reprocess
selectors:
  job.quantity:
    - "#Qty"
    - "input[name='Qty']"
"##;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.timings.step_settle_ms, 250);
        assert_eq!(config.timings.modal_attempts, 5);
        assert_eq!(config.timings.field_settle_ms, 300);
        assert_eq!(config.duplicate_delivery, DuplicateDeliveryPolicy::Reprocess);
        assert_eq!(
            config.selector_catalog().candidates("job.quantity")[0],
            "#Qty"
        );
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let yaml = MINIMAL.replace("1.0", "2.0");
        let err = load_config_from_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version"));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let yaml = MINIMAL.replace("https://erp.example.com", "erp.example.com");
        assert!(matches!(
            load_config_from_str(&yaml),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let yaml = format!("{MINIMAL}worker_count: 0\n");
        assert!(load_config_from_str(&yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_selector_key() {
        let yaml = format!("{MINIMAL}selectors:\n  job.colour: [\"#c\"]\n");
        assert!(matches!(
            load_config_from_str(&yaml),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.target.base_url, "https://erp.example.com");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config("/nonexistent/erpflow.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/erpflow.yaml"));
    }
}
