//! Runtime configuration: defaults, an optional YAML file, then environment overrides.
//!
//! The file path comes from the first CLI argument or `PLOIDY_CONFIG`.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::{PloidyError, PloidyResult};

/// Output format of the log subscriber.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human readable output for local runs.
    Pretty,
}

/// Settings for the per-row local explanations.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplainCfg {
    /// When false the raw classifier probability is used directly.
    pub enabled: bool,
    /// Perturbed samples drawn per row, including the row itself.
    pub num_samples: usize,
    /// Kernel width; `None` means `0.75 * sqrt(n_features)`.
    pub kernel_width: Option<f64>,
    pub seed: u64,
    /// Attach the explanation to each result entry.
    pub include_in_response: bool,
}

impl Default for ExplainCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            num_samples: 5000,
            kernel_width: None,
            seed: 42,
            include_in_response: false,
        }
    }
}

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub listen_addr: String,
    pub scaler_path: PathBuf,
    pub classifier_path: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Threads for the explanation pool; 0 lets rayon decide.
    pub worker_threads: usize,
    /// Extra normalized column name -> canonical name mappings.
    pub column_aliases: BTreeMap<String, String>,
    pub explain: ExplainCfg,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8001".to_string(),
            scaler_path: PathBuf::from("models/scaler.json"),
            classifier_path: PathBuf::from("models/classifier.json"),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            worker_threads: 0,
            column_aliases: BTreeMap::new(),
            explain: ExplainCfg::default(),
        }
    }
}

impl AppCfg {
    /// Resolve the configuration for this process.
    pub fn load() -> PloidyResult<Self> {
        let path = env::args()
            .nth(1)
            .or_else(|| env::var("PLOIDY_CONFIG").ok())
            .map(PathBuf::from);

        let cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let cfg = cfg.with_env_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> PloidyResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PloidyError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> PloidyResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| PloidyError::config(format!("invalid config YAML: {e}")))
    }

    /// Apply `PLOIDY_*` overrides using the supplied lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> PloidyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("PLOIDY_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(path) = lookup("PLOIDY_SCALER_PATH") {
            self.scaler_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PLOIDY_CLASSIFIER_PATH") {
            self.classifier_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("PLOIDY_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = lookup("PLOIDY_LOG_FORMAT") {
            self.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(PloidyError::config(format!("unknown log format '{other}'")))
                }
            };
        }
        if let Some(flag) = lookup("PLOIDY_EXPLAIN_ENABLED") {
            self.explain.enabled = flag.parse().map_err(|_| {
                PloidyError::config(format!("PLOIDY_EXPLAIN_ENABLED must be true/false, got '{flag}'"))
            })?;
        }
        Ok(self)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> PloidyResult<()> {
        if self.scaler_path.as_os_str().is_empty() || self.classifier_path.as_os_str().is_empty() {
            return Err(PloidyError::config("artefact paths must not be empty"));
        }
        if self.max_upload_bytes == 0 {
            return Err(PloidyError::config("max_upload_bytes must be positive"));
        }
        if self.explain.num_samples == 0 {
            return Err(PloidyError::config("explain.num_samples must be positive"));
        }
        if let Some(width) = self.explain.kernel_width {
            if !(width.is_finite() && width > 0.0) {
                return Err(PloidyError::config("explain.kernel_width must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppCfg::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.listen_addr, "0.0.0.0:8001");
        assert_eq!(cfg.explain.seed, 42);
        assert!(cfg.explain.enabled);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = AppCfg::from_yaml(
            r#"
listen_addr: "127.0.0.1:9000"
explain:
  num_samples: 250
column_aliases:
  "grau morfologico": Morfo
"#,
        )
        .unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert_eq!(cfg.explain.num_samples, 250);
        assert_eq!(cfg.explain.seed, 42);
        assert_eq!(cfg.column_aliases.get("grau morfologico").map(String::as_str), Some("Morfo"));
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn loads_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"log_format: pretty\nworker_threads: 2\n").unwrap();
        let cfg = AppCfg::from_file(f.path()).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.worker_threads, 2);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = AppCfg::from_file(Path::new("/nonexistent/ploidy.yaml")).unwrap_err();
        assert!(matches!(err, PloidyError::Config(_)));
    }

    #[test]
    fn env_overrides_win() {
        let cfg = AppCfg::default()
            .with_env_overrides(|key| match key {
                "PLOIDY_SCALER_PATH" => Some("/srv/scaler.json".to_string()),
                "PLOIDY_EXPLAIN_ENABLED" => Some("false".to_string()),
                "PLOIDY_LOG_FORMAT" => Some("PRETTY".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.scaler_path, PathBuf::from("/srv/scaler.json"));
        assert!(!cfg.explain.enabled);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn bad_env_flag_is_rejected() {
        let result = AppCfg::default().with_env_overrides(|key| {
            (key == "PLOIDY_EXPLAIN_ENABLED").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn zero_samples_fail_validation() {
        let mut cfg = AppCfg::default();
        cfg.explain.num_samples = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppCfg::default();
        cfg.explain.kernel_width = Some(-1.0);
        assert!(cfg.validate().is_err());
    }
}
