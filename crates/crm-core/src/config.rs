use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_RECONCILE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_ACTIVATION_DISTANCE: f64 = 5.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upper bound for a single stage commit against the backing store.
    #[serde(default)]
    pub reconcile_timeout_ms: Option<u64>,
    /// Extra attempts after a transient commit failure before rolling back.
    #[serde(default)]
    pub reconcile_retries: Option<u32>,
    /// Pointer travel needed before a press turns into a drag.
    #[serde(default)]
    pub drag_activation_distance: Option<f64>,
    #[serde(default)]
    pub default_stage_color: Option<String>,
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/crm/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("crm/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("crm\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Returns `None` when the file is missing or unreadable as TOML.
    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    pub fn effective_reconcile_timeout(&self) -> Duration {
        Duration::from_millis(
            self.reconcile_timeout_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_RECONCILE_TIMEOUT_MS),
        )
    }

    pub fn effective_reconcile_retries(&self) -> u32 {
        self.reconcile_retries.unwrap_or(0)
    }

    pub fn effective_activation_distance(&self) -> f64 {
        self.drag_activation_distance
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(DEFAULT_ACTIVATION_DISTANCE)
    }

    pub fn effective_default_stage_color(&self) -> &str {
        self.default_stage_color.as_deref().unwrap_or("slate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.effective_reconcile_timeout(), Duration::from_secs(5));
        assert_eq!(config.effective_reconcile_retries(), 0);
        assert_eq!(config.effective_activation_distance(), 5.0);
        assert_eq!(config.effective_default_stage_color(), "slate");
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reconcile_timeout_ms = 250\nreconcile_retries = 2\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(
            config.effective_reconcile_timeout(),
            Duration::from_millis(250)
        );
        assert_eq!(config.effective_reconcile_retries(), 2);
        assert_eq!(config.effective_activation_distance(), 5.0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig {
            reconcile_timeout_ms: Some(0),
            drag_activation_distance: Some(-3.0),
            ..AppConfig::default()
        };
        assert_eq!(config.effective_reconcile_timeout(), Duration::from_secs(5));
        assert_eq!(config.effective_activation_distance(), 5.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::load_from(Path::new("/nonexistent/crm.toml")).is_none());
    }
}
