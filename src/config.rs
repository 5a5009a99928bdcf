//! Configuration loading for gatewatch.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.gatewatch/config.toml`)
//! 3. User config (`~/.gatewatch/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, GateWatchError, Result};
use crate::oracle::ModelPreference;

/// Name of the per-project and per-user config directory.
pub const CONFIG_DIR_NAME: &str = ".gatewatch";

const CONFIG_HEADER: &str = "# gatewatch configuration\n\
# Environment variables (GATEWATCH_*) override everything in this file.\n\
# detection.confidence_threshold must be between 50 and 100.\n\n";

/// Main configuration struct for gatewatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Confidence gating.
    pub detection: DetectionConfig,
    /// Model selection.
    pub models: ModelsConfig,
    /// Few-shot reference images.
    pub references: ReferencesConfig,
    /// Camera identity.
    pub camera: CameraConfig,
    /// Publish topic naming.
    pub publish: PublishConfig,
}

pub use crate::core::MIN_CONFIDENCE_THRESHOLD;

/// Highest accepted confidence threshold.
pub const MAX_CONFIDENCE_THRESHOLD: u8 = 100;

/// Confidence gating configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Samples below this confidence are treated as unknown.
    pub confidence_threshold: u8,
}

impl DetectionConfig {
    /// Check if a threshold is within `[50, 100]`.
    pub fn is_valid_threshold(value: u8) -> bool {
        (MIN_CONFIDENCE_THRESHOLD..=MAX_CONFIDENCE_THRESHOLD).contains(&value)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 70,
        }
    }
}

/// Model selection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Ordered model-identifier patterns, highest priority first.
    pub preference: ModelPreference,
}

/// Reference image configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReferencesConfig {
    /// Directory holding the reference images. Relative paths resolve
    /// against the working directory. Defaults to `.gatewatch/references`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera name used in topics and alert payloads.
    pub name: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: "exterior_frente".to_string(),
        }
    }
}

/// Publish configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    /// Prefix for every published topic.
    pub topic_prefix: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            topic_prefix: "homeassistant/gate".to_string(),
        }
    }
}

impl Config {
    /// Load configuration for a working directory.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.gatewatch/config.toml` at the project root)
    /// 3. User config (`~/.gatewatch/config.toml`)
    /// 4. Defaults
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.gatewatch/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = gatewatch_home()?.join("config.toml");
        Self::load_layer(&path)
    }

    /// Load project config from `.gatewatch/config.toml` at the project root.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_gatewatch_dir(cwd).join("config.toml");
        Self::load_layer(&path)
    }

    /// Load one layer. A missing file is silent; a broken one is logged.
    fn load_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_with(&format!("loading {}", path.display()), None)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| GateWatchError::storage(path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| GateWatchError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.detection.confidence_threshold;
        if !DetectionConfig::is_valid_threshold(threshold) {
            return Err(GateWatchError::config(format!(
                "detection.confidence_threshold must be between {} and {}, got {}",
                MIN_CONFIDENCE_THRESHOLD, MAX_CONFIDENCE_THRESHOLD, threshold
            )));
        }
        if self.camera.name.trim().is_empty() {
            return Err(GateWatchError::config("camera.name must not be empty"));
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // GATEWATCH_CONFIDENCE_THRESHOLD
        if let Ok(val) = env::var("GATEWATCH_CONFIDENCE_THRESHOLD") {
            match val.trim().parse::<u8>() {
                Ok(n) if DetectionConfig::is_valid_threshold(n) => {
                    self.detection.confidence_threshold = n;
                }
                _ => tracing::warn!(
                    value = %val,
                    current = self.detection.confidence_threshold,
                    "invalid GATEWATCH_CONFIDENCE_THRESHOLD (expected {}-{}), keeping current value",
                    MIN_CONFIDENCE_THRESHOLD,
                    MAX_CONFIDENCE_THRESHOLD
                ),
            }
        }

        // GATEWATCH_MODEL_PREFERENCE (comma-separated)
        if let Ok(val) = env::var("GATEWATCH_MODEL_PREFERENCE") {
            let patterns: Vec<String> = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if patterns.is_empty() {
                tracing::warn!("GATEWATCH_MODEL_PREFERENCE is empty, keeping current list");
            } else {
                self.models.preference = ModelPreference::new(patterns);
            }
        }

        // GATEWATCH_REFERENCE_DIR
        if let Ok(val) = env::var("GATEWATCH_REFERENCE_DIR") {
            if val.trim().is_empty() {
                tracing::warn!("GATEWATCH_REFERENCE_DIR is empty, ignoring");
            } else {
                self.references.dir = Some(PathBuf::from(val));
            }
        }

        // GATEWATCH_CAMERA_NAME
        if let Ok(val) = env::var("GATEWATCH_CAMERA_NAME") {
            let name = val.trim();
            if name.is_empty() {
                tracing::warn!("GATEWATCH_CAMERA_NAME is empty, ignoring");
            } else {
                self.camera.name = name.to_string();
            }
        }

        // GATEWATCH_TOPIC_PREFIX
        if let Ok(val) = env::var("GATEWATCH_TOPIC_PREFIX") {
            let prefix = val.trim().trim_end_matches('/');
            if prefix.is_empty() {
                tracing::warn!("GATEWATCH_TOPIC_PREFIX is empty, ignoring");
            } else {
                self.publish.topic_prefix = prefix.to_string();
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Values from `other` take precedence when they differ from the
    /// default. A layer that explicitly sets a default value cannot undo a
    /// non-default value from a lower layer.
    fn merge(mut self, other: Config) -> Self {
        let default_detection = DetectionConfig::default();
        if other.detection.confidence_threshold != default_detection.confidence_threshold {
            self.detection.confidence_threshold = other.detection.confidence_threshold;
        }

        if other.models.preference != ModelPreference::default() {
            self.models.preference = other.models.preference;
        }

        if other.references.dir.is_some() {
            self.references.dir = other.references.dir;
        }

        if other.camera.name != CameraConfig::default().name {
            self.camera.name = other.camera.name;
        }

        if other.publish.topic_prefix != PublishConfig::default().topic_prefix {
            self.publish.topic_prefix = other.publish.topic_prefix;
        }

        self
    }

    /// Resolve the reference image directory for `cwd`.
    pub fn reference_dir(&self, cwd: &Path) -> PathBuf {
        match &self.references.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => project_gatewatch_dir(cwd).join("references"),
        }
    }

    /// Save configuration to the project config file.
    ///
    /// Writes the same `.gatewatch/config.toml` that loading reads, creating
    /// the directory if needed. The file is replaced atomically.
    pub fn save_project(&self, cwd: &Path) -> Result<PathBuf> {
        let dir = project_gatewatch_dir(cwd);

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| GateWatchError::storage(&dir, e))?;
        }

        let config_path = dir.join("config.toml");
        let content = format!("{}{}", CONFIG_HEADER, self.to_toml()?);

        // Atomic write: write to temp file, then rename
        let temp_path = dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| GateWatchError::storage(&temp_path, e))?;

        let file =
            fs::File::open(&temp_path).map_err(|e| GateWatchError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| GateWatchError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &config_path)
            .map_err(|e| GateWatchError::storage(&config_path, e))?;

        Ok(config_path)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GateWatchError::serde(e.to_string()))
    }

    /// Generate a diff of changed values between two configs.
    ///
    /// Returns a list of (key, old_value, new_value) tuples for changed fields.
    pub fn diff(&self, other: &Config) -> Vec<(String, String, String)> {
        let mut changes = Vec::new();

        if self.detection.confidence_threshold != other.detection.confidence_threshold {
            changes.push((
                "detection.confidence_threshold".to_string(),
                self.detection.confidence_threshold.to_string(),
                other.detection.confidence_threshold.to_string(),
            ));
        }

        if self.models.preference != other.models.preference {
            changes.push((
                "models.preference".to_string(),
                self.models.preference.patterns().join(","),
                other.models.preference.patterns().join(","),
            ));
        }

        if self.references.dir != other.references.dir {
            let show = |dir: &Option<PathBuf>| {
                dir.as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "(default)".to_string())
            };
            changes.push((
                "references.dir".to_string(),
                show(&self.references.dir),
                show(&other.references.dir),
            ));
        }

        if self.camera.name != other.camera.name {
            changes.push((
                "camera.name".to_string(),
                self.camera.name.clone(),
                other.camera.name.clone(),
            ));
        }

        if self.publish.topic_prefix != other.publish.topic_prefix {
            changes.push((
                "publish.topic_prefix".to_string(),
                self.publish.topic_prefix.clone(),
                other.publish.topic_prefix.clone(),
            ));
        }

        changes
    }
}

/// Get the gatewatch home directory.
///
/// Checks `GATEWATCH_HOME` environment variable first, then falls back to
/// `~/.gatewatch`. An empty `GATEWATCH_HOME` is ignored.
pub fn gatewatch_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("GATEWATCH_HOME") {
        if home.is_empty() {
            tracing::warn!("GATEWATCH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("GATEWATCH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(CONFIG_DIR_NAME));
    }

    let fallback_path = fallback_gatewatch_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Fallback home when HOME is unavailable.
#[cfg(unix)]
fn fallback_gatewatch_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/gatewatch-{}", uid))
}

/// Fallback home when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_gatewatch_home() -> PathBuf {
    std::env::temp_dir().join("gatewatch")
}

/// Find the project root for a given working directory.
///
/// The nearest ancestor holding a `.gatewatch/` directory wins. Without one
/// the working directory itself is the root.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .find(|ancestor| ancestor.join(CONFIG_DIR_NAME).is_dir())
        .unwrap_or(cwd)
        .to_path_buf()
}

/// Get the project `.gatewatch/` directory for a working directory.
pub fn project_gatewatch_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(CONFIG_DIR_NAME)
}

/// Get the crash log path: `<gatewatch_home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    gatewatch_home().map(|h| h.join("crash.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "GATEWATCH_CONFIDENCE_THRESHOLD",
        "GATEWATCH_MODEL_PREFERENCE",
        "GATEWATCH_REFERENCE_DIR",
        "GATEWATCH_CAMERA_NAME",
        "GATEWATCH_TOPIC_PREFIX",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    /// Point the user layer at an empty directory for the guard's lifetime.
    fn isolated_home() -> TempDir {
        let home = TempDir::new().unwrap();
        env::set_var("GATEWATCH_HOME", home.path());
        home
    }

    fn write_project_config(dir: &Path, content: &str) {
        let config_dir = dir.join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.detection.confidence_threshold, 70);
        assert_eq!(config.models.preference, ModelPreference::default());
        assert_eq!(config.models.preference.patterns()[0], "gemini-3-flash");
        assert!(config.references.dir.is_none());
        assert_eq!(config.camera.name, "exterior_frente");
        assert_eq!(config.publish.topic_prefix, "homeassistant/gate");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
[detection]
confidence_threshold = 85

[models]
preference = ["gemini-2.5-pro", "gemini-2.5-flash"]

[camera]
name = "driveway"
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.detection.confidence_threshold, 85);
        assert_eq!(
            config.models.preference.patterns(),
            &["gemini-2.5-pro".to_string(), "gemini-2.5-flash".to_string()]
        );
        assert_eq!(config.camera.name, "driveway");
        // Untouched sections keep defaults
        assert_eq!(config.publish.topic_prefix, "homeassistant/gate");
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(GateWatchError::Config { .. })));
    }

    #[test]
    fn test_load_from_file_rejects_out_of_range_threshold() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[detection]\nconfidence_threshold = 30\n").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn test_is_valid_threshold() {
        assert!(DetectionConfig::is_valid_threshold(50));
        assert!(DetectionConfig::is_valid_threshold(70));
        assert!(DetectionConfig::is_valid_threshold(100));
        assert!(!DetectionConfig::is_valid_threshold(49));
        assert!(!DetectionConfig::is_valid_threshold(0));
        assert!(!DetectionConfig::is_valid_threshold(101));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[detection]\nconfidence_threshold = 90\n");

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.detection.confidence_threshold, 90);
        assert_eq!(config.camera.name, "exterior_frente");
    }

    #[test]
    #[serial]
    fn test_invalid_project_config_falls_back() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[detection]\nconfidence_threshold = 10\n");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.detection.confidence_threshold, 70);
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[detection]\nconfidence_threshold = 90\n");

        env::set_var("GATEWATCH_CONFIDENCE_THRESHOLD", "60");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.detection.confidence_threshold, 60);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        env::set_var("GATEWATCH_CONFIDENCE_THRESHOLD", "80");
        env::set_var("GATEWATCH_MODEL_PREFERENCE", "gemini-2.5-pro, gemini-pro");
        env::set_var("GATEWATCH_REFERENCE_DIR", "/srv/gate/reference");
        env::set_var("GATEWATCH_CAMERA_NAME", "back_yard");
        env::set_var("GATEWATCH_TOPIC_PREFIX", "home/gate/");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.detection.confidence_threshold, 80);
        assert_eq!(
            config.models.preference.patterns(),
            &["gemini-2.5-pro".to_string(), "gemini-pro".to_string()]
        );
        assert_eq!(
            config.references.dir,
            Some(PathBuf::from("/srv/gate/reference"))
        );
        assert_eq!(config.camera.name, "back_yard");
        assert_eq!(config.publish.topic_prefix, "home/gate");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_threshold_ignored() {
        clear_env();
        for bad in ["49", "101", "300", "high", "-5"] {
            env::set_var("GATEWATCH_CONFIDENCE_THRESHOLD", bad);
            let mut config = Config::default();
            config.apply_env_overrides();
            assert_eq!(config.detection.confidence_threshold, 70, "value {}", bad);
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_empty_values_ignored() {
        clear_env();
        env::set_var("GATEWATCH_MODEL_PREFERENCE", " , ");
        env::set_var("GATEWATCH_CAMERA_NAME", "  ");
        env::set_var("GATEWATCH_TOPIC_PREFIX", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    fn test_merge_configs() {
        let base = Config::default();
        let mut other = Config::default();
        other.detection.confidence_threshold = 95;
        other.publish.topic_prefix = "site/gate".to_string();

        let merged = base.merge(other);
        assert_eq!(merged.detection.confidence_threshold, 95);
        assert_eq!(merged.publish.topic_prefix, "site/gate");
        assert_eq!(merged.camera.name, "exterior_frente");
    }

    #[test]
    fn test_merge_field_by_field_preserves_lower_layer() {
        let mut user = Config::default();
        user.camera.name = "front".to_string();
        user.references.dir = Some(PathBuf::from("/refs"));

        let mut project = Config::default();
        project.detection.confidence_threshold = 80;

        let merged = Config::default().merge(user).merge(project);
        assert_eq!(merged.camera.name, "front");
        assert_eq!(merged.references.dir, Some(PathBuf::from("/refs")));
        assert_eq!(merged.detection.confidence_threshold, 80);
    }

    #[test]
    #[serial]
    fn test_gatewatch_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("GATEWATCH_HOME", dir.path().to_str().unwrap());

        assert_eq!(gatewatch_home().unwrap(), dir.path());
        assert_eq!(crash_log_path().unwrap(), dir.path().join("crash.log"));

        env::remove_var("GATEWATCH_HOME");
    }

    #[test]
    #[serial]
    fn test_gatewatch_home_empty_env() {
        env::set_var("GATEWATCH_HOME", "");

        let home = gatewatch_home();
        assert!(home.is_some());
        assert!(home.unwrap().ends_with(CONFIG_DIR_NAME));

        env::remove_var("GATEWATCH_HOME");
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let mut config = Config::default();
        config.detection.confidence_threshold = 75;
        config.references.dir = Some(PathBuf::from("/srv/refs"));
        config.camera.name = "side".to_string();

        let toml_text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[camera]\nname = \"side\"\n").unwrap();
        assert_eq!(config.camera.name, "side");
        assert_eq!(config.detection, DetectionConfig::default());
        assert_eq!(config.models, ModelsConfig::default());
    }

    #[test]
    fn test_reference_dir_resolution() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        assert_eq!(
            config.reference_dir(dir.path()),
            dir.path().join(CONFIG_DIR_NAME).join("references")
        );

        config.references.dir = Some(PathBuf::from("refs"));
        assert_eq!(config.reference_dir(dir.path()), dir.path().join("refs"));

        config.references.dir = Some(PathBuf::from("/abs/refs"));
        assert_eq!(config.reference_dir(dir.path()), PathBuf::from("/abs/refs"));
    }

    #[test]
    fn test_save_project_creates_config_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.detection.confidence_threshold = 88;

        config.save_project(dir.path()).unwrap();

        let config_path = dir.path().join(CONFIG_DIR_NAME).join("config.toml");
        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert!(!dir.path().join(CONFIG_DIR_NAME).join(".config.toml.tmp").exists());
    }

    #[test]
    fn test_save_project_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let mut first = Config::default();
        first.camera.name = "first_cam".to_string();
        first.save_project(dir.path()).unwrap();

        let mut second = Config::default();
        second.camera.name = "second_cam".to_string();
        second.save_project(dir.path()).unwrap();

        let content =
            fs::read_to_string(dir.path().join(CONFIG_DIR_NAME).join("config.toml")).unwrap();
        assert!(content.contains("second_cam"));
        assert!(!content.contains("first_cam"));
    }

    #[test]
    #[serial]
    fn test_save_project_from_subdirectory_targets_project_root() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR_NAME)).unwrap();
        let nested = dir.path().join("cameras").join("front");
        fs::create_dir_all(&nested).unwrap();

        let mut config = Config::default();
        config.camera.name = "driveway".to_string();
        let written = config.save_project(&nested).unwrap();

        assert_eq!(written, dir.path().join(CONFIG_DIR_NAME).join("config.toml"));
        assert!(!nested.join(CONFIG_DIR_NAME).exists());
        assert_eq!(Config::load_from_cwd(&nested).camera.name, "driveway");
        clear_env();
    }

    #[test]
    fn test_diff_no_changes() {
        let config = Config::default();
        assert!(config.diff(&config).is_empty());
    }

    #[test]
    fn test_diff_multiple_changes() {
        let base = Config::default();
        let mut other = Config::default();
        other.detection.confidence_threshold = 90;
        other.camera.name = "side".to_string();

        let changes = base.diff(&other);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0],
            (
                "detection.confidence_threshold".to_string(),
                "70".to_string(),
                "90".to_string()
            )
        );
        assert_eq!(changes[1].0, "camera.name");
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR_NAME)).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), dir.path());
        assert_eq!(
            project_gatewatch_dir(&nested),
            dir.path().join(CONFIG_DIR_NAME)
        );
    }

    #[test]
    fn test_find_project_root_falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x");
        fs::create_dir_all(&nested).unwrap();
        // The temp dir has no .gatewatch anywhere above it in practice.
        let root = find_project_root(&nested);
        assert!(root == nested || root.join(CONFIG_DIR_NAME).is_dir());
    }
}
