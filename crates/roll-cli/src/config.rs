//! `config.toml` for the `roll` binary.
//!
//! ```toml
//! [engine]
//! classifier_timeout_ms = 30000
//!
//! [classifiers.face]
//! kind = "http"
//! endpoint = "http://localhost:8700/classify/face"
//!
//! [classifiers.voice]
//! kind = "fixture"
//! path = "voice.json"
//! delay_ms = 1500
//! ```
//!
//! A missing file means defaults and no classifiers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use roll_core::Source;
use roll_engine::EngineConfig;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    pub engine: EngineConfig,
    pub classifiers: ClassifiersConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassifiersConfig {
    pub face: Option<ClassifierConfig>,
    pub voice: Option<ClassifierConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierConfig {
    Http {
        endpoint: String,
    },
    Fixture {
        path: PathBuf,
        #[serde(default)]
        delay_ms: u64,
    },
}

impl RollConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config TOML")
    }

    /// Load `path`, treating a missing file as the default config. Relative
    /// fixture paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config =
            Self::parse(&content).with_context(|| format!("in {}", path.display()))?;
        if let Some(dir) = path.parent() {
            config.classifiers.resolve_paths(dir);
        }
        Ok(config)
    }

    pub fn classifier(&self, source: Source) -> Option<&ClassifierConfig> {
        match source {
            Source::Face => self.classifiers.face.as_ref(),
            Source::Voice => self.classifiers.voice.as_ref(),
        }
    }
}

impl ClassifiersConfig {
    fn resolve_paths(&mut self, base: &Path) {
        for entry in [&mut self.face, &mut self.voice].into_iter().flatten() {
            if let ClassifierConfig::Fixture { path, .. } = entry
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
    }
}

/// Priority: `--config` > `<data dir>/config.toml`.
pub fn config_path(override_path: Option<&Path>, data_dir: &Path) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = RollConfig::parse(
            r#"
[engine]
classifier_timeout_ms = 1200

[classifiers.face]
kind = "http"
endpoint = "http://localhost:8700/face"

[classifiers.voice]
kind = "fixture"
path = "/tmp/voice.json"
delay_ms = 1500
"#,
        )
        .unwrap();
        assert_eq!(config.engine.classifier_timeout_ms, 1200);
        assert_eq!(config.engine.submit_timeout_ms, 10_000);
        assert_eq!(
            config.classifier(Source::Face),
            Some(&ClassifierConfig::Http {
                endpoint: "http://localhost:8700/face".into()
            })
        );
        assert_eq!(
            config.classifier(Source::Voice),
            Some(&ClassifierConfig::Fixture {
                path: PathBuf::from("/tmp/voice.json"),
                delay_ms: 1500
            })
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = RollConfig::parse("[classifiers.face]\nkind = \"grpc\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = RollConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.classifier(Source::Face).is_none());
    }

    #[test]
    fn test_relative_fixture_path_resolved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[classifiers.face]\nkind = \"fixture\"\npath = \"face.json\"\n",
        )
        .unwrap();
        let config = RollConfig::load(&path).unwrap();
        assert_eq!(
            config.classifier(Source::Face),
            Some(&ClassifierConfig::Fixture {
                path: dir.path().join("face.json"),
                delay_ms: 0
            })
        );
    }

    #[test]
    fn test_config_path_priority() {
        let data = Path::new("/data");
        assert_eq!(config_path(None, data), PathBuf::from("/data/config.toml"));
        assert_eq!(
            config_path(Some(Path::new("/etc/roll.toml")), data),
            PathBuf::from("/etc/roll.toml")
        );
    }
}
