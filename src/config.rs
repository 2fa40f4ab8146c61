use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for gitpush
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitPushConfig {
    /// Git invocation settings
    pub git: GitSettings,
    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitSettings {
    /// Binary to spawn; a bare name is resolved on PATH
    pub binary: String,
    /// Remote used when a command does not name one
    pub default_remote: String,
    /// Branch used when a command does not name one
    pub default_branch: String,
    /// Number of commits the history view returns
    pub log_limit: u32,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            default_remote: "origin".to_string(),
            default_branch: "master".to_string(),
            log_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `gitpush=debug`
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl GitPushConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (gitpush.toml, .gitpush-rc)
    /// 3. Environment variables (`GITPUSH_GIT__LOG_LIMIT=50`)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`GitPushConfig::load`] with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_file = dir.join("gitpush.toml");
        if toml_file.exists() {
            builder = builder.add_source(File::from(toml_file));
        }

        let rc_file = dir.join(".gitpush-rc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("GITPUSH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<GitPushConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = GitPushConfig::load_env_file();
        GitPushConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static GitPushConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::debug!(binary = %config.git.binary, "Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = GitPushConfig::default();
        assert_eq!(config.git.binary, "git");
        assert_eq!(config.git.default_remote, "origin");
        assert_eq!(config.git.default_branch, "master");
        assert_eq!(config.git.log_limit, 20);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("gitpush.toml"),
            "[git]\nlog_limit = 5\n\n[logging]\njson = false\n",
        )
        .unwrap();

        let config = GitPushConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.git.log_limit, 5);
        assert_eq!(config.git.default_remote, "origin");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_rc_file_overrides_toml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gitpush.toml"), "[git]\ndefault_branch = \"main\"\n").unwrap();
        std::fs::write(dir.path().join(".gitpush-rc"), "[git]\ndefault_branch = \"trunk\"\n").unwrap();

        let config = GitPushConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.git.default_branch, "trunk");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let mut config = GitPushConfig::default();
        config.git.binary = "/usr/local/bin/git".to_string();
        config.save_to_file(dir.path().join("gitpush.toml")).unwrap();

        let loaded = GitPushConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.git.binary, "/usr/local/bin/git");
    }
}
