use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_WEB_URL: &str = "https://bitbucket.org";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub web_url: String,
    pub username: Option<String>,
    pub app_password: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
            username: None,
            app_password: None,
            log_file: None,
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bucketpr"))
}

pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|p| p.join("config.toml"))
}

/// Load the config file at `path`, or the default location. A missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => get_config_path(),
    };
    let mut config = match path {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        _ => Config::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    let non_empty = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(username) = non_empty("BUCKETPR_USERNAME") {
        config.username = Some(username);
    }
    if let Some(password) = non_empty("BUCKETPR_APP_PASSWORD") {
        config.app_password = Some(password);
    }
    if let Some(url) = non_empty("BUCKETPR_API_URL") {
        config.api_url = url;
    }
}

impl Config {
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| get_config_dir().map(|p| p.join("bucketpr.log")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load(Some(&dir.path().join("nope.toml"))).unwrap();
        // Environment may carry overrides on developer machines.
        config.username = None;
        config.app_password = None;
        config.api_url = DEFAULT_API_URL.to_string();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "username = \"alice\"\nweb_url = \"https://bb.example\"\nlog_file = \"/tmp/bpr.log\"\n",
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&contents).unwrap();
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.web_url, "https://bb.example");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.log_path(), Some(PathBuf::from("/tmp/bpr.log")));
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "username = [").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("BUCKETPR_USERNAME", "bob"),
            ("BUCKETPR_APP_PASSWORD", "  "),
            ("BUCKETPR_API_URL", "http://localhost:9000"),
        ]
        .into_iter()
        .collect();
        let mut config = Config {
            app_password: Some("from-file".into()),
            ..Config::default()
        };
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert_eq!(config.app_password.as_deref(), Some("from-file"));
        assert_eq!(config.api_url, "http://localhost:9000");
    }
}
