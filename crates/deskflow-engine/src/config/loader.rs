use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::EngineConfig;

const CONFIG_FILENAME: &str = "deskflow.toml";

/// Path of the configuration file in the user's config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("no config directory available")?;
    Ok(dir.join("deskflow").join(CONFIG_FILENAME))
}

/// Load configuration from the default location, falling back to defaults
/// when no file exists. Secrets are filled from the environment afterwards.
pub fn load_config() -> Result<EngineConfig> {
    let path = default_config_path()?;
    load_config_from_path(&path)
}

/// Load configuration from a specific path.
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?
    } else {
        EngineConfig::default()
    };

    apply_env_overrides(&mut config);
    config.azure_openai.resolve_endpoint();
    Ok(config)
}

/// Secrets come from the environment when present, so config files can stay
/// checked in without keys.
fn apply_env_overrides(config: &mut EngineConfig) {
    if let Ok(key) = std::env::var("DESKFLOW_OPENAI_API_KEY") {
        config.azure_openai.api_key = key;
    }
    if let Ok(key) = std::env::var("DESKFLOW_SEARCH_API_KEY") {
        config.search.api_key = key;
    }
    if let Ok(key) = std::env::var("DESKFLOW_TICKETING_API_KEY") {
        config.ticketing.api_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_tool_rounds, 8);
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
            minimum_reranker_score = 2.0

            [azure_openai]
            resource = "contoso"
            deployment = "gpt-4o"
            "#
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.minimum_reranker_score, 2.0);
        assert_eq!(
            config.azure_openai.endpoint,
            "https://contoso.openai.azure.com"
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "not [valid toml").unwrap();
        assert!(load_config_from_path(&path).is_err());
    }
}
