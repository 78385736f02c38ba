//! Configuration loader for Juno.
//!
//! Reads `config.toml` from the Juno data directory and deserializes it into
//! [`JunoConfig`], falling back to defaults when the file is missing or
//! malformed. Environment variables are layered on top.

use std::path::Path;

use secrecy::SecretString;

use juno_types::config::JunoConfig;

/// Environment variables consulted for the API key, in priority order.
pub const API_KEY_VARS: &[&str] = &["JUNO_API_KEY", "OPENAI_API_KEY"];
pub const MODEL_VAR: &str = "JUNO_MODEL";
pub const BASE_URL_VAR: &str = "JUNO_BASE_URL";

/// Load `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`JunoConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> JunoConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return JunoConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return JunoConfig::default();
        }
    };

    match toml::from_str::<JunoConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            JunoConfig::default()
        }
    }
}

/// Value of an environment variable; unset, empty and non-Unicode all count as absent.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Apply environment overrides, looking variables up through `lookup`.
pub fn apply_overrides(config: &mut JunoConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = API_KEY_VARS.iter().find_map(|var| lookup(*var)) {
        config.api_key = Some(SecretString::from(key));
    }
    if let Some(model) = lookup(MODEL_VAR) {
        config.model = model;
    }
    if let Some(base_url) = lookup(BASE_URL_VAR) {
        config.base_url = base_url;
    }
}

/// [`load_config`] plus the process environment.
pub async fn load_effective_config(data_dir: &Path) -> JunoConfig {
    let mut config = load_config(data_dir).await;
    apply_overrides(&mut config, env_var);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "gpt-4"
assistant_name = "Ada"

[embedding]
concurrency = 2

[indexing]
exclude = ["**/*.min.js"]
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.assistant_name, "Ada");
        assert_eq!(config.embedding.concurrency, 2);
        assert_eq!(config.indexing.exclude, vec!["**/*.min.js".to_string()]);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.max_round_trips, 5);
    }

    #[test]
    fn overrides_prefer_juno_api_key() {
        let mut config = JunoConfig::default();
        apply_overrides(
            &mut config,
            lookup(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("JUNO_API_KEY", "sk-juno"),
                ("JUNO_MODEL", "gpt-4-0613"),
            ]),
        );
        assert_eq!(config.api_key.as_ref().unwrap().expose_secret(), "sk-juno");
        assert_eq!(config.model, "gpt-4-0613");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn overrides_fall_back_to_openai_key() {
        let mut config = JunoConfig::default();
        apply_overrides(
            &mut config,
            lookup(&[("OPENAI_API_KEY", "sk-openai"), ("JUNO_BASE_URL", "http://localhost:8080/v1")]),
        );
        assert_eq!(config.api_key.as_ref().unwrap().expose_secret(), "sk-openai");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn no_overrides_keep_file_values() {
        let mut config = JunoConfig {
            model: "gpt-4".to_string(),
            ..JunoConfig::default()
        };
        apply_overrides(&mut config, lookup(&[]));
        assert_eq!(config.model, "gpt-4");
        assert!(config.api_key.is_none());
    }
}
