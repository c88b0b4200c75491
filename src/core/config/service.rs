use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "jwt",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "token_ttl_minutes"];

#[derive(Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
}

/// Environment variables that override file values, in `(variable, path, kind)` form.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 8] = [
    ("HUGGINGFACEHUB_API_TOKEN", &["rag", "hf_token"], EnvKind::Text),
    ("JWT_SECRET_KEY", &["auth", "jwt_secret"], EnvKind::Text),
    ("RAG_INDEX_DIR", &["rag", "index_dir"], EnvKind::Text),
    ("RAG_CORPUS_PATH", &["rag", "corpus_path"], EnvKind::Text),
    ("RAG_API_BASE", &["rag", "api_base"], EnvKind::Text),
    ("DATABASE_PATH", &["database", "path"], EnvKind::Text),
    ("HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Public config deep-merged with the secrets file. Missing files count as empty.
    pub fn load_config(&self) -> Result<Value, ConfigError> {
        let public_config = load_yaml_file(&self.paths.config_path)?;
        let secrets_config = load_yaml_file(&self.paths.secrets_path)?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        self.load_settings_with(|key| env::var(key).ok())
    }

    pub fn load_settings_with<F>(&self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.load_config()?;
        apply_env_overrides(&mut config, lookup)?;
        validate_config(&config)?;

        let mut settings: Settings = serde_json::from_value(config)?;
        settings.resolve_paths(&self.paths);
        Ok(settings)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(_) => Ok(value),
        // An empty YAML document parses to null.
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Invalid(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (variable, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(variable) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value = match kind {
            EnvKind::Text => Value::String(raw.to_string()),
            EnvKind::Integer => {
                let number = raw.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(format!("{} must be an integer, got '{}'", variable, raw))
                })?;
                Value::from(number)
            }
        };
        ensure_object_path(config, path, value);
    }
    Ok(())
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::at(dir)))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "auth": { "jwt_secret": "s3cr3t", "token_ttl_minutes": 30 },
            "rag": { "hf_token": "hf_abc", "top_k": 4, "hf_missing_token": null }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "auth": { "jwt_secret": "****", "token_ttl_minutes": 30 },
                "rag": { "hf_token": "****", "top_k": 4, "hf_missing_token": null }
            })
        );
    }

    #[test]
    fn empty_data_dir_yields_defaults_with_resolved_paths() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let settings = service.load_settings_with(no_env).unwrap();

        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.rag.chunk_size, 1000);
        assert_eq!(settings.rag.chunk_overlap, 200);
        assert_eq!(settings.rag.corpus_path, dir.path().join("sample.txt"));
        assert_eq!(settings.rag.index_dir, dir.path().join("faiss_index"));
        assert_eq!(settings.database.path, dir.path().join("users.db"));
    }

    #[test]
    fn secrets_file_overrides_public_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "rag:\n  top_k: 6\n  hf_token: placeholder\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "rag:\n  hf_token: hf_real\n").unwrap();

        let settings = service_in(dir.path()).load_settings_with(no_env).unwrap();

        assert_eq!(settings.rag.top_k, 6);
        assert_eq!(settings.rag.hf_token.as_deref(), Some("hf_real"));
    }

    #[test]
    fn environment_wins_over_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "server:\n  port: 9000\nauth:\n  jwt_secret: from-file\n",
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9100"),
            ("JWT_SECRET_KEY", "from-env"),
            ("RAG_INDEX_DIR", "/var/lib/index"),
        ]);

        let settings = service_in(dir.path())
            .load_settings_with(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(settings.rag.index_dir, PathBuf::from("/var/lib/index"));
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let result = service_in(dir.path())
            .load_settings_with(|key| (key == "PORT").then(|| "eighty".to_string()));

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "server: [unterminated\n").unwrap();

        let result = service_in(dir.path()).load_settings_with(no_env);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
