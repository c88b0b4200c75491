use serde_json::{Map, Value};

use super::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(auth) = expect_optional_object(root, "auth")? {
        validate_optional_string_field(auth, "auth.jwt_secret", "jwt_secret")?;
        validate_u64_field(
            auth,
            "auth.token_ttl_minutes",
            "token_ttl_minutes",
            1,
            525_600,
        )?;
        validate_bool_field(
            auth,
            "auth.allow_privileged_self_registration",
            "allow_privileged_self_registration",
        )?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_optional_string_field(rag, "rag.corpus_path", "corpus_path")?;
        validate_optional_string_field(rag, "rag.index_dir", "index_dir")?;
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 100)?;
        validate_optional_string_field(rag, "rag.embedding_model", "embedding_model")?;
        validate_optional_string_field(rag, "rag.llm_model", "llm_model")?;
        validate_f64_field(rag, "rag.temperature", "temperature", 0.0, 100.0)?;
        validate_u64_field(rag, "rag.max_length", "max_length", 1, 1_000_000)?;
        validate_optional_string_field(rag, "rag.api_base", "api_base")?;
        validate_u64_field(
            rag,
            "rag.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
        validate_optional_string_field(rag, "rag.hf_token", "hf_token")?;

        let chunk_size = rag.get("chunk_size").and_then(Value::as_u64).unwrap_or(1000);
        let chunk_overlap = rag.get("chunk_overlap").and_then(Value::as_u64).unwrap_or(200);
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
    }

    if let Some(database) = expect_optional_object(root, "database")? {
        validate_optional_string_field(database, "database.path", "path")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "'{}' must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "'{}' must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "'{}[{}]' cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!("'{}': expected {}", path, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_partial_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({ "rag": { "top_k": 3 }, "server": null })).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let config = json!({ "rag": { "chunk_size": 100, "chunk_overlap": 100 } });

        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_wrong_types_and_ranges() {
        assert!(validate_config(&json!({ "server": { "port": "80" } })).is_err());
        assert!(validate_config(&json!({ "server": { "port": 70000 } })).is_err());
        assert!(validate_config(&json!({ "auth": { "token_ttl_minutes": 0 } })).is_err());
        assert!(validate_config(&json!({ "auth": { "allow_privileged_self_registration": "no" } })).is_err());
        assert!(validate_config(&json!({ "rag": { "temperature": -1.0 } })).is_err());
        assert!(validate_config(&json!({ "server": { "cors_allowed_origins": [""] } })).is_err());
        assert!(validate_config(&json!({ "rag": [] })).is_err());
    }
}
