use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
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

    if let Some(corpus) = expect_optional_object(root, "corpus")? {
        validate_optional_string_field(corpus, "corpus.base_folder", "base_folder")?;
        validate_optional_string_field(corpus, "corpus.web_manifest", "web_manifest")?;
        validate_u64_field(
            corpus,
            "corpus.web_timeout_secs",
            "web_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_optional_string_field(index, "index.dir", "dir")?;
        validate_u64_field(index, "index.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(index, "index.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_bool_field(index, "index.force_rebuild", "force_rebuild")?;

        let size = index.get("chunk_size").and_then(Value::as_u64).unwrap_or(1000);
        let overlap = index.get("chunk_overlap").and_then(Value::as_u64).unwrap_or(100);
        if overlap >= size {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'index.chunk_overlap': must be smaller than chunk_size ({})",
                size
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_u64_field(
            generation,
            "generation.qa_passage_chars",
            "qa_passage_chars",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            generation,
            "generation.policy_passage_chars",
            "policy_passage_chars",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            generation,
            "generation.history_turns",
            "history_turns",
            0,
            100,
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 86_400)?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
    }

    if let Some(evaluation) = expect_optional_object(root, "evaluation")? {
        validate_bool_field(evaluation, "evaluation.enabled", "enabled")?;
        validate_optional_string_field(evaluation, "evaluation.metrics_file", "metrics_file")?;
        validate_f64_field(
            evaluation,
            "evaluation.precision_threshold",
            "precision_threshold",
            0.0,
            1.0,
        )?;
        validate_f64_field(
            evaluation,
            "evaluation.default_score",
            "default_score",
            0.0,
            1.0,
        )?;
        validate_u64_field(
            evaluation,
            "evaluation.queue_capacity",
            "queue_capacity",
            1,
            100_000,
        )?;
        validate_u64_field(evaluation, "evaluation.workers", "workers", 1, 64)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
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
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
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
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
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
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
