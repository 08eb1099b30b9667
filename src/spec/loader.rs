//! Document loading: file extension dispatch and YAML/JSON decoding.

use crate::spec::model::SpecModel;
use crate::types::{Error, Result};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "json" => Ok(DocumentFormat::Json),
            _ if ext.is_empty() => Err(Error::UnsupportedFormat(String::new())),
            _ => Err(Error::UnsupportedFormat(format!(".{}", ext))),
        }
    }
}

/// Load a document from disk and normalize it.
///
/// The extension is checked before the file is opened.
pub fn load_document(path: impl AsRef<Path>) -> Result<SpecModel> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Error reading file {}: {}", path.display(), e);
        Error::Io(e)
    })?;
    let model = parse_document(&text, format)?;
    tracing::info!(
        path = %path.display(),
        paths = model.paths.len(),
        operations = model.operation_count(),
        "Loaded API description"
    );
    Ok(model)
}

/// Decode document text and normalize it.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<SpecModel> {
    let tree = match format {
        DocumentFormat::Json => serde_json::from_str::<Value>(text)
            .map_err(|e| Error::document_parse(e.to_string()))?,
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
                tracing::error!("Failed to parse YAML: {}", e);
                Error::from(e)
            })?;
            yaml_to_json(yaml)?
        }
    };
    SpecModel::from_document(&tree)
}

/// Convert a YAML tree into a JSON tree. Non-string mapping keys (YAML
/// allows `200:` as an integer key) are rendered as strings.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| Error::document_parse(format!("non-finite number: {}", n)))?
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => Err(Error::document_parse(format!(
            "unsupported mapping key: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("api.yaml")).unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("api.YML")).unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("api.json")).unwrap(), DocumentFormat::Json);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DocumentFormat::from_path(Path::new("spec.toml")).unwrap_err();
        match err {
            Error::UnsupportedFormat(ext) => assert_eq!(ext, ".toml"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            DocumentFormat::from_path(Path::new("Makefile")).unwrap_err(),
            Error::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_toml_rejected_before_reading() {
        let err = load_document("/definitely/not/here/spec.toml").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_document("{\"paths\": ", DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, Error::DocumentParse(_)));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = parse_document("paths: [unterminated", DocumentFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::DocumentParse(_)));
    }

    #[test]
    fn test_yaml_integer_keys_become_strings() {
        let text = r#"
paths:
  /pets:
    get:
      summary: List pets
      responses:
        200:
          description: ok
"#;
        let model = parse_document(text, DocumentFormat::Yaml).unwrap();
        assert_eq!(model.paths[0].path, "/pets");
        assert_eq!(model.paths[0].operations[0].1.summary.as_deref(), Some("List pets"));
    }
}
