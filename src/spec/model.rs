//! Normalized in-memory representation of an API description.
//!
//! Built from a decoded document tree by [`SpecModel::from_document`]. The
//! model keeps the document's ordering (paths, methods, parameters, schemas)
//! so compilation is deterministic.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Methods and locations
// =============================================================================

/// HTTP verbs that produce tools. Every other key of a path item is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Parse a path-item key, case-insensitively. Returns `None` for keys
    /// such as `parameters`, `summary` or `head`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }

    /// Whether the `body` argument is sent as the request's JSON body.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Cookie,
    /// A location the dispatcher does not route, such as Swagger 2 `body`
    /// or `formData`. The parameter still appears in the input schema.
    Other,
}

impl FromStr for ParameterLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "cookie" => Ok(ParameterLocation::Cookie),
            "other" => Ok(ParameterLocation::Other),
            other => Err(Error::document_parse(format!(
                "unknown parameter location: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Schema values
// =============================================================================

/// JSON-Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        }
    }

    /// Read the `type` keyword of a parameter schema.
    ///
    /// Missing schema or missing `type` gives `string`, and so does a type
    /// name outside JSON Schema (e.g. Swagger 2 `file`). A 3.1-style type
    /// array uses its first non-`null` entry.
    fn from_schema(schema: Option<&Value>) -> Result<Self> {
        let Some(type_value) = schema.and_then(|s| s.get("type")) else {
            return Ok(SchemaType::default());
        };
        match type_value {
            Value::String(name) => Ok(Self::from_name_or_default(name)),
            Value::Array(names) => Ok(names
                .iter()
                .filter_map(Value::as_str)
                .find(|name| *name != "null")
                .map_or(SchemaType::Null, Self::from_name_or_default)),
            other => Err(Error::document_parse(format!(
                "schema type must be a string, got {}",
                other
            ))),
        }
    }
}

impl SchemaType {
    fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(schema_type = name, "Unknown schema type, treating as string");
            SchemaType::default()
        })
    }
}

impl FromStr for SchemaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object" => Ok(SchemaType::Object),
            "array" => Ok(SchemaType::Array),
            "string" => Ok(SchemaType::String),
            "number" => Ok(SchemaType::Number),
            "integer" => Ok(SchemaType::Integer),
            "boolean" => Ok(SchemaType::Boolean),
            "null" => Ok(SchemaType::Null),
            other => Err(Error::document_parse(format!("unknown schema type: {}", other))),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema object embedded verbatim. Guaranteed to be a JSON object; its
/// contents are never interpreted by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct JsonSchema(Map<String, Value>);

impl JsonSchema {
    pub fn new(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::document_parse(format!(
                "schema must be an object, got {}",
                other
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// The `type` keyword, when it is a plain string.
    pub fn type_name(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Names listed under `required`.
    pub fn required_names(&self) -> Vec<&str> {
        self.0
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// `(property, type)` pairs in declaration order.
    pub fn property_types(&self) -> Vec<(&str, Option<&str>)> {
        self.0
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| {
                        (name.as_str(), schema.get("type").and_then(Value::as_str))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Document model
// =============================================================================

/// One entry of the document's `servers` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// One operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema_type: SchemaType,
    pub description: Option<String>,
}

/// The `application/json` part of a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// `None` when the body declares no `application/json` content.
    pub json_schema: Option<JsonSchema>,
}

/// One operation under a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Operation {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
}

/// A path and its operations, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    pub path: String,
    pub operations: Vec<(HttpMethod, Operation)>,
}

/// Normalized API description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpecModel {
    pub title: Option<String>,
    pub version: Option<String>,
    pub servers: Vec<Server>,
    pub paths: Vec<PathItem>,
    pub schemas: Vec<(String, JsonSchema)>,
}

impl SpecModel {
    /// Build the model from a decoded document tree.
    ///
    /// Unsupported method keys and non-object operations are skipped.
    /// Structural problems in the parts the compiler relies on (parameter
    /// names, schema shapes) fail with [`Error::DocumentParse`].
    pub fn from_document(doc: &Value) -> Result<Self> {
        let root = doc
            .as_object()
            .ok_or_else(|| Error::document_parse("document root must be a mapping"))?;

        let info = root.get("info");
        let title = info.and_then(|i| opt_str(i, "title"));
        let version = info.and_then(|i| opt_str(i, "version"));

        let servers = match root.get("servers") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| Server {
                    url: opt_str(entry, "url").unwrap_or_default(),
                    description: opt_str(entry, "description"),
                })
                .collect(),
            Some(_) => return Err(Error::document_parse("servers must be a list")),
        };

        let mut paths = Vec::new();
        if let Some(path_map) = optional_object(root, "paths")? {
            for (path, item) in path_map {
                paths.push(parse_path_item(path, item)?);
            }
        }

        let schema_map = match optional_object(root, "components")? {
            Some(components) => optional_object(components, "schemas")?,
            None => None,
        };
        let mut schemas = Vec::new();
        for (name, schema) in schema_map.into_iter().flatten() {
            schemas.push((name.clone(), JsonSchema::new(schema.clone())?));
        }

        Ok(Self {
            title,
            version,
            servers,
            paths,
            schemas,
        })
    }

    /// URL of the first declared server, if any and non-empty.
    pub fn base_url(&self) -> Option<&str> {
        self.servers
            .first()
            .map(|s| s.url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Total number of supported operations.
    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|p| p.operations.len()).sum()
    }
}

fn parse_path_item(path: &str, item: &Value) -> Result<PathItem> {
    let Some(methods) = item.as_object() else {
        tracing::warn!(path, "Skipping path item that is not a mapping");
        return Ok(PathItem {
            path: path.to_string(),
            operations: Vec::new(),
        });
    };

    let mut operations = Vec::new();
    for (key, op) in methods {
        let Some(method) = HttpMethod::from_key(key) else {
            continue;
        };
        if !op.is_object() {
            tracing::warn!(path, method = key.as_str(), "Skipping malformed operation");
            continue;
        }
        operations.push((method, parse_operation(path, op)?));
    }

    Ok(PathItem {
        path: path.to_string(),
        operations,
    })
}

fn parse_operation(path: &str, op: &Value) -> Result<Operation> {
    let mut parameters = Vec::new();
    match op.get("parameters") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for entry in entries {
                if let Some(param) = parse_parameter(path, entry)? {
                    parameters.push(param);
                }
            }
        }
        Some(_) => {
            return Err(Error::document_parse(format!(
                "parameters of {} must be a list",
                path
            )))
        }
    }

    let request_body = match op.get("requestBody") {
        None | Some(Value::Null) => None,
        Some(body) => Some(parse_request_body(body)?),
    };

    Ok(Operation {
        summary: opt_str(op, "summary"),
        description: opt_str(op, "description"),
        parameters,
        request_body,
    })
}

fn parse_parameter(path: &str, entry: &Value) -> Result<Option<Parameter>> {
    if entry.get("$ref").is_some() {
        tracing::warn!(path, "Skipping referenced parameter; references are not resolved");
        return Ok(None);
    }
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::document_parse(format!("parameter without a name under {}", path)))?;

    let location = match entry.get("in").and_then(Value::as_str) {
        Some(loc) => loc.parse().unwrap_or_else(|_| {
            tracing::warn!(path, parameter = name, location = loc, "Parameter location is not routed");
            ParameterLocation::Other
        }),
        None => ParameterLocation::default(),
    };

    Ok(Some(Parameter {
        name: name.to_string(),
        location,
        required: entry.get("required").and_then(Value::as_bool).unwrap_or(false),
        schema_type: SchemaType::from_schema(entry.get("schema"))?,
        description: opt_str(entry, "description"),
    }))
}

fn parse_request_body(body: &Value) -> Result<RequestBody> {
    let json_schema = match body.get("content").and_then(|c| c.get("application/json")) {
        None => None,
        Some(media) => match media.get("schema") {
            None | Some(Value::Null) => Some(JsonSchema::default()),
            Some(schema) => Some(JsonSchema::new(schema.clone())?),
        },
    };

    Ok(RequestBody {
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        json_schema,
    })
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn optional_object<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    match parent.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::document_parse(format!("{} must be a mapping", key))),
    }
}
