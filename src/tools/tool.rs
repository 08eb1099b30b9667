//! Compiled tool definitions and their wire representation.

use crate::spec::{HttpMethod, JsonSchema, ParameterLocation, SchemaType};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

// =============================================================================
// Input schema
// =============================================================================

/// One entry of `inputSchema.properties`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertySchema {
    /// Built from an operation parameter.
    Parameter {
        #[serde(rename = "type")]
        schema_type: SchemaType,
        description: String,
    },
    /// The raw `application/json` request body schema.
    Body(JsonSchema),
}

/// Object schema describing a tool's arguments.
///
/// Serializes as `{"type": "object", "properties": {...}, "required": [...]}`
/// with properties in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSchema {
    properties: Vec<(String, PropertySchema)>,
    required: Vec<String>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a property. Overwriting keeps the property's
    /// original position.
    pub fn insert_property(&mut self, name: &str, schema: PropertySchema) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = schema,
            None => self.properties.push((name.to_string(), schema)),
        }
    }

    /// Mark a property as required. A name is listed at most once.
    pub fn require(&mut self, name: &str) {
        if !self.required.iter().any(|n| n == name) {
            self.required.push(name.to_string());
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, schema)| schema)
    }

    pub fn properties(&self) -> &[(String, PropertySchema)] {
        &self.properties
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

struct Properties<'a>(&'a [(String, PropertySchema)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &Properties(&self.properties))?;
        map.serialize_entry("required", &self.required)?;
        map.end()
    }
}

// =============================================================================
// Endpoint
// =============================================================================

/// How a declared parameter reaches the outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentBinding {
    pub name: String,
    pub location: ParameterLocation,
}

/// The operation a tool was compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub bindings: Vec<ArgumentBinding>,
}

impl Endpoint {
    pub fn binding(&self, name: &str) -> Option<&ArgumentBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

// =============================================================================
// Tool
// =============================================================================

/// A named, schema-described invocable unit.
///
/// Serializes to the wire form `{name, description, inputSchema}`; the
/// endpoint stays server-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
    #[serde(skip)]
    pub endpoint: Endpoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_schema_wire_form() {
        assert_eq!(
            InputSchema::new().to_value(),
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut schema = InputSchema::new();
        let param = |ty, desc: &str| PropertySchema::Parameter {
            schema_type: ty,
            description: desc.to_string(),
        };
        schema.insert_property("a", param(SchemaType::String, "first"));
        schema.insert_property("b", param(SchemaType::String, ""));
        schema.insert_property("a", param(SchemaType::Integer, "second"));

        let names: Vec<&str> = schema.properties().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(schema.property("a"), Some(&param(SchemaType::Integer, "second")));
    }

    #[test]
    fn test_required_is_a_set() {
        let mut schema = InputSchema::new();
        schema.require("id");
        schema.require("id");
        assert_eq!(schema.required(), ["id".to_string()]);
    }

    #[test]
    fn test_tool_wire_form_hides_endpoint() {
        let tool = Tool {
            name: "get__ping".to_string(),
            description: String::new(),
            input_schema: InputSchema::new(),
            endpoint: Endpoint {
                method: HttpMethod::Get,
                path: "/ping".to_string(),
                bindings: Vec::new(),
            },
        };
        let wire = serde_json::to_value(&tool).unwrap();
        assert_eq!(
            wire,
            json!({
                "name": "get__ping",
                "description": "",
                "inputSchema": {"type": "object", "properties": {}, "required": []}
            })
        );
    }
}
