//! Specification-to-tool compiler.
//!
//! Pure mapping from a [`SpecModel`] to an ordered list of [`Tool`]s: one
//! tool per supported operation, in path-then-method document order.

use crate::spec::{HttpMethod, Operation, SpecModel};
use crate::tools::tool::{ArgumentBinding, Endpoint, InputSchema, PropertySchema, Tool};
use crate::types::{Error, Result};
use std::collections::HashSet;

/// Property name under which the JSON request body is accepted.
pub const BODY_PROPERTY: &str = "body";

/// Compile every supported operation into a tool.
///
/// Fails with [`Error::DuplicateToolName`] as soon as two operations derive
/// the same name.
pub fn compile(spec: &SpecModel) -> Result<Vec<Tool>> {
    let mut seen: HashSet<String> = HashSet::with_capacity(spec.operation_count());
    let mut tools = Vec::with_capacity(spec.operation_count());

    for item in &spec.paths {
        for (method, operation) in &item.operations {
            let tool = compile_operation(&item.path, *method, operation);
            if !seen.insert(tool.name.clone()) {
                tracing::error!(
                    name = tool.name.as_str(),
                    path = item.path.as_str(),
                    method = method.as_str(),
                    "Tool name collision"
                );
                return Err(Error::DuplicateToolName(tool.name));
            }
            tracing::debug!(name = tool.name.as_str(), "Compiled tool");
            tools.push(tool);
        }
    }

    tracing::info!(tools = tools.len(), "Compiled tool catalog");
    Ok(tools)
}

/// Derive the tool name for an operation.
///
/// `lower(method) + "_" + path` with `/` and every other character outside
/// `[A-Za-z0-9_-]` replaced by `_`, so `GET /users/{id}` becomes
/// `get__users__id_`.
pub fn tool_name(method: HttpMethod, path: &str) -> String {
    let mut name = String::with_capacity(method.as_str().len() + 1 + path.len());
    name.push_str(method.as_str());
    name.push('_');
    name.extend(path.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        }
    }));
    name
}

fn compile_operation(path: &str, method: HttpMethod, operation: &Operation) -> Tool {
    let description = operation
        .summary
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(operation.description.as_deref())
        .unwrap_or_default()
        .to_string();

    let mut input_schema = InputSchema::new();
    let mut bindings: Vec<ArgumentBinding> = Vec::with_capacity(operation.parameters.len());

    // Duplicate names overwrite the earlier property and binding.
    for param in &operation.parameters {
        input_schema.insert_property(
            &param.name,
            PropertySchema::Parameter {
                schema_type: param.schema_type,
                description: param.description.clone().unwrap_or_default(),
            },
        );
        if param.required {
            input_schema.require(&param.name);
        }
        match bindings.iter_mut().find(|b| b.name == param.name) {
            Some(existing) => existing.location = param.location,
            None => bindings.push(ArgumentBinding {
                name: param.name.clone(),
                location: param.location,
            }),
        }
    }

    if let Some(body) = &operation.request_body {
        if let Some(schema) = &body.json_schema {
            input_schema.insert_property(BODY_PROPERTY, PropertySchema::Body(schema.clone()));
            if body.required {
                input_schema.require(BODY_PROPERTY);
            }
        }
    }

    Tool {
        name: tool_name(method, path),
        description,
        input_schema,
        endpoint: Endpoint {
            method,
            path: path.to_string(),
            bindings,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{JsonSchema, Parameter, ParameterLocation, PathItem, RequestBody, SchemaType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn param(name: &str, required: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            location: ParameterLocation::Query,
            required,
            schema_type: SchemaType::String,
            description: None,
        }
    }

    fn single(path: &str, method: HttpMethod, operation: Operation) -> SpecModel {
        SpecModel {
            paths: vec![PathItem {
                path: path.to_string(),
                operations: vec![(method, operation)],
            }],
            ..SpecModel::default()
        }
    }

    #[test]
    fn test_tool_name_derivation() {
        assert_eq!(tool_name(HttpMethod::Get, "/users/{id}"), "get__users__id_");
        assert_eq!(tool_name(HttpMethod::Post, "/orders"), "post__orders");
        assert_eq!(tool_name(HttpMethod::Delete, "/v1/item-list.json"), "delete__v1_item-list_json");
    }

    #[test]
    fn test_path_parameter_operation() {
        let mut id = param("id", true);
        id.location = ParameterLocation::Path;
        let op = Operation {
            parameters: vec![id],
            ..Operation::default()
        };
        let tools = compile(&single("/users/{id}", HttpMethod::Get, op)).unwrap();

        assert_eq!(tools.len(), 1);
        let tool = &tools[0];
        assert_eq!(tool.name, "get__users__id_");
        assert_eq!(tool.input_schema.required(), ["id".to_string()]);
        assert_eq!(
            tool.input_schema.to_value()["properties"]["id"],
            json!({"type": "string", "description": ""})
        );
        assert_eq!(tool.endpoint.binding("id").unwrap().location, ParameterLocation::Path);
    }

    #[test]
    fn test_required_json_body_is_embedded() {
        let schema = json!({"type": "object", "properties": {"qty": {"type": "integer"}}});
        let op = Operation {
            request_body: Some(RequestBody {
                required: true,
                json_schema: Some(JsonSchema::new(schema.clone()).unwrap()),
            }),
            ..Operation::default()
        };
        let tools = compile(&single("/orders", HttpMethod::Post, op)).unwrap();

        let value = tools[0].input_schema.to_value();
        assert_eq!(value["properties"]["body"], schema);
        assert_eq!(value["required"], json!(["body"]));
    }

    #[test]
    fn test_optional_body_not_required() {
        let op = Operation {
            parameters: vec![param("dry_run", false)],
            request_body: Some(RequestBody {
                required: false,
                json_schema: Some(JsonSchema::default()),
            }),
            ..Operation::default()
        };
        let tools = compile(&single("/orders", HttpMethod::Put, op)).unwrap();
        assert!(tools[0].input_schema.required().is_empty());
        assert!(tools[0].input_schema.property("body").is_some());
    }

    #[test]
    fn test_body_without_json_content_is_ignored() {
        let op = Operation {
            request_body: Some(RequestBody {
                required: true,
                json_schema: None,
            }),
            ..Operation::default()
        };
        let tools = compile(&single("/upload", HttpMethod::Post, op)).unwrap();
        assert_eq!(
            tools[0].input_schema.to_value(),
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_description_prefers_non_empty_summary() {
        let op = Operation {
            summary: Some(String::new()),
            description: Some("Long form".to_string()),
            ..Operation::default()
        };
        let tools = compile(&single("/a", HttpMethod::Get, op)).unwrap();
        assert_eq!(tools[0].description, "Long form");

        let tools = compile(&single("/a", HttpMethod::Get, Operation::default())).unwrap();
        assert_eq!(tools[0].description, "");
    }

    #[test]
    fn test_duplicate_parameter_last_write_wins() {
        // Mirrors observed behaviour; OpenAPI forbids the duplicate but the
        // compiler does not reject it.
        let mut first = param("q", true);
        first.description = Some("first".to_string());
        let mut second = param("q", false);
        second.schema_type = SchemaType::Integer;
        second.description = Some("second".to_string());
        let op = Operation {
            parameters: vec![first, second],
            ..Operation::default()
        };
        let tools = compile(&single("/search", HttpMethod::Get, op)).unwrap();

        let value = tools[0].input_schema.to_value();
        assert_eq!(value["properties"]["q"], json!({"type": "integer", "description": "second"}));
        assert_eq!(value["required"], json!(["q"]));
    }

    #[test]
    fn test_name_collision_fails() {
        let spec = SpecModel {
            paths: vec![
                PathItem {
                    path: "/a/b".to_string(),
                    operations: vec![(HttpMethod::Get, Operation::default())],
                },
                PathItem {
                    path: "/a_b".to_string(),
                    operations: vec![(HttpMethod::Get, Operation::default())],
                },
            ],
            ..SpecModel::default()
        };
        match compile(&spec).unwrap_err() {
            Error::DuplicateToolName(name) => assert_eq!(name, "get__a_b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let spec = SpecModel {
            paths: vec![PathItem {
                path: "/items".to_string(),
                operations: vec![
                    (HttpMethod::Post, Operation::default()),
                    (HttpMethod::Get, Operation::default()),
                ],
            }],
            ..SpecModel::default()
        };
        let first = serde_json::to_string(&compile(&spec).unwrap()).unwrap();
        let second = serde_json::to_string(&compile(&spec).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.find("post__items").unwrap() < first.find("get__items").unwrap());
    }
}
