//! Auxiliary listings: resources, resource templates and prompts.
//!
//! These are not derived from the API description. They come from a static
//! set, optionally read from a JSON file at startup.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// A listed resource. `text`, when present, is served by `resources/read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing)]
    pub text: Option<String>,
}

/// A parameterized resource URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A prompt. `template` may reference arguments as `{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
    #[serde(default, skip_serializing)]
    pub template: Option<String>,
}

/// Serves the auxiliary listings.
pub trait ContentProvider: Send + Sync + std::fmt::Debug {
    fn resources(&self) -> Vec<Resource>;

    fn resource_templates(&self) -> Vec<ResourceTemplate>;

    fn prompts(&self) -> Vec<Prompt>;

    /// Contents for `resources/read`.
    fn read_resource(&self, uri: &str) -> Result<Value>;

    /// Rendered result for `prompts/get`.
    fn get_prompt(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value>;
}

/// Fixed content, empty by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticContent {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}

impl StaticContent {
    /// Read content from a JSON file with `resources`, `resourceTemplates`
    /// and `prompts` arrays.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let content: Self = serde_json::from_str(&text)?;
        tracing::info!(
            resources = content.resources.len(),
            templates = content.resource_templates.len(),
            prompts = content.prompts.len(),
            "Loaded static content"
        );
        Ok(content)
    }
}

impl ContentProvider for StaticContent {
    fn resources(&self) -> Vec<Resource> {
        self.resources.clone()
    }

    fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.resource_templates.clone()
    }

    fn prompts(&self) -> Vec<Prompt> {
        self.prompts.clone()
    }

    fn read_resource(&self, uri: &str) -> Result<Value> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| Error::validation(format!("unknown resource: {}", uri)))?;
        let text = resource
            .text
            .as_ref()
            .ok_or_else(|| Error::validation(format!("resource has no readable content: {}", uri)))?;

        let mut entry = Map::new();
        entry.insert("uri".to_string(), Value::String(resource.uri.clone()));
        if let Some(mime) = &resource.mime_type {
            entry.insert("mimeType".to_string(), Value::String(mime.clone()));
        }
        entry.insert("text".to_string(), Value::String(text.clone()));
        Ok(serde_json::json!({ "contents": [entry] }))
    }

    fn get_prompt(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value> {
        let prompt = self
            .prompts
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::validation(format!("unknown prompt: {}", name)))?;

        if let Some(missing) = prompt
            .arguments
            .iter()
            .find(|a| a.required && !arguments.contains_key(&a.name))
        {
            return Err(Error::MissingArgument(missing.name.clone()));
        }

        let mut text = prompt
            .template
            .clone()
            .or_else(|| prompt.description.clone())
            .unwrap_or_else(|| prompt.name.clone());
        for (key, value) in arguments {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text = text.replace(&format!("{{{}}}", key), &rendered);
        }

        let mut result = Map::new();
        if let Some(description) = &prompt.description {
            result.insert("description".to_string(), Value::String(description.clone()));
        }
        result.insert(
            "messages".to_string(),
            serde_json::json!([{
                "role": "user",
                "content": {"type": "text", "text": text}
            }]),
        );
        Ok(Value::Object(result))
    }
}
