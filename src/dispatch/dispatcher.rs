//! Invocation dispatcher: resolves a tool call to an outbound request.

use crate::dispatch::invoker::{HttpInvoker, InvocationResult, OutboundRequest};
use crate::spec::ParameterLocation;
use crate::tools::{CatalogHandle, Tool, BODY_PROPERTY};
use crate::types::{Error, Result};
use reqwest::Url;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Resolves tool names against the published catalog and delegates the
/// resulting request to an [`HttpInvoker`].
#[derive(Debug, Clone)]
pub struct InvocationDispatcher {
    catalog: Arc<CatalogHandle>,
    invoker: Arc<dyn HttpInvoker>,
}

impl InvocationDispatcher {
    pub fn new(catalog: Arc<CatalogHandle>, invoker: Arc<dyn HttpInvoker>) -> Self {
        Self { catalog, invoker }
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    /// Invoke a tool.
    ///
    /// Checks run in order: tool exists, required arguments present, base
    /// URL known. Nothing is sent unless all pass. The outbound call runs
    /// on its own task, so dropping this future does not abort a call that
    /// has already started.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<InvocationResult> {
        let request = {
            let catalog = self.catalog.load();
            let tool = catalog.lookup(tool_name)?;
            check_required(tool, &arguments)?;
            let base_url = catalog.base_url().ok_or(Error::NoBaseUrl)?;
            build_request(base_url, tool, &arguments)?
        };

        tracing::info!(
            tool = tool_name,
            method = %request.method,
            url = %request.url,
            "Dispatching tool call"
        );

        let invoker = Arc::clone(&self.invoker);
        let call = tokio::spawn(async move { invoker.send(request).await });
        let result = call
            .await
            .map_err(|e| Error::internal(format!("outbound call task failed: {}", e)))??;

        tracing::info!(tool = tool_name, status = result.status, "Tool call completed");
        Ok(result)
    }
}

/// Fail with the first missing name from `inputSchema.required`.
pub fn check_required(tool: &Tool, arguments: &Map<String, Value>) -> Result<()> {
    match tool
        .input_schema
        .required()
        .iter()
        .find(|name| !arguments.contains_key(name.as_str()))
    {
        Some(missing) => Err(Error::MissingArgument(missing.clone())),
        None => Ok(()),
    }
}

/// Map a tool call onto an outbound request against `base_url`.
///
/// - `{name}` placeholders in the path are filled from the arguments;
/// - declared query parameters go to the query string, header parameters to
///   headers, cookie parameters to one `Cookie` header;
/// - for GET/DELETE, undeclared arguments also go to the query string;
/// - for POST/PUT/PATCH, the `body` argument is the JSON body.
pub fn build_request(
    base_url: &Url,
    tool: &Tool,
    arguments: &Map<String, Value>,
) -> Result<OutboundRequest> {
    let endpoint = &tool.endpoint;
    let mut used: HashSet<String> = HashSet::new();

    let mut segments = Vec::new();
    for segment in endpoint.path.trim_start_matches('/').split('/') {
        let filled = fill_placeholders(segment, arguments, &mut used)?;
        // URL normalization would drop these and change the target path.
        if filled != segment && (filled == "." || filled == "..") {
            return Err(Error::validation(format!(
                "path segment {:?} of {} resolves to {:?}",
                segment, endpoint.path, filled
            )));
        }
        segments.push(filled);
    }

    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| Error::validation(format!("base URL {} cannot carry a path", base_url)))?
        .pop_if_empty()
        .extend(segments.iter().map(String::as_str));

    let mut query = Vec::new();
    let mut headers = Vec::new();
    let mut cookies = Vec::new();

    for (name, value) in arguments {
        if used.contains(name.as_str()) || name == BODY_PROPERTY || value.is_null() {
            continue;
        }
        match endpoint.binding(name).map(|b| b.location) {
            Some(ParameterLocation::Query) => push_query(&mut query, name, value),
            Some(ParameterLocation::Header) => headers.push((name.clone(), scalar_text(value))),
            Some(ParameterLocation::Cookie) => {
                cookies.push(format!("{}={}", name, scalar_text(value)))
            }
            Some(ParameterLocation::Path) => {
                tracing::debug!(argument = name.as_str(), "Path parameter not in template, ignored");
            }
            Some(ParameterLocation::Other) => {
                tracing::debug!(argument = name.as_str(), "Argument has no routable location, ignored");
            }
            None if !endpoint.method.sends_body() => push_query(&mut query, name, value),
            None => {
                tracing::debug!(argument = name.as_str(), "Undeclared argument ignored");
            }
        }
    }
    if !cookies.is_empty() {
        headers.push(("cookie".to_string(), cookies.join("; ")));
    }

    let body = if endpoint.method.sends_body() {
        arguments.get(BODY_PROPERTY).cloned()
    } else {
        None
    };

    Ok(OutboundRequest {
        method: endpoint.method,
        url,
        query,
        headers,
        body,
    })
}

/// Replace each `{name}` in a path segment with the argument's text.
fn fill_placeholders(
    segment: &str,
    arguments: &Map<String, Value>,
    used: &mut HashSet<String>,
) -> Result<String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 1..close];
        let value = arguments
            .get(name)
            .ok_or_else(|| Error::MissingArgument(name.to_string()))?;
        out.push_str(&scalar_text(value));
        used.insert(name.to_string());
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn push_query(query: &mut Vec<(String, String)>, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                query.push((name.to_string(), scalar_text(item)));
            }
        }
        other => query.push((name.to_string(), scalar_text(other))),
    }
}

/// Strings are sent raw; everything else as its JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::invoker::EchoInvoker;
    use crate::spec::{HttpMethod, SchemaType};
    use crate::tools::{ArgumentBinding, Endpoint, InputSchema, PropertySchema, ToolCatalog};
    use serde_json::json;

    fn tool(method: HttpMethod, path: &str, params: &[(&str, ParameterLocation, bool)]) -> Tool {
        let mut input_schema = InputSchema::new();
        let mut bindings = Vec::new();
        for (name, location, required) in params {
            input_schema.insert_property(
                name,
                PropertySchema::Parameter {
                    schema_type: SchemaType::String,
                    description: String::new(),
                },
            );
            if *required {
                input_schema.require(name);
            }
            bindings.push(ArgumentBinding {
                name: name.to_string(),
                location: *location,
            });
        }
        Tool {
            name: crate::tools::tool_name(method, path),
            description: String::new(),
            input_schema,
            endpoint: Endpoint {
                method,
                path: path.to_string(),
                bindings,
            },
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn base() -> Url {
        Url::parse("https://api.test/v1/").unwrap()
    }

    #[test]
    fn test_path_substitution_and_query() {
        let t = tool(
            HttpMethod::Get,
            "/users/{id}/posts",
            &[("id", ParameterLocation::Path, true), ("limit", ParameterLocation::Query, false)],
        );
        let req = build_request(&base(), &t, &args(json!({"id": "a b", "limit": 10, "extra": true})))
            .unwrap();

        assert_eq!(req.url.as_str(), "https://api.test/v1/users/a%20b/posts");
        assert_eq!(
            req.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("extra".to_string(), "true".to_string())
            ]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_post_sends_body_argument() {
        let t = tool(HttpMethod::Post, "/orders", &[("dry_run", ParameterLocation::Query, false)]);
        let req = build_request(
            &base(),
            &t,
            &args(json!({"body": {"qty": 3}, "dry_run": false, "stray": 1})),
        )
        .unwrap();

        assert_eq!(req.url.as_str(), "https://api.test/v1/orders");
        assert_eq!(req.body, Some(json!({"qty": 3})));
        assert_eq!(req.query, vec![("dry_run".to_string(), "false".to_string())]);
    }

    #[test]
    fn test_header_and_cookie_parameters() {
        let t = tool(
            HttpMethod::Delete,
            "/items/{id}",
            &[
                ("id", ParameterLocation::Path, true),
                ("X-Trace", ParameterLocation::Header, false),
                ("session", ParameterLocation::Cookie, false),
            ],
        );
        let req = build_request(
            &base(),
            &t,
            &args(json!({"id": 7, "X-Trace": "abc", "session": "s1"})),
        )
        .unwrap();

        assert_eq!(req.url.path(), "/v1/items/7");
        assert!(req.headers.contains(&("X-Trace".to_string(), "abc".to_string())));
        assert!(req.headers.contains(&("cookie".to_string(), "session=s1".to_string())));
        assert!(req.query.is_empty());
    }

    #[test]
    fn test_missing_path_argument() {
        let t = tool(HttpMethod::Get, "/users/{id}", &[]);
        let err = build_request(&base(), &t, &Map::new()).unwrap_err();
        assert!(matches!(err, Error::MissingArgument(name) if name == "id"));
    }

    #[test]
    fn test_dot_segments_in_path_arguments_are_rejected() {
        let t = tool(
            HttpMethod::Get,
            "/users/{id}/posts",
            &[("id", ParameterLocation::Path, true)],
        );
        for id in ["..", "."] {
            let err = build_request(&base(), &t, &args(json!({ "id": id }))).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "id {id:?} gave {err:?}");
            assert_eq!(err.to_rpc_code(), crate::types::RPC_INVALID_PARAMS);
        }

        let req = build_request(&base(), &t, &args(json!({"id": "..a", "x": "."}))).unwrap();
        assert_eq!(req.url.path(), "/v1/users/..a/posts");
    }

    #[test]
    fn test_unrouted_location_is_not_sent() {
        let t = tool(
            HttpMethod::Get,
            "/upload",
            &[("file", ParameterLocation::Other, false)],
        );
        let req = build_request(&base(), &t, &args(json!({"file": "data", "q": 1}))).unwrap();
        assert_eq!(req.query, vec![("q".to_string(), "1".to_string())]);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_array_query_values_repeat() {
        let t = tool(HttpMethod::Get, "/search", &[("tag", ParameterLocation::Query, false)]);
        let req = build_request(&base(), &t, &args(json!({"tag": ["a", "b"]}))).unwrap();
        assert_eq!(
            req.query,
            vec![("tag".to_string(), "a".to_string()), ("tag".to_string(), "b".to_string())]
        );
    }

    fn dispatcher(tools: Vec<Tool>, base_url: Option<&str>) -> (InvocationDispatcher, Arc<EchoInvoker>) {
        let catalog = ToolCatalog::build(tools).unwrap().with_base_url(base_url);
        let handle = Arc::new(CatalogHandle::new(catalog));
        let echo = Arc::new(EchoInvoker::new());
        (InvocationDispatcher::new(handle, echo.clone()), echo)
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let (dispatcher, echo) = dispatcher(vec![], Some("https://api.test"));
        let err = dispatcher.invoke("nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
        assert_eq!(echo.calls(), 0);
        assert!(dispatcher.catalog().load().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_missing_required_sends_nothing() {
        let t = tool(HttpMethod::Get, "/users/{id}", &[("id", ParameterLocation::Path, true)]);
        let (dispatcher, echo) = dispatcher(vec![t], Some("https://api.test"));

        let err = dispatcher.invoke("get__users__id_", Map::new()).await.unwrap_err();

        assert!(matches!(err, Error::MissingArgument(name) if name == "id"));
        assert_eq!(echo.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoke_without_base_url() {
        let t = tool(HttpMethod::Get, "/ping", &[]);
        let (dispatcher, echo) = dispatcher(vec![t], None);

        let err = dispatcher.invoke("get__ping", Map::new()).await.unwrap_err();

        assert!(matches!(err, Error::NoBaseUrl));
        assert_eq!(echo.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoke_delegates_to_invoker() {
        let t = tool(HttpMethod::Get, "/users/{id}", &[("id", ParameterLocation::Path, true)]);
        let (dispatcher, echo) = dispatcher(vec![t], Some("https://api.test"));

        let result = dispatcher
            .invoke("get__users__id_", args(json!({"id": "42"})))
            .await
            .unwrap();

        assert_eq!(echo.calls(), 1);
        assert_eq!(result.status, 200);
        assert_eq!(result.body["url"], "https://api.test/users/42");
    }
}
