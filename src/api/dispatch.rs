use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::api::context::CallContext;
use crate::binding::Binding;
use crate::error::CmisError;
use crate::model::ContentStream;

/// Selector values for GET requests, keyed by the `cmisselector` parameter.
pub mod selector {
    /// Bare repository URL, no selector.
    pub const REPOSITORY_INFO: &str = "";
    pub const LAST_RESULT: &str = "lastResult";
    pub const TYPE_CHILDREN: &str = "typeChildren";
    pub const TYPE_DESCENDANTS: &str = "typeDescendants";
    pub const TYPE_DEFINITION: &str = "typeDefinition";
    pub const QUERY: &str = "query";
    pub const OBJECT: &str = "object";
    pub const CONTENT: &str = "content";
    pub const CHILDREN: &str = "children";
    pub const DESCENDANTS: &str = "descendants";
    pub const FOLDER_TREE: &str = "folderTree";
    pub const PARENTS: &str = "parents";
    pub const VERSIONS: &str = "versions";
}

/// Action values for POST requests, keyed by the `cmisaction` parameter.
pub mod action {
    pub const QUERY: &str = "query";
    pub const CREATE_DOCUMENT: &str = "createDocument";
    pub const CREATE_FOLDER: &str = "createFolder";
    pub const SET_CONTENT: &str = "setContent";
    pub const DELETE: &str = "delete";
    pub const DELETE_TREE: &str = "deleteTree";
}

/// Request parameter names.
pub mod param {
    pub const SELECTOR: &str = "cmisselector";
    pub const ACTION: &str = "cmisaction";
    pub const OBJECT_ID: &str = "objectId";
    pub const TRANSACTION: &str = "transaction";
    pub const TYPE_ID: &str = "typeId";
    pub const DEPTH: &str = "depth";
    pub const STATEMENT: &str = "statement";
    pub const OVERWRITE: &str = "overwriteFlag";
}

/// One line of a list response.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }

    pub fn to_value(&self) -> Result<Value, CmisError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The incoming request as the dispatcher sees it: query parameters plus an
/// optional JSON payload. Controls may arrive either way; query parameters
/// win on conflict.
#[derive(Debug, Default)]
pub struct OperationRequest {
    pub method: Method,
    pub params: HashMap<String, String>,
    pub payload: Option<Value>,
}

impl OperationRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.params.get(key) {
            return Some(value.as_str());
        }
        self.payload
            .as_ref()
            .and_then(|payload| payload.get(key))
            .and_then(Value::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, CmisError> {
        self.param(key)
            .ok_or_else(|| CmisError::invalid_argument(format!("Parameter {} must be set", key)))
    }

    pub fn int_param(&self, key: &str, default: i64) -> i64 {
        self.param(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    pub fn bool_param(&self, key: &str, default: bool) -> bool {
        self.param(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Object properties from the payload's `properties` member, falling
    /// back to `cmis:`-prefixed query parameters for form-style clients.
    pub fn properties(&self) -> HashMap<String, Value> {
        if let Some(Value::Object(map)) = self.payload.as_ref().and_then(|p| p.get("properties")) {
            return map.clone().into_iter().collect();
        }
        self.params
            .iter()
            .filter(|(key, _)| key.starts_with("cmis:"))
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect()
    }

    /// Content stream from the payload's `content` member.
    pub fn content_stream(&self) -> Result<Option<ContentStream>, CmisError> {
        let Some(content) = self.payload.as_ref().and_then(|p| p.get("content")) else {
            return Ok(None);
        };
        let file_name = content
            .get("fileName")
            .and_then(Value::as_str)
            .ok_or_else(|| CmisError::invalid_argument("Content fileName must be set"))?;
        let mime_type = content
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream");
        let data = content
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| CmisError::invalid_argument("Content data must be set"))?;
        Ok(Some(ContentStream::new(
            file_name,
            mime_type,
            data.as_bytes().to_vec(),
        )))
    }
}

/// Everything a handler may touch for one operation.
pub struct Operation<'a> {
    pub context: &'a CallContext,
    pub binding: &'a Binding,
    pub repository_id: &'a str,
    pub request: &'a OperationRequest,
}

#[derive(Debug)]
pub enum ResponseBody {
    Json(Value),
    Content { mime_type: String, bytes: Vec<u8> },
    Empty,
}

#[derive(Debug)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ServiceResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Json(value),
        }
    }

    pub fn created(value: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: ResponseBody::Json(value),
        }
    }

    pub fn content(stream: ContentStream) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Content {
                mime_type: stream.mime_type,
                bytes: stream.content,
            },
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }
}

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Json(value) => (self.status, Json(value)).into_response(),
            ResponseBody::Content { mime_type, bytes } => (
                self.status,
                [(axum::http::header::CONTENT_TYPE, mime_type)],
                bytes,
            )
                .into_response(),
            ResponseBody::Empty => self.status.into_response(),
        }
    }
}

pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ServiceResponse, CmisError>> + Send + 'a>>;

/// A routed operation. Plain function pointers keep the table cheap to
/// clone and impossible to register twice with different state.
pub type Handler = for<'a> fn(&'a Operation<'a>) -> HandlerFuture<'a>;

/// Route table mapping (resource key, method) to a handler. Resource keys
/// are selector values for GET and action values for POST.
pub struct Dispatcher {
    routes: HashMap<(String, Method), Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registers a route. Duplicate registration is a programming error and
    /// fails at startup.
    pub fn add_resource(&mut self, resource: &str, method: Method, handler: Handler) {
        let previous = self.routes.insert((resource.to_string(), method.clone()), handler);
        assert!(
            previous.is_none(),
            "duplicate route: {} {}",
            method,
            resource
        );
    }

    pub fn find(&self, resource: &str, method: &Method) -> Option<Handler> {
        self.routes.get(&(resource.to_string(), method.clone())).copied()
    }

    /// Runs the matching handler, or `None` when no route matches.
    pub async fn dispatch<'a>(
        &self,
        resource: &str,
        operation: &'a Operation<'a>,
    ) -> Option<Result<ServiceResponse, CmisError>> {
        let handler = self.find(resource, &operation.request.method)?;
        Some(handler(operation).await)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(params: &[(&str, &str)], payload: Option<Value>) -> OperationRequest {
        OperationRequest {
            method: Method::GET,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            payload,
        }
    }

    #[test]
    fn query_params_win_over_payload() {
        let req = request(
            &[("objectId", "from-query")],
            Some(json!({"objectId": "from-payload", "transaction": "t1"})),
        );
        assert_eq!(req.param("objectId"), Some("from-query"));
        assert_eq!(req.param("transaction"), Some("t1"));
        assert_eq!(req.param("missing"), None);
    }

    #[test]
    fn properties_prefer_payload_object() {
        let req = request(
            &[("cmis:name", "ignored")],
            Some(json!({"properties": {"cmis:name": "a.txt"}})),
        );
        assert_eq!(req.properties()["cmis:name"], json!("a.txt"));

        let req = request(&[("cmis:name", "b.txt"), ("depth", "2")], None);
        let props = req.properties();
        assert_eq!(props.len(), 1);
        assert_eq!(props["cmis:name"], json!("b.txt"));
    }

    #[test]
    fn content_stream_requires_file_name_and_data() {
        let req = request(&[], Some(json!({"content": {"fileName": "a.txt", "data": "hi"}})));
        let stream = req.content_stream().unwrap().unwrap();
        assert_eq!(stream.file_name, "a.txt");
        assert_eq!(stream.mime_type, "application/octet-stream");
        assert_eq!(stream.content, b"hi");

        let req = request(&[], Some(json!({"content": {"data": "hi"}})));
        assert!(req.content_stream().is_err());

        let req = request(&[], None);
        assert!(req.content_stream().unwrap().is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate route")]
    fn duplicate_routes_panic() {
        fn noop<'a>(_op: &'a Operation<'a>) -> HandlerFuture<'a> {
            Box::pin(async { Ok(ServiceResponse::no_content()) })
        }
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_resource(selector::OBJECT, Method::GET, noop);
        dispatcher.add_resource(selector::OBJECT, Method::GET, noop);
    }
}
